use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tutor_core::model::SessionId;

use crate::error::SessionIdentityError;

/// Supplies the learner session every progress call is made on behalf of.
///
/// Returning `None` means no session has been established yet.
pub trait SessionIdentity: Send + Sync {
    fn session_id(&self) -> Option<SessionId>;
}

/// Identity that is known up front, or deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct FixedSessionIdentity(Option<SessionId>);

impl FixedSessionIdentity {
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self(Some(session_id))
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl SessionIdentity for FixedSessionIdentity {
    fn session_id(&self) -> Option<SessionId> {
        self.0.clone()
    }
}

/// Identity persisted as a single token in a file, stable across restarts
/// of the same device.
#[derive(Debug, Clone)]
pub struct FileSessionIdentity {
    path: PathBuf,
    session_id: Option<SessionId>,
}

impl FileSessionIdentity {
    /// Read the token at `path`, generating and writing a new one if the file
    /// is missing or blank.
    ///
    /// # Errors
    ///
    /// Returns `SessionIdentityError::Io` if the file cannot be read or written.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, SessionIdentityError> {
        let path = path.as_ref().to_path_buf();
        if let Some(existing) = read_token(&path)? {
            return Ok(Self {
                path,
                session_id: Some(existing),
            });
        }

        let session_id = SessionId::generate();
        let io_err = |source: std::io::Error| SessionIdentityError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, session_id.as_str()).map_err(io_err)?;
        tracing::info!(path = %path.display(), "created learner session token");

        Ok(Self {
            path,
            session_id: Some(session_id),
        })
    }

    /// Read the token at `path` without creating one.
    ///
    /// # Errors
    ///
    /// Returns `SessionIdentityError::Io` for read failures other than a
    /// missing file.
    pub fn read_existing(path: impl AsRef<Path>) -> Result<Self, SessionIdentityError> {
        let path = path.as_ref().to_path_buf();
        let session_id = read_token(&path)?;
        Ok(Self { path, session_id })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionIdentity for FileSessionIdentity {
    fn session_id(&self) -> Option<SessionId> {
        self.session_id.clone()
    }
}

fn read_token(path: &Path) -> Result<Option<SessionId>, SessionIdentityError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(SessionId::new(raw).ok()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SessionIdentityError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_identity_is_stable_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session");

        let first = FileSessionIdentity::load_or_create(&path).unwrap();
        let second = FileSessionIdentity::load_or_create(&path).unwrap();

        assert!(first.session_id().is_some());
        assert_eq!(first.session_id(), second.session_id());
        assert_eq!(second.path(), path.as_path());
    }

    #[test]
    fn read_existing_without_file_has_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let identity = FileSessionIdentity::read_existing(dir.path().join("missing")).unwrap();
        assert!(identity.session_id().is_none());
    }

    #[test]
    fn blank_token_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        fs::write(&path, "   \n").unwrap();

        let identity = FileSessionIdentity::load_or_create(&path).unwrap();
        let stored = fs::read_to_string(&path).unwrap();
        assert_eq!(identity.session_id().unwrap().as_str(), stored);
    }

    #[test]
    fn anonymous_identity_has_no_session() {
        assert!(FixedSessionIdentity::anonymous().session_id().is_none());
    }
}
