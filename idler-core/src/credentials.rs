//! Gateway basic-auth credentials read from mounted secret files.

use std::fmt;
use std::path::Path;

use tracing::warn;

use crate::error::{IdlerError, IdlerResult};

const USER_FILE: &str = "basic-auth-user";
const PASSWORD_FILE: &str = "basic-auth-password";

/// Basic-auth credentials for the gateway.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read `basic-auth-user` and `basic-auth-password` from a secret mount.
    ///
    /// A missing file is logged and treated as empty. Returns `None` when
    /// neither value is set, so requests go out unauthenticated.
    pub fn load(secret_mount_path: impl AsRef<Path>) -> IdlerResult<Option<Self>> {
        let dir = secret_mount_path.as_ref();
        let username = read_secret(&dir.join(USER_FILE))?;
        let password = read_secret(&dir.join(PASSWORD_FILE))?;

        if username.is_empty() && password.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self { username, password }))
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn read_secret(path: &Path) -> IdlerResult<String> {
    if !path.exists() {
        warn!(path = %path.display(), "Secret file not found, continuing without it");
        return Ok(String::new());
    }

    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| IdlerError::Credentials {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_trims_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(USER_FILE), "admin\n").unwrap();
        std::fs::write(dir.path().join(PASSWORD_FILE), "  s3cret \n").unwrap();

        let creds = Credentials::load(dir.path()).unwrap().unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_missing_files_means_no_credentials() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Credentials::load(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_unreadable_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        // A directory where a file is expected cannot be read as a string
        std::fs::create_dir(dir.path().join(USER_FILE)).unwrap();

        let result = Credentials::load(dir.path());
        assert!(matches!(result, Err(IdlerError::Credentials { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("admin"));
        assert!(!printed.contains("s3cret"));
    }
}
