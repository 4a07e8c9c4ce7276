use std::path::PathBuf;

use thiserror::Error;

/// Errors that end the watch loop.
///
/// Command failures and notification failures never show up here: they are
/// logged where they happen and the loop keeps going.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create temporary directory: {0}")]
    TempDir(std::io::Error),

    #[error("failed to prepare directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load private key {}: {source}", path.display())]
    KeyAuth {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to clone {url}: {source}")]
    Clone { url: String, source: git2::Error },

    #[error("failed to open worktree at {}: {source}", path.display())]
    Worktree { path: PathBuf, source: git2::Error },

    #[error("failed to pull branch {branch}: {source}")]
    Pull { branch: String, source: git2::Error },

    #[error("unable to listen for interrupt signals: {0}")]
    Signal(std::io::Error),

    #[error("watch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl WatchError {
    /// Setup errors happen before the first successful clone.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            WatchError::TempDir(_)
                | WatchError::Directory { .. }
                | WatchError::KeyAuth { .. }
                | WatchError::Clone { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_error_message_names_branch() {
        let err = WatchError::Pull {
            branch: "main".to_string(),
            source: git2::Error::from_str("non-fast-forward update"),
        };

        let msg = err.to_string();
        assert!(msg.contains("main"));
        assert!(msg.contains("non-fast-forward"));
        assert!(!err.is_setup());
    }

    #[test]
    fn test_directory_error_is_setup() {
        let err = WatchError::Directory {
            path: PathBuf::from("/nope/dir"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };

        assert!(err.to_string().contains("/nope/dir"));
        assert!(err.is_setup());
    }
}
