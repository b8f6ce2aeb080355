//! Raw scanner output persistence
//!
//! Layout: `<base>/<org>/<repo>/stdout.json` and `<base>/<org>/<repo>/stderr.log`.

use crate::scan::error::PersistError;
use std::path::{Path, PathBuf};

pub const STDOUT_FILE: &str = "stdout.json";
pub const STDERR_FILE: &str = "stderr.log";

/// Writes the raw output of each scan under a base directory
#[derive(Debug, Clone)]
pub struct RawResultStore {
    base: PathBuf,
}

impl RawResultStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory that holds the output of `target`
    pub fn location(&self, target: &str) -> Result<PathBuf, PersistError> {
        let (org, repo) = org_and_repo(target)?;
        Ok(self.base.join(org).join(repo))
    }

    /// Persist both streams, creating directories on demand
    pub async fn store(
        &self,
        target: &str,
        stdout: &[u8],
        stderr: &[u8],
    ) -> Result<PathBuf, PersistError> {
        let dir = self.location(target)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PersistError::Io {
                path: dir.clone(),
                source,
            })?;

        for (name, contents) in [(STDOUT_FILE, stdout), (STDERR_FILE, stderr)] {
            let path = dir.join(name);
            tokio::fs::write(&path, contents)
                .await
                .map_err(|source| PersistError::Io { path, source })?;
        }

        log::debug!("Lava scan results stored for {} in {}", target, dir.display());
        Ok(dir)
    }
}

/// Organization and repository names from a clone address
///
/// Uses the first two non-empty path segments. Addresses without a scheme are
/// treated as bare paths.
pub fn org_and_repo(target: &str) -> Result<(String, String), PersistError> {
    let invalid = |reason: String| PersistError::InvalidTarget {
        target: target.to_string(),
        reason,
    };

    let path = match url::Url::parse(target) {
        Ok(parsed) => parsed.path().to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => target.to_string(),
        Err(e) => return Err(invalid(format!("invalid URL: {}", e))),
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let (Some(org), Some(repo)) = (segments.next(), segments.next()) else {
        return Err(invalid(format!("invalid repository URL path: {}", path)));
    };

    if [org, repo].iter().any(|s| *s == "." || *s == "..") {
        return Err(invalid(format!("unsafe path segment in {}", path)));
    }

    Ok((org.to_string(), repo.to_string()))
}
