//! Scanner command line
//!
//! The token is part of the argument list handed to the child process but is
//! never rendered: `Display` and `Debug` both substitute `REDACTED`.

use std::ffi::OsString;
use std::fmt;

const REDACTED: &str = "REDACTED";

/// Arguments for one scanner run against one repository
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    binary: String,
    endpoint: String,
    token: String,
    check_image: String,
    target: String,
}

impl Invocation {
    pub fn new(
        binary: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
        check_image: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            endpoint: endpoint.into(),
            token: token.into(),
            check_image: check_image.into(),
            target: target.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Arguments passed to the child, token included
    pub fn args(&self) -> Vec<OsString> {
        self.render(&self.token)
            .into_iter()
            .map(OsString::from)
            .collect()
    }

    fn render(&self, token: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "-var".to_string(),
            format!("GITHUB_ENTERPRISE_ENDPOINT={}", self.endpoint),
            "-var".to_string(),
            format!("GITHUB_ENTERPRISE_TOKEN={}", token),
            "-type=GitRepository".to_string(),
            "-show".to_string(),
            "info".to_string(),
            "-fmt=json".to_string(),
            self.check_image.clone(),
            self.target.clone(),
        ]
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.binary, self.render(REDACTED).join(" "))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("binary", &self.binary)
            .field("endpoint", &self.endpoint)
            .field("token", &REDACTED)
            .field("check_image", &self.check_image)
            .field("target", &self.target)
            .finish()
    }
}
