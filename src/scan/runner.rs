//! Scanner process execution

use crate::core::shutdown::ShutdownSignal;
use crate::scan::error::{ScanError, ScanResult};
use crate::scan::invocation::Invocation;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Captured result of one finished scanner process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, absent when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Killed on shutdown; the streams hold whatever was read before that
    pub cancelled: bool,
}

impl ProcessOutput {
    /// Successful exit with the given report on stdout
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    pub fn from_status(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code: status.code(),
            signal: exit_signal(&status),
            stdout,
            stderr,
            cancelled: false,
        }
    }

    /// Partial output of a process stopped by the shutdown signal
    pub fn cancelled(stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            stdout,
            stderr,
            cancelled: true,
            ..Default::default()
        }
    }

    /// The invocation error for anything other than a clean exit
    pub fn failure(&self) -> Option<ScanError> {
        if self.cancelled {
            return Some(ScanError::Cancelled);
        }
        match (self.exit_code, self.signal) {
            (Some(0), _) => None,
            (Some(code), _) => Some(ScanError::Invocation {
                message: format!("exit status {}", code),
            }),
            (None, Some(signal)) => Some(ScanError::Invocation {
                message: format!("terminated by signal {}", signal),
            }),
            (None, None) => Some(ScanError::Invocation {
                message: "exited without a status".to_string(),
            }),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Runs the scanner for one invocation
#[async_trait]
pub trait ScannerRunner: Send + Sync {
    /// Run to completion, or until the shutdown signal fires
    async fn run(&self, invocation: &Invocation, shutdown: &ShutdownSignal)
        -> ScanResult<ProcessOutput>;
}

/// Spawns the scanner as a child process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl ScannerRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        shutdown: &ShutdownSignal,
    ) -> ScanResult<ProcessOutput> {
        if shutdown.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut child = tokio::process::Command::new(invocation.binary())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::Invocation {
                message: e.to_string(),
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // The buffers keep every byte read so far even when the race is lost.
        let finished = {
            let collect = async {
                tokio::try_join!(
                    drain(stdout_pipe.as_mut(), &mut stdout),
                    drain(stderr_pipe.as_mut(), &mut stderr),
                    child.wait(),
                )
            };
            tokio::select! {
                result = collect => Some(result),
                _ = shutdown.cancelled() => None,
            }
        };

        match finished {
            Some(result) => {
                let ((), (), status) = result.map_err(|e| ScanError::Invocation {
                    message: e.to_string(),
                })?;
                Ok(ProcessOutput::from_status(status, stdout, stderr))
            }
            None => {
                if let Err(e) = child.kill().await {
                    log::debug!("failed to kill Lava for {}: {}", invocation.target(), e);
                }
                Ok(ProcessOutput::cancelled(stdout, stderr))
            }
        }
    }
}

async fn drain<R>(pipe: Option<&mut R>, buf: &mut Vec<u8>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(pipe) => pipe.read_to_end(buf).await.map(|_| ()),
        None => Ok(()),
    }
}

/// Locate the scanner binary
///
/// A value containing a path separator must name an executable file; a bare
/// name is searched for on `PATH`.
pub fn resolve_binary(binary: &str) -> ScanResult<PathBuf> {
    let not_found = || ScanError::BinaryNotFound {
        path: binary.to_string(),
    };

    if binary.trim().is_empty() {
        return Err(not_found());
    }

    if binary.contains(std::path::MAIN_SEPARATOR) || binary.contains('/') {
        let path = PathBuf::from(binary);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(not_found())
        };
    }

    let search = std::env::var_os("PATH").ok_or_else(not_found)?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
