//! Helpers for driving the external binaries the recorder depends on
//! (`streamlink`, `ffmpeg`, `ffprobe`).

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Maximum amount of stderr kept in a [`ProcessError::Failed`].
const STDERR_LIMIT: usize = 4096;

/// Errors from running an external program.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Unexpected output from {program}: {reason}")]
    InvalidOutput { program: String, reason: String },
}

impl ProcessError {
    pub fn spawn(program: impl AsRef<OsStr>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.as_ref().to_string_lossy().into_owned(),
            source,
        }
    }

    pub fn invalid_output(program: impl AsRef<OsStr>, reason: impl Into<String>) -> Self {
        Self::InvalidOutput {
            program: program.as_ref().to_string_lossy().into_owned(),
            reason: reason.into(),
        }
    }
}

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

/// Resolve an executable by name on `PATH`, or verify an explicit path.
pub fn find_executable(program: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Return the configured executables that cannot be found.
pub fn missing_executables<'a, I>(programs: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    programs
        .into_iter()
        .filter(|p| find_executable(p).is_none())
        .collect()
}

fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(feature = "tokio")]
mod async_process {
    use super::*;
    use std::process::{Output, Stdio};
    use tracing::debug;

    impl NoWindowExt for tokio::process::Command {
        fn no_window(&mut self) {
            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
            }
        }
    }

    /// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
    ///
    /// The child is killed if the command's future is dropped.
    pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        cmd.no_window();
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run a command to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit status is returned as [`ProcessError::Failed`].
    pub async fn run_checked(cmd: &mut tokio::process::Command) -> Result<Output, ProcessError> {
        let program = cmd.as_std().get_program().to_string_lossy().into_owned();
        debug!(program = %program, args = ?cmd.as_std().get_args().collect::<Vec<_>>(), "running");

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessError::spawn(&program, e))?;

        if !output.status.success() {
            return Err(ProcessError::Failed {
                program,
                status: output.status,
                stderr: truncate_stderr(&output.stderr),
            });
        }
        Ok(output)
    }
}

#[cfg(feature = "tokio")]
pub use async_process::{run_checked, tokio_command};
