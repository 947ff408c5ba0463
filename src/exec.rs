//! Process execution seam, used to probe an existing install for its
//! version.

use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to execute {executable}")]
    Spawn {
        executable: String,
        #[source]
        source: io::Error,
    },

    #[error("{executable} exited with {status}: {stderr}")]
    Failed {
        executable: String,
        status: String,
        stderr: String,
    },

    #[error("output of {executable} was not valid UTF-8")]
    Output { executable: String },
}

pub trait ProcessExecutor {
    /// Runs an executable to completion and returns its captured stdout.
    fn run(&self, executable: &Path, args: &[&str]) -> Result<String, ProcessError>;
}

/// Default executor spawning through [`std::process::Command`].
#[derive(Debug, Default)]
pub struct CommandExecutor;

impl ProcessExecutor for CommandExecutor {
    fn run(&self, executable: &Path, args: &[&str]) -> Result<String, ProcessError> {
        let output = Command::new(executable)
            .args(args)
            .output()
            .map_err(|source| ProcessError::Spawn {
                executable: executable.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::Failed {
                executable: executable.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ProcessError::Output {
            executable: executable.display().to_string(),
        })
    }
}
