//! Access token resolution for the Compute Engine client.

use std::ffi::OsString;

use thiserror::Error;

use crate::command::{CommandError, CommandRunner};

/// Where the bearer token for API calls comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenSource {
    /// A token supplied directly through configuration.
    Static(String),
    /// A token printed by `<program> auth print-access-token`.
    Gcloud {
        /// Path or name of the `gcloud` executable.
        program: String,
    },
}

/// Errors raised while resolving an access token.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TokenError {
    /// The token command could not be started.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// The token command exited unsuccessfully.
    #[error("{program} exited with {}: {stderr}", exit_note(.code.as_ref()))]
    Failed {
        /// Program that was run.
        program: String,
        /// Exit code, when available.
        code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },
    /// No token was produced.
    #[error("{source_name} produced an empty access token")]
    Empty {
        /// Description of the token source.
        source_name: String,
    },
}

fn exit_note(code: Option<&i32>) -> String {
    code.map_or_else(|| String::from("signal"), |value| format!("status {value}"))
}

impl TokenSource {
    /// Resolves the bearer token, running the gcloud command if required.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the command cannot be run, fails, or
    /// prints nothing.
    pub fn resolve(&self, runner: &dyn CommandRunner) -> Result<String, TokenError> {
        match self {
            Self::Static(token) => {
                let trimmed = token.trim();
                if trimmed.is_empty() {
                    return Err(TokenError::Empty {
                        source_name: String::from("configured token"),
                    });
                }
                Ok(trimmed.to_owned())
            }
            Self::Gcloud { program } => {
                let args = [
                    OsString::from("auth"),
                    OsString::from("print-access-token"),
                ];
                let output = runner.run(program, &args)?;
                if !output.is_success() {
                    return Err(TokenError::Failed {
                        program: program.clone(),
                        code: output.code,
                        stderr: output.stderr.trim().to_owned(),
                    });
                }
                let token = output.stdout.trim();
                if token.is_empty() {
                    return Err(TokenError::Empty {
                        source_name: program.clone(),
                    });
                }
                Ok(token.to_owned())
            }
        }
    }
}
