use dsu_core::{DsuError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Progress chatter the Go toolchain prints on stderr.
const PROGRESS_PREFIXES: &[&str] = &["go: downloading", "go: finding", "go: extracting"];

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// Stderr without toolchain progress lines.
    pub fn diagnostics(&self) -> String {
        self.stderr
            .lines()
            .filter(|line| !PROGRESS_PREFIXES.iter().any(|p| line.trim_start().starts_with(p)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_error(&self) -> bool {
        !self.success
    }
}

/// Runs one external program, optionally inside a directory.
#[derive(Debug, Clone)]
pub struct Executor {
    program: String,
}

impl Executor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn output(&self, dir: Option<&Path>, args: &[&str]) -> Result<CommandOutput> {
        let mut command = Command::new(&self.program);
        command.args(args).kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        debug!(program = %self.program, ?args, dir = ?dir, "running command");
        let output = command.output().await.map_err(|err| DsuError::Command {
            command: self.describe(args),
            stderr: err.to_string(),
        })?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }

    /// Stdout of a successful run; a failed run becomes `DsuError::Command`.
    pub async fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.output(dir, args).await?;
        if output.has_error() {
            let diagnostics = output.diagnostics();
            return Err(DsuError::Command {
                command: self.describe(args),
                stderr: if diagnostics.is_empty() {
                    "exited with an error".to_string()
                } else {
                    diagnostics
                },
            });
        }
        if !output.stderr.is_empty() {
            debug!(program = %self.program, stderr = %output.stderr.trim(), "command stderr");
        }
        Ok(output.stdout)
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }
}
