use duct::cmd;
use log::trace;
use mockall::automock;
use std::{io, path::Path};

/// The captured result of an external command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external command in a directory and captures its output.
#[automock]
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], directory: &Path) -> io::Result<CommandOutput>;
}

/// Runs commands as subprocesses, without a shell in between.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], directory: &Path) -> io::Result<CommandOutput> {
        trace!("Running {program} {} in {}.", args.join(" "), directory.display());

        let output = cmd(program, args)
            .dir(directory)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}
