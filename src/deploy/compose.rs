use super::{
    command::{CommandOutput, CommandRunner, ProcessRunner},
    DeployError, Deployer,
};
use log::{debug, error};
use std::path::PathBuf;

const REFRESH_ACTION: &str = "docker compose pull";
const RECONCILE_ACTION: &str = "docker compose up";

/// A deployment managed by Docker Compose in the working copy.
///
/// Refreshing pulls the newest images, reconciling recreates the changed services
/// with `up -d --remove-orphans --pull always`. Both run in the directory of the
/// working copy, so the compose files are resolved from there. The output is only
/// logged if the command fails.
pub struct ComposeDeployer<R: CommandRunner = ProcessRunner> {
    directory: PathBuf,
    program: String,
    base_args: Vec<String>,
    runner: R,
}

impl ComposeDeployer<ProcessRunner> {
    /// Create a deployer with a docker command (e.g. `docker` or `sudo docker`) and compose files.
    pub fn new(directory: PathBuf, docker: &str, files: &[String]) -> Result<Self, DeployError> {
        Self::with_runner(directory, docker, files, ProcessRunner)
    }
}

impl<R: CommandRunner> ComposeDeployer<R> {
    pub fn with_runner(
        directory: PathBuf,
        docker: &str,
        files: &[String],
        runner: R,
    ) -> Result<Self, DeployError> {
        let mut split_command =
            shlex::split(docker).ok_or_else(|| DeployError::InvalidCommand(docker.to_string()))?;
        if split_command.is_empty() {
            return Err(DeployError::InvalidCommand(docker.to_string()));
        }
        let program = split_command.remove(0);

        let mut base_args = split_command;
        base_args.extend(["compose", "--progress", "quiet"].map(String::from));
        for file in files {
            base_args.push(String::from("-f"));
            base_args.push(file.clone());
        }

        Ok(ComposeDeployer {
            directory,
            program,
            base_args,
            runner,
        })
    }

    fn run_action(&self, action: &'static str, args: &[&str]) -> Result<(), DeployError> {
        let mut full_args = self.base_args.clone();
        full_args.extend(args.iter().map(|arg| arg.to_string()));

        debug!(
            "Running {} {} in {}.",
            self.program,
            full_args.join(" "),
            self.directory.display()
        );
        let output = self
            .runner
            .run(&self.program, &full_args, &self.directory)
            .map_err(|err| DeployError::FailedToStart(action, err))?;

        if output.success() {
            debug!("{action} finished.");
            Ok(())
        } else {
            log_failure(action, &output);
            Err(DeployError::NonZeroExitcode(action, output))
        }
    }
}

fn log_failure(action: &str, output: &CommandOutput) {
    error!("{action} failed.");
    if !output.stdout.is_empty() {
        error!("{action} stdout:");
        output.stdout.lines().for_each(|line| error!("{line}"));
    }
    if !output.stderr.is_empty() {
        error!("{action} stderr:");
        output.stderr.lines().for_each(|line| error!("{line}"));
    }
}

impl<R: CommandRunner> Deployer for ComposeDeployer<R> {
    fn refresh(&self) -> Result<(), DeployError> {
        self.run_action(REFRESH_ACTION, &["pull"])
    }

    fn reconcile(&self, extra_flags: &[String]) -> Result<(), DeployError> {
        let mut args = vec!["up", "-d", "--remove-orphans", "--pull", "always"];
        args.extend(extra_flags.iter().map(String::as_str));
        self.run_action(RECONCILE_ACTION, &args)
    }
}
