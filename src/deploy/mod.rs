use command::CommandOutput;
use mockall::automock;
use thiserror::Error;

/// Running external commands with captured output.
pub mod command;
/// Deploying with Docker Compose.
pub mod compose;

/// A custom error describing the error cases for deployments.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The deployment command is empty or cannot be parsed.
    #[error("the command {0:?} is invalid")]
    InvalidCommand(String),
    /// The command cannot be started. The parameters are the action and the underlying error.
    #[error("cannot run {0}: {1}")]
    FailedToStart(&'static str, std::io::Error),
    /// The command returned a non-zero exit code.
    /// The parameters are the action and the captured output with the exit code.
    #[error("{0} failed with {}", .1.code.map_or_else(|| "a signal".to_string(), |code| format!("exit code {code}")))]
    NonZeroExitcode(&'static str, CommandOutput),
}

/// A deployment that can be refreshed and reconciled to the desired state.
#[automock]
pub trait Deployer {
    /// Pull the newest artifacts, without changing what is running.
    fn refresh(&self) -> Result<(), DeployError>;
    /// Apply the desired running state, with the extra flags appended to the command.
    fn reconcile(&self, extra_flags: &[String]) -> Result<(), DeployError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_describe_the_exit() {
        assert_eq!(
            "docker compose up failed with exit code 3",
            DeployError::NonZeroExitcode(
                "docker compose up",
                CommandOutput {
                    code: Some(3),
                    ..Default::default()
                }
            )
            .to_string()
        );
        assert_eq!(
            "docker compose pull failed with a signal",
            DeployError::NonZeroExitcode("docker compose pull", CommandOutput::default())
                .to_string()
        );
    }
}
