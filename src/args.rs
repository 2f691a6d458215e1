use compose_watcher::config::{AuthCredential, ConfigError, RepositoryTarget, DEFAULT_BRANCH};
use duration_string::DurationString;
use gumdrop::Options;
use std::{env, path::PathBuf};

const ENV_PREFIX: &str = "WATCHER_";

/// Watch a git repository and refresh a Docker Compose deployment on changes.
#[derive(Debug, Options)]
pub struct Args {
    /// The URL of the git repository (env: WATCHER_URL).
    #[options(short = "r")]
    pub url: Option<String>,

    /// The directory to clone to and pull in (env: WATCHER_DIRECTORY).
    #[options(short = "d")]
    pub directory: Option<String>,

    /// The branch to watch, defaults to main (env: WATCHER_BRANCH).
    #[options(short = "b")]
    pub branch: Option<String>,

    /// The username for the remote repository (env: WATCHER_USERNAME).
    #[options(short = "u")]
    pub username: Option<String>,

    /// The password for the remote repository or the SSH key (env: WATCHER_PASSWORD).
    #[options(short = "p")]
    pub password: Option<String>,

    /// The SSH private key to authenticate with (env: WATCHER_KEY).
    #[options(short = "k")]
    pub key: Option<String>,

    /// A line to add to the SSH known hosts, if the remote is not on GitHub, GitLab or Bitbucket.
    #[options(no_short)]
    pub known_host: Option<String>,

    /// The compose file to use, you can define multiple times.
    #[options(short = "f", long = "file")]
    pub files: Vec<String>,

    /// The docker command to run compose with.
    #[options(no_short, default = "docker")]
    pub docker: String,

    /// An extra argument for docker compose up, you can define multiple times.
    #[options(no_short, long = "up-arg")]
    pub up_args: Vec<String>,

    /// Increase verbosity, can be set multiple times (-v debug, -vv tracing)
    #[options(count)]
    pub verbose: u8,

    /// Only print error messages.
    #[options()]
    pub quiet: bool,

    /// Print the current version.
    #[options(short = "V")]
    pub version: bool,

    /// Print this help.
    #[options()]
    pub help: bool,

    #[options(command)]
    pub command: Option<Command>,
}

#[derive(Debug, Options)]
pub enum Command {
    /// Clone the repository and check out the branch.
    Init(InitArgs),
    /// Pull once and deploy if there are changes.
    Check(CheckArgs),
    /// Pull periodically and deploy every change.
    Watch(WatchArgs),
}

#[derive(Debug, Options)]
pub struct InitArgs {
    /// Print this help.
    #[options()]
    pub help: bool,
}

#[derive(Debug, Options)]
pub struct CheckArgs {
    /// Deploy even if there are no changes.
    #[options(no_short)]
    pub force: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

#[derive(Debug, Options)]
pub struct WatchArgs {
    /// Pull the repository with this interval.
    ///
    /// Can be a number postfixed with s(econd), m(inutes), h(ours), d(ays)
    #[options(short = "i", default = "5m")]
    pub interval: DurationString,

    /// Deploy once when the watch starts.
    #[options(no_short, long = "onstart")]
    pub on_start: bool,

    /// Clone the repository when the watch starts, if it isn't cloned yet.
    #[options(short = "c")]
    pub clone: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

fn option_or_env(value: &Option<String>, name: &str) -> Option<String> {
    value
        .clone()
        .or_else(|| env::var(format!("{ENV_PREFIX}{name}")).ok())
        .filter(|value| !value.is_empty())
}

impl Args {
    /// Build the repository target from the arguments and the environment.
    pub fn to_target(&self) -> Result<RepositoryTarget, ConfigError> {
        let url = option_or_env(&self.url, "URL").ok_or(ConfigError::Missing("URL (-r)"))?;
        let directory = option_or_env(&self.directory, "DIRECTORY")
            .ok_or(ConfigError::Missing("directory (-d)"))?;
        let branch =
            option_or_env(&self.branch, "BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let credential = AuthCredential::from_parts(
            option_or_env(&self.username, "USERNAME"),
            option_or_env(&self.password, "PASSWORD"),
            option_or_env(&self.key, "KEY").map(PathBuf::from),
        )?;

        Ok(RepositoryTarget {
            url,
            directory: PathBuf::from(directory),
            branch,
            credential,
        })
    }
}

pub fn parse_args() -> Args {
    Args::parse_args_default_or_exit()
}
