use mockall::automock;
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// The libgit2 implementation of the workspace and repository.
pub mod git;
/// Bootstrapping the SSH known hosts.
pub mod known_hosts;

/// A custom error describing the error cases for the repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The directory doesn't contain a git repository. It has to be cloned first.
    #[error("{0} is not a valid git repository ({1})")]
    NotFound(PathBuf, String),
    /// The clone target already has files in it, it is most likely cloned already.
    #[error("cannot clone into {0}, the directory is not empty")]
    DirectoryNotEmpty(PathBuf),
    /// Cloning failed. This can be a network failure, an authentication error or many other things.
    #[error("cannot clone {0} ({1})")]
    CloneFailed(String, String),
    /// The branch doesn't exist locally or on the remote.
    #[error("branch {0} cannot be found locally or on the remote")]
    BranchNotFound(String),
    /// The branch exists, but it cannot be checked out.
    #[error("cannot checkout branch {0} ({1})")]
    CheckoutFailed(String, String),
    /// Cannot parse HEAD, either stuck an unborn branch or some deleted reference.
    #[error("HEAD is invalid, probably points to invalid commit")]
    NoHead,
    /// There is no branch in the repository currently.
    #[error("repository is not on a branch, checkout a branch first")]
    NotOnABranch,
    /// Cannot fetch from the remote. This can be a network failure, authentication error or many other things.
    #[error("cannot fetch ({0})")]
    FetchFailed(String),
    /// There are changes in the directory, avoiding pulling over them.
    #[error("there are uncommited changes in the directory")]
    DirtyWorkingTree,
    /// The local branch has diverged from the remote, it cannot be fast-forwarded.
    #[error("cannot fast-forward branch, the local and remote history diverged")]
    NotFastForward,
    /// Cannot set the HEAD to the fetched commit.
    #[error("could not set HEAD to fetch commit {0}")]
    FailedSettingHead(String),
    /// Cannot write the SSH configuration.
    #[error("cannot create ssh config")]
    SshConfigFailed,
}

/// An opaque identifier of a commit. Two commit refs are equal iff they denote the same commit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommitRef(String);

impl CommitRef {
    pub fn new(sha: impl Into<String>) -> Self {
        CommitRef(sha.into())
    }

    /// The abbreviated form of the commit hash.
    pub fn short(&self) -> &str {
        self.0.get(0..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The result of a successful pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PullOutcome {
    /// The branch was already on the remote commit.
    UpToDate,
    /// The branch was fast-forwarded to the given commit.
    FastForwarded(CommitRef),
}

/// A place where the repository lives: it can be cloned to and opened from.
#[automock]
pub trait Workspace {
    /// Clone the remote into the directory.
    fn clone_remote(&self) -> Result<(), RepositoryError>;
    /// Open an already existing local copy.
    fn open(&self) -> Result<Box<dyn Repository>, RepositoryError>;
}

/// An opened local copy of the repository.
#[automock]
pub trait Repository {
    /// Check out the branch, fetching it from the remote if it doesn't exist locally.
    fn checkout_branch(&mut self, branch: &str) -> Result<(), RepositoryError>;
    /// Fast-forward the current branch from its remote.
    fn pull(&mut self) -> Result<PullOutcome, RepositoryError>;
    /// The commit the HEAD currently points to.
    fn current_tip(&self) -> Result<CommitRef, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_shorten_commits() {
        let commit = CommitRef::new("0123456789abcdef");
        assert_eq!("0123456", commit.short());
        assert_eq!("0123456789abcdef", commit.to_string());
        assert_eq!("abc", CommitRef::new("abc").short());
    }
}
