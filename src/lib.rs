//! Watch a git branch and refresh a Docker Compose deployment when it changes.
//!
//! ## How it works
//!
//! `compose-watcher` keeps a local **working copy** of a remote repository in sync,
//! compares the commit on the branch with the last one it has seen, and runs a
//! **deployment** (pull the newest images, then recreate the services) when it changed.
//! It can do this once ([check](reconcile::check_once)) or in a loop, until
//! it is stopped ([watch](reconcile::watch)).
//!
//! ```ignore
//! +------------+       +---------+       +------------+
//! | repository | ----> | compare | ----> | deployment |
//! +------------+       +---------+       +------------+
//! ```
//!

/// The reasons and ways to stop watching.
pub mod cancel;
/// The repository to watch and the credentials to access it.
pub mod config;
/// Turning the configured credentials into authentication for git.
pub mod credentials;
/// A deployment is the external action that runs if there are changes (e.g. [Docker Compose](deploy::compose::ComposeDeployer)).
pub mod deploy;
/// The checks and the loop that connect the repository with the deployment.
pub mod reconcile;
/// A repository is the local working copy, which is kept in sync with the remote (e.g. [with git](repository::git::GitRepository)).
pub mod repository;
