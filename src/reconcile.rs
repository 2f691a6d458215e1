use crate::{
    cancel::{CancelReason, Cancellation},
    deploy::{DeployError, Deployer},
    repository::{CommitRef, PullOutcome, Repository, RepositoryError, Workspace},
};
use duration_string::DurationString;
use log::{debug, error, info};
use std::time::{Duration, Instant};
use thiserror::Error;

/// A custom error for the failures that stop the reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("repository failed: {0}")]
    Repository(#[from] RepositoryError),
    #[error("deployment failed: {0}")]
    Deployment(#[from] DeployError),
}

/// Options for the one-shot check.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Deploy even if there were no changes.
    pub force: bool,
    /// Extra flags passed to the reconcile step.
    pub up_flags: Vec<String>,
}

/// Options for the continuous watch.
#[derive(Clone, Debug)]
pub struct WatchOptions {
    pub branch: String,
    pub interval: Duration,
    /// Deploy right after the baseline is established.
    pub on_start: bool,
    /// Clone the repository first, if it isn't cloned already.
    pub clone_first: bool,
    /// Extra flags passed to the reconcile step.
    pub up_flags: Vec<String>,
}

/// The state kept between the polls: the last commit that was seen on the branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchState {
    last_observed: CommitRef,
}

impl WatchState {
    pub fn new(baseline: CommitRef) -> Self {
        WatchState {
            last_observed: baseline,
        }
    }

    pub fn last_observed(&self) -> &CommitRef {
        &self.last_observed
    }
}

/// What happened during a single poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Pulling failed, nothing changed.
    PullFailed,
    /// The current commit cannot be read, nothing changed.
    TipFailed,
    /// The branch is still on the last observed commit.
    Unchanged,
    /// The branch moved and the deployment was refreshed and reconciled.
    Deployed(CommitRef),
    /// The branch moved, but refreshing failed, so reconciling was skipped.
    RefreshFailed(CommitRef),
    /// The branch moved, but reconciling failed.
    ReconcileFailed(CommitRef),
}

fn deploy(deployer: &dyn Deployer, up_flags: &[String]) -> Result<(), DeployError> {
    deployer.refresh()?;
    deployer.reconcile(up_flags)
}

/// Clone the repository and check out the branch.
pub fn init(workspace: &dyn Workspace, branch: &str) -> Result<(), ReconcileError> {
    workspace.clone_remote()?;
    let mut repo = workspace.open()?;
    repo.checkout_branch(branch)?;
    info!("Repository is ready on branch {branch}.");

    Ok(())
}

/// Pull the repository once and deploy if the commit changed or the deployment is forced.
///
/// Returns true if a deployment happened. Every error is returned to the caller.
pub fn check_once(
    workspace: &dyn Workspace,
    deployer: &dyn Deployer,
    options: &CheckOptions,
) -> Result<bool, ReconcileError> {
    let mut repo = workspace.open()?;

    let before = repo.current_tip()?;
    repo.pull()?;
    let after = repo.current_tip()?;

    if options.force || before != after {
        if before != after {
            info!("Changes found, updated {} to {}.", before.short(), after.short());
        } else {
            info!("No changes found, but the deployment is forced.");
        }
        deploy(deployer, &options.up_flags)?;
        info!("Deployment finished on commit {}.", after.short());
        Ok(true)
    } else {
        info!("No changes found and not forced.");
        Ok(false)
    }
}

/// Run one poll: pull, compare with the last observed commit and deploy on a change.
///
/// Errors are logged and never returned, the next poll is the retry. The last observed
/// commit only moves after the new commit was read successfully, and it is not moved
/// back if the deployment fails.
pub fn tick(
    state: &mut WatchState,
    repo: &mut dyn Repository,
    deployer: &dyn Deployer,
    up_flags: &[String],
) -> TickOutcome {
    if let Err(err) = repo.pull() {
        error!("Could not pull from repository: {err}.");
        return TickOutcome::PullFailed;
    }

    let current = match repo.current_tip() {
        Ok(current) => current,
        Err(err) => {
            error!("Could not get current commit of HEAD: {err}.");
            return TickOutcome::TipFailed;
        }
    };

    if current == state.last_observed {
        info!("No changes found.");
        return TickOutcome::Unchanged;
    }

    state.last_observed = current.clone();
    info!("Changes found, new commit is {current}.");

    if let Err(err) = deployer.refresh() {
        error!("Could not refresh the deployment: {err}.");
        return TickOutcome::RefreshFailed(current);
    }
    if let Err(err) = deployer.reconcile(up_flags) {
        error!("Could not reconcile the deployment: {err}.");
        return TickOutcome::ReconcileFailed(current);
    }

    info!("Deployment finished on commit {}.", current.short());
    TickOutcome::Deployed(current)
}

/// Watch the branch and deploy every new commit, until it is cancelled.
///
/// Every failure before the first poll is returned, because there is no trustworthy
/// baseline to compare against. After that, the polls never fail; the only way to stop
/// is the cancellation, whose reason is returned.
pub fn watch(
    workspace: &dyn Workspace,
    deployer: &dyn Deployer,
    options: &WatchOptions,
    cancellation: &Cancellation,
) -> Result<CancelReason, ReconcileError> {
    if options.clone_first {
        match workspace.clone_remote() {
            Ok(()) => {}
            Err(RepositoryError::DirectoryNotEmpty(directory)) => {
                debug!(
                    "{} is not empty, assuming it is already cloned.",
                    directory.display()
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut repo = workspace.open()?;
    repo.checkout_branch(&options.branch)?;
    match repo.pull()? {
        PullOutcome::UpToDate => debug!("Repository is up to date."),
        PullOutcome::FastForwarded(commit) => debug!("Repository updated to {commit}."),
    }
    let mut state = WatchState::new(repo.current_tip()?);

    if options.on_start {
        info!("Deploying on start.");
        deploy(deployer, &options.up_flags)?;
    }

    info!(
        "Starting watch in every {}, on commit {}.",
        DurationString::new(options.interval),
        state.last_observed()
    );

    let mut next_tick = Instant::now() + options.interval;
    loop {
        let until_next_tick = next_tick.saturating_duration_since(Instant::now());
        if let Some(reason) = cancellation.wait(until_next_tick) {
            info!("Stopping watch: {reason}.");
            return Ok(reason);
        }

        let outcome = tick(&mut state, repo.as_mut(), deployer, &options.up_flags);
        debug!("Poll finished: {outcome:?}.");

        // Missed ticks are dropped, a long poll is followed by an immediate one at most.
        next_tick += options.interval;
        let now = Instant::now();
        if next_tick < now {
            next_tick = now;
        }
    }
}
