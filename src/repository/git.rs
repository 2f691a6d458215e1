use super::{CommitRef, PullOutcome, Repository, RepositoryError, Workspace};
use crate::{
    config::{redact_url, RepositoryTarget},
    credentials::AuthHandle,
};
use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    AnnotatedCommit, AutotagOption, ErrorCode, FetchOptions, Repository as UnderlyingRepository,
    StatusOptions,
};
use log::{debug, info, trace};
use std::{fs, path::Path};

/// The remote used for branches without an upstream.
const DEFAULT_REMOTE: &str = "origin";

/// A workspace backed by a local directory and a remote git URL.
pub struct GitWorkspace {
    target: RepositoryTarget,
    auth: AuthHandle,
}

/// An opened git repository, which is authenticated with the handle for network operations.
pub struct GitRepository {
    repo: UnderlyingRepository,
    auth: AuthHandle,
}

fn fetch_options(auth: &AuthHandle) -> FetchOptions<'static> {
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(auth.remote_callbacks());
    opts.download_tags(AutotagOption::All);
    opts
}

fn has_content(directory: &Path) -> bool {
    fs::read_dir(directory)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

impl GitWorkspace {
    pub fn new(target: RepositoryTarget, auth: AuthHandle) -> Self {
        GitWorkspace { target, auth }
    }
}

impl Workspace for GitWorkspace {
    fn clone_remote(&self) -> Result<(), RepositoryError> {
        let RepositoryTarget { url, directory, .. } = &self.target;
        if has_content(directory) {
            return Err(RepositoryError::DirectoryNotEmpty(directory.clone()));
        }

        debug!("Cloning {} into {}.", redact_url(url), directory.display());
        RepoBuilder::new()
            .fetch_options(fetch_options(&self.auth))
            .clone(url, directory)
            .map_err(|err| {
                if err.code() == ErrorCode::Exists {
                    RepositoryError::DirectoryNotEmpty(directory.clone())
                } else {
                    RepositoryError::CloneFailed(redact_url(url), err.message().to_string())
                }
            })?;
        info!("Cloned {} into {}.", redact_url(url), directory.display());

        Ok(())
    }

    fn open(&self) -> Result<Box<dyn Repository>, RepositoryError> {
        let repo = GitRepository::open(&self.target.directory, self.auth.clone())?;
        Ok(Box::new(repo))
    }
}

impl GitRepository {
    pub fn open(directory: &Path, auth: AuthHandle) -> Result<Self, RepositoryError> {
        let repo = UnderlyingRepository::open(directory).map_err(|err| {
            RepositoryError::NotFound(directory.to_path_buf(), err.message().to_string())
        })?;

        Ok(GitRepository { repo, auth })
    }

    fn checkout_local(&self, branch: &str) -> Result<(), git2::Error> {
        let refname = format!("refs/heads/{branch}");
        let commit = self.repo.find_reference(&refname)?.peel_to_commit()?;
        self.repo
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        self.repo.set_head(&refname)
    }

    fn fetch_branch(&self, branch: &str) -> Result<(), RepositoryError> {
        let mut remote = self
            .repo
            .find_remote(DEFAULT_REMOTE)
            .map_err(|err| RepositoryError::FetchFailed(err.message().to_string()))?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");

        trace!("Fetching {refspec} from {DEFAULT_REMOTE}.");
        remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_options(&self.auth)), None)
            .map_err(|err| RepositoryError::FetchFailed(err.message().to_string()))
    }

    fn track_remote(&self, branch: &str) -> Result<(), RepositoryError> {
        let to_error = |err: git2::Error| {
            RepositoryError::CheckoutFailed(branch.to_string(), err.message().to_string())
        };
        let mut config = self.repo.config().map_err(to_error)?;
        config
            .set_str(&format!("branch.{branch}.remote"), DEFAULT_REMOTE)
            .map_err(to_error)?;
        config
            .set_str(
                &format!("branch.{branch}.merge"),
                &format!("refs/heads/{branch}"),
            )
            .map_err(to_error)?;

        Ok(())
    }

    // Inspired from: https://github.com/rust-lang/git2-rs/blob/master/examples/pull.rs
    fn fetch(&self) -> Result<AnnotatedCommit<'_>, RepositoryError> {
        let Self { repo, auth } = self;
        let head = repo.head().map_err(|_| RepositoryError::NoHead)?;
        if !head.is_branch() {
            return Err(RepositoryError::NotOnABranch);
        }
        let branch_name = head.shorthand().ok_or(RepositoryError::NotOnABranch)?;
        let branch_refname = head.name().ok_or(RepositoryError::NotOnABranch)?;
        let remote_name = repo
            .branch_upstream_remote(branch_refname)
            .ok()
            .and_then(|buf| buf.as_str().map(String::from))
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        let mut remote = repo
            .find_remote(&remote_name)
            .map_err(|err| RepositoryError::FetchFailed(err.message().to_string()))?;
        remote
            .fetch(&[branch_name], Some(&mut fetch_options(auth)), None)
            .map_err(|err| RepositoryError::FetchFailed(err.message().to_string()))?;

        let fetch_head = repo
            .find_reference("FETCH_HEAD")
            .map_err(|err| RepositoryError::FetchFailed(err.message().to_string()))?;
        repo.reference_to_annotated_commit(&fetch_head)
            .map_err(|err| RepositoryError::FetchFailed(err.message().to_string()))
    }

    fn is_dirty(&self) -> Result<bool, RepositoryError> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(|_| RepositoryError::DirtyWorkingTree)?;

        Ok(!statuses.is_empty())
    }

    fn fast_forward(&self, fetch_commit: &AnnotatedCommit) -> Result<(), RepositoryError> {
        let Self { repo, .. } = self;
        let fetch_id = fetch_commit.id();
        let failed_setting_head =
            |_: git2::Error| RepositoryError::FailedSettingHead(fetch_id.to_string());

        let head = repo.head().map_err(|_| RepositoryError::NoHead)?;
        let branch_refname = head
            .name()
            .ok_or(RepositoryError::NotOnABranch)?
            .to_string();
        let msg = format!("Fast-Forward: Setting {branch_refname} to id: {fetch_id}");

        let mut branch_ref = repo
            .find_reference(&branch_refname)
            .map_err(|_| RepositoryError::NotOnABranch)?;
        branch_ref
            .set_target(fetch_id, &msg)
            .map_err(failed_setting_head)?;
        repo.set_head(&branch_refname).map_err(failed_setting_head)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))
            .map_err(failed_setting_head)?;

        Ok(())
    }
}

impl Repository for GitRepository {
    /// Check out the branch. If it doesn't exist locally, it is fetched from the remote
    /// with `refs/heads/<branch>:refs/heads/<branch>` and the checkout is retried once.
    fn checkout_branch(&mut self, branch: &str) -> Result<(), RepositoryError> {
        match self.checkout_local(branch) {
            Ok(()) => {
                debug!("Checked out branch {branch}.");
                Ok(())
            }
            Err(err) if err.code() == ErrorCode::NotFound => {
                debug!("Branch {branch} is not found locally, fetching from {DEFAULT_REMOTE}.");
                self.fetch_branch(branch)?;
                self.checkout_local(branch).map_err(|err| {
                    if err.code() == ErrorCode::NotFound {
                        RepositoryError::BranchNotFound(branch.to_string())
                    } else {
                        RepositoryError::CheckoutFailed(
                            branch.to_string(),
                            err.message().to_string(),
                        )
                    }
                })?;
                self.track_remote(branch)?;
                debug!("Checked out branch {branch} from {DEFAULT_REMOTE}.");
                Ok(())
            }
            Err(err) => Err(RepositoryError::CheckoutFailed(
                branch.to_string(),
                err.message().to_string(),
            )),
        }
    }

    /// Fetch the current branch and fast-forward it, if the remote has new commits.
    fn pull(&mut self) -> Result<PullOutcome, RepositoryError> {
        let fetch_commit = self.fetch()?;
        let (analysis, _) = self
            .repo
            .merge_analysis(&[&fetch_commit])
            .map_err(|_| RepositoryError::NotFastForward)?;

        if analysis.is_up_to_date() {
            Ok(PullOutcome::UpToDate)
        } else if analysis.is_fast_forward() {
            if self.is_dirty()? {
                return Err(RepositoryError::DirtyWorkingTree);
            }
            self.fast_forward(&fetch_commit)?;
            Ok(PullOutcome::FastForwarded(CommitRef::new(
                fetch_commit.id().to_string(),
            )))
        } else {
            Err(RepositoryError::NotFastForward)
        }
    }

    fn current_tip(&self) -> Result<CommitRef, RepositoryError> {
        let commit = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|_| RepositoryError::NoHead)?;

        Ok(CommitRef::new(commit.id().to_string()))
    }
}
