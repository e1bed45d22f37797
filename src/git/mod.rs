//! Repository fetching for `version_control_fetch` acquisitions
//!
//! A missing checkout is cloned (shallow for remote URLs). An existing one
//! is fetched and hard-reset to the remote head, so re-running install
//! brings it up to date. Errors are classified as transient or permanent
//! for the retry loop.

mod auth;
mod error;

use std::borrow::Cow;
use std::path::Path;

use git2::{FetchOptions, RemoteCallbacks, Repository, ResetType, build::RepoBuilder};

pub use error::GitFailure;

/// What happened to the checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Cloned,
    Updated,
}

/// Rewrite SCP-style `git@host:path` into `ssh://git@host/path` for libgit2
fn normalize_url(url: &str) -> Cow<'_, str> {
    if !url.starts_with("git@") {
        return Cow::Borrowed(url);
    }
    match url.split_once(':') {
        Some((host, path)) => {
            Cow::Owned(format!("ssh://{host}/{}", path.trim_start_matches('/')))
        }
        None => Cow::Borrowed(url),
    }
}

fn is_local(url: &str) -> bool {
    url.starts_with("file://") || Path::new(url).is_absolute()
}

fn fetch_options(url: &str) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    auth::install(&mut callbacks);

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    if !is_local(url) {
        options.depth(1);
    }
    options
}

/// Clone `url` into `target`, or update the checkout already there
pub fn fetch_into(
    url: &str,
    target: &Path,
    branch: Option<&str>,
) -> Result<FetchOutcome, GitFailure> {
    if target.join(".git").exists() {
        update(url, target, branch)?;
        return Ok(FetchOutcome::Updated);
    }
    if target.exists()
        && target
            .read_dir()
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(true)
    {
        return Err(GitFailure::permanent(format!(
            "{} exists and is not a git checkout",
            target.display()
        )));
    }

    clone(url, target, branch)?;
    Ok(FetchOutcome::Cloned)
}

fn clone(url: &str, target: &Path, branch: Option<&str>) -> Result<Repository, GitFailure> {
    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options(url));
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    tracing::debug!(url, target = %target.display(), "cloning repository");
    builder
        .clone(normalize_url(url).as_ref(), target)
        .map_err(|e| error::classify(&e))
}

fn update(url: &str, target: &Path, branch: Option<&str>) -> Result<(), GitFailure> {
    let repo = Repository::open(target).map_err(|e| error::classify(&e))?;
    let mut remote = repo
        .find_remote("origin")
        .or_else(|_| repo.remote_anonymous(normalize_url(url).as_ref()))
        .map_err(|e| error::classify(&e))?;

    let refspec = branch.map_or_else(|| "HEAD".to_string(), |b| format!("refs/heads/{b}"));
    tracing::debug!(url, target = %target.display(), refspec = %refspec, "updating checkout");
    remote
        .fetch(&[refspec.as_str()], Some(&mut fetch_options(url)), None)
        .map_err(|e| error::classify(&e))?;

    let head = repo
        .find_reference("FETCH_HEAD")
        .and_then(|r| r.peel(git2::ObjectType::Commit))
        .map_err(|e| error::classify(&e))?;
    repo.reset(&head, ResetType::Hard, None)
        .map_err(|e| error::classify(&e))
}
