use rand::Rng;
use tracing::info;

use crate::error::Result;
use crate::git::{self, GitRunner};
use crate::history::{CommitRecord, HistoryRecord};

/// Picks a branch name of the form `rewrite_NNNN`.
///
/// Whether the branch already exists is not checked; `git checkout -b` fails
/// if it does.
pub fn generate_branch_name<R: Rng>(rng: &mut R) -> String {
    format!("rewrite_{:04}", rng.gen_range(1..=9999))
}

/// Recreates `history` on a new branch started at its root commit.
///
/// Each commit is cherry-picked onto the current tip and then amended with
/// its recorded author and committer, strictly in stored order. The first
/// failing git command aborts the replay and leaves the branch as git left
/// it; in particular a conflicting cherry-pick is not resolved or skipped.
///
/// Returns the name of the branch that was created.
pub fn replay<G, R>(
    git: &mut G,
    history: &HistoryRecord,
    branch: Option<&str>,
    rng: &mut R,
) -> Result<String>
where
    G: GitRunner,
    R: Rng,
{
    let branch = match branch {
        Some(name) => name.to_string(),
        None => generate_branch_name(rng),
    };

    info!("creating branch {branch} at {}", history.root_hash);
    git::checkout_new_branch(git, &branch, &history.root_hash)?;

    for (i, commit) in history.commits.iter().enumerate() {
        info!(
            "[{}/{}] replaying {} as {}",
            i + 1,
            history.commits.len(),
            commit.commit_hash,
            commit.author()
        );
        replay_commit(git, commit)?;
    }

    Ok(branch)
}

fn replay_commit<G: GitRunner>(git: &mut G, commit: &CommitRecord) -> Result<()> {
    git::cherry_pick(git, &commit.commit_hash)?;
    git::amend_identity(
        git,
        &commit.author(),
        &commit.author_date,
        commit.identity_env(),
    )
}
