use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::extract;
use crate::git::GitRunner;

/// Author and committer metadata of one original commit.
///
/// Dates are kept as the literal strings git printed, offset included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: String,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: String,
}

impl CommitRecord {
    /// The value for `git commit --author`, e.g. `John Doe <john@example.com>`.
    pub fn author(&self) -> String {
        format!("{} <{}>", self.author_name, self.author_email)
    }

    /// Environment overrides that make git reproduce this record's identity.
    pub fn identity_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("GIT_AUTHOR_NAME", self.author_name.clone()),
            ("GIT_AUTHOR_EMAIL", self.author_email.clone()),
            ("GIT_AUTHOR_DATE", self.author_date.clone()),
            ("GIT_COMMITTER_NAME", self.committer_name.clone()),
            ("GIT_COMMITTER_EMAIL", self.committer_email.clone()),
            ("GIT_COMMITTER_DATE", self.committer_date.clone()),
        ]
    }
}

/// The commits after `root_hash`, oldest first.
///
/// The order is the order replay must follow: each commit is cherry-picked on
/// top of the one before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub root_hash: String,
    pub commits: Vec<CommitRecord>,
}

impl HistoryRecord {
    /// Reads the metadata of every commit between `root` and `HEAD`.
    pub fn capture<G: GitRunner>(git: &mut G, root: &str) -> Result<Self> {
        let hashes = extract::list_descendant_hashes(git, root)?;
        debug!("{} commits after {root}", hashes.len());

        let commits = hashes
            .iter()
            .map(|hash| extract::extract_metadata(&mut *git, hash))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root_hash: root.to_string(),
            commits,
        })
    }

    /// Renders the record as pretty-printed JSON.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a record previously produced by [`HistoryRecord::serialize`].
    ///
    /// Unknown fields are ignored; missing ones are an [`Error::Format`].
    pub fn deserialize(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let document = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::deserialize(&document)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut document = self.serialize()?;
        document.push('\n');
        fs::write(path, document).map_err(|e| Error::io(path, e))
    }
}
