//! Reading commit metadata out of a live repository.
//!
//! All knowledge of the `git show --format=fuller` layout lives here: if that
//! format ever changes, [`parse_show_output`] is the only thing to fix.

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::git::{self, GitRunner};
use crate::history::CommitRecord;

/// Returns the commits descending from `root` on the current branch,
/// nearest to `root` first.
///
/// Refuses to list anything while a cherry-pick, revert, merge, or rebase is
/// stopped half-way: `HEAD` then points at a partial result, not the history
/// the caller means to record.
pub fn list_descendant_hashes<G: GitRunner>(git: &mut G, root: &str) -> Result<Vec<String>> {
    let git_dir = git::rev_parse(git, "--absolute-git-dir")?;
    if let Some(operation) = git::pending_operation(Path::new(&git_dir)) {
        return Err(Error::OperationInProgress { operation });
    }
    git::rev_list_ancestry_path(git, root)
}

/// Reads the author and committer identity of `commit` from the repository.
pub fn extract_metadata<G: GitRunner>(git: &mut G, commit: &str) -> Result<CommitRecord> {
    let out = match git::show_fuller(git, commit) {
        Err(Error::NonUtf8Output { .. }) => {
            return Err(Error::parse(commit, "header is not valid UTF-8"));
        }
        other => other?,
    };
    let record = parse_show_output(commit, &out)?;
    info!(
        "extracted {} by {} <{}>",
        record.commit_hash, record.author_name, record.author_email
    );
    Ok(record)
}

/// Parses the five header lines of `git show --format=fuller`.
///
/// `commit` is only used to label errors.
pub fn parse_show_output(commit: &str, text: &str) -> Result<CommitRecord> {
    let lines: Vec<&str> = text.lines().take(5).collect();
    if lines.len() < 5 {
        return Err(Error::parse(
            commit,
            format!("expected 5 header lines, got {}", lines.len()),
        ));
    }

    let commit_hash = match lines[0].split_whitespace().collect::<Vec<_>>()[..] {
        ["commit", hash, ..] => hash.to_string(),
        _ => return Err(Error::parse(commit, format!("bad header line {:?}", lines[0]))),
    };

    let (author_name, author_email) = parse_identity(commit, "Author", lines[1])?;
    let author_date = parse_date(commit, "AuthorDate", lines[2])?;
    let (committer_name, committer_email) = parse_identity(commit, "Commit", lines[3])?;
    let committer_date = parse_date(commit, "CommitDate", lines[4])?;

    Ok(CommitRecord {
        commit_hash,
        author_name,
        author_email,
        author_date,
        committer_name,
        committer_email,
        committer_date,
    })
}

/// Splits `Label: rest` and checks the label.
fn split_label<'a>(commit: &str, label: &str, line: &'a str) -> Result<&'a str> {
    match line.split_once(':') {
        Some((found, rest)) if found.trim() == label => Ok(rest),
        Some((found, _)) => Err(Error::parse(
            commit,
            format!("expected {label:?} line, found {:?}", found.trim()),
        )),
        None => Err(Error::parse(commit, format!("missing ':' in {line:?}"))),
    }
}

/// Parses `Author:     John Doe <john@example.com>` into its name and email.
pub fn parse_identity(commit: &str, label: &str, line: &str) -> Result<(String, String)> {
    let rest = split_label(commit, label, line)?;

    let (name, after) = rest
        .split_once('<')
        .ok_or_else(|| Error::parse(commit, format!("no '<' in {label} line {line:?}")))?;
    let (email, _) = after
        .split_once('>')
        .ok_or_else(|| Error::parse(commit, format!("no '>' in {label} line {line:?}")))?;

    Ok((name.trim().to_string(), email.trim().to_string()))
}

/// Parses `AuthorDate: Thu Jun 6 14:31:55 2019 +0300`.
///
/// The date is kept exactly as git printed it; replay hands it straight back
/// to git.
pub fn parse_date(commit: &str, label: &str, line: &str) -> Result<String> {
    Ok(split_label(commit, label, line)?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::scripted::ScriptedGit;

    const FULLER: &str = "\
commit 3f2a9c1d0e8b7a6f5e4d3c2b1a0f9e8d7c6b5a49 (HEAD -> main)
Author:     John Doe <john_doe@example.com>
AuthorDate: Thu Jun 6 14:31:55 2019 +0300
Commit:     Build Bot <bot@ci.example.org>
CommitDate: Fri Jun 7 09:00:01 2019 -0700

    Adding a
";

    #[test]
    fn parses_fuller_header() {
        let rec = parse_show_output("3f2a9c1", FULLER).unwrap();
        assert_eq!(rec.commit_hash, "3f2a9c1d0e8b7a6f5e4d3c2b1a0f9e8d7c6b5a49");
        assert_eq!(rec.author_name, "John Doe");
        assert_eq!(rec.author_email, "john_doe@example.com");
        assert_eq!(rec.author_date, "Thu Jun 6 14:31:55 2019 +0300");
        assert_eq!(rec.committer_name, "Build Bot");
        assert_eq!(rec.committer_email, "bot@ci.example.org");
        assert_eq!(rec.committer_date, "Fri Jun 7 09:00:01 2019 -0700");
    }

    #[test]
    fn identity_keeps_colons_in_name() {
        let (name, email) =
            parse_identity("c", "Author", "Author:     Dr: Who <who@tardis.org>").unwrap();
        assert_eq!(name, "Dr: Who");
        assert_eq!(email, "who@tardis.org");
    }

    #[test]
    fn identity_allows_empty_email() {
        let (name, email) = parse_identity("c", "Commit", "Commit: Anon <>").unwrap();
        assert_eq!(name, "Anon");
        assert_eq!(email, "");
    }

    #[test]
    fn identity_without_brackets_is_parse_error() {
        let err = parse_identity("c", "Author", "Author: John Doe").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn date_is_verbatim() {
        let d = parse_date("c", "CommitDate", "CommitDate:   2019-06-06T14:31:55+03:00  ").unwrap();
        assert_eq!(d, "2019-06-06T14:31:55+03:00");
    }

    #[test]
    fn short_output_is_parse_error() {
        let err = parse_show_output("abc", "commit abc\nAuthor: A <a@b>\n").unwrap_err();
        match err {
            Error::Parse { commit, reason } => {
                assert_eq!(commit, "abc");
                assert!(reason.contains("got 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn merge_header_is_parse_error() {
        let text = "\
commit abc
Merge: 111 222
Author:     John Doe <john_doe@example.com>
AuthorDate: Thu Jun 6 14:31:55 2019 +0300
Commit:     John Doe <john_doe@example.com>
CommitDate: Thu Jun 6 14:31:55 2019 +0300
";
        assert!(matches!(
            parse_show_output("abc", text),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn extract_runs_show_for_commit() {
        let mut git = ScriptedGit::new().respond("git show", FULLER);
        let rec = extract_metadata(&mut git, "3f2a9c1").unwrap();
        assert_eq!(rec.author_name, "John Doe");
        assert_eq!(
            git.command_lines(),
            vec![
                "git show --no-patch --no-color --no-mailmap --no-show-signature \
                 --date=default --encoding=UTF-8 --format=fuller 3f2a9c1"
            ]
        );
    }

    #[test]
    fn undecodable_header_is_parse_error() {
        let mut git = ScriptedGit::new().non_utf8("git show");
        match extract_metadata(&mut git, "3f2a9c1") {
            Err(Error::Parse { commit, reason }) => {
                assert_eq!(commit, "3f2a9c1");
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn listing_refuses_stopped_cherry_pick() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::write(dir.path().join("CHERRY_PICK_HEAD"), "abc\n")
            .expect("failed to write state file");
        let git_dir = dir.path().to_string_lossy().into_owned();

        let mut git = ScriptedGit::new()
            .respond("git rev-parse --absolute-git-dir", &git_dir)
            .respond("git rev-list", "aaa\nbbb");
        let err = list_descendant_hashes(&mut git, "root").unwrap_err();

        assert!(matches!(
            err,
            Error::OperationInProgress {
                operation: "cherry-pick"
            }
        ));
        assert_eq!(git.command_lines(), vec!["git rev-parse --absolute-git-dir"]);
    }

    #[test]
    fn unknown_root_propagates_command_error() {
        let mut git = ScriptedGit::new().fail("git rev-list", "fatal: bad revision 'nope..HEAD'");
        let err = list_descendant_hashes(&mut git, "nope").unwrap_err();
        assert!(matches!(err, Error::ExternalCommand { .. }));
    }
}
