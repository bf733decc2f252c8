use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// A single `git` invocation: its arguments plus any environment overrides
/// scoped to the child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
        }
    }

    /// Adds environment variables that apply to this invocation only.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git")?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Abstraction over running `git`.
///
/// Every repository query and mutation goes through this trait, so the
/// extraction and replay logic can be exercised against a scripted runner
/// without touching a real repository.
pub trait GitRunner {
    /// Runs `cmd` to completion and returns its trimmed standard output.
    ///
    /// A non-zero exit status is reported as [`Error::ExternalCommand`]
    /// carrying the command line and captured standard error.
    fn run(&mut self, cmd: &GitCommand) -> Result<String>;
}

/// Runs the `git` binary found on `PATH`, optionally inside a given directory.
#[derive(Debug, Clone, Default)]
pub struct SystemGit {
    repo: Option<PathBuf>,
}

impl SystemGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every command as `git -C <repo> ...`.
    pub fn in_dir(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: Some(repo.into()),
        }
    }
}

impl GitRunner for SystemGit {
    fn run(&mut self, git: &GitCommand) -> Result<String> {
        let mut cmd = Command::new("git");
        if let Some(repo) = &self.repo {
            cmd.arg("-C").arg(repo);
        }
        cmd.args(git.args());
        cmd.envs(git.env().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!("running {git}");
        run_output(cmd, &git.to_string())
    }
}

/// Runs a command and returns its trimmed standard output on success,
/// or an [`Error::ExternalCommand`] with its trimmed standard error on failure.
///
/// If the process fails to spawn, the I/O error is returned as [`Error::Spawn`].
fn run_output(mut cmd: Command, display: &str) -> Result<String> {
    let out = cmd.output().map_err(|source| Error::Spawn {
        command: display.to_string(),
        source,
    })?;

    if out.status.success() {
        decode_stdout(display, out.stdout)
    } else {
        Err(Error::ExternalCommand {
            command: display.to_string(),
            status: out.status.to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        })
    }
}

/// Decodes captured standard output, refusing anything that is not UTF-8.
///
/// Identities and dates are written back to git verbatim, so a replacement
/// character in place of an undecodable byte would change the commit.
fn decode_stdout(display: &str, stdout: Vec<u8>) -> Result<String> {
    match String::from_utf8(stdout) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(_) => Err(Error::NonUtf8Output {
            command: display.to_string(),
        }),
    }
}

/// Checks that a `git` executable is available on `PATH`.
///
/// # Returns
///
/// * `Ok(path)` with the resolved location of `git`.
/// * `Err(Error::GitNotFound)` if no executable named `git` is on `PATH`.
pub fn locate() -> Result<PathBuf> {
    Ok(which::which("git")?)
}

/// Runs `git rev-parse <flag>` and returns its output.
///
/// Typically used to confirm the working directory is inside a repository,
/// e.g. with `--show-toplevel`, or to find the git directory with
/// `--absolute-git-dir`.
///
/// # Parameters
///
/// * `git` – The runner to execute the command with.
/// * `flag` – A single `rev-parse` option or revision.
///
/// # Returns
///
/// * `Ok(String)` with the trimmed output.
/// * `Err(Error::ExternalCommand)` if git rejects the flag or the directory is
///   not a repository.
///
/// # Examples
///
/// ```ignore
/// let mut git = SystemGit::new();
/// let top = rev_parse(&mut git, "--show-toplevel")?;
/// println!("repository root: {top}");
/// ```
pub fn rev_parse<G: GitRunner>(git: &mut G, flag: &str) -> Result<String> {
    git.run(&GitCommand::new(["rev-parse", flag]))
}

/// Reports which multi-step git operation, if any, is stopped half-way in
/// `git_dir`.
///
/// A cherry-pick, revert, merge, or rebase that stopped on a conflict leaves
/// its state file or directory behind until it is continued or aborted.
///
/// # Parameters
///
/// * `git_dir` – Path to the repository's git directory, as printed by
///   `git rev-parse --absolute-git-dir`.
///
/// # Returns
///
/// * `Some(name)` naming the first pending operation found.
/// * `None` when the repository is idle.
///
/// # Notes
///
/// * This only looks at the filesystem; it does not invoke git.
///
/// # Examples
///
/// ```ignore
/// use std::path::Path;
///
/// if let Some(op) = pending_operation(Path::new(".git")) {
///     eprintln!("a {op} is in progress");
/// }
/// ```
pub fn pending_operation(git_dir: &Path) -> Option<&'static str> {
    [
        ("CHERRY_PICK_HEAD", "cherry-pick"),
        ("REVERT_HEAD", "revert"),
        ("MERGE_HEAD", "merge"),
        ("rebase-merge", "rebase"),
        ("rebase-apply", "rebase"),
    ]
    .into_iter()
    .find(|(entry, _)| git_dir.join(entry).exists())
    .map(|(_, operation)| operation)
}

/// Lists the commits on the ancestry path from `root` (exclusive) to `HEAD`,
/// oldest first.
///
/// Runs:
///
/// ```text
/// git rev-list --reverse --ancestry-path <root>..HEAD
/// ```
///
/// Blank lines are skipped, so an empty range yields an empty vector.
pub fn rev_list_ancestry_path<G: GitRunner>(git: &mut G, root: &str) -> Result<Vec<String>> {
    let range = format!("{root}..HEAD");
    let out = git.run(&GitCommand::new([
        "rev-list",
        "--reverse",
        "--ancestry-path",
        range.as_str(),
    ]))?;

    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Shows the header of `commit` in the `fuller` format, without the patch.
///
/// The output looks like:
///
/// ```text
/// commit <hash>
/// Author:     <name> <<email>>
/// AuthorDate: <date>
/// Commit:     <name> <<email>>
/// CommitDate: <date>
/// ```
///
/// # Parameters
///
/// * `git` – The runner to execute the command with.
/// * `commit` – Any revision git can resolve to a single commit.
///
/// # Returns
///
/// * `Ok(String)` with the header followed by the indented message.
/// * `Err(Error::ExternalCommand)` if the revision does not resolve.
/// * `Err(Error::NonUtf8Output)` if the header cannot be decoded as UTF-8.
///
/// # Notes
///
/// * Repository settings that change this layout are overridden on the
///   command line: `log.date` by `--date=default` (a format `--date` accepts
///   back), `.mailmap`/`log.mailmap` by `--no-mailmap`, `color.ui` by
///   `--no-color`, and `log.showSignature` by `--no-show-signature`.
/// * `--encoding=UTF-8` asks git to re-encode messages and identities stored
///   in another declared encoding.
pub fn show_fuller<G: GitRunner>(git: &mut G, commit: &str) -> Result<String> {
    git.run(&GitCommand::new([
        "show",
        "--no-patch",
        "--no-color",
        "--no-mailmap",
        "--no-show-signature",
        "--date=default",
        "--encoding=UTF-8",
        "--format=fuller",
        commit,
    ]))
}

/// Creates `branch` at `start_point` and checks it out.
///
/// Fails with [`Error::ExternalCommand`] if `branch` already exists or the
/// working tree has changes that the checkout would overwrite.
pub fn checkout_new_branch<G: GitRunner>(
    git: &mut G,
    branch: &str,
    start_point: &str,
) -> Result<()> {
    git.run(&GitCommand::new(["checkout", "-b", branch, start_point]))?;
    Ok(())
}

/// Applies the change introduced by `commit` on top of the current branch tip.
pub fn cherry_pick<G: GitRunner>(git: &mut G, commit: &str) -> Result<()> {
    git.run(&GitCommand::new(["cherry-pick", commit]))?;
    Ok(())
}

/// Amends the current commit with the given author and date, keeping its
/// message.
///
/// This runs:
///
/// ```text
/// git commit --amend --author <author> --date <date> --no-edit
/// ```
///
/// # Parameters
///
/// * `git` – The runner to execute the command with.
/// * `author` – The author in `Name <email>` form.
/// * `date` – The author date, in any format `git commit --date` accepts.
/// * `env` – Variables applied to the child process only. This is how the
///   committer identity and timestamp get overridden, since `git commit` has
///   no flags for them.
///
/// # Returns
///
/// * `Ok(())` if the amend succeeded.
/// * `Err(Error::ExternalCommand)` if git rejected the identity or date.
///
/// # Examples
///
/// ```ignore
/// amend_identity(
///     &mut git,
///     "Jane Doe <jane_doe@example.com>",
///     "Thu Jun 6 14:31:55 2019 +0300",
///     record.identity_env(),
/// )?;
/// ```
pub fn amend_identity<G: GitRunner>(
    git: &mut G,
    author: &str,
    date: &str,
    env: Vec<(&'static str, String)>,
) -> Result<()> {
    let cmd = GitCommand::new([
        "commit",
        "--amend",
        "--author",
        author,
        "--date",
        date,
        "--no-edit",
    ])
    .envs(env);
    git.run(&cmd)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::scripted::ScriptedGit;
    use super::*;

    #[test]
    fn display_quotes_args_with_spaces() {
        let cmd = GitCommand::new(["commit", "--author", "John Doe <j@d.org>", "--no-edit"]);
        assert_eq!(
            cmd.to_string(),
            "git commit --author \"John Doe <j@d.org>\" --no-edit"
        );
    }

    #[test]
    fn envs_accumulate_in_order() {
        let cmd = GitCommand::new(["status"])
            .envs([("A", "1")])
            .envs([("B", String::from("2"))]);
        assert_eq!(
            cmd.env(),
            &[
                (String::from("A"), String::from("1")),
                (String::from("B"), String::from("2"))
            ]
        );
    }

    #[test]
    fn rev_list_splits_lines_and_skips_blanks() {
        let mut git = ScriptedGit::new().respond("git rev-list", "aaa\nbbb\n\nccc");
        let hashes = rev_list_ancestry_path(&mut git, "root").unwrap();
        assert_eq!(hashes, vec!["aaa", "bbb", "ccc"]);
        assert_eq!(
            git.command_lines(),
            vec!["git rev-list --reverse --ancestry-path root..HEAD"]
        );
    }

    #[test]
    fn rev_list_empty_output_is_empty_range() {
        let mut git = ScriptedGit::new();
        let hashes = rev_list_ancestry_path(&mut git, "HEAD").unwrap();
        assert!(hashes.is_empty());
    }

    #[test]
    fn amend_passes_author_date_and_env() {
        let mut git = ScriptedGit::new();
        amend_identity(
            &mut git,
            "Jane <jane@example.com>",
            "Thu Jun 6 14:31:55 2019 +0300",
            vec![("GIT_COMMITTER_NAME", String::from("Jane"))],
        )
        .unwrap();

        let call = &git.calls[0];
        assert_eq!(
            call.args(),
            &[
                "commit",
                "--amend",
                "--author",
                "Jane <jane@example.com>",
                "--date",
                "Thu Jun 6 14:31:55 2019 +0300",
                "--no-edit"
            ]
        );
        assert_eq!(
            call.env(),
            &[(String::from("GIT_COMMITTER_NAME"), String::from("Jane"))]
        );
    }

    #[test]
    fn failing_command_surfaces_stderr() {
        let mut git = ScriptedGit::new().fail("git checkout", "fatal: a branch named 'x' already exists");
        let err = checkout_new_branch(&mut git, "x", "abc").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("git checkout -b x abc"));
        assert!(msg.contains("already exists"));
    }

    #[test]
    fn show_overrides_repository_display_settings() {
        let mut git = ScriptedGit::new();
        show_fuller(&mut git, "abc").unwrap();
        assert_eq!(
            git.calls[0].args(),
            &[
                "show",
                "--no-patch",
                "--no-color",
                "--no-mailmap",
                "--no-show-signature",
                "--date=default",
                "--encoding=UTF-8",
                "--format=fuller",
                "abc"
            ]
        );
    }

    #[test]
    fn stdout_is_trimmed_utf8() {
        let text = decode_stdout("git show abc", b"commit abc\n\n".to_vec()).unwrap();
        assert_eq!(text, "commit abc");
    }

    #[test]
    fn invalid_utf8_stdout_is_rejected() {
        let bytes = b"Author:     Jos\xe9 <jose@example.com>".to_vec();
        match decode_stdout("git show abc", bytes) {
            Err(Error::NonUtf8Output { command }) => assert_eq!(command, "git show abc"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn pending_operation_detects_stopped_cherry_pick() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        assert_eq!(pending_operation(dir.path()), None);

        std::fs::write(dir.path().join("CHERRY_PICK_HEAD"), "abc\n")
            .expect("failed to write state file");
        assert_eq!(pending_operation(dir.path()), Some("cherry-pick"));
    }

    #[test]
    fn pending_operation_detects_rebase_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::create_dir(dir.path().join("rebase-merge")).expect("failed to create dir");
        assert_eq!(pending_operation(dir.path()), Some("rebase"));
    }

    #[test]
    fn system_git_reports_non_zero_exit() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut git = SystemGit::in_dir(dir.path());
        // Not a repository, so rev-parse must fail.
        let res = rev_parse(&mut git, "--show-toplevel");
        match res {
            Err(Error::ExternalCommand { command, .. }) => {
                assert_eq!(command, "git rev-parse --show-toplevel");
            }
            Err(Error::Spawn { .. }) => {} // no git on this machine
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
