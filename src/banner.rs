use console::{measure_text_width, style};
use std::iter;

use crate::history::HistoryRecord;

/// Prints a framed summary of the replay that is about to happen.
///
/// # Examples
///
/// ```no_run
/// use git_rewrite::banner::print_banner;
/// use git_rewrite::history::HistoryRecord;
///
/// let history = HistoryRecord { root_hash: "a84477f".into(), commits: vec![] };
/// print_banner(&history, "rewrite_0042");
/// ```
pub fn print_banner(history: &HistoryRecord, branch: &str) {
    println!();
    for row in frame(&banner_lines(history, branch)) {
        println!("{row}");
    }
    println!();
}

/// Surrounds `lines` with a double-line box, one space of margin on each side.
///
/// Widths are visible widths from [`measure_text_width`], so styled lines pad
/// the same as plain ones.
fn frame(lines: &[String]) -> Vec<String> {
    let inner = lines.iter().map(|l| measure_text_width(l)).max().unwrap_or(0) + 2;
    let edge = |s: &str| style(s).blue().bold().to_string();
    let rule = "═".repeat(inner);

    let body = lines.iter().map(|line| {
        let fill = " ".repeat(inner - 1 - measure_text_width(line));
        format!("{} {line}{fill}{}", edge("║"), edge("║"))
    });

    iter::once(edge(&format!("╔{rule}╗")))
        .chain(body)
        .chain(iter::once(edge(&format!("╚{rule}╝"))))
        .collect()
}

/// Lines of the replay banner: title, target, then one line per distinct
/// author identity that will be written.
///
/// The target line is styled, so callers measuring width must use
/// `console::measure_text_width` rather than `str::len()`.
fn banner_lines(history: &HistoryRecord, branch: &str) -> Vec<String> {
    let top = ["Replay commit metadata onto a new branch", ""]
        .into_iter()
        .map(|s| s.to_string());

    let target = iter::once(
        style(format!(
            "Branch {} from {} ({} commits)",
            branch,
            history.root_hash,
            history.commits.len()
        ))
        .cyan()
        .bold()
        .to_string(),
    );

    let mut authors: Vec<String> = Vec::new();
    for commit in &history.commits {
        let author = commit.author();
        if !authors.contains(&author) {
            authors.push(author);
        }
    }

    let bottom = iter::once(String::new())
        .chain(iter::once(String::from("Authors that will be written:")))
        .chain(authors.into_iter().map(|a| format!("  {a}")))
        .chain(iter::once(String::new()))
        .chain(
            [
                "For each commit this tool will:",
                "  1) `git cherry-pick` it onto the new branch",
                "  2) Amend it with the recorded author and committer",
            ]
            .into_iter()
            .map(|s| s.to_string()),
        );

    top.chain(target).chain(bottom).collect()
}
