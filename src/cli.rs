use crate::{
    banner::print_banner,
    error::Error,
    git::{self, GitRunner, SystemGit},
    history::HistoryRecord,
    replay,
};

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use console::style;
use std::{env, ffi::OsString, path::PathBuf};
use tracing::debug;

/// Dump commit author/committer metadata to JSON and replay it onto a new branch
#[derive(Parser, Debug)]
#[command(name = "git-rewrite", version, about)]
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump commit data to a JSON file
    Dump(DumpArgs),

    /// Apply commit data from a JSON file
    ///
    /// A new branch is created at the recorded root commit; every recorded
    /// commit is cherry-picked onto it and amended with its recorded author
    /// and committer.
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// The hash of the root commit; only commits after it are dumped
    pub root_hash: String,

    /// The path of the output file
    #[arg(short, long, default_value = "history.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// The path of the input file
    #[arg(short, long, default_value = "history.json")]
    pub input: PathBuf,

    /// The name of the branch that will be created [default: rewrite_NNNN]
    #[arg(short, long)]
    pub branch: Option<String>,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Run as if started in this directory
    #[arg(global = true, short = 'C', long = "repo", value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Enable verbose output
    ///
    /// This can be repeated up to 3 times to enable successively more output.
    #[arg(global = true, long, short, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable or disable colored output
    ///
    /// If the `NO_COLOR` environment variable is set, it is equivalent to `--color=never`.
    #[arg(global = true, long, value_enum, default_value_t = Mode::Auto, value_name = "MODE")]
    pub color: Mode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Auto,
    Never,
    Always,
}

/// Prints an error to stderr in the CLI's error style.
fn report(e: Error) {
    eprintln!("{}", style(format!("Error: {}", e)).red().bold());
}

fn configure_color(global_args: &GlobalArgs) {
    let mode = if env::var_os("NO_COLOR").is_some() {
        Mode::Never
    } else {
        global_args.color
    };
    match mode {
        Mode::Auto => {}
        Mode::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        Mode::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        }
    }
}

fn configure_tracing(global_args: &GlobalArgs) -> Result<(), ()> {
    use tracing_subscriber::filter::LevelFilter;

    let filter = match global_args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_ansi(console::colors_enabled_stderr())
        .finish();

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Failed to initialize logging: {}", e))
                    .red()
                    .bold()
            );
            Err(())
        }
    }
}

/// Verifies git is available and that we are inside a repository.
fn verify_environment(global_args: &GlobalArgs) -> Result<SystemGit, ()> {
    match git::locate() {
        Ok(path) => debug!("using {}", path.display()),
        Err(e) => {
            report(e);
            return Err(());
        }
    }

    let mut git = match &global_args.repo {
        Some(repo) => SystemGit::in_dir(repo),
        None => SystemGit::new(),
    };

    match git::rev_parse(&mut git, "--show-toplevel") {
        Ok(root) => debug!("repository root: {root}"),
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Error: not inside a git repo ({})", e))
                    .red()
                    .bold()
            );
            return Err(());
        }
    }

    Ok(git)
}

/// Captures the commits after `root_hash` and writes them to the output file.
fn dump<G: GitRunner>(git: &mut G, args: &DumpArgs) -> Result<i32, ()> {
    let history = HistoryRecord::capture(git, &args.root_hash).map_err(report)?;
    history.save(&args.output).map_err(report)?;

    println!(
        "{}",
        style(format!(
            "✅ Wrote {} commits after {} to {}",
            history.commits.len(),
            history.root_hash,
            args.output.display()
        ))
        .green()
        .bold()
    );
    Ok(0)
}

/// Loads the input file and replays it onto a new branch.
///
/// The file is fully parsed before the repository is touched.
fn apply<G: GitRunner>(git: &mut G, args: &ApplyArgs) -> Result<i32, ()> {
    let history = HistoryRecord::load(&args.input).map_err(report)?;

    let mut rng = rand::thread_rng();
    let branch = match &args.branch {
        Some(name) => name.clone(),
        None => replay::generate_branch_name(&mut rng),
    };

    print_banner(&history, &branch);

    match replay::replay(git, &history, Some(&branch), &mut rng) {
        Ok(branch) => {
            println!(
                "{}",
                style(format!(
                    "✅ Replayed {} commits onto branch {}",
                    history.commits.len(),
                    branch
                ))
                .green()
                .bold()
            );
            Ok(0)
        }
        Err(e) => {
            report(e);
            eprintln!(
                "{}",
                style(format!(
                    "❌ Replay stopped; branch {} was left as-is.",
                    branch
                ))
                .yellow()
                .bold()
            );
            Err(())
        }
    }
}

/// Main CLI entry point for `git-rewrite`, reading the process arguments.
///
/// Returns `Ok(exit_code)` when the process should exit normally (including
/// help, version, and usage errors reported by clap), or `Err(())` after an
/// operation failed and its error was printed.
pub fn entry() -> Result<i32, ()> {
    entry_from(env::args_os())
}

/// Same as [`entry`], with explicit arguments (the first is the program name).
///
/// 1. Parses arguments; with no subcommand, prints help and returns `0`.
/// 2. Configures color and logging.
/// 3. Verifies `git` is installed and the target directory is a repository.
/// 4. Runs `dump` or `apply`.
pub fn entry_from<I, T>(args: I) -> Result<i32, ()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match CommandLineArgs::try_parse_from(args) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return Ok(e.exit_code());
        }
    };

    let Some(command) = args.command else {
        let _ = CommandLineArgs::command().print_help();
        println!();
        return Ok(0);
    };

    configure_color(&args.global_args);
    configure_tracing(&args.global_args)?;

    let mut git = verify_environment(&args.global_args)?;

    match command {
        Command::Dump(dump_args) => dump(&mut git, &dump_args),
        Command::Apply(apply_args) => apply(&mut git, &apply_args),
    }
}
