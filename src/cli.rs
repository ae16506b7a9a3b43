use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use clap_complete::Shell;
use std::env;
use std::ffi::OsString;

use crate::error::{RakeError, Result};
use crate::logger::*;
use crate::options::{ClassicGlobals, ExecutionContext, Options, TaskPattern};
use crate::printer::PROGRAM;

pub const USAGE: &str = "rhake [-f rakefile] {options} targets...";

/// Task run when the command line names none.
pub const DEFAULT_TASK: &str = "default";

#[derive(Parser, Debug)]
#[command(
    name = "rhake",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true,
    help_template = "{all-args}"
)]
pub struct Cli {
    /// Do a dry run without executing actions
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Display this help message
    #[arg(short = 'H', long = "help")]
    pub help: bool,

    /// Include LIBDIR in the search path for required scripts
    #[arg(short = 'I', long = "libdir", value_name = "LIBDIR")]
    pub libdir: Vec<String>,

    /// Do not search parent directories for the Rakefile
    #[arg(short = 'N', long = "nosearch", visible_alias = "no-search")]
    pub nosearch: bool,

    /// Display the tasks and dependencies, then exit
    #[arg(short = 'P', long = "prereqs", visible_alias = "show-prereqs")]
    pub prereqs: bool,

    /// Do not log messages to standard output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Use FILE as the rakefile (an empty name needs no rakefile)
    #[arg(
        short = 'f',
        long = "rakefile",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    pub rakefile: Option<String>,

    /// Auto-import any .rake files in RAKELIBDIR (colon separated, default is 'rakelib')
    #[arg(short = 'R', long = "rakelibdir", value_name = "RAKELIBDIR")]
    pub rakelibdir: Option<String>,

    /// Require SCRIPT before executing the rakefile
    #[arg(short = 'r', long = "require", value_name = "SCRIPT")]
    pub require: Vec<String>,

    /// Like --quiet, but also suppresses the 'in directory' announcement
    #[arg(short = 's', long = "silent")]
    pub silent: bool,

    /// Display the tasks (matching optional PATTERN) with descriptions, then exit
    #[arg(
        short = 'T',
        long = "tasks",
        value_name = "PATTERN",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    pub tasks: Option<String>,

    /// Turn on invoke/execute tracing, enable full error details
    #[arg(short = 't', long = "trace")]
    pub trace: bool,

    /// Display usage
    #[arg(short = 'h', long = "usage")]
    pub usage: bool,

    /// Log message to standard output (default)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Display the program version
    #[arg(short = 'V', long = "version")]
    pub version: bool,

    /// Put Task and FileTask in the top level namespace
    #[arg(short = 'C', long = "classic-namespace")]
    pub classic_namespace: bool,

    /// Print a shell completion script, then exit
    #[arg(long = "completions", value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Tasks to run, plus KEY=VALUE environment settings
    #[arg(value_name = "TARGETS")]
    pub targets: Vec<String>,
}

/// Result of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Continue with these residual (non-flag) arguments.
    Proceed(Vec<String>),
    /// Print this banner and stop with a success status.
    Exit(String),
}

/// Side effects some flags apply while the command line is processed.
pub trait OptionEffects {
    /// Receives the parsed execution flags before any `--require` file runs.
    fn apply_exec(&mut self, exec: &ExecutionContext);
    fn add_library_path(&mut self, dir: &str);
    fn require(&mut self, file: &str) -> Result<()>;
}

/// Parses `args` (program name first) into `options` and the global flags
/// in `exec`.
pub fn handle_options<I, T>(
    args: I,
    options: &mut Options,
    exec: &mut ExecutionContext,
    effects: &mut dyn OptionEffects,
) -> Result<ParseOutcome>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command()
        .try_get_matches_from(args)
        .map_err(convert_clap_error)?;
    let cli = Cli::from_arg_matches(&matches).map_err(convert_clap_error)?;
    debug!("cli args: {:?}", cli);

    if cli.help {
        return Ok(ParseOutcome::Exit(help_text()));
    }
    if cli.usage {
        return Ok(ParseOutcome::Exit(usage_text()));
    }
    if cli.version {
        return Ok(ParseOutcome::Exit(version_text()));
    }
    if let Some(shell) = cli.completions {
        return Ok(ParseOutcome::Exit(completion_script(shell)));
    }

    apply_verbosity(&matches, options, exec);

    if cli.nosearch {
        options.nosearch = Some(true);
    }
    if cli.prereqs {
        options.show_prereqs = Some(true);
    }
    if let Some(file) = cli.rakefile {
        options.rakefile_candidates = vec![file];
    }
    if let Some(dirs) = cli.rakelibdir {
        options.rakelib_dirs = dirs.split(':').map(str::to_string).collect();
    }
    if let Some(source) = cli.tasks {
        let pattern =
            TaskPattern::new(&source).map_err(|err| RakeError::InvalidOptionValue {
                option: "--tasks".to_string(),
                message: err.to_string(),
            })?;
        options.show_tasks = Some(true);
        options.show_task_pattern = Some(pattern);
    }
    if cli.classic_namespace {
        options.classic_namespace = Some(true);
        exec.classic = Some(ClassicGlobals::mirror(options));
    }
    exec.sync_with(options);
    effects.apply_exec(exec);

    for dir in &cli.libdir {
        effects.add_library_path(dir);
    }
    for file in &cli.require {
        effects.require(file)?;
    }

    Ok(ParseOutcome::Proceed(cli.targets))
}

#[derive(Clone, Copy)]
enum VerbosityFlag {
    Trace,
    DryRun,
    Quiet,
    Silent,
    Verbose,
}

/// Applies the flags touching `verbose` in the order they were given.
fn apply_verbosity(matches: &ArgMatches, options: &mut Options, exec: &mut ExecutionContext) {
    let mut seen: Vec<(usize, VerbosityFlag)> = [
        ("trace", VerbosityFlag::Trace),
        ("dry_run", VerbosityFlag::DryRun),
        ("quiet", VerbosityFlag::Quiet),
        ("silent", VerbosityFlag::Silent),
        ("verbose", VerbosityFlag::Verbose),
    ]
    .into_iter()
    .filter_map(|(id, flag)| flag_position(matches, id).map(|index| (index, flag)))
    .collect();
    seen.sort_by_key(|(index, _)| *index);

    for (_, flag) in seen {
        match flag {
            VerbosityFlag::Trace => {
                options.trace = Some(true);
                exec.verbose = true;
            }
            VerbosityFlag::DryRun => {
                options.dryrun = Some(true);
                options.trace = Some(true);
                exec.verbose = true;
                exec.nowrite = true;
            }
            VerbosityFlag::Quiet => exec.verbose = false,
            VerbosityFlag::Silent => {
                options.silent = Some(true);
                exec.verbose = false;
            }
            VerbosityFlag::Verbose => exec.verbose = true,
        }
    }
}

fn flag_position(matches: &ArgMatches, id: &str) -> Option<usize> {
    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return None;
    }
    matches.indices_of(id).and_then(|indices| indices.last())
}

fn convert_clap_error(err: clap::Error) -> RakeError {
    let option = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg.clone(),
        _ => String::new(),
    };
    match err.kind() {
        ErrorKind::UnknownArgument => RakeError::UnrecognizedOption(option),
        _ => {
            let rendered = err.render().to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            RakeError::InvalidOptionValue { option, message }
        }
    }
}

/// Splits residual arguments into task names and `KEY=VALUE` environment
/// settings, applying the latter. Defaults to the `default` task.
pub fn collect_tasks(targets: Vec<String>) -> Vec<String> {
    let mut tasks = Vec::new();
    for arg in targets {
        match env_assignment(&arg) {
            Some((key, value)) => {
                debug!("setting environment {}={}", key, value);
                env::set_var(key, value);
            }
            None => tasks.push(arg),
        }
    }
    if tasks.is_empty() {
        tasks.push(DEFAULT_TASK.to_string());
    }
    tasks
}

fn env_assignment(arg: &str) -> Option<(&str, &str)> {
    let (key, value) = arg.split_once('=')?;
    let is_word = !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_');
    is_word.then_some((key, value))
}

pub fn usage_text() -> String {
    format!("{USAGE}\n")
}

pub fn help_text() -> String {
    let options = Cli::command().render_help().to_string();
    format!("{USAGE}\n\nOptions are ...\n{options}")
}

pub fn version_text() -> String {
    format!("{PROGRAM}, version {}\n", env!("CARGO_PKG_VERSION"))
}

fn completion_script(shell: Shell) -> String {
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut Cli::command(), PROGRAM, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
