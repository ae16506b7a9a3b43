use std::env;
use std::error::Error as _;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{self, OptionEffects, ParseOutcome};
use crate::engine::ScriptEngine;
use crate::error::{RakeError, Result};
use crate::import::Loader;
use crate::locator;
use crate::logger::{self, *};
use crate::options::{ExecutionContext, Options};
use crate::printer::{Console, PROGRAM};
use crate::task::{Action, RegistryRef, Task};

/// Extension of the auxiliary task files picked up from rakelib directories.
const RAKELIB_EXTENSION: &str = "rake";

/// The driver: parses options, finds and evaluates the rakefile, drains
/// imports and runs the requested tasks.
pub struct Application {
    options: Options,
    scripts: ScriptEngine,
    rakefile: Option<PathBuf>,
    console: Console,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_console(Console::stdio())
    }

    /// Builds an application whose output, errors and trace narration all go
    /// to `console`.
    pub fn with_console(console: Console) -> Self {
        let scripts = ScriptEngine::new();
        scripts.set_narrator(console.narrator());
        Self {
            options: Options::default(),
            scripts,
            rakefile: None,
            console,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    pub fn exec(&self) -> ExecutionContext {
        self.scripts.exec()
    }

    pub fn registry(&self) -> RegistryRef {
        self.scripts.registry()
    }

    pub fn scripts(&self) -> &ScriptEngine {
        &self.scripts
    }

    /// Path of the evaluated rakefile, once located.
    pub fn rakefile(&self) -> Option<&Path> {
        self.rakefile.as_deref()
    }

    pub fn set_pending_comment(&self, comment: impl Into<String>) {
        self.registry().lock().unwrap().set_pending_comment(comment);
    }

    pub fn take_pending_comment(&self) -> Option<String> {
        self.registry().lock().unwrap().take_pending_comment()
    }

    /// Declares a task the way a build script does, consuming the pending
    /// comment.
    pub fn define_task<I, S>(&self, name: &str, prereqs: I, action: Option<Action>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry()
            .lock()
            .unwrap()
            .define(name)
            .enhance(prereqs, action);
    }

    /// Interns `name` and appends to it without touching its comment.
    pub fn enhance<I, S>(&self, name: &str, prereqs: I, action: Option<Action>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry()
            .lock()
            .unwrap()
            .enhance(name, prereqs, action);
    }

    pub fn lookup(&self, name: &str) -> Option<Task> {
        self.registry().lock().unwrap().lookup(name).cloned()
    }

    pub fn add_loader(&self, extension: &str, loader: Loader) {
        self.scripts
            .imports()
            .lock()
            .unwrap()
            .register_loader(extension, loader);
    }

    pub fn add_import(&self, file: impl Into<String>) {
        self.scripts.imports().lock().unwrap().add_import(file);
    }

    pub fn load_imports(&self) -> Result<()> {
        self.scripts.drain_imports()
    }

    /// Applies the command line to the options and the execution flags.
    /// The flags reach the script engine before any `--require` file runs.
    pub fn handle_options<I, T>(&mut self, args: I) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut exec = self.scripts.exec();
        cli::handle_options(args, &mut self.options, &mut exec, &mut self.scripts)
    }

    /// Finds the rakefile, moves into its directory, evaluates it and loads
    /// everything it imported.
    pub fn load_rakefile(&mut self) -> Result<()> {
        let start = env::current_dir()?;
        let located = locator::locate(
            &start,
            &self.options.rakefile_candidates,
            self.options.allows_missing_rakefile(),
            !self.options.nosearch(),
        )?;

        if located.dir != start {
            debug!("changing directory to {}", located.dir.display());
            env::set_current_dir(&located.dir)?;
        }
        if !self.options.silent() {
            self.console.info(format!("(in {})", located.dir.display()));
        }

        if let Some(path) = located.path() {
            info!("loading rakefile {}", path.display());
            self.scripts.run_script(&path)?;
            self.rakefile = Some(path);
        }

        self.queue_rakelib_imports()?;
        self.load_imports()
    }

    fn queue_rakelib_imports(&self) -> Result<()> {
        for dir in &self.options.rakelib_dirs {
            let dir = Path::new(dir);
            if !dir.is_dir() {
                continue;
            }
            let mut files: Vec<String> = fs::read_dir(dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path.extension().and_then(|ext| ext.to_str()) == Some(RAKELIB_EXTENSION)
                })
                .map(|path| path.display().to_string())
                .collect();
            files.sort();
            for file in files {
                trace!("rakelib import: {}", file);
                self.add_import(file);
            }
        }
        Ok(())
    }

    /// Lists tasks, shows prerequisites, or invokes `tasks` in order.
    pub fn top_level(&mut self, tasks: &[String]) -> Result<()> {
        if self.options.show_tasks() {
            self.display_tasks_and_comments();
            return Ok(());
        }
        if self.options.show_prereqs() {
            self.display_prerequisites(tasks);
            return Ok(());
        }
        for name in tasks {
            info!("invoking '{}'", name);
            self.scripts.invoke(name)?;
        }
        Ok(())
    }

    pub fn display_tasks_and_comments(&mut self) {
        let items = self
            .registry()
            .lock()
            .unwrap()
            .list_items(self.options.show_task_pattern.as_ref());
        self.console.print_task_list(&items);
    }

    pub fn display_prerequisites(&mut self, tasks: &[String]) {
        let registry = self.registry();
        for name in tasks {
            let lines = registry.lock().unwrap().prerequisite_tree(name);
            self.console.print_tree(&lines);
        }
    }

    /// Runs the whole application and returns the process exit status.
    /// Every error raised below is reported here and nowhere else.
    pub fn run<I, T>(&mut self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.run_inner(args) {
            Ok(()) => 0,
            Err(err) => {
                self.report_error(&err);
                1
            }
        }
    }

    fn run_inner<I, T>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let residual = match self.handle_options(args)? {
            ParseOutcome::Exit(banner) => {
                self.console.raw(&banner);
                return Ok(());
            }
            ParseOutcome::Proceed(residual) => residual,
        };
        logger::init(self.options.trace());
        info!("start");

        let tasks = cli::collect_tasks(residual);
        debug!("requested tasks: {:?}", tasks);
        self.load_rakefile()?;
        self.top_level(&tasks)?;

        info!("{} end", env!("CARGO_PKG_NAME"));
        Ok(())
    }

    fn report_error(&mut self, err: &RakeError) {
        error!("{}", err);
        self.console.error(format!("{} aborted!", PROGRAM));
        self.console.error(err.to_string());
        if self.options.trace() {
            self.console.error(format!("{:#?}", err));
            let mut source = err.source();
            while let Some(cause) = source {
                self.console.error(format!("caused by: {}", cause));
                source = cause.source();
            }
        } else {
            if let Some(task) = err.failed_task() {
                self.console.error(format!("(in task '{}')", task));
            }
            self.console
                .error("(See full trace by running task with --trace)");
        }
    }
}

impl OptionEffects for ScriptEngine {
    fn apply_exec(&mut self, exec: &ExecutionContext) {
        self.set_exec(exec.clone());
    }

    fn add_library_path(&mut self, dir: &str) {
        ScriptEngine::add_library_path(self, dir);
    }

    fn require(&mut self, file: &str) -> Result<()> {
        ScriptEngine::require(self, file)
    }
}
