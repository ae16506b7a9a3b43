use regex::Regex;
use std::fmt;

/// Filenames searched for when no `--rakefile` is given.
pub const DEFAULT_RAKEFILES: [&str; 4] = ["rakefile", "Rakefile", "rakefile.rhai", "Rakefile.rhai"];

/// Directory scanned for `*.rake` files when no `--rakelibdir` is given.
pub const DEFAULT_RAKELIB: &str = "rakelib";

/// Parsed command-line configuration.
///
/// Flags stay `None` until the command line mentions them, so callers can
/// tell "not requested" apart from an explicit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub show_task_pattern: Option<TaskPattern>,
    pub show_tasks: Option<bool>,
    pub show_prereqs: Option<bool>,
    pub trace: Option<bool>,
    pub dryrun: Option<bool>,
    pub silent: Option<bool>,
    pub nosearch: Option<bool>,
    pub classic_namespace: Option<bool>,
    pub rakefile_candidates: Vec<String>,
    pub rakelib_dirs: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            show_task_pattern: None,
            show_tasks: None,
            show_prereqs: None,
            trace: None,
            dryrun: None,
            silent: None,
            nosearch: None,
            classic_namespace: None,
            rakefile_candidates: DEFAULT_RAKEFILES.iter().map(|s| s.to_string()).collect(),
            rakelib_dirs: vec![DEFAULT_RAKELIB.to_string()],
        }
    }
}

impl Options {
    pub fn trace(&self) -> bool {
        self.trace.unwrap_or(false)
    }

    pub fn dryrun(&self) -> bool {
        self.dryrun.unwrap_or(false)
    }

    pub fn silent(&self) -> bool {
        self.silent.unwrap_or(false)
    }

    pub fn nosearch(&self) -> bool {
        self.nosearch.unwrap_or(false)
    }

    pub fn show_tasks(&self) -> bool {
        self.show_tasks.unwrap_or(false)
    }

    pub fn show_prereqs(&self) -> bool {
        self.show_prereqs.unwrap_or(false)
    }

    /// An empty candidate means the caller does not need a rakefile at all.
    pub fn allows_missing_rakefile(&self) -> bool {
        self.rakefile_candidates.iter().any(|name| name.is_empty())
    }
}

/// Compiled `--tasks` filter. An empty pattern matches every task name.
#[derive(Clone)]
pub struct TaskPattern(Regex);

impl TaskPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

impl PartialEq for TaskPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for TaskPattern {}

impl fmt::Debug for TaskPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.as_str())
    }
}

/// Copies of selected options exposed to build scripts in classic-namespace
/// mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassicGlobals {
    pub show_tasks: Option<bool>,
    pub show_prereqs: Option<bool>,
    pub trace: Option<bool>,
    pub dryrun: Option<bool>,
    pub silent: Option<bool>,
}

impl ClassicGlobals {
    pub fn mirror(options: &Options) -> Self {
        Self {
            show_tasks: options.show_tasks,
            show_prereqs: options.show_prereqs,
            trace: options.trace,
            dryrun: options.dryrun,
            silent: options.silent,
        }
    }

    /// Script-visible constant names paired with their values.
    pub fn constants(&self) -> [(&'static str, bool); 5] {
        [
            ("SHOW_TASKS", self.show_tasks.unwrap_or(false)),
            ("SHOW_PREREQS", self.show_prereqs.unwrap_or(false)),
            ("TRACE", self.trace.unwrap_or(false)),
            ("DRYRUN", self.dryrun.unwrap_or(false)),
            ("SILENT", self.silent.unwrap_or(false)),
        ]
    }
}

/// Run-wide flags handed to every task action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub verbose: bool,
    pub nowrite: bool,
    pub trace: bool,
    pub dryrun: bool,
    pub classic: Option<ClassicGlobals>,
}

impl ExecutionContext {
    /// Pulls the option-derived execution flags in after parsing.
    pub fn sync_with(&mut self, options: &Options) {
        self.trace = options.trace();
        self.dryrun = options.dryrun();
    }
}
