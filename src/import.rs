use rhai::Engine;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::engine::{self, ScriptFn};
use crate::error::{ActionError, RakeError, Result};
use crate::logger::{debug, trace};
use crate::task::{invoke, ActionContext, RegistryRef};

/// Extensions evaluated as build scripts without any registration.
pub const BUILTIN_EXTENSIONS: [&str; 2] = ["rhai", "rake"];

pub type NativeLoader = Arc<dyn Fn(&Engine, &str) -> Result<(), ActionError>>;

#[derive(Clone)]
pub enum Loader {
    /// Evaluates the file with the build-script engine.
    BuildScript,
    /// Closure registered by a build script; receives the filename.
    Script(ScriptFn),
    Native(NativeLoader),
}

impl Loader {
    pub fn native<F>(func: F) -> Self
    where
        F: Fn(&Engine, &str) -> Result<(), ActionError> + 'static,
    {
        Self::Native(Arc::new(func))
    }

    pub fn load(&self, engine: &Engine, file: &str) -> Result<()> {
        match self {
            Self::BuildScript => engine::load_script(engine, Path::new(file)),
            Self::Script(func) => func
                .call(engine, (file.to_string(),))
                .map(|_| ())
                .map_err(|source| RakeError::LoadFailure {
                    file: file.to_string(),
                    source,
                }),
            Self::Native(func) => func(engine, file).map_err(|source| RakeError::LoadFailure {
                file: file.to_string(),
                source,
            }),
        }
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildScript => f.write_str("Loader::BuildScript"),
            Self::Script(func) => write!(f, "Loader::Script({})", func.name()),
            Self::Native(_) => f.write_str("Loader::Native"),
        }
    }
}

/// Loaders keyed by extension plus the FIFO of imports waiting to load.
#[derive(Debug, Default)]
pub struct ImportQueue {
    loaders: HashMap<String, Loader>,
    pending: VecDeque<String>,
    imported: HashSet<String>,
}

pub type ImportsRef = Arc<Mutex<ImportQueue>>;

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_loaders() -> Self {
        let mut queue = Self::new();
        for ext in BUILTIN_EXTENSIONS {
            queue.register_loader(ext, Loader::BuildScript);
        }
        queue
    }

    /// Associates `extension` (with or without a leading dot) with `loader`,
    /// replacing any previous loader for it.
    pub fn register_loader(&mut self, extension: &str, loader: Loader) {
        let ext = extension.trim_start_matches('.').to_string();
        debug!("register_loader: '{}' -> {:?}", ext, loader);
        self.loaders.insert(ext, loader);
    }

    pub fn add_import(&mut self, file: impl Into<String>) {
        let file = file.into();
        trace!("add_import: '{}'", file);
        self.pending.push_back(file);
    }

    pub fn next_pending(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn is_imported(&self, file: &str) -> bool {
        self.imported.contains(file)
    }

    pub fn mark_imported(&mut self, file: &str) {
        self.imported.insert(file.to_string());
    }

    pub fn loader_for(&self, file: &str) -> Result<Loader> {
        let extension = Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        self.loaders
            .get(extension)
            .cloned()
            .ok_or_else(|| RakeError::UnknownImportLoader {
                file: file.to_string(),
                extension: extension.to_string(),
            })
    }
}

/// Loads `file` now through the loader matching its suffix.
pub fn load_file(imports: &ImportsRef, engine: &Engine, file: &str) -> Result<()> {
    let loader = {
        let mut queue = imports.lock().unwrap();
        let loader = queue.loader_for(file)?;
        queue.mark_imported(file);
        loader
    };
    debug!("load_file: '{}' via {:?}", file, loader);
    loader.load(engine, file)
}

/// Loads every queued import in FIFO order. A task named after the file runs
/// first, so generated files can be rebuilt before they load; the loader is
/// only called afterwards if that task did not load the file itself.
pub fn drain_imports(imports: &ImportsRef, registry: &RegistryRef, ctx: &ActionContext<'_>) -> Result<()> {
    loop {
        let next = imports.lock().unwrap().next_pending();
        let Some(file) = next else {
            break;
        };
        if imports.lock().unwrap().is_imported(&file) {
            trace!("drain_imports: '{}' already imported", file);
            continue;
        }

        let has_task = registry.lock().unwrap().contains(&file);
        if has_task {
            debug!("drain_imports: building '{}' through its task", file);
            invoke(registry, &file, ctx)?;
        }

        let loaded = imports.lock().unwrap().is_imported(&file);
        if !loaded {
            load_file(imports, ctx.engine, &file)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExecutionContext;
    use crate::task::{Action, TaskRegistry};

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording_loader(log: &Log) -> Loader {
        let log = log.clone();
        Loader::native(move |_, file| {
            log.lock().unwrap().push(format!("load {}", file));
            Ok(())
        })
    }

    fn setup() -> (ImportsRef, RegistryRef, Log) {
        (
            Arc::new(Mutex::new(ImportQueue::new())),
            Arc::new(Mutex::new(TaskRegistry::new())),
            Arc::default(),
        )
    }

    fn drain(imports: &ImportsRef, registry: &RegistryRef) -> Result<()> {
        let engine = Engine::new();
        let exec = ExecutionContext::default();
        drain_imports(imports, registry, &ActionContext::new(&engine, &exec))
    }

    #[test]
    fn loads_queued_imports_once() {
        let (imports, registry, log) = setup();
        {
            let mut queue = imports.lock().unwrap();
            queue.register_loader("dummy", recording_loader(&log));
            queue.add_import("x.dummy");
            queue.add_import("x.dummy");
        }

        drain(&imports, &registry).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["load x.dummy"]);
        assert_eq!(imports.lock().unwrap().next_pending(), None);
    }

    #[test]
    fn imports_load_in_fifo_order() {
        let (imports, registry, log) = setup();
        {
            let mut queue = imports.lock().unwrap();
            queue.register_loader(".dummy", recording_loader(&log));
            queue.add_import("b.dummy");
            queue.add_import("a.dummy");
        }

        drain(&imports, &registry).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["load b.dummy", "load a.dummy"]);
    }

    #[test]
    fn builds_imported_file_on_demand_before_loading() {
        let (imports, registry, log) = setup();
        let make_log = log.clone();
        registry
            .lock()
            .unwrap()
            .intern("x.dummy")
            .add_action(Action::native(move |_| {
                make_log.lock().unwrap().push("make x.dummy".to_string());
                Ok(())
            }));
        {
            let mut queue = imports.lock().unwrap();
            queue.register_loader("dummy", recording_loader(&log));
            queue.add_import("x.dummy");
        }

        drain(&imports, &registry).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["make x.dummy", "load x.dummy"]);
    }

    #[test]
    fn task_that_loads_file_suppresses_fallback() {
        let (imports, registry, log) = setup();
        let task_imports = imports.clone();
        registry
            .lock()
            .unwrap()
            .intern("gen.dummy")
            .add_action(Action::native(move |ctx| {
                load_file(&task_imports, ctx.engine, "gen.dummy")?;
                Ok(())
            }));
        {
            let mut queue = imports.lock().unwrap();
            queue.register_loader("dummy", recording_loader(&log));
            queue.add_import("gen.dummy");
        }

        drain(&imports, &registry).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["load gen.dummy"]);
    }

    #[test]
    fn unknown_extension_is_fatal() {
        let (imports, registry, _) = setup();
        imports.lock().unwrap().add_import("notes.txt");

        let err = drain(&imports, &registry).unwrap_err();
        match err {
            RakeError::UnknownImportLoader { file, extension } => {
                assert_eq!(file, "notes.txt");
                assert_eq!(extension, "txt");
            }
            other => panic!("expected UnknownImportLoader, got {:?}", other),
        }
    }

    #[test]
    fn builtin_loaders_cover_script_extensions() {
        let queue = ImportQueue::with_builtin_loaders();
        assert!(matches!(queue.loader_for("tasks.rake"), Ok(Loader::BuildScript)));
        assert!(matches!(queue.loader_for("tasks.rhai"), Ok(Loader::BuildScript)));
        assert!(queue.loader_for("tasks").is_err());
    }

    #[test]
    fn loader_failure_names_the_file() {
        let (imports, registry, _) = setup();
        {
            let mut queue = imports.lock().unwrap();
            queue.register_loader("dummy", Loader::native(|_, _| Err("corrupt".into())));
            queue.add_import("x.dummy");
        }

        let err = drain(&imports, &registry).unwrap_err();
        assert_eq!(err.to_string(), "failed to load 'x.dummy': corrupt");
    }
}
