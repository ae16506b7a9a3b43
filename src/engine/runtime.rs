use rhai::{Engine, EvalAltResult, NativeCallContext, Position, AST};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{RakeError, Result};
use crate::import::{ImportQueue, ImportsRef};
use crate::options::ExecutionContext;
use crate::printer::Narrator;
use crate::task::{RegistryRef, TaskRegistry};

/// State shared between the driver and the native functions scripts call.
/// Stored as the engine's default tag.
#[derive(Clone)]
pub(crate) struct RuntimeHandle {
    pub(crate) registry: RegistryRef,
    pub(crate) imports: ImportsRef,
    pub(crate) exec: Arc<Mutex<ExecutionContext>>,
    pub(crate) load_path: Arc<Mutex<Vec<PathBuf>>>,
    pub(crate) narrator: Arc<Mutex<Narrator>>,
    current_ast: Arc<Mutex<Option<Arc<AST>>>>,
}

impl RuntimeHandle {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(TaskRegistry::new())),
            imports: Arc::new(Mutex::new(ImportQueue::with_builtin_loaders())),
            exec: Arc::new(Mutex::new(ExecutionContext::default())),
            load_path: Arc::new(Mutex::new(Vec::new())),
            narrator: Arc::new(Mutex::new(Narrator::stderr())),
            current_ast: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn exec_snapshot(&self) -> ExecutionContext {
        self.exec.lock().unwrap().clone()
    }

    pub(crate) fn narrator(&self) -> Narrator {
        self.narrator.lock().unwrap().clone()
    }

    pub(crate) fn current_ast(&self) -> Option<Arc<AST>> {
        self.current_ast.lock().unwrap().clone()
    }
}

pub(crate) fn runtime_from_engine(engine: &Engine) -> Result<RuntimeHandle> {
    engine
        .default_tag()
        .read_lock::<RuntimeHandle>()
        .map(|handle| handle.clone())
        .ok_or(RakeError::MissingRuntime)
}

pub(crate) fn runtime_from_ctx(
    ctx: &NativeCallContext,
) -> Result<RuntimeHandle, Box<EvalAltResult>> {
    ctx.tag()
        .and_then(|tag| tag.read_lock::<RuntimeHandle>())
        .map(|handle| handle.clone())
        .ok_or_else(|| script_error(RakeError::MissingRuntime))
}

pub(crate) fn script_error(err: RakeError) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(err.to_string().into(), Position::NONE).into()
}

/// Makes `ast` the one closures declared by scripts are bound to, until
/// dropped. A no-op on engines without a runtime.
pub(crate) struct AstScope {
    slot: Option<Arc<Mutex<Option<Arc<AST>>>>>,
    previous: Option<Arc<AST>>,
}

impl AstScope {
    pub(crate) fn enter(engine: &Engine, ast: &Arc<AST>) -> Self {
        match runtime_from_engine(engine) {
            Ok(runtime) => {
                let previous = runtime.current_ast.lock().unwrap().replace(ast.clone());
                Self {
                    slot: Some(runtime.current_ast),
                    previous,
                }
            }
            Err(_) => Self {
                slot: None,
                previous: None,
            },
        }
    }
}

impl Drop for AstScope {
    fn drop(&mut self) {
        if let Some(slot) = &self.slot {
            if let Ok(mut guard) = slot.lock() {
                *guard = self.previous.take();
            }
        }
    }
}
