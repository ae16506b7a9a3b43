use rhai::module_resolvers::{FileModuleResolver, ModuleResolversCollection};
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, FuncArgs, Scope, AST};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::bindings;
use super::runtime::{runtime_from_engine, AstScope, RuntimeHandle};
use crate::error::{RakeError, Result};
use crate::import::{self, ImportsRef};
use crate::logger::*;
use crate::options::ExecutionContext;
use crate::printer::Narrator;
use crate::task::{self, ActionContext, RegistryRef};

/// A script closure together with the AST that defines it.
#[derive(Clone)]
pub struct ScriptFn {
    func: FnPtr,
    ast: Arc<AST>,
}

impl ScriptFn {
    pub fn new(func: FnPtr, ast: Arc<AST>) -> Self {
        Self { func, ast }
    }

    pub fn name(&self) -> &str {
        self.func.fn_name()
    }

    pub fn call(&self, engine: &Engine, args: impl FuncArgs) -> Result<Dynamic, Box<EvalAltResult>> {
        let _scope = AstScope::enter(engine, &self.ast);
        self.func.call::<Dynamic>(engine, &self.ast, args)
    }
}

/// Compiles and runs a build script with `engine`, letting it register tasks,
/// loaders and imports.
pub fn load_script(engine: &Engine, path: &Path) -> Result<()> {
    let runtime = runtime_from_engine(engine)?;
    let script_error = |source| RakeError::Script {
        file: path.display().to_string(),
        source,
    };

    debug!("load_script({})", path.display());
    let ast = Arc::new(engine.compile_file(path.to_path_buf()).map_err(script_error)?);
    trace!("load_script: AST compiled successfully");

    let mut scope = Scope::new();
    if let Some(classic) = &runtime.exec_snapshot().classic {
        for (name, value) in classic.constants() {
            scope.push_constant(name, value);
        }
    }

    let _scope = AstScope::enter(engine, &ast);
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(script_error)?;
    trace!("load_script: AST executed successfully");
    Ok(())
}

pub struct ScriptEngine {
    pub engine: Engine,
    runtime: RuntimeHandle,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        let runtime = RuntimeHandle::new();

        engine.set_max_expr_depths(256, 128);

        bindings::register_all(&mut engine, runtime.clone());

        Self { engine, runtime }
    }

    pub fn registry(&self) -> RegistryRef {
        self.runtime.registry.clone()
    }

    pub fn imports(&self) -> ImportsRef {
        self.runtime.imports.clone()
    }

    pub fn exec(&self) -> ExecutionContext {
        self.runtime.exec_snapshot()
    }

    pub fn set_exec(&self, exec: ExecutionContext) {
        *self.runtime.exec.lock().unwrap() = exec;
    }

    /// Sends trace and dry-run narration to `narrator`.
    pub fn set_narrator(&self, narrator: Narrator) {
        *self.runtime.narrator.lock().unwrap() = narrator;
    }

    pub fn run_script(&self, path: &Path) -> Result<()> {
        load_script(&self.engine, path)
    }

    pub fn library_paths(&self) -> Vec<PathBuf> {
        self.runtime.load_path.lock().unwrap().clone()
    }

    /// Adds `dir` to the places `import` statements and `--require` look in.
    pub fn add_library_path(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        debug!("add_library_path({})", dir.display());
        let paths = {
            let mut load_path = self.runtime.load_path.lock().unwrap();
            load_path.push(dir);
            load_path.clone()
        };

        let mut resolvers = ModuleResolversCollection::new();
        resolvers.push(FileModuleResolver::new());
        for path in paths {
            resolvers.push(FileModuleResolver::new_with_path(path));
        }
        self.engine.set_module_resolver(resolvers);
    }

    /// Loads a build script right away. Each resolved file is loaded once.
    pub fn require(&self, name: &str) -> Result<()> {
        let path = self
            .resolve_required(name)
            .ok_or_else(|| RakeError::RequiredFileNotFound(name.to_string()))?;
        let key = path.display().to_string();
        {
            let mut imports = self.runtime.imports.lock().unwrap();
            if imports.is_imported(&key) {
                trace!("require: '{}' already loaded", key);
                return Ok(());
            }
            imports.mark_imported(&key);
        }
        info!("require: loading {}", key);
        load_script(&self.engine, &path)
    }

    fn resolve_required(&self, name: &str) -> Option<PathBuf> {
        let mut roots = vec![env::current_dir().unwrap_or_default()];
        roots.extend(self.library_paths());

        let file_names = [name.to_string(), format!("{}.rhai", name)];
        roots.iter().find_map(|root| {
            file_names
                .iter()
                .map(|file| root.join(file))
                .find(|candidate| candidate.is_file())
        })
    }

    pub fn invoke(&self, name: &str) -> Result<()> {
        let exec = self.exec();
        task::invoke(&self.runtime.registry, name, &self.action_context(&exec))
    }

    pub fn drain_imports(&self) -> Result<()> {
        let exec = self.exec();
        import::drain_imports(
            &self.runtime.imports,
            &self.runtime.registry,
            &self.action_context(&exec),
        )
    }

    fn action_context<'a>(&'a self, exec: &'a ExecutionContext) -> ActionContext<'a> {
        ActionContext::new(&self.engine, exec).with_narrator(self.runtime.narrator())
    }
}
