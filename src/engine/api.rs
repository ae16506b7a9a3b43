use rhai::{
    plugin::*, Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map,
    NativeCallContext,
};
use rhai_process::PipelineExecutor;
use std::io::{self, Write};

use super::core::ScriptFn;
use super::runtime::{runtime_from_ctx, script_error, RuntimeHandle};
use crate::error::RakeError;
use crate::import::{self, Loader};
use crate::logger::trace;
use crate::task::{self, Action, ActionContext};

pub fn register(engine: &mut Engine) {
    engine.register_global_module(exported_module!(rhake_api).into());
}

#[export_module]
pub mod rhake_api {
    use super::*;

    #[rhai_fn(global, name = "desc", return_raw)]
    pub fn desc(ctx: NativeCallContext, text: &str) -> Result<(), Box<EvalAltResult>> {
        let runtime = runtime_from_ctx(&ctx)?;
        runtime.registry.lock().unwrap().set_pending_comment(text);
        Ok(())
    }

    #[rhai_fn(global, name = "task", return_raw)]
    pub fn task_plain(ctx: NativeCallContext, name: &str) -> Result<(), Box<EvalAltResult>> {
        define_task(&ctx, name, Array::new(), None)
    }

    #[rhai_fn(global, name = "task", return_raw)]
    pub fn task_with_prereqs(
        ctx: NativeCallContext,
        name: &str,
        prereqs: Array,
    ) -> Result<(), Box<EvalAltResult>> {
        define_task(&ctx, name, prereqs, None)
    }

    #[rhai_fn(global, name = "task", return_raw)]
    pub fn task_with_action(
        ctx: NativeCallContext,
        name: &str,
        action: FnPtr,
    ) -> Result<(), Box<EvalAltResult>> {
        define_task(&ctx, name, Array::new(), Some(action))
    }

    #[rhai_fn(global, name = "task", return_raw)]
    pub fn task_full(
        ctx: NativeCallContext,
        name: &str,
        prereqs: Array,
        action: FnPtr,
    ) -> Result<(), Box<EvalAltResult>> {
        define_task(&ctx, name, prereqs, Some(action))
    }

    #[rhai_fn(global, name = "add_import", return_raw)]
    pub fn add_import(ctx: NativeCallContext, file: &str) -> Result<(), Box<EvalAltResult>> {
        let runtime = runtime_from_ctx(&ctx)?;
        runtime.imports.lock().unwrap().add_import(file);
        Ok(())
    }

    #[rhai_fn(global, name = "load", return_raw)]
    pub fn load_file(ctx: NativeCallContext, file: &str) -> Result<(), Box<EvalAltResult>> {
        let runtime = runtime_from_ctx(&ctx)?;
        import::load_file(&runtime.imports, ctx.engine(), file).map_err(script_error)
    }

    #[rhai_fn(global, name = "add_loader", return_raw)]
    pub fn add_loader(
        ctx: NativeCallContext,
        extension: &str,
        loader: FnPtr,
    ) -> Result<(), Box<EvalAltResult>> {
        let runtime = runtime_from_ctx(&ctx)?;
        let script = bind_closure(&runtime, loader)?;
        runtime
            .imports
            .lock()
            .unwrap()
            .register_loader(extension, Loader::Script(script));
        Ok(())
    }

    #[rhai_fn(global, name = "invoke", return_raw)]
    pub fn invoke_task(ctx: NativeCallContext, name: &str) -> Result<(), Box<EvalAltResult>> {
        let runtime = runtime_from_ctx(&ctx)?;
        let exec = runtime.exec_snapshot();
        trace!("invoke from script: '{}'", name);
        task::invoke(
            &runtime.registry,
            name,
            &ActionContext::new(ctx.engine(), &exec).with_narrator(runtime.narrator()),
        )
        .map_err(script_error)
    }

    #[rhai_fn(global, name = "verbose", return_raw)]
    pub fn verbose(ctx: NativeCallContext) -> Result<bool, Box<EvalAltResult>> {
        Ok(runtime_from_ctx(&ctx)?.exec_snapshot().verbose)
    }

    #[rhai_fn(global, name = "nowrite", return_raw)]
    pub fn nowrite(ctx: NativeCallContext) -> Result<bool, Box<EvalAltResult>> {
        Ok(runtime_from_ctx(&ctx)?.exec_snapshot().nowrite)
    }

    /// Reads an environment variable, `()` when unset. `KEY=VALUE` command
    /// line arguments land here.
    #[rhai_fn(global, name = "env")]
    pub fn env_var(name: &str) -> Dynamic {
        std::env::var(name).map(Dynamic::from).unwrap_or(Dynamic::UNIT)
    }

    #[rhai_fn(global, name = "exec", return_raw)]
    pub fn exec_executor(
        ctx: NativeCallContext,
        executor: PipelineExecutor,
    ) -> Result<Map, Box<EvalAltResult>> {
        let runtime = runtime_from_ctx(&ctx)?;
        if runtime.exec_snapshot().nowrite {
            runtime.narrator().line("exec skipped (no-write mode)");
            return Ok(Map::new());
        }
        let result = executor.run()?;
        forward_streams(&result);
        Ok(result)
    }
}

fn define_task(
    ctx: &NativeCallContext,
    name: &str,
    prereqs: Array,
    action: Option<FnPtr>,
) -> Result<(), Box<EvalAltResult>> {
    let runtime = runtime_from_ctx(ctx)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(script_error(RakeError::InvalidTaskName));
    }
    let prereqs: Vec<String> = prereqs.into_iter().map(dynamic_to_name).collect();
    let action = match action {
        Some(func) => Some(Action::Script(bind_closure(&runtime, func)?)),
        None => None,
    };

    trace!("define_task: '{}' prereqs={:?}", name, prereqs);
    runtime
        .registry
        .lock()
        .unwrap()
        .define(name)
        .enhance(prereqs, action);
    Ok(())
}

fn bind_closure(runtime: &RuntimeHandle, func: FnPtr) -> Result<ScriptFn, Box<EvalAltResult>> {
    runtime
        .current_ast()
        .map(|ast| ScriptFn::new(func, ast))
        .ok_or_else(|| script_error(RakeError::NoActiveScript))
}

fn dynamic_to_name(value: Dynamic) -> String {
    if let Some(s) = value.clone().try_cast::<ImmutableString>() {
        s.into()
    } else {
        value.to_string()
    }
}

fn forward_streams(result: &Map) {
    if let Some(stdout) = extract_string(result, "stdout") {
        if !stdout.is_empty() {
            print!("{}", stdout);
            let _ = io::stdout().flush();
        }
    }
    if let Some(stderr) = extract_string(result, "stderr") {
        if !stderr.is_empty() {
            eprint!("{}", stderr);
            let _ = io::stderr().flush();
        }
    }
}

fn extract_string(map: &Map, key: &str) -> Option<String> {
    map.get(key)
        .and_then(|value| value.clone().try_cast::<ImmutableString>().map(Into::into))
}
