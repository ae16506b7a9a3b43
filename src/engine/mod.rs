mod api;
mod bindings;
mod core;
mod runtime;

pub use self::core::{load_script, ScriptEngine, ScriptFn};
