mod display;
mod invoke;
mod model;

use std::sync::{Arc, Mutex};

pub use display::{ListItem, TreeLine};
pub use invoke::invoke;
pub use model::{Action, ActionContext, Invocation, NativeAction, Task, TaskRegistry};

/// Shared handle to the registry. Locks are never held while an action runs.
pub type RegistryRef = Arc<Mutex<TaskRegistry>>;
