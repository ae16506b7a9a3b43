mod action;
mod registry;
mod task;

pub use action::{Action, ActionContext, NativeAction};
pub use registry::{Invocation, TaskRegistry};
pub use task::Task;
