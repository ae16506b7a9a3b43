use rhai::Engine;
use std::fmt;
use std::sync::Arc;

use crate::engine::ScriptFn;
use crate::error::ActionError;
use crate::options::ExecutionContext;
use crate::printer::Narrator;

/// Everything an action can see while it runs.
pub struct ActionContext<'a> {
    pub engine: &'a Engine,
    pub exec: &'a ExecutionContext,
    pub narrator: Narrator,
}

impl<'a> ActionContext<'a> {
    /// Narration goes to stderr until [`ActionContext::with_narrator`] says
    /// otherwise.
    pub fn new(engine: &'a Engine, exec: &'a ExecutionContext) -> Self {
        Self {
            engine,
            exec,
            narrator: Narrator::stderr(),
        }
    }

    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn narrate(&self, message: impl AsRef<str>) {
        self.narrator.line(message);
    }
}

pub type NativeAction = Arc<dyn Fn(&ActionContext<'_>) -> Result<(), ActionError>>;

/// A single step appended to a task by `enhance`.
#[derive(Clone)]
pub enum Action {
    Native(NativeAction),
    Script(ScriptFn),
}

impl Action {
    pub fn native<F>(func: F) -> Self
    where
        F: Fn(&ActionContext<'_>) -> Result<(), ActionError> + 'static,
    {
        Self::Native(Arc::new(func))
    }

    pub fn run(&self, ctx: &ActionContext<'_>) -> Result<(), ActionError> {
        match self {
            Self::Native(func) => func(ctx),
            Self::Script(script) => script.call(ctx.engine, ()).map(|_| ()).map_err(Into::into),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Action::Native"),
            Self::Script(script) => write!(f, "Action::Script({})", script.name()),
        }
    }
}
