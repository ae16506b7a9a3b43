use indexmap::IndexMap;

use super::action::Action;
use super::task::Task;
use crate::logger::trace;
use crate::options::TaskPattern;

/// Outcome of the checked-then-set step that starts an invocation.
#[derive(Debug)]
pub enum Invocation {
    FirstTime {
        prerequisites: Vec<String>,
        actions: Vec<Action>,
    },
    AlreadyInvoked,
    Missing,
}

/// Task graph keyed by name, kept in declaration order.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: IndexMap<String, Task>,
    pending_comment: Option<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pending_comment(&mut self, comment: impl Into<String>) {
        self.pending_comment = Some(comment.into());
    }

    pub fn take_pending_comment(&mut self) -> Option<String> {
        self.pending_comment.take()
    }

    pub fn pending_comment(&self) -> Option<&str> {
        self.pending_comment.as_deref()
    }

    /// Returns the task called `name`, creating it with the pending comment
    /// when it does not exist yet.
    pub fn intern(&mut self, name: &str) -> &mut Task {
        let pending = &mut self.pending_comment;
        self.tasks.entry(name.to_string()).or_insert_with(|| {
            let comment = pending.take();
            trace!("intern: creating task '{}' (comment={:?})", name, comment);
            Task::new(name, comment)
        })
    }

    /// Declares `name` from a build script. Always consumes the pending
    /// comment, attaching it only if the task had none.
    pub fn define(&mut self, name: &str) -> &mut Task {
        let comment = self.pending_comment.take();
        let task = self.intern(name);
        task.add_comment(comment);
        task
    }

    pub fn lookup(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Interns `name` and appends prerequisites plus an optional action.
    pub fn enhance<I, S>(&mut self, name: &str, prereqs: I, action: Option<Action>) -> &mut Task
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intern(name).enhance(prereqs, action)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks whose name matches `pattern`, in declaration order. `None`
    /// matches everything.
    pub fn tasks_matching(&self, pattern: Option<&TaskPattern>) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|task| pattern.map_or(true, |p| p.is_match(&task.name)))
            .collect()
    }

    pub fn begin_invocation(&mut self, name: &str) -> Invocation {
        match self.tasks.get_mut(name) {
            None => Invocation::Missing,
            Some(task) if task.invoked => Invocation::AlreadyInvoked,
            Some(task) => {
                task.invoked = true;
                Invocation::FirstTime {
                    prerequisites: task.prerequisites.clone(),
                    actions: task.actions.clone(),
                }
            }
        }
    }
}
