use std::path::Path;

use super::model::{Action, ActionContext, Invocation};
use super::RegistryRef;
use crate::error::{RakeError, Result};
use crate::logger::{debug, trace};

/// Runs `name` after its prerequisites, at most once per registry.
///
/// The invoked flag is set before any prerequisite is visited, so a cycle
/// stops at the first task reached twice instead of recursing forever.
pub fn invoke(registry: &RegistryRef, name: &str, ctx: &ActionContext<'_>) -> Result<()> {
    let invocation = registry.lock().unwrap().begin_invocation(name);
    match invocation {
        Invocation::AlreadyInvoked => {
            if ctx.exec.trace {
                ctx.narrate(format!("** Invoke {} (already invoked)", name));
            }
            Ok(())
        }
        Invocation::Missing => {
            if Path::new(name).exists() {
                trace!("invoke: '{}' is an existing file, nothing to do", name);
                Ok(())
            } else {
                Err(RakeError::UnknownTask(name.to_string()))
            }
        }
        Invocation::FirstTime {
            prerequisites,
            actions,
        } => {
            if ctx.exec.trace {
                ctx.narrate(format!("** Invoke {} (first_time)", name));
            }
            for prereq in &prerequisites {
                invoke(registry, prereq, ctx)?;
            }
            execute(name, &actions, ctx)
        }
    }
}

fn execute(name: &str, actions: &[Action], ctx: &ActionContext<'_>) -> Result<()> {
    if ctx.exec.dryrun {
        ctx.narrate(format!("** Execute (dry run) {}", name));
        return Ok(());
    }
    if ctx.exec.trace {
        ctx.narrate(format!("** Execute {}", name));
    }
    debug!("execute '{}': {} action(s)", name, actions.len());
    for action in actions {
        action
            .run(ctx)
            .map_err(|source| RakeError::action_failure(name, source))?;
    }
    Ok(())
}
