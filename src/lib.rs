//! `rhake`: a make-like build tool whose build files are Rhai scripts.
//!
//! The [`Application`] drives a run: it parses the command line, locates
//! the rakefile, evaluates it, loads queued imports and then invokes the
//! requested tasks with their prerequisites.

pub mod app;
pub mod cli;
pub mod engine;
pub mod error;
pub mod import;
pub mod locator;
pub mod logger;
pub mod options;
pub mod printer;
pub mod task;

pub use app::Application;
pub use error::{RakeError, Result};
pub use options::{ExecutionContext, Options};

/// Runs the tool against the process arguments and returns the exit status.
pub fn run() -> i32 {
    Application::new().run(std::env::args_os())
}
