use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use crate::task::{ListItem, TreeLine};

const RESET: &str = "\x1b[0m";
const FG_CYAN: &str = "\x1b[36m";
const FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Prefix for listing lines, mirroring how a task is invoked.
pub const PROGRAM: &str = "rhake";

fn write_line(mut target: impl Write, message: &str) {
    let _ = writeln!(target, "{}", message);
}

/// Shared error-stream sink for `** Invoke`/`** Execute` progress lines.
/// Clones write to the same target.
#[derive(Clone)]
pub struct Narrator(Arc<Mutex<Box<dyn Write>>>);

impl Narrator {
    pub fn new(target: impl Write + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(target))))
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn line(&self, message: impl AsRef<str>) {
        if let Ok(mut target) = self.0.lock() {
            write_line(&mut *target, message.as_ref());
            let _ = target.flush();
        }
    }
}

impl Default for Narrator {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Narrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Narrator")
    }
}

/// Output and error sinks used by the application.
pub struct Console {
    out: Box<dyn Write>,
    err: Narrator,
    color: bool,
}

impl Console {
    pub fn stdio() -> Self {
        Self {
            out: Box::new(io::stdout()),
            err: Narrator::stderr(),
            color: io::stdout().is_terminal(),
        }
    }

    pub fn new(out: impl Write + 'static, err: impl Write + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Narrator::new(err),
            color: false,
        }
    }

    /// Handle on the error stream for narration from task execution.
    pub fn narrator(&self) -> Narrator {
        self.err.clone()
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        write_line(&mut self.out, message.as_ref());
        let _ = self.out.flush();
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.err.line(message);
    }

    /// Emits text as-is (banners already carry their own newlines).
    pub fn raw(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        if !text.ends_with('\n') {
            let _ = self.out.write_all(b"\n");
        }
        let _ = self.out.flush();
    }

    pub fn print_task_list(&mut self, items: &[ListItem]) {
        for line in format_task_list(items, self.color) {
            self.info(line);
        }
    }

    pub fn print_tree(&mut self, lines: &[TreeLine]) {
        for line in format_tree(lines) {
            self.info(line);
        }
    }
}

pub fn format_task_list(items: &[ListItem], use_color: bool) -> Vec<String> {
    let width = items
        .iter()
        .map(|item| item.name.chars().count())
        .max()
        .unwrap_or(0);

    items
        .iter()
        .map(|item| match (&item.comment, use_color) {
            (Some(comment), false) => {
                format!("{PROGRAM} {:<width$}  # {}", item.name, comment)
            }
            (Some(comment), true) => format!(
                "{PROGRAM} {FG_CYAN}{:<width$}{RESET}  {FG_BRIGHT_BLACK}# {}{RESET}",
                item.name, comment
            ),
            (None, false) => format!("{PROGRAM} {}", item.name),
            (None, true) => format!("{PROGRAM} {FG_CYAN}{}{RESET}", item.name),
        })
        .collect()
}

pub fn format_tree(lines: &[TreeLine]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            if line.depth == 0 {
                format!("{PROGRAM} {}", line.name)
            } else {
                format!("{}{}", "    ".repeat(line.depth), line.name)
            }
        })
        .collect()
}
