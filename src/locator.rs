use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RakeError, Result};
use crate::logger::{debug, trace};

/// Where the rakefile was found. `file` is empty when none was required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub file: String,
    pub dir: PathBuf,
}

impl Located {
    pub fn path(&self) -> Option<PathBuf> {
        if self.file.is_empty() {
            None
        } else {
            Some(self.dir.join(&self.file))
        }
    }
}

/// Walks from `start_dir` towards the filesystem root looking for one of
/// `candidates`. Never changes the working directory; that is up to the
/// caller.
pub fn locate(
    start_dir: &Path,
    candidates: &[String],
    allow_empty: bool,
    search_parents: bool,
) -> Result<Located> {
    if allow_empty {
        debug!("locate: empty rakefile name accepted, skipping search");
        return Ok(Located {
            file: String::new(),
            dir: start_dir.to_path_buf(),
        });
    }

    let mut dir = start_dir.to_path_buf();
    loop {
        trace!("locate: checking {}", dir.display());
        if let Some(file) = find_in_dir(&dir, candidates) {
            debug!("locate: found '{}' in {}", file, dir.display());
            return Ok(Located { file, dir });
        }
        if !search_parents || !dir.pop() {
            break;
        }
    }

    Err(RakeError::RakefileNotFound {
        candidates: candidates.to_vec(),
    })
}

/// Exact-case matches win; otherwise the first directory entry equal to a
/// candidate ignoring case.
fn find_in_dir(dir: &Path, candidates: &[String]) -> Option<String> {
    let candidates: Vec<&String> = candidates.iter().filter(|c| !c.is_empty()).collect();

    if let Some(exact) = candidates.iter().find(|c| dir.join(c.as_str()).is_file()) {
        return Some(exact.to_string());
    }

    let mut entries: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    entries.sort();

    candidates.iter().find_map(|candidate| {
        entries
            .iter()
            .find(|entry| entry.eq_ignore_ascii_case(candidate))
            .cloned()
    })
}
