use std::collections::HashSet;

use super::model::TaskRegistry;
use crate::options::TaskPattern;

/// One row of the `--tasks` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub name: String,
    pub comment: Option<String>,
}

/// One row of the `--prereqs` tree. Depth 0 is the requested task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub name: String,
}

impl TaskRegistry {
    pub fn list_items(&self, pattern: Option<&TaskPattern>) -> Vec<ListItem> {
        self.tasks_matching(pattern)
            .into_iter()
            .map(|task| ListItem {
                name: task.name.clone(),
                comment: task.comment.clone(),
            })
            .collect()
    }

    /// Read-only walk of the prerequisites below `root`. A task already on
    /// the current path is printed but not descended into again.
    pub fn prerequisite_tree(&self, root: &str) -> Vec<TreeLine> {
        let mut lines = Vec::new();
        let mut rendering = HashSet::new();
        self.collect_tree(root, 0, &mut rendering, &mut lines);
        lines
    }

    fn collect_tree(
        &self,
        name: &str,
        depth: usize,
        rendering: &mut HashSet<String>,
        lines: &mut Vec<TreeLine>,
    ) {
        lines.push(TreeLine {
            depth,
            name: name.to_string(),
        });
        if rendering.contains(name) {
            return;
        }
        let Some(task) = self.lookup(name) else {
            return;
        };
        rendering.insert(name.to_string());
        for prereq in &task.prerequisites {
            self.collect_tree(prereq, depth + 1, rendering, lines);
        }
        rendering.remove(name);
    }
}
