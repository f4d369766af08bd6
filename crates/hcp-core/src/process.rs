//! Physics processes and their sub-process trees.

use serde::{Deserialize, Serialize};

/// A physics process (observed data stream or simulated sample).
///
/// Processes form a tree: a process may be decomposed into sub-processes
/// (e.g. `tt` into `tt_sl`, `tt_dl`, `tt_fh`). Histograms refer to processes
/// by [`Process::id`] only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Unique integer identifier used on the `process` histogram axis.
    pub id: i64,
    /// Unique name.
    pub name: String,
    /// `true` for observed data, `false` for simulation.
    #[serde(default)]
    pub is_data: bool,
    /// Display label for plots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Display color (`#rrggbb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Truth-level expression identifying events of this process inside a
    /// dataset that contains several sub-processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    /// Sub-processes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<Process>,
}

impl Process {
    /// Create a leaf process.
    pub fn new(id: i64, name: impl Into<String>, is_data: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_data,
            label: None,
            color: None,
            selection: None,
            processes: Vec::new(),
        }
    }

    /// Set the display label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the display color.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the truth-level selection expression.
    pub fn selection(mut self, expr: impl Into<String>) -> Self {
        self.selection = Some(expr.into());
        self
    }

    /// Add a sub-process.
    pub fn add_process(mut self, child: Process) -> Self {
        self.processes.push(child);
        self
    }

    /// Label for display, falling back to the name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// `true` when the process has no sub-processes.
    pub fn is_leaf(&self) -> bool {
        self.processes.is_empty()
    }

    /// Depth-first walk over the process tree.
    pub fn walk_processes(&self, include_self: bool) -> Vec<&Process> {
        let mut out = Vec::new();
        if include_self {
            out.push(self);
        }
        for child in &self.processes {
            child.collect_into(&mut out);
        }
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Process>) {
        out.push(self);
        for child in &self.processes {
            child.collect_into(out);
        }
    }

    /// Leaf processes of the subtree (the process itself when it is a leaf).
    pub fn leaf_processes(&self) -> Vec<&Process> {
        self.walk_processes(true).into_iter().filter(|p| p.is_leaf()).collect()
    }

    /// `true` if `other` is this process or one of its (deep) sub-processes.
    pub fn has_process(&self, other: &Process) -> bool {
        self.walk_processes(true).iter().any(|p| p.id == other.id)
    }

    /// Look up a process by name in this subtree.
    pub fn find(&self, name: &str) -> Option<&Process> {
        self.walk_processes(true).into_iter().find(|p| p.name == name)
    }

    /// Look up a process by id in this subtree.
    pub fn find_id(&self, id: i64) -> Option<&Process> {
        self.walk_processes(true).into_iter().find(|p| p.id == id)
    }
}
