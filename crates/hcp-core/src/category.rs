//! Analysis categories (regions) and their leaf decomposition.

use serde::{Deserialize, Serialize};

/// A named analysis region.
///
/// A category may be split into sub-categories; histograms are filled with
/// the ids of the leaf categories an event falls into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Integer identifier used on the `category` histogram axis.
    pub id: i64,
    /// Unique name.
    pub name: String,
    /// Event-level selection expression. `None` accepts every event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Sub-categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

impl Category {
    /// Create a category without selection.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), selection: None, label: None, categories: Vec::new() }
    }

    /// Set the selection expression.
    pub fn selection(mut self, expr: impl Into<String>) -> Self {
        self.selection = Some(expr.into());
        self
    }

    /// Set the display label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a sub-category.
    pub fn add_category(mut self, child: Category) -> Self {
        self.categories.push(child);
        self
    }

    /// Label for display, falling back to the name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// `true` when the category has no sub-categories.
    pub fn is_leaf(&self) -> bool {
        self.categories.is_empty()
    }

    /// Deep leaf categories. Empty when `self` is a leaf.
    pub fn leaf_categories(&self) -> Vec<&Category> {
        let mut out = Vec::new();
        for child in &self.categories {
            child.collect_leaves(&mut out);
        }
        out
    }

    /// Leaf categories, or `[self]` when `self` is a leaf.
    pub fn leaf_categories_or_self(&self) -> Vec<&Category> {
        let leaves = self.leaf_categories();
        if leaves.is_empty() { vec![self] } else { leaves }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Category>) {
        if self.is_leaf() {
            out.push(self);
            return;
        }
        for child in &self.categories {
            child.collect_leaves(out);
        }
    }

    /// Depth-first walk including `self`.
    pub fn walk_categories(&self) -> Vec<&Category> {
        let mut out = vec![self];
        for child in &self.categories {
            out.extend(child.walk_categories());
        }
        out
    }

    /// Chain of categories from `self` down to the descendant `name`
    /// (inclusive on both ends). `None` when `name` is not in the subtree.
    pub fn path_to(&self, name: &str) -> Option<Vec<&Category>> {
        if self.name == name {
            return Some(vec![self]);
        }
        for child in &self.categories {
            if let Some(mut tail) = child.path_to(name) {
                tail.insert(0, self);
                return Some(tail);
            }
        }
        None
    }
}
