//! Branch maps: one unit of work per (category, variable).

use serde::{Deserialize, Serialize};

/// Nesting order of a branch map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOrder {
    /// Categories outer, variables inner.
    CategoryMajor,
    /// Variables outer, categories inner.
    #[default]
    VariableMajor,
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Position in the branch map
    pub index: usize,
    /// Category name
    pub category: String,
    /// Variable name
    pub variable: String,
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} cat={} var={}", self.index, self.category, self.variable)
    }
}

fn sorted_unique(names: &[String]) -> Vec<&str> {
    let mut v: Vec<&str> = names.iter().map(String::as_str).collect();
    v.sort_unstable();
    v.dedup();
    v
}

/// Cartesian product of the sorted category and variable names.
pub fn create_branch_map(
    categories: &[String],
    variables: &[String],
    order: BranchOrder,
) -> Vec<Branch> {
    let cats = sorted_unique(categories);
    let vars = sorted_unique(variables);
    let pairs: Vec<(&str, &str)> = match order {
        BranchOrder::CategoryMajor => {
            cats.iter().flat_map(|c| vars.iter().map(move |v| (*c, *v))).collect()
        }
        BranchOrder::VariableMajor => {
            vars.iter().flat_map(|v| cats.iter().map(move |c| (*c, *v))).collect()
        }
    };
    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (c, v))| Branch { index, category: c.to_string(), variable: v.to_string() })
        .collect()
}
