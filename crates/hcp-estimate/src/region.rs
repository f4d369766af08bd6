//! Which categories produce estimation artifacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hcp_core::Error;

/// Control region used when nothing else is configured.
pub const DEFAULT_CONTROL_REGION: &str = "cat_c";

/// Predicate over category names.
///
/// YAML forms: `{category: cat_c}`, `{any_of: [cat_a, cat_b]}`, `all`.
/// A bare word other than `all` is read like the command-line form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegionRepr", into = "RegionRepr")]
pub enum RegionSelector {
    /// Exactly this category name.
    Category(String),
    /// Any of these names.
    AnyOf(Vec<String>),
    /// Every category.
    All,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RegionRepr {
    Word(String),
    Map(RegionMap),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegionMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    any_of: Option<Vec<String>>,
}

impl TryFrom<RegionRepr> for RegionSelector {
    type Error = Error;

    fn try_from(repr: RegionRepr) -> Result<Self, Self::Error> {
        match repr {
            RegionRepr::Word(word) => word.parse(),
            RegionRepr::Map(RegionMap { category: Some(name), any_of: None }) => {
                Ok(RegionSelector::Category(name))
            }
            RegionRepr::Map(RegionMap { category: None, any_of: Some(names) }) => {
                if names.is_empty() {
                    return Err(Error::Validation("region 'any_of' lists no categories".into()));
                }
                Ok(RegionSelector::AnyOf(names))
            }
            RegionRepr::Map(_) => Err(Error::Validation(
                "region needs exactly one of 'category' or 'any_of'".into(),
            )),
        }
    }
}

impl From<RegionSelector> for RegionRepr {
    fn from(region: RegionSelector) -> Self {
        match region {
            RegionSelector::Category(name) => {
                RegionRepr::Map(RegionMap { category: Some(name), any_of: None })
            }
            RegionSelector::AnyOf(names) => {
                RegionRepr::Map(RegionMap { category: None, any_of: Some(names) })
            }
            RegionSelector::All => RegionRepr::Word("all".into()),
        }
    }
}

impl Default for RegionSelector {
    fn default() -> Self {
        RegionSelector::Category(DEFAULT_CONTROL_REGION.to_string())
    }
}

impl RegionSelector {
    /// `true` if branches of `category` should be estimated.
    pub fn matches(&self, category: &str) -> bool {
        match self {
            RegionSelector::Category(name) => name == category,
            RegionSelector::AnyOf(names) => names.iter().any(|n| n == category),
            RegionSelector::All => true,
        }
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelector::Category(name) => write!(f, "{name}"),
            RegionSelector::AnyOf(names) => write!(f, "{}", names.join(",")),
            RegionSelector::All => write!(f, "all"),
        }
    }
}

/// `all`, a single name, or a comma-separated list of names.
impl FromStr for RegionSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(RegionSelector::All);
        }
        let names: Vec<String> =
            s.split(',').map(str::trim).filter(|n| !n.is_empty()).map(String::from).collect();
        match names.len() {
            0 => Err(Error::Validation(format!("empty region selector '{s}'"))),
            1 => Ok(RegionSelector::Category(names[0].clone())),
            _ => Ok(RegionSelector::AnyOf(names)),
        }
    }
}
