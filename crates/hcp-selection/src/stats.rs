//! Selection statistics: running event counts and weight sums, in total and
//! broken down by group (e.g. per process id).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hcp_core::{Error, Result};

/// How each event contributes to a metric.
#[derive(Debug, Clone, Copy)]
pub enum WeightSpec<'a> {
    /// Every event counts once.
    Unit,
    /// Events where the mask is true count once.
    Mask(&'a [bool]),
    /// Events contribute their weight, optionally masked.
    Weighted(&'a [f64], Option<&'a [bool]>),
}

impl WeightSpec<'_> {
    fn weight(&self, i: usize) -> f64 {
        match self {
            WeightSpec::Unit => 1.0,
            WeightSpec::Mask(m) => {
                if m[i] {
                    1.0
                } else {
                    0.0
                }
            }
            WeightSpec::Weighted(w, None) => w[i],
            WeightSpec::Weighted(w, Some(m)) => {
                if m[i] {
                    w[i]
                } else {
                    0.0
                }
            }
        }
    }

    fn check(&self, metric: &str, n_events: usize) -> Result<()> {
        let ok = match self {
            WeightSpec::Unit => true,
            WeightSpec::Mask(m) => m.len() == n_events,
            WeightSpec::Weighted(w, m) => {
                w.len() == n_events && m.is_none_or(|m| m.len() == n_events)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "stats metric '{metric}': weights do not match {n_events} events"
            )))
        }
    }
}

/// A grouping of events by an integer id column.
#[derive(Debug, Clone, Copy)]
pub struct StatGroup<'a> {
    /// Group name (`process`).
    pub name: &'a str,
    /// Group id per event.
    pub ids: &'a [f64],
}

/// Accumulated selection statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionStats {
    /// Metric name → running total.
    pub totals: BTreeMap<String, f64>,
    /// `<metric>_per_<group>` → (group id → running total).
    pub per_group: BTreeMap<String, BTreeMap<i64, f64>>,
}

impl SelectionStats {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total of a metric (0 when never incremented).
    pub fn get(&self, metric: &str) -> f64 {
        self.totals.get(metric).copied().unwrap_or(0.0)
    }

    /// Per-group total of a metric, e.g. `get_group("num_events", "process", 1210)`.
    pub fn get_group(&self, metric: &str, group: &str, id: i64) -> f64 {
        self.per_group
            .get(&format!("{metric}_per_{group}"))
            .and_then(|m| m.get(&id))
            .copied()
            .unwrap_or(0.0)
    }

    /// Add another accumulator into this one.
    pub fn merge(&mut self, other: &SelectionStats) {
        for (k, v) in &other.totals {
            *self.totals.entry(k.clone()).or_insert(0.0) += v;
        }
        for (k, groups) in &other.per_group {
            let dst = self.per_group.entry(k.clone()).or_default();
            for (id, v) in groups {
                *dst.entry(*id).or_insert(0.0) += v;
            }
        }
    }

    /// Write as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Increment `stats` for a batch of `n_events` events.
///
/// Each `(metric, spec)` adds to `totals[metric]` and, for every group, to
/// `per_group["<metric>_per_<group>"][id]`.
pub fn increment_stats(
    stats: &mut SelectionStats,
    n_events: usize,
    weights: &[(&str, WeightSpec<'_>)],
    groups: &[StatGroup<'_>],
) -> Result<()> {
    for g in groups {
        if g.ids.len() != n_events {
            return Err(Error::Validation(format!(
                "stats group '{}' has {} ids for {n_events} events",
                g.name,
                g.ids.len()
            )));
        }
    }

    for (metric, spec) in weights {
        spec.check(metric, n_events)?;
        let total: f64 = (0..n_events).map(|i| spec.weight(i)).sum();
        *stats.totals.entry(metric.to_string()).or_insert(0.0) += total;

        for g in groups {
            let dst = stats.per_group.entry(format!("{metric}_per_{}", g.name)).or_default();
            for (i, &id) in g.ids.iter().enumerate() {
                *dst.entry(id as i64).or_insert(0.0) += spec.weight(i);
            }
        }
    }
    Ok(())
}
