//! Histogram production from selected events.
//!
//! Every event contributes once per category id it carries, at its
//! `process_id` and the given shift.

use hcp_core::{Error, Result, Variable};
use hcp_events::{CompiledExpr, EventBatch, ExprValues};

use crate::axis::Axis;
use crate::histogram::{Coord, Histogram};

/// Name of the process axis.
pub const PROCESS_AXIS: &str = "process";
/// Name of the category axis.
pub const CATEGORY_AXIS: &str = "category";
/// Name of the shift axis.
pub const SHIFT_AXIS: &str = "shift";

/// Per-event weights: the `mc_weight` column for simulation when present,
/// unit weights otherwise.
pub fn event_weights(events: &EventBatch, is_data: bool) -> Result<Vec<f64>> {
    if !is_data && events.has("mc_weight") {
        Ok(events.scalar("mc_weight")?.to_vec())
    } else {
        Ok(vec![1.0; events.len()])
    }
}

/// Fill `process × category × shift × variable` for one variable.
///
/// `weight` defaults to unit weights. Requires the `process_id` and
/// `category_ids` columns written by the selection.
pub fn fill_variable_histogram(
    events: &EventBatch,
    variable: &Variable,
    shift_id: i64,
    weight: Option<&[f64]>,
) -> Result<Histogram> {
    let mut hist = Histogram::new(vec![
        Axis::int_category(PROCESS_AXIS, Vec::new()),
        Axis::int_category(CATEGORY_AXIS, Vec::new()),
        Axis::int_category(SHIFT_AXIS, vec![shift_id]),
        Axis::from_variable(variable),
    ])?;

    let n = events.len();
    if let Some(w) = weight
        && w.len() != n
    {
        return Err(Error::Histogram(format!(
            "variable '{}': {} weights for {n} events",
            variable.name,
            w.len()
        )));
    }
    let process_ids = events.scalar("process_id")?;
    let category_ids = events.jagged("category_ids")?;
    let expr = CompiledExpr::compile(variable.expr())?;
    let values = expr.eval_batch(events, variable.null())?;

    let mut fill_event = |ev: usize, x: f64| -> Result<()> {
        let w = weight.map_or(1.0, |w| w[ev]);
        for &cat in category_ids.row(ev) {
            hist.fill(
                &[
                    Coord::Id(process_ids[ev] as i64),
                    Coord::Id(cat as i64),
                    Coord::Id(shift_id),
                    Coord::Value(x),
                ],
                w,
            )?;
        }
        Ok(())
    };

    match &values {
        ExprValues::PerEvent(v) => {
            for (ev, &x) in v.iter().enumerate() {
                fill_event(ev, x)?;
            }
        }
        ExprValues::PerObject(j) => {
            for ev in 0..n {
                for &x in j.row(ev) {
                    fill_event(ev, x)?;
                }
            }
        }
    }

    log::debug!(
        "filled '{}' from {n} events: {} processes, {} categories, sum={}",
        variable.name,
        hist.axes()[0].n_bins(),
        hist.axes()[1].n_bins(),
        hist.sum()
    );
    Ok(hist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hcp_core::Binning;

    fn events() -> EventBatch {
        EventBatch::from_json_str(
            r#"{
                "process_id": [1210, 1210, 1220],
                "category_ids": [[11], [12, 20], []],
                "mc_weight": [2.0, 0.5, 1.0],
                "Jet.pt": [[45.0, 20.0], [80.0], [30.0]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn fills_one_entry_per_category() {
        let ev = events();
        let var = Variable::new("jet1_pt", Binning::Regular(2, 0.0, 100.0))
            .expression("Jet.pt[:,0]");
        let w = event_weights(&ev, false).unwrap();
        let h = fill_variable_histogram(&ev, &var, 0, Some(&w)).unwrap();

        assert_eq!(h.axis(PROCESS_AXIS).unwrap().categories(), &[1210]);
        assert_eq!(h.axis(CATEGORY_AXIS).unwrap().categories(), &[11, 12, 20]);
        assert_relative_eq!(h.sum(), 3.0);

        let cat12 = h.select(CATEGORY_AXIS, &[12]).unwrap();
        let x = cat12.sum_axis(PROCESS_AXIS).unwrap().sum_axis(CATEGORY_AXIS).unwrap();
        let x = x.sum_axis(SHIFT_AXIS).unwrap();
        assert_eq!(x.values().unwrap(), vec![0.0, 0.5]);
    }

    #[test]
    fn jagged_expression_fills_every_object() {
        let ev = events();
        let var = Variable::new("jets_pt", Binning::Regular(2, 0.0, 100.0)).expression("Jet.pt");
        let h = fill_variable_histogram(&ev, &var, 3, None).unwrap();
        assert_eq!(h.axis(SHIFT_AXIS).unwrap().categories(), &[3]);
        // event 0: two jets in one category, event 1: one jet in two categories
        assert_relative_eq!(h.sum(), 4.0);
    }

    #[test]
    fn null_values_land_in_underflow() {
        let ev = events();
        let var = Variable::new("jet2_pt", Binning::Regular(2, 0.0, 100.0))
            .expression("Jet.pt[:,1]");
        let h = fill_variable_histogram(&ev, &var, 0, None).unwrap();
        let x = h.sum_axis(PROCESS_AXIS).unwrap().sum_axis(CATEGORY_AXIS).unwrap();
        let x = x.sum_axis(SHIFT_AXIS).unwrap();
        assert_eq!(x.values_flow(), &[2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn data_uses_unit_weights() {
        let ev = events();
        assert_eq!(event_weights(&ev, true).unwrap(), vec![1.0; 3]);
    }

    #[test]
    fn missing_selection_columns_fail() {
        let ev = EventBatch::from_json_str(r#"{"x": [1.0]}"#).unwrap();
        let var = Variable::new("x", Binning::Regular(1, 0.0, 2.0));
        let err = fill_variable_histogram(&ev, &var, 0, None).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "column", .. }));
    }
}
