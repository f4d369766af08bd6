//! Multi-axis histogram with value and variance storage.
//!
//! Storage is row-major over all axes and includes the flow bins of binned
//! axes, so `values_flow()` is the full array.

use serde::{Deserialize, Serialize};

use hcp_core::{Error, Result};

use crate::axis::Axis;

/// Fill coordinate for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coord {
    /// Category id (categorical axes).
    Id(i64),
    /// Value (binned axes).
    Value(f64),
}

/// A multi-dimensional histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramRepr")]
pub struct Histogram {
    axes: Vec<Axis>,
    values: Vec<f64>,
    variances: Vec<f64>,
}

#[derive(Deserialize)]
struct HistogramRepr {
    axes: Vec<Axis>,
    values: Vec<f64>,
    variances: Vec<f64>,
}

impl TryFrom<HistogramRepr> for Histogram {
    type Error = Error;

    fn try_from(r: HistogramRepr) -> Result<Self> {
        let h = Histogram { axes: r.axes, values: r.values, variances: r.variances };
        h.validate()?;
        Ok(h)
    }
}

fn size_of(axes: &[Axis]) -> usize {
    axes.iter().map(|a| a.extent()).product()
}

impl Histogram {
    /// Empty (zero-filled) histogram over `axes`.
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        let n = size_of(&axes);
        let h = Histogram { axes, values: vec![0.0; n], variances: vec![0.0; n] };
        h.validate()?;
        Ok(h)
    }

    /// Histogram from explicit storage.
    pub fn from_parts(axes: Vec<Axis>, values: Vec<f64>, variances: Vec<f64>) -> Result<Self> {
        let h = Histogram { axes, values, variances };
        h.validate()?;
        Ok(h)
    }

    /// Check axis names are unique and storage matches the axis extents.
    pub fn validate(&self) -> Result<()> {
        for (i, a) in self.axes.iter().enumerate() {
            a.validate()?;
            if self.axes[..i].iter().any(|b| b.name() == a.name()) {
                return Err(Error::Histogram(format!("duplicate axis '{}'", a.name())));
            }
        }
        let n = size_of(&self.axes);
        if self.values.len() != n || self.variances.len() != n {
            return Err(Error::Histogram(format!(
                "storage size mismatch: axes imply {n}, values={}, variances={}",
                self.values.len(),
                self.variances.len()
            )));
        }
        Ok(())
    }

    /// Axes in storage order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Storage shape (flow bins included).
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.extent()).collect()
    }

    /// Position of a named axis.
    pub fn axis_position(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name() == name)
    }

    /// Look up a named axis.
    pub fn axis(&self, name: &str) -> Result<&Axis> {
        self.axes
            .iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| Error::Histogram(format!("no axis named '{name}'")))
    }

    /// Flow-inclusive values, row-major.
    pub fn values_flow(&self) -> &[f64] {
        &self.values
    }

    /// Flow-inclusive variances, row-major.
    pub fn variances_flow(&self) -> &[f64] {
        &self.variances
    }

    /// Replace all values. Length must match the storage.
    pub fn set_values_flow(&mut self, values: Vec<f64>) -> Result<()> {
        if values.len() != self.values.len() {
            return Err(Error::Histogram(format!(
                "cannot set {} values on storage of size {}",
                values.len(),
                self.values.len()
            )));
        }
        self.values = values;
        Ok(())
    }

    /// Replace all variances. Length must match the storage.
    pub fn set_variances_flow(&mut self, variances: Vec<f64>) -> Result<()> {
        if variances.len() != self.variances.len() {
            return Err(Error::Histogram(format!(
                "cannot set {} variances on storage of size {}",
                variances.len(),
                self.variances.len()
            )));
        }
        self.variances = variances;
        Ok(())
    }

    /// Sum of all values, flow included.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// In-range values of a histogram with a single binned axis.
    pub fn values(&self) -> Result<Vec<f64>> {
        self.single_binned_axis()?;
        Ok(self.values[1..self.values.len() - 1].to_vec())
    }

    /// In-range variances of a histogram with a single binned axis.
    pub fn variances(&self) -> Result<Vec<f64>> {
        self.single_binned_axis()?;
        Ok(self.variances[1..self.variances.len() - 1].to_vec())
    }

    fn single_binned_axis(&self) -> Result<&Axis> {
        match self.axes.as_slice() {
            [a] if !a.is_categorical() => Ok(a),
            _ => Err(Error::Histogram(format!(
                "expected a single binned axis, got [{}]",
                self.axes.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// (outer, extent, inner) decomposition around axis `pos`.
    fn split(&self, pos: usize) -> (usize, usize, usize) {
        let outer = size_of(&self.axes[..pos]);
        let inner = size_of(&self.axes[pos + 1..]);
        (outer, self.axes[pos].extent(), inner)
    }

    fn categorical_position(&self, axis: &str) -> Result<usize> {
        let pos = self
            .axis_position(axis)
            .ok_or_else(|| Error::Histogram(format!("no axis named '{axis}'")))?;
        if !self.axes[pos].is_categorical() {
            return Err(Error::Histogram(format!("axis '{axis}' is not categorical")));
        }
        Ok(pos)
    }

    /// Keep only the given ids on a categorical axis, in the given order.
    ///
    /// Ids not present on the axis are skipped; duplicates are kept once.
    pub fn select(&self, axis: &str, ids: &[i64]) -> Result<Histogram> {
        let pos = self.categorical_position(axis)?;
        let mut keep: Vec<(i64, usize)> = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.axes[pos].index_of(id) {
                Some(idx) if !keep.iter().any(|(k, _)| *k == id) => keep.push((id, idx)),
                Some(_) => {}
                None => log::debug!("axis '{axis}': id {id} not present, skipped"),
            }
        }

        let (outer, extent, inner) = self.split(pos);
        let mut values = Vec::with_capacity(outer * keep.len() * inner);
        let mut variances = Vec::with_capacity(values.capacity());
        for o in 0..outer {
            for &(_, k) in &keep {
                let base = (o * extent + k) * inner;
                values.extend_from_slice(&self.values[base..base + inner]);
                variances.extend_from_slice(&self.variances[base..base + inner]);
            }
        }

        let mut axes = self.axes.clone();
        axes[pos] = Axis::int_category(axis, keep.iter().map(|(id, _)| *id).collect());
        Ok(Histogram { axes, values, variances })
    }

    /// Sum over (and remove) a named axis, flow bins included.
    pub fn sum_axis(&self, axis: &str) -> Result<Histogram> {
        let pos = self
            .axis_position(axis)
            .ok_or_else(|| Error::Histogram(format!("no axis named '{axis}'")))?;
        let (outer, extent, inner) = self.split(pos);
        let mut values = vec![0.0; outer * inner];
        let mut variances = vec![0.0; outer * inner];
        for o in 0..outer {
            for k in 0..extent {
                let base = (o * extent + k) * inner;
                for i in 0..inner {
                    values[o * inner + i] += self.values[base + i];
                    variances[o * inner + i] += self.variances[base + i];
                }
            }
        }
        let mut axes = self.axes.clone();
        axes.remove(pos);
        Ok(Histogram { axes, values, variances })
    }

    /// Add another histogram with identical axes.
    pub fn add(&mut self, other: &Histogram) -> Result<()> {
        self.check_compatible(other)?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        for (a, b) in self.variances.iter_mut().zip(&other.variances) {
            *a += b;
        }
        Ok(())
    }

    /// `true` if both histograms have the same axes.
    pub fn is_compatible(&self, other: &Histogram) -> bool {
        self.axes.len() == other.axes.len()
            && self.axes.iter().zip(&other.axes).all(|(a, b)| a.is_compatible(b))
    }

    fn check_compatible(&self, other: &Histogram) -> Result<()> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(Error::Histogram(format!(
                "incompatible axes: {:?} vs {:?}",
                self.shape_summary(),
                other.shape_summary()
            )))
        }
    }

    fn shape_summary(&self) -> Vec<(String, usize)> {
        self.axes.iter().map(|a| (a.name().to_string(), a.extent())).collect()
    }

    /// Fill one entry. `coords` holds one coordinate per axis, in axis order.
    ///
    /// Unknown ids are appended to their categorical axis.
    pub fn fill(&mut self, coords: &[Coord], weight: f64) -> Result<()> {
        if coords.len() != self.axes.len() {
            return Err(Error::Histogram(format!(
                "fill expects {} coordinates, got {}",
                self.axes.len(),
                coords.len()
            )));
        }
        let mut index = 0usize;
        for pos in 0..self.axes.len() {
            let categorical = self.axes[pos].is_categorical();
            let k = match coords[pos] {
                Coord::Id(id) if categorical => match self.axes[pos].index_of(id) {
                    Some(k) => k,
                    None => self.grow(pos, id),
                },
                Coord::Value(v) if !categorical => self.axes[pos].bin_index(v),
                c => {
                    return Err(Error::Histogram(format!(
                        "coordinate {c:?} does not fit axis '{}'",
                        self.axes[pos].name()
                    )));
                }
            };
            index = index * self.axes[pos].extent() + k;
        }
        self.values[index] += weight;
        self.variances[index] += weight * weight;
        Ok(())
    }

    /// Append a category id to axis `pos`, re-laying out the storage.
    fn grow(&mut self, pos: usize, id: i64) -> usize {
        let (outer, extent, inner) = self.split(pos);
        let mut values = Vec::with_capacity(outer * (extent + 1) * inner);
        let mut variances = Vec::with_capacity(values.capacity());
        for o in 0..outer {
            let base = o * extent * inner;
            values.extend_from_slice(&self.values[base..base + extent * inner]);
            values.extend(std::iter::repeat_n(0.0, inner));
            variances.extend_from_slice(&self.variances[base..base + extent * inner]);
            variances.extend(std::iter::repeat_n(0.0, inner));
        }
        self.values = values;
        self.variances = variances;
        if let Axis::IntCategory { categories, .. } = &mut self.axes[pos] {
            categories.push(id);
        }
        extent
    }
}
