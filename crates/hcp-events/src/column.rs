//! Event columns: one value per event, or a variable-length list per event.

use crate::error::{EventsError, Result};

/// A variable-length (jagged) column, e.g. the `pt` of every jet per event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JaggedCol {
    /// Flat array of all values across all entries.
    pub flat: Vec<f64>,
    /// Entry boundaries: `offsets.len() == n_entries + 1`.
    pub offsets: Vec<usize>,
}

impl JaggedCol {
    /// Build from per-entry lists.
    pub fn from_lists(lists: &[Vec<f64>]) -> Self {
        let mut flat = Vec::with_capacity(lists.iter().map(|l| l.len()).sum());
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        offsets.push(0);
        for l in lists {
            flat.extend_from_slice(l);
            offsets.push(flat.len());
        }
        Self { flat, offsets }
    }

    /// Build from per-entry counts and a flat array.
    pub fn from_counts(counts: &[usize], flat: Vec<f64>) -> Result<Self> {
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        offsets.push(0);
        let mut acc = 0usize;
        for &c in counts {
            acc += c;
            offsets.push(acc);
        }
        if acc != flat.len() {
            return Err(EventsError::Shape(format!(
                "counts sum to {acc} but flat array has {} values",
                flat.len()
            )));
        }
        Ok(Self { flat, offsets })
    }

    /// Get element `index` of entry `row`. Returns `oor` for out-of-range.
    pub fn get(&self, row: usize, index: usize, oor: f64) -> f64 {
        let start = self.offsets[row];
        let end = self.offsets[row + 1];
        let len = end - start;
        if index >= len { oor } else { self.flat[start + index] }
    }

    /// Values of entry `row`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.flat[self.offsets[row]..self.offsets[row + 1]]
    }

    /// Number of entries.
    pub fn n_entries(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Number of values per entry.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Keep only entries where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Self {
        let mut flat = Vec::new();
        let mut offsets = vec![0];
        for (row, &keep) in mask.iter().enumerate() {
            if keep {
                flat.extend_from_slice(self.row(row));
                offsets.push(flat.len());
            }
        }
        Self { flat, offsets }
    }

    /// Entries `start..end` as a new column.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let base = self.offsets[start];
        let flat = self.flat[base..self.offsets[end]].to_vec();
        let offsets = self.offsets[start..=end].iter().map(|o| o - base).collect();
        Self { flat, offsets }
    }

    /// Apply `f` element-wise, keeping the offsets.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self { flat: self.flat.iter().map(|&v| f(v)).collect(), offsets: self.offsets.clone() }
    }

    /// Check offsets are monotonic and end at `flat.len()`.
    pub fn validate(&self) -> Result<()> {
        if self.offsets.first() != Some(&0) {
            return Err(EventsError::Shape("jagged offsets must start at 0".into()));
        }
        if self.offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(EventsError::Shape("jagged offsets must be non-decreasing".into()));
        }
        if self.offsets.last() != Some(&self.flat.len()) {
            return Err(EventsError::Shape(format!(
                "last offset {:?} does not match flat length {}",
                self.offsets.last(),
                self.flat.len()
            )));
        }
        Ok(())
    }
}

/// One column of an [`crate::EventBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// One value per event. Booleans are stored as 0/1.
    Scalar(Vec<f64>),
    /// A list of values per event.
    Jagged(JaggedCol),
}

impl Column {
    /// Number of events.
    pub fn len(&self) -> usize {
        match self {
            Column::Scalar(v) => v.len(),
            Column::Jagged(j) => j.n_entries(),
        }
    }

    /// `true` when the column holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar view, if this is a scalar column. A jagged column without
    /// entries also reads as an empty scalar column.
    pub fn as_scalar(&self) -> Option<&[f64]> {
        match self {
            Column::Scalar(v) => Some(v),
            Column::Jagged(j) if j.n_entries() == 0 => Some(&[]),
            Column::Jagged(_) => None,
        }
    }

    /// Jagged view, if this is a jagged column.
    pub fn as_jagged(&self) -> Option<&JaggedCol> {
        match self {
            Column::Scalar(_) => None,
            Column::Jagged(j) => Some(j),
        }
    }

    /// Keep only events where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Column {
        match self {
            Column::Scalar(v) => Column::Scalar(
                v.iter().zip(mask).filter(|(_, keep)| **keep).map(|(x, _)| *x).collect(),
            ),
            Column::Jagged(j) => Column::Jagged(j.filter(mask)),
        }
    }

    /// Events `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Column {
        match self {
            Column::Scalar(v) => Column::Scalar(v[start..end].to_vec()),
            Column::Jagged(j) => Column::Jagged(j.slice(start, end)),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::Scalar(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Scalar(v.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect())
    }
}

impl From<JaggedCol> for Column {
    fn from(j: JaggedCol) -> Self {
        Column::Jagged(j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jagged_access() {
        let j = JaggedCol::from_lists(&[vec![50.0, 30.0], vec![], vec![70.0]]);
        assert_eq!(j.n_entries(), 3);
        assert_eq!(j.counts(), vec![2, 0, 1]);
        assert_eq!(j.get(0, 1, -1.0), 30.0);
        assert_eq!(j.get(1, 0, -1.0), -1.0);
        assert_eq!(j.row(2), &[70.0]);
        j.validate().unwrap();
    }

    #[test]
    fn jagged_filter_and_slice() {
        let j = JaggedCol::from_lists(&[vec![1.0], vec![2.0, 3.0], vec![4.0]]);
        let f = j.filter(&[false, true, true]);
        assert_eq!(f, JaggedCol::from_lists(&[vec![2.0, 3.0], vec![4.0]]));
        let s = j.slice(1, 3);
        assert_eq!(s, f);
    }

    #[test]
    fn from_counts_checks_length() {
        assert!(JaggedCol::from_counts(&[1, 2], vec![1.0, 2.0]).is_err());
        let j = JaggedCol::from_counts(&[1, 2], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(j.offsets, vec![0, 1, 3]);
    }

    #[test]
    fn bool_columns_are_numeric() {
        let c: Column = vec![true, false].into();
        assert_eq!(c.as_scalar(), Some(&[1.0, 0.0][..]));
    }
}
