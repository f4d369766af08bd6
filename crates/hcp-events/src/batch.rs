//! In-memory columnar event batch.
//!
//! Columns are addressed by name. Object collections use dotted names
//! (`Jet.pt`, `Jet.eta`, ...) and are stored as jagged columns sharing the
//! same offsets.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::column::{Column, JaggedCol};
use crate::error::{EventsError, Result};

/// A batch of events stored column-wise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    n_events: usize,
    columns: BTreeMap<String, Column>,
}

impl EventBatch {
    /// Create an empty batch for `n_events` events.
    pub fn new(n_events: usize) -> Self {
        Self { n_events, columns: BTreeMap::new() }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.n_events
    }

    /// `true` when the batch has no events.
    pub fn is_empty(&self) -> bool {
        self.n_events == 0
    }

    /// Insert (or replace) a column. Its length must match the batch.
    pub fn insert(&mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<()> {
        let name = name.into();
        let column = column.into();
        if column.len() != self.n_events {
            return Err(EventsError::Shape(format!(
                "column '{}' has {} entries, batch has {}",
                name,
                column.len(),
                self.n_events
            )));
        }
        if let Column::Jagged(j) = &column {
            j.validate()?;
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Builder form of [`EventBatch::insert`].
    pub fn with(mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<Self> {
        self.insert(name, column)?;
        Ok(self)
    }

    /// `true` if a column exists.
    pub fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns.get(name).ok_or_else(|| EventsError::MissingColumn(name.to_string()))
    }

    /// Look up a scalar column.
    pub fn scalar(&self, name: &str) -> Result<&[f64]> {
        self.column(name)?.as_scalar().ok_or_else(|| {
            EventsError::Shape(format!("column '{name}' is jagged, expected one value per event"))
        })
    }

    /// Look up a jagged column.
    pub fn jagged(&self, name: &str) -> Result<&JaggedCol> {
        self.column(name)?.as_jagged().ok_or_else(|| {
            EventsError::Shape(format!("column '{name}' is scalar, expected a jagged column"))
        })
    }

    /// Scalar column interpreted as booleans (`> 0`).
    pub fn flag(&self, name: &str) -> Result<Vec<bool>> {
        Ok(self.scalar(name)?.iter().map(|&v| v > 0.0).collect())
    }

    /// Object collections: prefix before the first `.` of jagged columns,
    /// mapped to their field names.
    pub fn collections(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, col) in &self.columns {
            if let (Column::Jagged(_), Some((coll, field))) = (col, name.split_once('.')) {
                out.entry(coll.to_string()).or_default().push(field.to_string());
            }
        }
        out
    }

    /// Keep only events where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Result<EventBatch> {
        if mask.len() != self.n_events {
            return Err(EventsError::Shape(format!(
                "mask has {} entries, batch has {}",
                mask.len(),
                self.n_events
            )));
        }
        let n = mask.iter().filter(|m| **m).count();
        let columns = self.columns.iter().map(|(k, c)| (k.clone(), c.filter(mask))).collect();
        Ok(EventBatch { n_events: n, columns })
    }

    /// Events `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> EventBatch {
        let end = end.min(self.n_events);
        let start = start.min(end);
        let columns =
            self.columns.iter().map(|(k, c)| (k.clone(), c.slice(start, end))).collect();
        EventBatch { n_events: end - start, columns }
    }

    /// Split into consecutive batches of at most `size` events.
    pub fn chunks(&self, size: usize) -> Vec<EventBatch> {
        let size = size.max(1);
        (0..self.n_events).step_by(size).map(|s| self.slice(s, s + size)).collect()
    }

    /// Parse the JSON column format: an object mapping column names to arrays
    /// of numbers/booleans (scalar) or arrays of arrays (jagged). Empty
    /// arrays give empty jagged columns, which also read as scalars.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let obj = value
            .as_object()
            .ok_or_else(|| EventsError::Shape("event JSON must be an object of columns".into()))?;

        let mut parsed = Vec::with_capacity(obj.len());
        for (name, v) in obj {
            parsed.push((name.clone(), column_from_json(name, v)?));
        }
        let n_events = parsed.first().map(|(_, c)| c.len()).unwrap_or(0);
        let mut batch = EventBatch::new(n_events);
        for (name, col) in parsed {
            batch.insert(name, col)?;
        }
        Ok(batch)
    }

    /// Read a JSON event file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let batch = Self::from_json_str(&text)?;
        log::debug!(
            "read {} events ({} columns) from {}",
            batch.len(),
            batch.columns.len(),
            path.display()
        );
        Ok(batch)
    }

    /// Serialize to the JSON column format.
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        for (name, col) in &self.columns {
            let v = match col {
                Column::Scalar(v) => Value::from(v.clone()),
                Column::Jagged(j) => Value::Array(
                    (0..j.n_entries()).map(|r| Value::from(j.row(r).to_vec())).collect(),
                ),
            };
            obj.insert(name.clone(), v);
        }
        Value::Object(obj)
    }
}

fn number(name: &str, v: &Value) -> Result<f64> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| EventsError::Shape(format!("column '{name}': non-finite number"))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(EventsError::Shape(format!("column '{name}': unexpected value {other}"))),
    }
}

fn column_from_json(name: &str, v: &Value) -> Result<Column> {
    let arr = v
        .as_array()
        .ok_or_else(|| EventsError::Shape(format!("column '{name}' must be an array")))?;
    // `[]` may be a collection field or a flag; jagged fits both
    if arr.is_empty() || arr.iter().any(|e| e.is_array()) {
        let mut lists = Vec::with_capacity(arr.len());
        for entry in arr {
            let inner = entry.as_array().ok_or_else(|| {
                EventsError::Shape(format!("column '{name}': mixed scalar and list entries"))
            })?;
            lists.push(inner.iter().map(|x| number(name, x)).collect::<Result<Vec<f64>>>()?);
        }
        Ok(Column::Jagged(JaggedCol::from_lists(&lists)))
    } else {
        Ok(Column::Scalar(arr.iter().map(|x| number(name, x)).collect::<Result<Vec<f64>>>()?))
    }
}
