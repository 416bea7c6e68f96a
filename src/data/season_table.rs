//! Season stat tables
//!
//! A small header-plus-rows table for scraped per-player season stats.
//! Cells start as text and are coerced to numbers after merging.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::data::events::RawValue;
use crate::output::Tabular;
use crate::{GridironError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum StatCell {
    Missing,
    Text(String),
    Number(f64),
}

impl StatCell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StatCell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            StatCell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Key used for joins and dedup
    fn key(&self) -> Option<String> {
        match self {
            StatCell::Missing => None,
            StatCell::Text(s) => Some(s.clone()),
            StatCell::Number(n) => Some(n.to_string()),
        }
    }

    /// Text to number; anything unparseable becomes `Missing`
    fn coerced(&self) -> StatCell {
        match self {
            StatCell::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if !n.is_nan() => StatCell::Number(n),
                _ => StatCell::Missing,
            },
            other => other.clone(),
        }
    }
}

impl From<RawValue> for StatCell {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Missing => StatCell::Missing,
            RawValue::Number(n) if n.is_nan() => StatCell::Missing,
            RawValue::Number(n) => StatCell::Number(n),
            RawValue::Text(s) => StatCell::Text(s),
        }
    }
}

/// Column bound for positional pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Index(usize),
    /// `len - n`
    FromEnd(usize),
}

/// One column-pruning step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prune {
    /// Drop every column with one of these labels; each must exist
    Named(&'static [&'static str]),
    /// Drop the last `n` columns
    Tail(usize),
    /// Drop the single column at `len - n`
    NthFromEnd(usize),
    /// Drop columns in `[start, end)`
    Span(usize, Bound),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<StatCell>>,
}

impl SeasonTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        SeasonTable {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build from scraped text rows; rows whose width differs from the header are skipped
    pub fn from_text_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let mut table = SeasonTable::new(name, columns);
        let width = table.columns.len();
        let mut skipped = 0usize;
        for row in rows {
            if row.len() != width {
                skipped += 1;
                continue;
            }
            table.rows.push(row.into_iter().map(StatCell::Text).collect());
        }
        if skipped > 0 {
            log::warn!(
                "{}: skipped {} rows not matching the {}-column header",
                table.name,
                skipped,
                width
            );
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| GridironError::schema(&self.name, name))
    }

    /// First row whose `key_column` cell has the given text
    pub fn find(&self, key_column: &str, key: &str) -> Option<&[StatCell]> {
        let col = self.columns.iter().position(|c| c == key_column)?;
        self.rows
            .iter()
            .find(|r| r[col].as_text() == Some(key))
            .map(|r| r.as_slice())
    }

    fn drop_indices(&mut self, indices: &HashSet<usize>) {
        if indices.is_empty() {
            return;
        }
        self.columns = std::mem::take(&mut self.columns)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, c)| c)
            .collect();
        for row in &mut self.rows {
            *row = std::mem::take(row)
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !indices.contains(i))
                .map(|(_, c)| c)
                .collect();
        }
    }

    pub fn apply(&mut self, prune: Prune) -> Result<()> {
        let len = self.columns.len();
        let indices: HashSet<usize> = match prune {
            Prune::Named(names) => {
                let mut found = HashSet::new();
                for name in names {
                    let matches: Vec<usize> = self
                        .columns
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.as_str() == *name)
                        .map(|(i, _)| i)
                        .collect();
                    if matches.is_empty() {
                        return Err(GridironError::schema(&self.name, *name));
                    }
                    found.extend(matches);
                }
                found
            }
            Prune::Tail(n) => (len.saturating_sub(n)..len).collect(),
            Prune::NthFromEnd(n) => {
                if n == 0 || n > len {
                    HashSet::new()
                } else {
                    HashSet::from([len - n])
                }
            }
            Prune::Span(start, end) => {
                let end = match end {
                    Bound::Index(i) => i.min(len),
                    Bound::FromEnd(n) => len.saturating_sub(n),
                };
                (start.min(end)..end).collect()
            }
        };
        self.drop_indices(&indices);
        Ok(())
    }

    /// Rename columns; labels not present are ignored
    pub fn rename(&mut self, pairs: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = pairs.iter().find(|(from, _)| *from == column.as_str()) {
                *column = to.to_string();
            }
        }
    }

    /// Coerce every column at or after `start` to numbers
    pub fn coerce_numeric_from(&mut self, start: usize) {
        for row in &mut self.rows {
            for cell in row.iter_mut().skip(start) {
                *cell = cell.coerced();
            }
        }
    }

    /// Keep the first row for each key value; returns the number of rows dropped
    pub fn dedup_by(&mut self, key_column: &str) -> Result<usize> {
        let col = self.column_index(key_column)?;
        let before = self.rows.len();
        let mut seen: HashSet<Option<String>> = HashSet::new();
        self.rows.retain(|row| seen.insert(row[col].key()));
        Ok(before - self.rows.len())
    }

    /// Replace every missing cell with `value`
    pub fn fill_missing(&mut self, value: f64) {
        for cell in self.rows.iter_mut().flatten() {
            if *cell == StatCell::Missing {
                *cell = StatCell::Number(value);
            }
        }
    }

    /// Strip trailing `+` / `*` award markers from text cells
    pub fn strip_annotations(&mut self) {
        for cell in self.rows.iter_mut().flatten() {
            if let StatCell::Text(s) = cell {
                let kept = s.trim_end_matches(|c: char| c == '+' || c == '*').len();
                s.truncate(kept);
            }
        }
    }

    pub fn retain_rows<F: FnMut(&[StatCell]) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|row| keep(row));
    }

    /// Stable ascending sort on a text column; missing keys sort last
    pub fn sort_by_text(&mut self, column: &str) -> Result<()> {
        let col = self.column_index(column)?;
        self.rows.sort_by(|a, b| match (a[col].as_text(), b[col].as_text()) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(())
    }

    /// Full outer join on `key`.
    ///
    /// Left rows keep their order; right rows without a match follow in
    /// their own order. Non-key columns present on both sides get `_x` and
    /// `_y` suffixes. Duplicate keys produce one row per matching pair.
    pub fn outer_join(&self, other: &SeasonTable, key: &str) -> Result<SeasonTable> {
        let left_key = self.column_index(key)?;
        let right_key = other.column_index(key)?;

        let left_names: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let right_names: HashSet<&str> = other.columns.iter().map(String::as_str).collect();
        let clash = |c: &str| c != key && left_names.contains(c) && right_names.contains(c);

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| if clash(c) { format!("{}_x", c) } else { c.clone() })
            .collect();
        let right_cols: Vec<usize> = (0..other.columns.len()).filter(|&i| i != right_key).collect();
        columns.extend(right_cols.iter().map(|&i| {
            let c = &other.columns[i];
            if clash(c) {
                format!("{}_y", c)
            } else {
                c.clone()
            }
        }));

        let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            if let Some(k) = row[right_key].key() {
                right_index.entry(k).or_default().push(i);
            }
        }

        let mut merged = SeasonTable::new(format!("{}+{}", self.name, other.name), columns);
        let mut matched = vec![false; other.rows.len()];

        for row in &self.rows {
            let hits = row[left_key]
                .key()
                .and_then(|k| right_index.get(&k))
                .cloned()
                .unwrap_or_default();
            if hits.is_empty() {
                let mut out = row.clone();
                out.extend(right_cols.iter().map(|_| StatCell::Missing));
                merged.rows.push(out);
                continue;
            }
            for r in hits {
                matched[r] = true;
                let mut out = row.clone();
                out.extend(right_cols.iter().map(|&i| other.rows[r][i].clone()));
                merged.rows.push(out);
            }
        }

        for (r, row) in other.rows.iter().enumerate() {
            if matched[r] {
                continue;
            }
            let mut out = vec![StatCell::Missing; self.columns.len()];
            out[left_key] = row[right_key].clone();
            out.extend(right_cols.iter().map(|&i| row[i].clone()));
            merged.rows.push(out);
        }

        Ok(merged)
    }
}

fn cell_value(cell: &StatCell) -> Value {
    match cell {
        StatCell::Missing => Value::Null,
        StatCell::Text(s) => Value::String(s.clone()),
        StatCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Value::from(*n as i64),
        StatCell::Number(n) => Value::from(*n),
    }
}

impl Tabular for SeasonTable {
    fn header(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn records(&self) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(cell_value).collect())
            .collect()
    }
}
