//! Table rendering
//!
//! Feature tables and season tables are written as an aligned text table,
//! a JSON array of objects, or CSV.

use serde_json::{Map, Value};
use std::io::Write;

use crate::Result;

/// Anything with a header and rows of JSON-like cells
pub trait Tabular {
    fn header(&self) -> Vec<String>;
    fn records(&self) -> Vec<Vec<Value>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

/// Plain text for one cell; null renders as an empty string
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

pub fn render<T: Tabular, W: Write>(table: &T, format: OutputFormat, out: W) -> Result<()> {
    match format {
        OutputFormat::Table => write_text(table, out),
        OutputFormat::Json => write_json(table, out),
        OutputFormat::Csv => write_csv(table, out),
    }
}

pub fn write_csv<T: Tabular, W: Write>(table: &T, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.header())?;
    for record in table.records() {
        writer.write_record(record.iter().map(cell_text))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Tabular, W: Write>(table: &T, mut out: W) -> Result<()> {
    let header = table.header();
    let rows: Vec<Value> = table
        .records()
        .into_iter()
        .map(|record| {
            let object: Map<String, Value> = header.iter().cloned().zip(record).collect();
            Value::Object(object)
        })
        .collect();
    serde_json::to_writer_pretty(&mut out, &rows)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_text<T: Tabular, W: Write>(table: &T, mut out: W) -> Result<()> {
    let header = table.header();
    let rows: Vec<Vec<String>> = table
        .records()
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|v| match v {
                    Value::Null => "-".to_string(),
                    Value::Number(n) if n.is_f64() => {
                        format!("{:.3}", n.as_f64().unwrap_or(f64::NAN))
                    }
                    other => cell_text(other),
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    writeln!(out, "{}", line(&header).trim_end())?;
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    writeln!(out, "{}", "─".repeat(total))?;
    for row in &rows {
        writeln!(out, "{}", line(row).trim_end())?;
    }
    Ok(())
}
