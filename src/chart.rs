// Chart kinds and the pie-slice derivation

use crate::csv_reader::Dataset;
use crate::resolve::FieldSelection;
use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// The closed set of chart families a dataset can be drawn as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
}

impl ChartKind {
    /// Kinds in the order the chart buttons are offered
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Area,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar",
            ChartKind::Line => "Line",
            ChartKind::Pie => "Pie",
            ChartKind::Scatter => "Scatter",
            ChartKind::Area => "Area",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartKind {
    type Err = anyhow::Error;

    /// Accepts the bare kind or the button text ("Pie Chart"), any case
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let name = trimmed
            .strip_suffix(" Chart")
            .or_else(|| trimmed.strip_suffix(" chart"))
            .unwrap_or(trimmed)
            .trim();

        ChartKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.label().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown chart kind '{}'. Available kinds: Bar, Pie, Line, Scatter, Area",
                    s
                )
            })
    }
}

/// One pie sector: the X text as its name, the parsed Y text as its size
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

/// Parse a cell the way pie values are read: the longest leading decimal
/// number wins, and anything unparsable, empty or non-finite becomes 0.0.
///
/// `"12.5kg"` is 12.5, `"abc"` is 0.0, `"Infinity"` is 0.0.
pub fn parse_pie_value(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let digits_from = |mut i: usize| {
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if end < len && bytes[end] == b'.' {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return 0.0;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_start = end + 1;
        if exp_start < len && (bytes[exp_start] == b'+' || bytes[exp_start] == b'-') {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    match s[..end].parse::<f64>() {
        // -0.0 collapses to 0.0 as well
        Ok(value) if value.is_finite() && value != 0.0 => value,
        _ => 0.0,
    }
}

/// Derive one slice per row, in dataset order
pub fn pie_slices(dataset: &Dataset, fields: &FieldSelection) -> Vec<PieSlice> {
    dataset
        .rows()
        .iter()
        .map(|row| {
            let name = row.get(&fields.x).unwrap_or_default().to_string();
            let value = fields
                .y
                .as_deref()
                .and_then(|y| row.get(y))
                .map(parse_pie_value)
                .unwrap_or(0.0);
            PieSlice { name, value }
        })
        .collect()
}
