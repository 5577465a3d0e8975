use crate::chart::{ChartKind, PieSlice};
use crate::palette::HslFill;

// =============================================================================
// Chart description (output of compilation, input of rendering)
// =============================================================================

/// Everything a backend needs to draw one chart.
/// Built by a pure function; holds raw cell text, never pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDescription {
    pub kind: ChartKind,
    pub x_field: String,
    pub y_field: Option<String>,
    pub body: ChartBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    /// Bar, Line, Area and Scatter: one mark per row, in dataset order
    Cartesian(Vec<Mark>),
    Pie(Vec<StyledSlice>),
}

/// Raw X/Y text of one row. `None` when the row lacks the field.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub x: Option<String>,
    pub y: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledSlice {
    pub slice: PieSlice,
    pub fill: HslFill,
}

impl ChartDescription {
    pub fn marks(&self) -> &[Mark] {
        match &self.body {
            ChartBody::Cartesian(marks) => marks,
            ChartBody::Pie(_) => &[],
        }
    }

    pub fn slices(&self) -> &[StyledSlice] {
        match &self.body {
            ChartBody::Pie(slices) => slices,
            ChartBody::Cartesian(_) => &[],
        }
    }

    /// Number of marks or slices that will be drawn
    pub fn len(&self) -> usize {
        match &self.body {
            ChartBody::Cartesian(marks) => marks.len(),
            ChartBody::Pie(slices) => slices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Scaled geometry (backend side)
// =============================================================================

/// A numeric axis in data space
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub domain: (f64, f64),
    pub is_categorical: bool,
    /// If categorical, maps slot index -> label
    pub categories: Vec<String>,
}

/// Marks after numeric coercion. Points that failed coercion are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub points: Vec<Option<(f64, f64)>>,
    pub x: Scale,
    pub y: Scale,
}
