use crate::csv_reader::Dataset;
use tracing::debug;

/// The two columns every chart plots, taken from the first row's keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    pub x: String,
    /// `None` when the data has a single column
    pub y: Option<String>,
}

/// Resolve the X and Y fields for a dataset.
///
/// X is the first key and Y the second key of the first row, in the order
/// the parser produced them. The choice does not depend on the chart kind.
/// Returns `None` for an empty dataset or a first row without any keys.
pub fn select_fields(dataset: &Dataset) -> Option<FieldSelection> {
    let first = dataset.first()?;
    let mut keys = first.keys();

    let x = keys.next()?.to_string();
    let y = keys.next().map(str::to_string);

    if y.is_none() {
        debug!(x_field = %x, "dataset has a single column, Y field is undefined");
    }

    Some(FieldSelection { x, y })
}
