use crate::chart::{pie_slices, ChartKind};
use crate::csv_reader::Dataset;
use crate::ir::{ChartBody, ChartDescription, Mark, StyledSlice};
use crate::palette::pie_color;
use crate::resolve::{select_fields, FieldSelection};

/// Compile the current data and chart kind into a chart description.
///
/// Pure: called again whenever either input changes. Returns `None` when
/// there is nothing to draw (empty dataset, no kind selected, or no fields).
pub fn compile_chart(dataset: &Dataset, kind: Option<ChartKind>) -> Option<ChartDescription> {
    let kind = kind?;
    if dataset.is_empty() {
        return None;
    }
    let fields = select_fields(dataset)?;

    let body = match kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Area | ChartKind::Scatter => {
            ChartBody::Cartesian(compile_marks(dataset, &fields))
        }
        ChartKind::Pie => ChartBody::Pie(
            pie_slices(dataset, &fields)
                .into_iter()
                .enumerate()
                .map(|(i, slice)| StyledSlice { slice, fill: pie_color(i) })
                .collect(),
        ),
    };

    Some(ChartDescription {
        kind,
        x_field: fields.x,
        y_field: fields.y,
        body,
    })
}

fn compile_marks(dataset: &Dataset, fields: &FieldSelection) -> Vec<Mark> {
    dataset
        .rows()
        .iter()
        .map(|row| Mark {
            x: row.get(&fields.x).map(str::to_string),
            y: fields.y.as_deref().and_then(|y| row.get(y)).map(str::to_string),
        })
        .collect()
}
