// Numeric coercion and curve shaping applied by the rendering backend

use crate::chart::ChartKind;
use crate::ir::{ChartDescription, Geometry, Mark};
use crate::scale::{categorical_scale, continuous_scale, value_scale};

/// Read a cell as a plottable number. Unlike pie values this is strict:
/// the whole trimmed text must be a finite number, otherwise it is not drawn.
pub fn coerce_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Turn the marks of a cartesian chart into scaled data-space points.
///
/// Bar, Line and Area put each row in its own categorical slot (row order,
/// labelled by the X text); Scatter reads both axes as numbers.
pub fn build_geometry(chart: &ChartDescription) -> Geometry {
    let marks = chart.marks();
    match chart.kind {
        ChartKind::Scatter => scatter_geometry(marks),
        _ => categorical_geometry(marks),
    }
}

fn categorical_geometry(marks: &[Mark]) -> Geometry {
    let categories: Vec<String> = marks
        .iter()
        .map(|m| m.x.clone().unwrap_or_default())
        .collect();

    let points: Vec<Option<(f64, f64)>> = marks
        .iter()
        .enumerate()
        .map(|(i, m)| {
            m.y.as_deref()
                .and_then(coerce_number)
                .map(|y| (i as f64, y))
        })
        .collect();

    let ys: Vec<f64> = points.iter().flatten().map(|&(_, y)| y).collect();

    Geometry {
        points,
        x: categorical_scale(categories),
        y: value_scale(&ys),
    }
}

fn scatter_geometry(marks: &[Mark]) -> Geometry {
    let points: Vec<Option<(f64, f64)>> = marks
        .iter()
        .map(|m| {
            let x = m.x.as_deref().and_then(coerce_number)?;
            let y = m.y.as_deref().and_then(coerce_number)?;
            Some((x, y))
        })
        .collect();

    let xs: Vec<f64> = points.iter().flatten().map(|&(x, _)| x).collect();
    let ys: Vec<f64> = points.iter().flatten().map(|&(_, y)| y).collect();

    Geometry {
        points,
        x: continuous_scale(&xs),
        y: value_scale(&ys),
    }
}

/// Split a point sequence into runs of consecutive drawable points
pub fn line_segments(points: &[Option<(f64, f64)>]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();

    for point in points {
        match point {
            Some(p) => current.push(*p),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Tangents for monotone cubic interpolation in x (d3's `curveMonotoneX`)
fn monotone_tangents(points: &[(f64, f64)]) -> Vec<f64> {
    let n = points.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let widths: Vec<f64> = points.windows(2).map(|w| w[1].0 - w[0].0).collect();
    let secants: Vec<f64> = points
        .windows(2)
        .zip(&widths)
        .map(|(w, &h)| if h != 0.0 { w[1].1 / h - w[0].1 / h } else { 0.0 })
        .collect();

    let mut tangents = vec![0.0; n];
    for i in 1..n - 1 {
        let (h0, h1) = (widths[i - 1], widths[i]);
        let (s0, s1) = (secants[i - 1], secants[i]);
        if s0 * s1 <= 0.0 || h0 + h1 == 0.0 {
            continue;
        }
        let p = s0 * (h1 / (h0 + h1)) + s1 * (h0 / (h0 + h1));
        tangents[i] = s0.signum() * 2.0 * s0.abs().min(s1.abs()).min(0.5 * p.abs());
    }

    if n == 2 {
        tangents[0] = secants[0];
        tangents[1] = secants[0];
    } else {
        let endpoint = |h: f64, s: f64, neighbour: f64| {
            if h != 0.0 {
                1.5 * s - 0.5 * neighbour
            } else {
                neighbour
            }
        };
        tangents[0] = endpoint(widths[0], secants[0], tangents[1]);
        tangents[n - 1] = endpoint(widths[n - 2], secants[n - 2], tangents[n - 2]);
    }

    tangents
}

/// Sample a smooth curve through `points` that never overshoots the data
/// between neighbouring points. Input points must be sorted by x.
pub fn monotone_curve(points: &[(f64, f64)], samples_per_segment: usize) -> Vec<(f64, f64)> {
    if points.len() < 3 || samples_per_segment < 2 {
        return points.to_vec();
    }

    // Interpolate in units of the largest |y| so slopes cannot overflow
    let unit = points.iter().map(|p| p.1.abs()).fold(1.0, f64::max);
    let scaled: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x, y / unit)).collect();

    let tangents = monotone_tangents(&scaled);
    let mut curve = Vec::with_capacity((points.len() - 1) * samples_per_segment + 1);
    curve.push(points[0]);

    for i in 0..scaled.len() - 1 {
        let (x0, y0) = scaled[i];
        let (x1, y1) = scaled[i + 1];
        let h = x1 - x0;
        let (m0, m1) = (tangents[i], tangents[i + 1]);

        for step in 1..=samples_per_segment {
            let t = step as f64 / samples_per_segment as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            let y = h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1;
            curve.push((x0 + t * h, y * unit));
        }
    }

    curve
}
