use crate::ir::Scale;

/// Largest magnitude an axis end may take, so the span stays finite
const AXIS_LIMIT: f64 = f64::MAX / 4.0;

/// One slot per category, centred on integer positions 0..n-1
pub fn categorical_scale(categories: Vec<String>) -> Scale {
    let n = categories.len().max(1) as f64;
    Scale {
        domain: (-0.5, n - 0.5),
        is_categorical: true,
        categories,
    }
}

/// Continuous axis over `values`, padded by 5% on both sides
pub fn continuous_scale(values: &[f64]) -> Scale {
    let domain = match min_max(values) {
        Some((min, max)) => bounded(pad_range(min, max)),
        None => (0.0, 1.0),
    };
    Scale {
        domain,
        is_categorical: false,
        categories: Vec::new(),
    }
}

/// Value axis that always includes zero, padded away from zero only
pub fn value_scale(values: &[f64]) -> Scale {
    let (min, max) = min_max(values).unwrap_or((0.0, 0.0));
    let lo = min.min(0.0);
    let hi = max.max(0.0);

    let domain = if lo == hi {
        (0.0, 1.0)
    } else {
        let padding = hi * 0.05 - lo * 0.05;
        bounded((
            if lo < 0.0 { lo - padding } else { lo },
            if hi > 0.0 { hi + padding } else { hi },
        ))
    };

    Scale {
        domain,
        is_categorical: false,
        categories: Vec::new(),
    }
}

/// Label for a tick at `position` on a categorical scale, if it sits on a slot
pub fn category_label(scale: &Scale, position: f64) -> Option<&str> {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return None;
    }
    scale.categories.get(rounded as usize).map(String::as_str)
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied().filter(|v| v.is_finite());
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        let padding = (min.abs() * 0.05).max(1.0);
        (min - padding, max + padding)
    } else {
        let padding = max * 0.05 - min * 0.05;
        (min - padding, max + padding)
    }
}

/// Clamp both ends into `[-AXIS_LIMIT, AXIS_LIMIT]`, keeping them apart
fn bounded((lo, hi): (f64, f64)) -> (f64, f64) {
    let lo = lo.clamp(-AXIS_LIMIT, AXIS_LIMIT);
    let hi = hi.clamp(-AXIS_LIMIT, AXIS_LIMIT);
    if lo < hi {
        (lo, hi)
    } else if hi >= AXIS_LIMIT {
        (AXIS_LIMIT / 2.0, AXIS_LIMIT)
    } else {
        (-AXIS_LIMIT, -AXIS_LIMIT / 2.0)
    }
}
