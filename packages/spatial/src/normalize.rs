//! Value normalization to `[0, 1]`.

/// Outcome of an in-place min-max normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Values were rescaled so the minimum is 0 and the maximum is 1.
    Applied,
    /// Every value was equal (or there were none); nothing was changed.
    Degenerate,
}

/// Rescales `values` in place to `[0, 1]` by min-max.
///
/// When the range is zero (or not finite) the slice is left untouched and
/// [`Normalization::Degenerate`] is returned; callers decide what a
/// degenerate slice means for them.
pub fn min_max_in_place(values: &mut [f64]) -> Normalization {
    let Some((min, max)) = range(values) else {
        return Normalization::Degenerate;
    };
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return Normalization::Degenerate;
    }
    for v in values.iter_mut() {
        *v = ((*v - min) / span).clamp(0.0, 1.0);
    }
    Normalization::Applied
}

/// Min-max normalized copy of `values`; a degenerate input maps to all
/// zeros.
#[must_use]
pub fn min_max(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    if min_max_in_place(&mut out) == Normalization::Degenerate {
        out.fill(0.0);
    }
    out
}

/// Two-stage logarithmic scale for heavy-tailed magnitudes such as AADT.
///
/// `log1p` then min-max, then `log1p(x * 100)` then min-max again, which
/// spreads the low end of the range across most of the color ramp.
/// Negative inputs are treated as zero.
#[must_use]
pub fn double_log(values: &[f64]) -> Vec<f64> {
    let first: Vec<f64> = values.iter().map(|v| v.max(0.0).ln_1p()).collect();
    let second: Vec<f64> = min_max(&first)
        .into_iter()
        .map(|v| (v * 100.0).ln_1p())
        .collect();
    min_max(&second)
}

/// Percentile rank of each value: average rank of its tie group divided by
/// the number of values, so results lie in `(0, 1]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]].total_cmp(&values[order[start]]).is_eq() {
            end += 1;
        }
        // One-based positions start+1 ..= end share their mean rank.
        let average_rank = (start + 1 + end) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = average_rank / n as f64;
        }
        start = end;
    }
    ranks
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
