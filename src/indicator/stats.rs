//! Elementary statistics over small in-memory series.
//!
//! Functions return `None` instead of NaN when the input is too short or
//! has no variance, so callers can store NULL rather than a poisoned float.

/// Successive relative changes `x[i] / x[i-1] - 1`. The output is one element
/// shorter than the input.
pub fn pct_change(series: &[f64]) -> Vec<f64> {
    series
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

pub fn mean(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(series.iter().sum::<f64>() / series.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let m = mean(series)?;
    let ss: f64 = series.iter().map(|x| (x - m).powi(2)).sum();
    let sd = (ss / (series.len() - 1) as f64).sqrt();
    sd.is_finite().then_some(sd)
}

/// Pearson correlation of two equally long series.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let ma = mean(a)?;
    let mb = mean(b)?;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}
