//! Exponential Moving Average indicator, span-style with adjusted weights.
//!
//! alpha = 2/(span+1). Rather than seeding from an SMA, every output is the
//! weighted mean of all observations so far with weights (1-alpha)^age, so the
//! weights renormalize over the available history while the window fills:
//!
//! EMA[i] = sum((1-alpha)^j * X[i-j]) / sum((1-alpha)^j)
//!
//! Leading NaN inputs give NaN. A NaN after the first observation repeats the
//! current average and still ages the older weights.

pub fn calculate_ema(series: &[f64], span: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(series.len());
    if span == 0 {
        values.resize(series.len(), f64::NAN);
        return values;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut weighted = f64::NAN;
    let mut old_weight = 0.0;

    for &x in series {
        if weighted.is_nan() {
            if !x.is_nan() {
                weighted = x;
                old_weight = 1.0;
            }
        } else {
            old_weight *= decay;
            if !x.is_nan() {
                if weighted != x {
                    weighted = (old_weight * weighted + x) / (old_weight + 1.0);
                }
                old_weight += 1.0;
            }
        }
        values.push(weighted);
    }

    values
}
