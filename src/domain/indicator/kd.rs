//! Stochastic oscillator (KD).
//!
//! RSV[i] = (C[i] - min(L, n)) / (max(H, n) - min(L, n)) * 100
//! K[i]   = RSV[i] / 3 + K[i-1] * 2/3, seeded at 50
//! D[i]   = K[i] / 3 + D[i-1] * 2/3, seeded at 50 (D smooths K, not RSV)
//!
//! Default window: 9. RSV is NaN while the window is incomplete. An undefined
//! input leaves the filter state untouched and yields NaN for that bar only,
//! so a flat window (max == min, 0/0) marks just the bars it covers.

use crate::domain::indicator::rolling;

pub const DEFAULT_WINDOW: usize = 9;
pub const SEED: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticKd {
    pub rsv: Vec<f64>,
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn calculate_kd(high: &[f64], low: &[f64], close: &[f64], window: usize) -> StochasticKd {
    let lowest = rolling(low, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min));
    let highest = rolling(high, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    });

    let rsv: Vec<f64> = close
        .iter()
        .zip(lowest.iter().zip(&highest))
        .map(|(c, (lo, hi))| (c - lo) / (hi - lo) * 100.0)
        .collect();

    let k = smooth(&rsv);
    let d = smooth(&k);

    StochasticKd { rsv, k, d }
}

/// The one-third recursive filter shared by K and D.
fn smooth(series: &[f64]) -> Vec<f64> {
    let mut current = SEED;
    series
        .iter()
        .map(|&x| {
            if x.is_nan() {
                return x;
            }
            current = x * (1.0 / 3.0) + current * (2.0 / 3.0);
            current
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kd_warmup() {
        let high = [11.0, 12.0, 13.0, 14.0];
        let low = [9.0, 10.0, 11.0, 12.0];
        let close = [10.0, 11.0, 12.0, 13.0];
        let kd = calculate_kd(&high, &low, &close, 3);

        assert!(kd.rsv[0].is_nan() && kd.rsv[1].is_nan());
        assert!(kd.k[0].is_nan() && kd.k[1].is_nan());
        assert!(kd.d[0].is_nan() && kd.d[1].is_nan());
        assert!(!kd.k[2].is_nan());
        assert!(!kd.d[2].is_nan());
    }

    #[test]
    fn kd_recursion_from_seed() {
        let high = [11.0, 12.0, 13.0, 14.0];
        let low = [9.0, 10.0, 11.0, 12.0];
        let close = [10.0, 11.0, 12.0, 13.0];
        let kd = calculate_kd(&high, &low, &close, 3);

        // window [9..13], close 12 -> 3/4
        let rsv2 = 75.0;
        assert_relative_eq!(kd.rsv[2], rsv2);
        let k2 = rsv2 / 3.0 + SEED * 2.0 / 3.0;
        assert_relative_eq!(kd.k[2], k2, epsilon = 1e-12);
        let d2 = k2 / 3.0 + SEED * 2.0 / 3.0;
        assert_relative_eq!(kd.d[2], d2, epsilon = 1e-12);

        // window [10..14], close 13 -> 3/4
        let k3 = 75.0 / 3.0 + k2 * 2.0 / 3.0;
        assert_relative_eq!(kd.k[3], k3, epsilon = 1e-12);
        assert_relative_eq!(kd.d[3], k3 / 3.0 + d2 * 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn d_smooths_k_not_rsv() {
        let high = [10.0, 12.0, 15.0, 11.0, 13.0];
        let low = [8.0, 9.0, 10.0, 7.0, 9.0];
        let close = [9.0, 11.0, 14.0, 8.0, 12.0];
        let kd = calculate_kd(&high, &low, &close, 2);

        let mut d = SEED;
        for i in 1..5 {
            d = kd.k[i] / 3.0 + d * 2.0 / 3.0;
            assert_relative_eq!(kd.d[i], d, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_prices_leave_kd_undefined() {
        let flat = [100.0; 20];
        let kd = calculate_kd(&flat, &flat, &flat, DEFAULT_WINDOW);
        assert!(kd.rsv.iter().all(|v| v.is_nan()));
        assert!(kd.k.iter().all(|v| v.is_nan()));
        assert!(kd.d.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn flat_window_marks_only_its_bar() {
        // bars 2..=3 form a flat 2-bar window at index 3
        let high = [12.0, 14.0, 10.0, 10.0, 13.0];
        let low = [8.0, 9.0, 10.0, 10.0, 9.0];
        let close = [10.0, 13.0, 10.0, 10.0, 12.0];
        let kd = calculate_kd(&high, &low, &close, 2);

        assert!(kd.rsv[3].is_nan());
        assert!(kd.k[3].is_nan());
        assert!(kd.d[3].is_nan());

        // the filter resumes from the state at index 2
        let expected_k4 = kd.rsv[4] / 3.0 + kd.k[2] * 2.0 / 3.0;
        assert_relative_eq!(kd.k[4], expected_k4, epsilon = 1e-12);
        let expected_d4 = kd.k[4] / 3.0 + kd.d[2] * 2.0 / 3.0;
        assert_relative_eq!(kd.d[4], expected_d4, epsilon = 1e-12);
    }

    #[test]
    fn kd_stays_within_bounds() {
        let high: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + 2.0).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 4.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 1.5).collect();
        let kd = calculate_kd(&high, &low, &close, DEFAULT_WINDOW);

        for v in kd.k.iter().chain(&kd.d).filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
