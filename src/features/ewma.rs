//! Exponentially weighted moving average
//!
//! Causal smoothing of one entity's chronologically ordered feature values.
//! The first observation is emitted as-is; there is no warm-up period.

use crate::{GridironError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ewma {
    alpha: f64,
    adjust: bool,
}

impl Ewma {
    /// alpha = 2 / (span + 1); span must be at least 1
    pub fn from_span(span: f64) -> Result<Self> {
        if !span.is_finite() || span < 1.0 {
            return Err(GridironError::Config(format!(
                "EWMA span must be >= 1, got {}",
                span
            )));
        }
        Ok(Ewma {
            alpha: 2.0 / (span + 1.0),
            adjust: false,
        })
    }

    /// Switch to bias-adjusted weighting:
    /// y_t = sum((1-a)^i * x_{t-i}) / sum((1-a)^i)
    pub fn with_adjust(mut self, adjust: bool) -> Self {
        self.adjust = adjust;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smooth a sequence. Output has the same length as the input.
    ///
    /// A NaN input repeats the previous smoothed value (NaN if nothing has
    /// been observed yet), but the weight of that history still decays, so
    /// the next observation after a gap counts for more.
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        let decay = 1.0 - self.alpha;
        let mut out = Vec::with_capacity(values.len());

        if self.adjust {
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for &x in values {
                numerator *= decay;
                denominator *= decay;
                if !x.is_nan() {
                    numerator += x;
                    denominator += 1.0;
                }
                out.push(if denominator > 0.0 {
                    numerator / denominator
                } else {
                    f64::NAN
                });
            }
        } else {
            let mut state: Option<f64> = None;
            // weight of `state` relative to a fresh observation's alpha
            let mut history = 1.0;
            for &x in values {
                match state {
                    None => {
                        if !x.is_nan() {
                            state = Some(x);
                        }
                    }
                    Some(prev) => {
                        history *= decay;
                        if !x.is_nan() {
                            state = Some((history * prev + self.alpha * x) / (history + self.alpha));
                            history = 1.0;
                        }
                    }
                }
                out.push(state.unwrap_or(f64::NAN));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round3(x: f64) -> f64 {
        (x * 1000.0).round() / 1000.0
    }

    #[test]
    fn test_alpha_from_span() {
        let ewma = Ewma::from_span(10.0).unwrap();
        assert!((ewma.alpha() - 2.0 / 11.0).abs() < 1e-12);
        assert_eq!(Ewma::from_span(1.0).unwrap().alpha(), 1.0);
        assert!(Ewma::from_span(0.5).is_err());
        assert!(Ewma::from_span(f64::NAN).is_err());
    }

    #[test]
    fn test_completion_percentage_scenario() {
        let raw = [10.0 / 15.0, 12.0 / 15.0, 8.0 / 10.0];
        let smoothed = Ewma::from_span(10.0).unwrap().smooth(&raw);
        assert_eq!(smoothed[0], raw[0]);
        assert_eq!(round3(smoothed[0]), 0.667);
        assert_eq!(round3(smoothed[1]), 0.691);
        assert_eq!(round3(smoothed[2]), 0.711);
    }

    #[test]
    fn test_bounded_by_history() {
        let raw = [3.0, -1.0, 7.5, 2.0, 2.0, 10.0, -4.0, 0.0];
        for adjust in [false, true] {
            let smoothed = Ewma::from_span(3.0).unwrap().with_adjust(adjust).smooth(&raw);
            assert_eq!(smoothed.len(), raw.len());
            assert_eq!(smoothed[0], raw[0]);
            for i in 0..raw.len() {
                let lo = raw[..=i].iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = raw[..=i].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                assert!(smoothed[i] >= lo - 1e-12 && smoothed[i] <= hi + 1e-12);
            }
        }
    }

    #[test]
    fn test_causal() {
        let ewma = Ewma::from_span(4.0).unwrap();
        let full = ewma.smooth(&[1.0, 2.0, 3.0, 100.0]);
        let prefix = ewma.smooth(&[1.0, 2.0, 3.0]);
        assert_eq!(&full[..3], &prefix[..]);
    }

    #[test]
    fn test_gap_decays_history() {
        let ewma = Ewma::from_span(10.0).unwrap();
        let smoothed = ewma.smooth(&[1.0, f64::NAN, 0.0]);
        assert_eq!(smoothed[0], 1.0);
        assert_eq!(smoothed[1], 1.0);
        // history decays twice across the gap: (1-a)^2 / ((1-a)^2 + a)
        let d = 1.0 - ewma.alpha();
        let expected = d * d / (d * d + ewma.alpha());
        assert!((smoothed[2] - expected).abs() < 1e-12);
        assert!((smoothed[2] - 0.7864077669902912).abs() < 1e-12);
    }

    #[test]
    fn test_leading_nan_waits_for_first_observation() {
        let smoothed = Ewma::from_span(10.0).unwrap().smooth(&[f64::NAN, 2.0, f64::NAN]);
        assert!(smoothed[0].is_nan());
        assert_eq!(smoothed[1], 2.0);
        assert_eq!(smoothed[2], 2.0);
    }

    #[test]
    fn test_adjusted_gap_decays_history() {
        // alpha = 0.5: weights 0.25 on the 1.0, 1.0 on the 0.0
        let smoothed = Ewma::from_span(3.0)
            .unwrap()
            .with_adjust(true)
            .smooth(&[1.0, f64::NAN, 0.0]);
        assert_eq!(smoothed[1], 1.0);
        assert!((smoothed[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_adjusted_weights() {
        let ewma = Ewma::from_span(3.0).unwrap().with_adjust(true);
        // alpha = 0.5: (2 + 0.5 * 1) / 1.5
        let smoothed = ewma.smooth(&[1.0, 2.0]);
        assert_eq!(smoothed[0], 1.0);
        assert!((smoothed[1] - 2.5 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert!(Ewma::from_span(10.0).unwrap().smooth(&[]).is_empty());
    }
}
