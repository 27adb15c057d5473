//! OLS Regression Module
//! Ordinary least squares of cumulative deaths on cumulative cases.

use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("Regression needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("Regression predictor has zero variance")]
    ZeroVariance,
    #[error("Mismatched input lengths: {x} x values vs {y} y values")]
    MismatchedLengths { x: usize, y: usize },
}

/// Fitted line y = intercept + slope * x with its coefficient statistics.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub slope_se: f64,
    pub intercept_se: f64,
    pub slope_t: f64,
    pub slope_p: f64,
    pub r_squared: f64,
}

impl OlsFit {
    /// Fit deaths ~ cases by ordinary least squares.
    ///
    /// Degenerate input is rejected rather than producing a NaN fit: fewer
    /// than three points leaves no residual degree of freedom, and a constant
    /// predictor has no defined slope.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, RegressionError> {
        if x.len() != y.len() {
            return Err(RegressionError::MismatchedLengths {
                x: x.len(),
                y: y.len(),
            });
        }
        let n = x.len();
        if n < 3 {
            return Err(RegressionError::TooFewPoints(n));
        }

        let nf = n as f64;
        let x_mean = x.iter().sum::<f64>() / nf;
        let y_mean = y.iter().sum::<f64>() / nf;

        let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
        let syy: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
        let sxy: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(xv, yv)| (xv - x_mean) * (yv - y_mean))
            .sum();

        if sxx == 0.0 {
            return Err(RegressionError::ZeroVariance);
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let rss: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(xv, yv)| {
                let predicted = intercept + slope * xv;
                (yv - predicted).powi(2)
            })
            .sum();

        let df = nf - 2.0;
        let sigma2 = rss / df;
        let slope_se = (sigma2 / sxx).sqrt();
        let intercept_se = (sigma2 * (1.0 / nf + x_mean.powi(2) / sxx)).sqrt();

        // a constant response is fit exactly by the flat line
        let r_squared = if syy == 0.0 { 1.0 } else { 1.0 - rss / syy };

        let slope_t = if slope_se > 0.0 {
            slope / slope_se
        } else {
            f64::INFINITY
        };
        let slope_p = match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) if slope_t.is_finite() => 2.0 * (1.0 - dist.cdf(slope_t.abs())),
            _ => 0.0,
        };

        Ok(Self {
            n,
            slope,
            intercept,
            slope_se,
            intercept_se,
            slope_t,
            slope_p,
            r_squared,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfectly_linear_data_recovers_slope_and_unit_r_squared() {
        let x: Vec<f64> = (1..=50).map(|v| (v * 100) as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.01 * v).collect();
        let fit = OlsFit::fit(&x, &y).unwrap();
        assert!((fit.slope - 0.01).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn noisy_data_has_positive_standard_errors() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.1, 1.9, 3.2, 3.8, 5.1];
        let fit = OlsFit::fit(&x, &y).unwrap();
        assert!(fit.slope_se > 0.0);
        assert!(fit.intercept_se > 0.0);
        assert!(fit.slope_p < 0.05);
        assert!(fit.r_squared > 0.9 && fit.r_squared < 1.0);
    }

    #[test]
    fn predict_applies_the_fitted_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = OlsFit::fit(&x, &y).unwrap();
        assert!((fit.predict(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_points_are_rejected() {
        let err = OlsFit::fit(&[1.0, 2.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, RegressionError::TooFewPoints(2)));
    }

    #[test]
    fn constant_predictor_is_rejected() {
        let err = OlsFit::fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, RegressionError::ZeroVariance));
    }

    #[test]
    fn constant_response_fits_exactly() {
        let fit = OlsFit::fit(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 4.0);
        assert_eq!(fit.r_squared, 1.0);
    }
}
