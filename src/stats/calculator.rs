//! Statistics Calculator Module
//! Descriptive statistics over the country-day tables.

use polars::prelude::*;

/// Five-number summary plus mean for one column of a country-day table.
#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub name: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub q3: f64,
    pub max: f64,
}

impl Default for SeriesSummary {
    fn default() -> Self {
        Self {
            name: String::new(),
            count: 0,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            mean: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
        }
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute the summary for an array of values.
    pub fn summarize(name: &str, values: &[f64]) -> SeriesSummary {
        let n = values.len();
        if n == 0 {
            return SeriesSummary {
                name: name.to_string(),
                ..SeriesSummary::default()
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;

        SeriesSummary {
            name: name.to_string(),
            count: n,
            min: sorted[0],
            q1: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            mean,
            q3: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Extract a numeric column from a DataFrame as f64 values, nulls dropped.
    pub fn column_values(df: &DataFrame, column: &str) -> Vec<f64> {
        df.column(column)
            .ok()
            .and_then(|col| col.cast(&DataType::Float64).ok())
            .map(|col| {
                col.f64()
                    .ok()
                    .map(|ca| ca.into_iter().flatten().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Summaries for the named columns of a table, in order.
    pub fn summarize_columns(df: &DataFrame, columns: &[&str]) -> Vec<SeriesSummary> {
        columns
            .iter()
            .map(|column| Self::summarize(column, &Self::column_values(df, column)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_known_values() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let s = StatsCalculator::summarize("cases", &values);
        assert_eq!(s.count, 4);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        // NumPy-style interpolated quartiles
        assert!((s.q1 - 1.75).abs() < 1e-12);
        assert!((s.q3 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn odd_length_median_is_middle_element() {
        let s = StatsCalculator::summarize("x", &[5.0, 1.0, 3.0]);
        assert_eq!(s.median, 3.0);
    }

    #[test]
    fn empty_input_yields_nan_summary() {
        let s = StatsCalculator::summarize("deaths", &[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan());
    }

    #[test]
    fn column_values_casts_integers_and_skips_nulls() {
        let df = df!("cases" => [Some(1i64), None, Some(3)]).unwrap();
        let values = StatsCalculator::column_values(&df, "cases");
        assert_eq!(values, [1.0, 3.0]);
    }
}
