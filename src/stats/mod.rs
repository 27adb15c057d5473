//! Stats module - descriptive statistics and regression

pub mod calculator;
pub mod regression;

pub use calculator::{SeriesSummary, StatsCalculator};
pub use regression::{OlsFit, RegressionError};
