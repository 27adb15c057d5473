//! Charts module - static chart rendering

pub mod plotter;

pub use plotter::{ChartError, ChartRenderer};
