//! Report module - Markdown document assembly

pub mod builder;

pub use builder::{CountrySection, ReportBuilder};
