//! CSV Fetcher Module
//! Downloads the remote time-series CSVs and parses them with Polars.

use polars::prelude::*;
use std::io::Cursor;
use thiserror::Error;
use tracing::info;

use crate::config::SourceUrls;

/// Identifier columns every source table must carry, in order.
pub const ID_COLUMNS: [&str; 4] = ["Province/State", "Country/Region", "Lat", "Long"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Schema drift in {url}: missing columns {missing:?}")]
    SchemaDrift { url: String, missing: Vec<String> },
    #[error("No date columns in {url}")]
    NoDateColumns { url: String },
}

/// The three raw wide tables, as downloaded.
pub struct RawTables {
    pub confirmed: DataFrame,
    pub deaths: DataFrame,
    pub recovered: DataFrame,
}

/// Downloads CSV resources into DataFrames. Any failure aborts the run;
/// this is a manually-run report, so there is no retry.
pub struct DataFetcher {
    client: reqwest::blocking::Client,
}

impl Default for DataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DataFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch confirmed, deaths, and recovered tables in order.
    pub fn fetch_all(&self, sources: &SourceUrls) -> Result<RawTables, FetchError> {
        Ok(RawTables {
            confirmed: self.fetch_csv(&sources.confirmed)?,
            deaths: self.fetch_csv(&sources.deaths)?,
            recovered: self.fetch_csv(&sources.recovered)?,
        })
    }

    /// Download one CSV resource and parse it into a validated DataFrame.
    pub fn fetch_csv(&self, url: &str) -> Result<DataFrame, FetchError> {
        info!("Fetching {url}");
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let df = Self::parse_csv(&body)?;
        Self::check_schema(url, &df)?;
        info!("Parsed {} with {} rows", url, df.height());
        Ok(df)
    }

    /// Parse CSV text into a DataFrame.
    pub fn parse_csv(text: &str) -> Result<DataFrame, FetchError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .into_reader_with_file_handle(Cursor::new(text.as_bytes()))
            .finish()?;
        Ok(df)
    }

    /// Verify the identifier columns are present and at least one date column
    /// follows them. Schema drift is fatal.
    pub fn check_schema(url: &str, df: &DataFrame) -> Result<(), FetchError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<String> = ID_COLUMNS
            .iter()
            .filter(|id| !names.iter().any(|n| n == *id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FetchError::SchemaDrift {
                url: url.to_string(),
                missing,
            });
        }

        let date_cols = names
            .iter()
            .filter(|n| !ID_COLUMNS.contains(&n.as_str()))
            .count();
        if date_cols == 0 {
            return Err(FetchError::NoDateColumns {
                url: url.to_string(),
            });
        }

        Ok(())
    }
}
