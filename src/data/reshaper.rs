//! Reshaper Module
//! Pivots the raw wide tables (one column per date) into long form.

use polars::prelude::*;
use thiserror::Error;

use crate::data::fetcher::ID_COLUMNS;

/// Canonical identifier column names in the long tables.
pub const PROVINCE: &str = "province";
pub const COUNTRY: &str = "country";
pub const DATE: &str = "date";

#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub struct Reshaper;

impl Reshaper {
    /// List the date-label columns of a wide table, in source order.
    pub fn date_columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|n| !ID_COLUMNS.contains(&n.as_str()))
            .collect()
    }

    /// Pivot a wide metric table into long form.
    ///
    /// Output columns: [province, country, date, {value_name}]. Lat/Long are
    /// dropped. Every (row, date column) cell becomes exactly one output row,
    /// so R rows with D date columns yield R*D long rows. A missing province
    /// (whole-country row) becomes an empty-string marker; grouping downstream
    /// is by country, so no special handling is needed.
    pub fn wide_to_long(df: &DataFrame, value_name: &str) -> Result<DataFrame, ReshapeError> {
        let date_cols = Self::date_columns(df);

        let province_series = df.column(ID_COLUMNS[0])?;
        let country_series = df.column(ID_COLUMNS[1])?;

        let mut provinces: Vec<String> = Vec::new();
        let mut countries: Vec<String> = Vec::new();
        let mut dates: Vec<String> = Vec::new();
        let mut values: Vec<Option<i64>> = Vec::new();

        for date_col in &date_cols {
            let value_i64 = df.column(date_col)?.cast(&DataType::Int64)?;
            let value_ca = value_i64.i64()?;

            for i in 0..df.height() {
                let province = match province_series.get(i)? {
                    v if v.is_null() => String::new(),
                    v => v.to_string().trim_matches('"').to_string(),
                };
                let country = country_series.get(i)?.to_string().trim_matches('"').to_string();

                provinces.push(province);
                countries.push(country);
                dates.push(date_col.clone());
                values.push(value_ca.get(i));
            }
        }

        let df = DataFrame::new(vec![
            Column::new(PROVINCE.into(), provinces),
            Column::new(COUNTRY.into(), countries),
            Column::new(DATE.into(), dates),
            Column::new(value_name.into(), values),
        ])?;

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_fixture() -> DataFrame {
        df!(
            "Province/State" => [Some("Gotland"), None],
            "Country/Region" => ["Sweden", "Iceland"],
            "Lat" => [57.5, 64.9],
            "Long" => [18.4, -19.0],
            "1/22/20" => [1i64, 0],
            "1/23/20" => [2i64, 4],
            "1/24/20" => [3i64, 9],
        )
        .unwrap()
    }

    #[test]
    fn long_table_has_rows_times_dates_rows() {
        let wide = wide_fixture();
        let long = Reshaper::wide_to_long(&wide, "cases").unwrap();
        // 2 rows x 3 date columns
        assert_eq!(long.height(), 6);
        assert_eq!(
            long.get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
            [PROVINCE, COUNTRY, DATE, "cases"]
        );
    }

    #[test]
    fn geospatial_columns_are_dropped_and_ids_renamed() {
        let long = Reshaper::wide_to_long(&wide_fixture(), "cases").unwrap();
        assert!(long.column("Lat").is_err());
        assert!(long.column("Long").is_err());
        assert!(long.column("Province/State").is_err());
        assert!(long.column(PROVINCE).is_ok());
        assert!(long.column(COUNTRY).is_ok());
    }

    #[test]
    fn missing_province_becomes_empty_marker() {
        let long = Reshaper::wide_to_long(&wide_fixture(), "cases").unwrap();
        let provinces = long.column(PROVINCE).unwrap();
        let provinces = provinces.str().unwrap();
        let empty = provinces
            .into_iter()
            .filter(|p| *p == Some(""))
            .count();
        // the Iceland row appears once per date column
        assert_eq!(empty, 3);
    }

    #[test]
    fn values_follow_their_date_column() {
        let long = Reshaper::wide_to_long(&wide_fixture(), "cases").unwrap();
        let filtered = long
            .lazy()
            .filter(col(COUNTRY).eq(lit("Iceland")).and(col(DATE).eq(lit("1/24/20"))))
            .collect()
            .unwrap();
        assert_eq!(filtered.height(), 1);
        let v = filtered.column("cases").unwrap().i64().unwrap().get(0);
        assert_eq!(v, Some(9));
    }
}
