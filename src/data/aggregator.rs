//! Aggregator Module
//! Joins the long metric tables, collapses provinces to national totals, and
//! derives day-over-day deltas per target country.

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

use crate::data::reshaper::{COUNTRY, DATE, PROVINCE};

pub const CASES: &str = "cases";
pub const DEATHS: &str = "deaths";
pub const NEW_CASES: &str = "new_cases";
pub const NEW_DEATHS: &str = "new_deaths";

/// Date label format of the source column headers, e.g. "1/22/20".
pub const DATE_LABEL_FORMAT: &str = "%m/%d/%y";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Unparseable date label {label:?}: {source}")]
    BadDateLabel {
        label: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Null date label in joined table")]
    NullDateLabel,
    #[error("No rows for country {0:?} after filtering")]
    EmptyCountry(String),
}

/// Country-day table for one target country, ordered by date.
///
/// Columns: [date, cases, deaths, new_cases, new_deaths]. The first day of the
/// country's series is absent because its first difference is undefined.
#[derive(Debug)]
pub struct CountrySeries {
    pub country: String,
    pub table: DataFrame,
}

pub struct Aggregator;

impl Aggregator {
    /// Full outer join of the cases and deaths long tables on
    /// (province, country, date). A row present in only one table keeps a null
    /// for the missing metric; that is surfaced, not treated as an error.
    pub fn join_metrics(
        cases_long: &DataFrame,
        deaths_long: &DataFrame,
    ) -> Result<DataFrame, AggregateError> {
        let keys = [col(PROVINCE), col(COUNTRY), col(DATE)];
        let joined = cases_long
            .clone()
            .lazy()
            .join(
                deaths_long.clone().lazy(),
                keys.clone(),
                keys,
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            )
            .collect()?;
        Ok(joined)
    }

    /// Parse the M/D/YY date labels into a calendar-date column in place.
    pub fn parse_dates(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let labels = df.column(DATE)?.str()?;
        let mut dates: Vec<NaiveDate> = Vec::with_capacity(labels.len());
        for label in labels.into_iter() {
            let label = label.ok_or(AggregateError::NullDateLabel)?;
            let date = NaiveDate::parse_from_str(label, DATE_LABEL_FORMAT).map_err(|source| {
                AggregateError::BadDateLabel {
                    label: label.to_string(),
                    source,
                }
            })?;
            dates.push(date);
        }

        let mut df = df.clone();
        df.with_column(Series::new(DATE.into(), dates))?;
        Ok(df)
    }

    /// Drop rows with cases <= 0 (pre-outbreak and cleanup rows, plus join
    /// rows that had no cases record), then sum cases and deaths over
    /// provinces per (country, date).
    pub fn national_totals(joined: &DataFrame) -> Result<DataFrame, AggregateError> {
        let totals = joined
            .clone()
            .lazy()
            .filter(col(CASES).gt(lit(0)))
            .group_by([col(COUNTRY), col(DATE)])
            .agg([col(CASES).sum(), col(DEATHS).sum()])
            .sort([COUNTRY, DATE], Default::default())
            .collect()?;
        Ok(totals)
    }

    /// Restrict the national totals to one country, order by date, and append
    /// first-difference columns. The first row is dropped; deltas may be
    /// negative when the source revises a cumulative count downward, and are
    /// passed through as-is.
    pub fn country_deltas(
        totals: &DataFrame,
        country: &str,
    ) -> Result<CountrySeries, AggregateError> {
        let df = totals
            .clone()
            .lazy()
            .filter(col(COUNTRY).eq(lit(country)))
            .sort([DATE], Default::default())
            .select([col(DATE), col(CASES), col(DEATHS)])
            .collect()?;

        let height = df.height();
        if height < 2 {
            return Err(AggregateError::EmptyCountry(country.to_string()));
        }

        let cases_ca = df.column(CASES)?.i64()?;
        let deaths_ca = df.column(DEATHS)?.i64()?;

        // cases are non-null after the positivity filter; an all-null deaths
        // group sums to zero, so both unwraps fall back to 0 only vacuously
        let mut new_cases: Vec<i64> = Vec::with_capacity(height - 1);
        let mut new_deaths: Vec<i64> = Vec::with_capacity(height - 1);
        for i in 1..height {
            new_cases.push(cases_ca.get(i).unwrap_or(0) - cases_ca.get(i - 1).unwrap_or(0));
            new_deaths.push(deaths_ca.get(i).unwrap_or(0) - deaths_ca.get(i - 1).unwrap_or(0));
        }

        let mut table = df.slice(1, height - 1);
        table.with_column(Column::new(NEW_CASES.into(), new_cases))?;
        table.with_column(Column::new(NEW_DEATHS.into(), new_deaths))?;

        Ok(CountrySeries {
            country: country.to_string(),
            table,
        })
    }

    /// Run the whole aggregation stage: join, parse, filter, sum, and derive
    /// deltas for each target country in order.
    pub fn build(
        cases_long: &DataFrame,
        deaths_long: &DataFrame,
        countries: &[String],
    ) -> Result<Vec<CountrySeries>, AggregateError> {
        let joined = Self::join_metrics(cases_long, deaths_long)?;
        let joined = Self::parse_dates(&joined)?;
        let totals = Self::national_totals(&joined)?;

        countries
            .iter()
            .map(|country| Self::country_deltas(&totals, country))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reshaper::Reshaper;

    fn long_fixture(value_name: &str, values: [[i64; 2]; 3]) -> DataFrame {
        // two provinces of one country over three days
        df!(
            PROVINCE => ["North", "South", "North", "South", "North", "South"],
            COUNTRY => ["Malta"; 6],
            DATE => ["1/22/20", "1/22/20", "1/23/20", "1/23/20", "1/24/20", "1/24/20"],
            value_name => [
                values[0][0], values[0][1],
                values[1][0], values[1][1],
                values[2][0], values[2][1],
            ],
        )
        .unwrap()
    }

    #[test]
    fn provinces_sum_to_national_totals() {
        let cases = long_fixture(CASES, [[10, 20], [30, 40], [50, 60]]);
        let deaths = long_fixture(DEATHS, [[1, 2], [3, 4], [5, 6]]);

        let joined = Aggregator::join_metrics(&cases, &deaths).unwrap();
        let joined = Aggregator::parse_dates(&joined).unwrap();
        let totals = Aggregator::national_totals(&joined).unwrap();

        assert_eq!(totals.height(), 3);
        let first_cases = totals.column(CASES).unwrap().i64().unwrap().get(0);
        let first_deaths = totals.column(DEATHS).unwrap().i64().unwrap().get(0);
        assert_eq!(first_cases, Some(30));
        assert_eq!(first_deaths, Some(3));
    }

    #[test]
    fn each_country_day_appears_at_most_once() {
        let cases = long_fixture(CASES, [[10, 20], [30, 40], [50, 60]]);
        let deaths = long_fixture(DEATHS, [[1, 2], [3, 4], [5, 6]]);

        let joined = Aggregator::join_metrics(&cases, &deaths).unwrap();
        let joined = Aggregator::parse_dates(&joined).unwrap();
        let totals = Aggregator::national_totals(&joined).unwrap();

        let deduped = totals
            .clone()
            .lazy()
            .group_by([col(COUNTRY), col(DATE)])
            .agg([col(CASES).count().alias("n")])
            .collect()
            .unwrap();
        let max_n = deduped.column("n").unwrap().u32().unwrap().max();
        assert_eq!(max_n, Some(1));
    }

    #[test]
    fn zero_case_rows_are_filtered_out() {
        let cases = df!(
            PROVINCE => ["", "", ""],
            COUNTRY => ["Iceland"; 3],
            DATE => ["1/22/20", "1/23/20", "1/24/20"],
            CASES => [0i64, 5, 8],
        )
        .unwrap();
        let deaths = df!(
            PROVINCE => ["", "", ""],
            COUNTRY => ["Iceland"; 3],
            DATE => ["1/22/20", "1/23/20", "1/24/20"],
            DEATHS => [0i64, 1, 2],
        )
        .unwrap();

        let joined = Aggregator::join_metrics(&cases, &deaths).unwrap();
        let joined = Aggregator::parse_dates(&joined).unwrap();
        let totals = Aggregator::national_totals(&joined).unwrap();

        assert_eq!(totals.height(), 2);
        let min_cases = totals.column(CASES).unwrap().i64().unwrap().min();
        assert!(min_cases.unwrap() > 0);
    }

    #[test]
    fn unmatched_deaths_row_keeps_null_cases_and_is_filtered() {
        let cases = df!(
            PROVINCE => ["", ""],
            COUNTRY => ["Iceland"; 2],
            DATE => ["1/23/20", "1/24/20"],
            CASES => [5i64, 8],
        )
        .unwrap();
        // an extra day only the deaths table knows about
        let deaths = df!(
            PROVINCE => ["", "", ""],
            COUNTRY => ["Iceland"; 3],
            DATE => ["1/22/20", "1/23/20", "1/24/20"],
            DEATHS => [1i64, 1, 2],
        )
        .unwrap();

        let joined = Aggregator::join_metrics(&cases, &deaths).unwrap();
        assert_eq!(joined.height(), 3);
        let joined = Aggregator::parse_dates(&joined).unwrap();
        let totals = Aggregator::national_totals(&joined).unwrap();
        assert_eq!(totals.height(), 2);
    }

    #[test]
    fn date_labels_parse_as_month_day_two_digit_year() {
        let df = df!(
            PROVINCE => [""],
            COUNTRY => ["Iceland"],
            DATE => ["1/22/20"],
            CASES => [1i64],
        )
        .unwrap();
        let parsed = Aggregator::parse_dates(&df).unwrap();
        let date = parsed
            .column(DATE)
            .unwrap()
            .as_materialized_series()
            .date()
            .unwrap()
            .as_date_iter()
            .next()
            .flatten()
            .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 1, 22).unwrap());
    }

    #[test]
    fn deltas_are_first_differences_with_first_day_dropped() {
        let cases = long_fixture(CASES, [[10, 20], [30, 40], [50, 61]]);
        let deaths = long_fixture(DEATHS, [[1, 2], [3, 4], [5, 6]]);

        let series = Aggregator::build(&cases, &deaths, &["Malta".to_string()]).unwrap();
        let table = &series[0].table;

        assert_eq!(table.height(), 2);
        let new_cases: Vec<i64> = table
            .column(NEW_CASES)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let new_deaths: Vec<i64> = table
            .column(NEW_DEATHS)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        // day2: 70-30, day3: 111-70
        assert_eq!(new_cases, [40, 41]);
        assert_eq!(new_deaths, [4, 4]);
    }

    #[test]
    fn end_to_end_from_wide_tables() {
        let wide_cases = df!(
            "Province/State" => [None::<&str>],
            "Country/Region" => ["Iceland"],
            "Lat" => [64.9],
            "Long" => [-19.0],
            "1/22/20" => [5i64],
            "1/23/20" => [15i64],
            "1/24/20" => [40i64],
        )
        .unwrap();
        let wide_deaths = df!(
            "Province/State" => [None::<&str>],
            "Country/Region" => ["Iceland"],
            "Lat" => [64.9],
            "Long" => [-19.0],
            "1/22/20" => [1i64],
            "1/23/20" => [2i64],
            "1/24/20" => [5i64],
        )
        .unwrap();

        let cases_long = Reshaper::wide_to_long(&wide_cases, CASES).unwrap();
        let deaths_long = Reshaper::wide_to_long(&wide_deaths, DEATHS).unwrap();
        let series = Aggregator::build(&cases_long, &deaths_long, &["Iceland".to_string()])
            .unwrap();

        let table = &series[0].table;
        assert_eq!(table.height(), 2);
        let new_cases: Vec<i64> = table
            .column(NEW_CASES)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let new_deaths: Vec<i64> = table
            .column(NEW_DEATHS)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(new_cases, [10, 25]);
        assert_eq!(new_deaths, [1, 3]);
    }

    #[test]
    fn unknown_country_is_an_error() {
        let cases = long_fixture(CASES, [[10, 20], [30, 40], [50, 60]]);
        let deaths = long_fixture(DEATHS, [[1, 2], [3, 4], [5, 6]]);
        let err = Aggregator::build(&cases, &deaths, &["Atlantis".to_string()]).unwrap_err();
        assert!(matches!(err, AggregateError::EmptyCountry(_)));
    }
}
