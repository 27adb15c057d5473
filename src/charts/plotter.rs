//! Chart Plotter Module
//! Renders the report charts as PNG images with plotters.

use chrono::NaiveDate;
use plotters::prelude::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::aggregator::{CountrySeries, CASES, DEATHS};
use crate::data::reshaper::DATE;
use crate::stats::OlsFit;

const CHART_SIZE: (u32, u32) = (1024, 640);

/// Series colors: cases then deaths, first country then second.
const SERIES_PALETTE: [RGBColor; 4] = [BLUE, RED, GREEN, MAGENTA];

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render {}: {message}", path.display())]
    Draw { path: PathBuf, message: String },
    #[error("Nothing to plot for {0}")]
    EmptySeries(String),
}

/// Renders PNG charts into the report output directory.
pub struct ChartRenderer {
    out_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
        }
    }

    /// Per-country time-series chart: cumulative cases and deaths over the
    /// full date range, log-scaled y axis.
    /// Title: "{country} COVID Cases and Deaths".
    pub fn country_chart(&self, series: &CountrySeries) -> Result<PathBuf, ChartError> {
        let title = format!("{} COVID Cases and Deaths", series.country);
        let cases = Self::date_points(&series.table, CASES)?;
        let deaths = Self::date_points(&series.table, DEATHS)?;
        let labeled = vec![
            (format!("{} cases", series.country), cases),
            (format!("{} deaths", series.country), deaths),
        ];
        self.time_series_chart(
            &format!("{}_cases_deaths.png", Self::slug(&series.country)),
            &title,
            &labeled,
        )
    }

    /// Combined comparison chart: cases and deaths for every country, four
    /// series on one log-scaled axis.
    pub fn combined_chart(
        &self,
        all: &[CountrySeries],
        title: &str,
    ) -> Result<PathBuf, ChartError> {
        let mut labeled = Vec::new();
        for series in all {
            labeled.push((
                format!("{} cases", series.country),
                Self::date_points(&series.table, CASES)?,
            ));
            labeled.push((
                format!("{} deaths", series.country),
                Self::date_points(&series.table, DEATHS)?,
            ));
        }
        self.time_series_chart("combined_cases_deaths.png", title, &labeled)
    }

    /// Regression overlay chart keyed by cumulative cases on the x axis:
    /// actual deaths as a scatter, the fitted line as predictions.
    pub fn regression_chart(
        &self,
        series: &CountrySeries,
        fit: &OlsFit,
    ) -> Result<PathBuf, ChartError> {
        let x = crate::stats::StatsCalculator::column_values(&series.table, CASES);
        let y = crate::stats::StatsCalculator::column_values(&series.table, DEATHS);
        if x.is_empty() {
            return Err(ChartError::EmptySeries(series.country.clone()));
        }

        let path = self.chart_path(&format!("{}_regression.png", Self::slug(&series.country)))?;
        let title = format!("{} Deaths vs Cases (OLS)", series.country);

        let x_max = x.iter().cloned().fold(f64::MIN, f64::max) * 1.05;
        let y_max = y
            .iter()
            .chain([fit.predict(x_max)].iter())
            .cloned()
            .fold(1.0f64, f64::max)
            * 1.1;

        let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(|e| Self::draw(&path, e))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 26))
            .margin(12)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, 0.0..y_max)
            .map_err(|e| Self::draw(&path, e))?;

        chart
            .configure_mesh()
            .x_desc("Cumulative cases")
            .y_desc("Cumulative deaths")
            .draw()
            .map_err(|e| Self::draw(&path, e))?;

        chart
            .draw_series(
                x.iter()
                    .zip(y.iter())
                    .map(|(&xv, &yv)| Circle::new((xv, yv), 3, BLUE.filled())),
            )
            .map_err(|e| Self::draw(&path, e))?
            .label("actual deaths")
            .legend(|(x, y)| Circle::new((x + 9, y), 3, BLUE.filled()));

        let mut fit_points: Vec<(f64, f64)> =
            x.iter().map(|&xv| (xv, fit.predict(xv))).collect();
        fit_points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        chart
            .draw_series(LineSeries::new(fit_points, &RED))
            .map_err(|e| Self::draw(&path, e))?
            .label("predicted deaths")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], RED));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .border_style(BLACK)
            .background_style(WHITE.mix(0.85))
            .draw()
            .map_err(|e| Self::draw(&path, e))?;

        root.present().map_err(|e| Self::draw(&path, e))?;
        drop(chart);
        drop(root);
        Ok(path)
    }

    fn time_series_chart(
        &self,
        file_name: &str,
        title: &str,
        labeled: &[(String, Vec<(NaiveDate, f64)>)],
    ) -> Result<PathBuf, ChartError> {
        let path = self.chart_path(file_name)?;

        let mut first: Option<NaiveDate> = None;
        let mut last: Option<NaiveDate> = None;
        let mut y_max = 1.0f64;
        for (_, points) in labeled {
            for &(date, value) in points {
                first = Some(first.map_or(date, |d| d.min(date)));
                last = Some(last.map_or(date, |d| d.max(date)));
                y_max = y_max.max(value);
            }
        }
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(ChartError::EmptySeries(title.to_string())),
        };
        let last = last + chrono::Duration::days(1);

        let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(|e| Self::draw(&path, e))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 26))
            .margin(12)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(first..last, (1.0..y_max * 1.5).log_scale())
            .map_err(|e| Self::draw(&path, e))?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Cumulative count (log scale)")
            .x_labels(8)
            .x_label_formatter(&|d: &NaiveDate| d.format("%m/%d/%y").to_string())
            .draw()
            .map_err(|e| Self::draw(&path, e))?;

        for (i, (label, points)) in labeled.iter().enumerate() {
            let color = SERIES_PALETTE[i % SERIES_PALETTE.len()];
            // log(0) is undefined, so zero-valued observations are not drawn
            let drawable: Vec<(NaiveDate, f64)> = points
                .iter()
                .filter(|(_, v)| *v > 0.0)
                .cloned()
                .collect();
            chart
                .draw_series(LineSeries::new(drawable, &color))
                .map_err(|e| Self::draw(&path, e))?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .border_style(BLACK)
            .background_style(WHITE.mix(0.85))
            .draw()
            .map_err(|e| Self::draw(&path, e))?;

        root.present().map_err(|e| Self::draw(&path, e))?;
        drop(chart);
        drop(root);
        Ok(path)
    }

    /// (date, value) pairs for one column of a country-day table, nulls and
    /// unmatched rows skipped.
    pub fn date_points(
        df: &DataFrame,
        column: &str,
    ) -> Result<Vec<(NaiveDate, f64)>, ChartError> {
        let dates = df.column(DATE)?.as_materialized_series().date()?.as_date_iter();
        let values = df.column(column)?.cast(&DataType::Float64)?;
        let values_ca = values.f64()?;

        Ok(dates
            .zip(values_ca.into_iter())
            .filter_map(|(date, value)| Some((date?, value?)))
            .collect())
    }

    fn chart_path(&self, file_name: &str) -> Result<PathBuf, ChartError> {
        std::fs::create_dir_all(&self.out_dir)?;
        Ok(self.out_dir.join(file_name))
    }

    fn slug(country: &str) -> String {
        country.to_lowercase().replace(' ', "_")
    }

    fn draw(path: &Path, e: impl std::fmt::Display) -> ChartError {
        ChartError::Draw {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}
