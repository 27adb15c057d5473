//! epicurve - COVID time-series analysis & regression report generator
//!
//! Single-pass pipeline, run to completion once per invocation:
//! fetch the three source CSVs, reshape wide to long, join and aggregate to
//! national country-day totals with day-over-day deltas, then emit summary
//! statistics, charts, and two OLS regressions as a Markdown report.

mod charts;
mod config;
mod data;
mod report;
mod stats;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use charts::ChartRenderer;
use config::ReportConfig;
use data::aggregator::{CASES, DEATHS, NEW_CASES, NEW_DEATHS};
use data::{Aggregator, DataFetcher, Reshaper};
use report::{CountrySection, ReportBuilder};
use stats::{OlsFit, StatsCalculator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ReportConfig::load().context("loading configuration")?;
    run(&config)
}

fn run(config: &ReportConfig) -> Result<()> {
    let fetcher = DataFetcher::new();
    let raw = fetcher
        .fetch_all(&config.sources)
        .context("fetching source tables")?;
    info!(
        "Fetched wide tables: {} confirmed, {} deaths, {} recovered rows",
        raw.confirmed.height(),
        raw.deaths.height(),
        raw.recovered.height()
    );

    let cases_long = Reshaper::wide_to_long(&raw.confirmed, CASES)?;
    let deaths_long = Reshaper::wide_to_long(&raw.deaths, DEATHS)?;
    info!(
        "Reshaped to long form: {} case rows, {} death rows",
        cases_long.height(),
        deaths_long.height()
    );

    let series = Aggregator::build(&cases_long, &deaths_long, &config.countries)?;
    for s in &series {
        info!("{}: {} country-days after aggregation", s.country, s.table.height());
    }

    let renderer = ChartRenderer::new(&config.output_dir);
    let mut sections = Vec::new();
    for s in &series {
        let summaries =
            StatsCalculator::summarize_columns(&s.table, &[CASES, DEATHS, NEW_CASES, NEW_DEATHS]);

        let x = StatsCalculator::column_values(&s.table, CASES);
        let y = StatsCalculator::column_values(&s.table, DEATHS);
        let fit = OlsFit::fit(&x, &y)
            .with_context(|| format!("fitting deaths ~ cases for {}", s.country))?;
        info!(
            "{}: slope {:.6}, intercept {:.4}, R-squared {:.4}",
            s.country, fit.slope, fit.intercept, fit.r_squared
        );

        let trend_chart = renderer.country_chart(s)?;
        let regression_chart = renderer.regression_chart(s, &fit)?;

        sections.push(CountrySection {
            country: s.country.clone(),
            summaries,
            fit,
            trend_chart,
            regression_chart,
        });
    }

    let combined_title = config.combined_title();
    let combined_chart = renderer.combined_chart(&series, &combined_title)?;

    let report_path = ReportBuilder::new(&config.output_dir).write(
        &sections,
        &combined_title,
        &combined_chart,
    )?;
    info!("Report written to {}", report_path.display());

    Ok(())
}
