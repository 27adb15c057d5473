//! Report Builder Module
//! Assembles the Markdown report document from the computed tables, fitted
//! regressions, and rendered chart images.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::stats::{OlsFit, SeriesSummary};

pub const REPORT_FILE: &str = "report.md";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the report needs for one country.
pub struct CountrySection {
    pub country: String,
    pub summaries: Vec<SeriesSummary>,
    pub fit: OlsFit,
    pub trend_chart: PathBuf,
    pub regression_chart: PathBuf,
}

/// Writes `report.md` into the output directory.
pub struct ReportBuilder {
    out_dir: PathBuf,
}

impl ReportBuilder {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
        }
    }

    pub fn write(
        &self,
        sections: &[CountrySection],
        combined_title: &str,
        combined_chart: &Path,
    ) -> Result<PathBuf, ReportError> {
        let mut doc = String::from("# COVID Cases and Deaths Report\n\n");

        for section in sections {
            doc.push_str(&Self::country_section(section));
        }

        doc.push_str(&format!(
            "## {combined_title}\n\n![{combined_title}]({})\n",
            Self::file_name(combined_chart)
        ));

        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(REPORT_FILE);
        fs::write(&path, doc)?;
        Ok(path)
    }

    fn country_section(section: &CountrySection) -> String {
        format!(
            "## {country} COVID Cases and Deaths\n\n\
             {table}\n\
             ![{country} COVID Cases and Deaths]({trend})\n\n\
             {regression}\n\
             ![{country} Deaths vs Cases]({fit_chart})\n\n",
            country = section.country,
            table = Self::summary_table(&section.summaries),
            trend = Self::file_name(&section.trend_chart),
            regression = Self::regression_section(&section.country, &section.fit),
            fit_chart = Self::file_name(&section.regression_chart),
        )
    }

    fn summary_table(summaries: &[SeriesSummary]) -> String {
        let mut table = String::from(
            "| Series | N | Min | Q1 | Median | Mean | Q3 | Max |\n\
             |---|---|---|---|---|---|---|---|\n",
        );
        for s in summaries {
            table.push_str(&format!(
                "| {} | {} | {:.1} | {:.1} | {:.1} | {:.2} | {:.1} | {:.1} |\n",
                s.name, s.count, s.min, s.q1, s.median, s.mean, s.q3, s.max
            ));
        }
        table
    }

    fn regression_section(country: &str, fit: &OlsFit) -> String {
        format!(
            "### OLS regression: {country} deaths ~ cases\n\n\
             | Term | Estimate | Std. error |\n\
             |---|---|---|\n\
             | intercept | {intercept:.4} | {intercept_se:.4} |\n\
             | cases | {slope:.6} | {slope_se:.6} |\n\n\
             n = {n}, t = {t:.2}, p = {p:.4}, R-squared = {r2:.4}\n",
            intercept = fit.intercept,
            intercept_se = fit.intercept_se,
            slope = fit.slope,
            slope_se = fit.slope_se,
            n = fit.n,
            t = fit.slope_t,
            p = fit.slope_p,
            r2 = fit.r_squared,
        )
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
