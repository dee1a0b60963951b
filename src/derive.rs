// Columns computed from the raw table before aggregation.
//
// Each step consumes a dataset and returns a new one; the records
// themselves never change after load apart from gaining derived values.
use chrono::{Month, Weekday};

use crate::dataset::Dataset;
use crate::error::{DashboardError, Result};
use crate::types::Column;

pub const AGE_FLOOR: i32 = 18;
pub const AGE_STEP: i32 = 5;
pub const AGE_CEILING: i32 = 65;
pub const UNBUCKETED_LABEL: &str = "Unbucketed";

/// Age range bucket. Width-5 intervals from 18, the last one cut off at
/// 65 inclusive: `18-22, 23-27, ..., 58-62, 63-65`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBand {
    Bucket { lo: i32, hi: i32 },
    Unbucketed,
}

impl AgeBand {
    pub fn of(age: i32) -> Self {
        if !(AGE_FLOOR..=AGE_CEILING).contains(&age) {
            return AgeBand::Unbucketed;
        }
        let lo = AGE_FLOOR + (age - AGE_FLOOR) / AGE_STEP * AGE_STEP;
        AgeBand::Bucket {
            lo,
            hi: (lo + AGE_STEP - 1).min(AGE_CEILING),
        }
    }

    pub fn label(&self) -> String {
        match self {
            AgeBand::Bucket { lo, hi } => format!("{}-{}", lo, hi),
            AgeBand::Unbucketed => UNBUCKETED_LABEL.to_string(),
        }
    }

    /// Every bucket in ascending order. `Unbucketed` is not part of the
    /// declared domain; it only shows up when observed.
    pub fn buckets() -> Vec<AgeBand> {
        (AGE_FLOOR..=AGE_CEILING)
            .step_by(AGE_STEP as usize)
            .map(AgeBand::of)
            .collect()
    }
}

/// Attach the `Age Range` column and register its bucket order.
pub fn derive_age_range(dataset: Dataset) -> Dataset {
    let (mut records, mut derived, mut domains) = dataset.into_parts();
    for r in &mut records {
        r.age_band = Some(AgeBand::of(r.age));
    }
    derived.insert(Column::AgeRange);
    domains.insert(
        Column::AgeRange,
        AgeBand::buckets().iter().map(AgeBand::label).collect(),
    );
    Dataset::from_parts(records, derived, domains)
}

/// Give `column` a fixed value order used by every later sort and
/// completion step. Repeated values keep their first position.
pub fn derive_ordered_category<S: AsRef<str>>(
    dataset: Dataset,
    column: Column,
    ordered_domain: &[S],
) -> Result<Dataset> {
    dataset.require(column)?;
    if ordered_domain.is_empty() {
        return Err(DashboardError::invalid_spec(format!(
            "empty ordered domain for `{}`",
            column
        )));
    }
    let mut domain: Vec<String> = Vec::with_capacity(ordered_domain.len());
    for v in ordered_domain {
        let v = v.as_ref().to_string();
        if !domain.contains(&v) {
            domain.push(v);
        }
    }
    let (records, derived, mut domains) = dataset.into_parts();
    domains.insert(column, domain);
    Ok(Dataset::from_parts(records, derived, domains))
}

/// `January` through `December`.
pub fn calendar_months() -> Vec<String> {
    let mut month = Month::January;
    let mut out = Vec::with_capacity(12);
    for _ in 0..12 {
        out.push(month.name().to_string());
        month = month.succ();
    }
    out
}

/// `Monday` through `Sunday`.
pub fn weekdays() -> Vec<String> {
    let mut day = Weekday::Mon;
    let mut out = Vec::with_capacity(7);
    for _ in 0..7 {
        out.push(weekday_name(day).to_string());
        day = day.succ();
    }
    out
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Severity labels from least to most severe.
pub const SEVERITY_RANK: &[&str] = &[
    "Minor", "Moderate", "Serious", "Major", "Severe", "Critical", "Fatal",
];

/// Observed severities in rank order. Labels missing from
/// `SEVERITY_RANK` follow, in lexical order.
pub fn severity_order(dataset: &Dataset) -> Vec<String> {
    let rank = |v: &str| {
        SEVERITY_RANK
            .iter()
            .position(|r| r.eq_ignore_ascii_case(v))
            .unwrap_or(SEVERITY_RANK.len())
    };
    let mut observed: Vec<String> = dataset.records().iter().map(|r| r.severity.clone()).collect();
    observed.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    observed.dedup();
    observed
}

/// The derivations every dashboard view expects: age ranges, calendar and
/// week order for Month and DayOfWeek, and severity rank.
pub fn prepare(dataset: Dataset) -> Result<Dataset> {
    let dataset = derive_age_range(dataset);
    let dataset = derive_ordered_category(dataset, Column::Month, &calendar_months())?;
    let dataset = derive_ordered_category(dataset, Column::DayOfWeek, &weekdays())?;
    let severities = severity_order(&dataset);
    if severities.is_empty() {
        return Ok(dataset);
    }
    derive_ordered_category(dataset, Column::Severity, &severities)
}
