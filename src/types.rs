use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use strum::Display;
use tabled::Tabled;

use crate::derive::AgeBand;

/// One row of the source CSV before typing. Every field arrives as text so
/// numeric validation can report the offending line itself.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Industry Sector")]
    pub industry_sector: String,
    #[serde(rename = "Accident Type")]
    pub accident_type: String,
    #[serde(rename = "Accident Severity")]
    pub severity: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "DayOfWeek")]
    pub day_of_week: String,
    #[serde(rename = "Shift")]
    pub shift: String,
    #[serde(rename = "Hour Type")]
    pub hour_type: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Employee Type")]
    pub employee_type: String,
    #[serde(rename = "Critical Risk")]
    pub critical_risk: String,
    #[serde(rename = "Safety Gear")]
    pub safety_gear: String,
    #[serde(rename = "Local")]
    pub local: String,
}

/// A typed accident record. `age_band` stays `None` until the age range
/// column has been derived for the owning dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub state: String,
    pub industry_sector: String,
    pub accident_type: String,
    pub severity: String,
    pub year: i32,
    pub month: String,
    pub day_of_week: String,
    pub shift: String,
    pub hour_type: String,
    pub age: i32,
    pub gender: String,
    pub employee_type: String,
    pub critical_risk: String,
    pub safety_gear: String,
    pub local: String,
    pub age_band: Option<AgeBand>,
}

impl Record {
    /// The grouping key of this record for `column`, or `None` when the
    /// column is derived and has not been computed yet.
    pub fn value(&self, column: Column) -> Option<Cow<'_, str>> {
        let v = match column {
            Column::State => Cow::Borrowed(self.state.as_str()),
            Column::IndustrySector => Cow::Borrowed(self.industry_sector.as_str()),
            Column::AccidentType => Cow::Borrowed(self.accident_type.as_str()),
            Column::Severity => Cow::Borrowed(self.severity.as_str()),
            Column::Year => Cow::Owned(self.year.to_string()),
            Column::Month => Cow::Borrowed(self.month.as_str()),
            Column::DayOfWeek => Cow::Borrowed(self.day_of_week.as_str()),
            Column::Shift => Cow::Borrowed(self.shift.as_str()),
            Column::HourType => Cow::Borrowed(self.hour_type.as_str()),
            Column::Age => Cow::Owned(self.age.to_string()),
            Column::Gender => Cow::Borrowed(self.gender.as_str()),
            Column::EmployeeType => Cow::Borrowed(self.employee_type.as_str()),
            Column::CriticalRisk => Cow::Borrowed(self.critical_risk.as_str()),
            Column::SafetyGear => Cow::Borrowed(self.safety_gear.as_str()),
            Column::Local => Cow::Borrowed(self.local.as_str()),
            Column::AgeRange => Cow::Owned(self.age_band?.label()),
        };
        Some(v)
    }
}

/// Columns addressable by filters and aggregations. The display form is
/// the exact CSV header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
)]
pub enum Column {
    #[strum(to_string = "State")]
    State,
    #[strum(to_string = "Industry Sector")]
    IndustrySector,
    #[strum(to_string = "Accident Type")]
    AccidentType,
    #[strum(to_string = "Accident Severity")]
    Severity,
    #[strum(to_string = "Year")]
    Year,
    #[strum(to_string = "Month")]
    Month,
    #[strum(to_string = "DayOfWeek")]
    DayOfWeek,
    #[strum(to_string = "Shift")]
    Shift,
    #[strum(to_string = "Hour Type")]
    HourType,
    #[strum(to_string = "Age")]
    Age,
    #[strum(to_string = "Gender")]
    Gender,
    #[strum(to_string = "Employee Type")]
    EmployeeType,
    #[strum(to_string = "Critical Risk")]
    CriticalRisk,
    #[strum(to_string = "Safety Gear")]
    SafetyGear,
    #[strum(to_string = "Local")]
    Local,
    #[strum(to_string = "Age Range")]
    AgeRange,
}

/// How a single-column frequency is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyOrder {
    /// Ordinal columns read in key order (years ascending, months in
    /// calendar order).
    ByKey,
    /// Nominal columns read largest first; ties fall back to key order.
    ByCountDesc,
}

impl Serialize for Column {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Column {
    pub fn is_derived(self) -> bool {
        matches!(self, Column::AgeRange)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Column::Year | Column::Age)
    }

    pub fn frequency_order(self) -> FrequencyOrder {
        match self {
            Column::Year
            | Column::Age
            | Column::Month
            | Column::DayOfWeek
            | Column::AgeRange
            | Column::Severity => FrequencyOrder::ByKey,
            _ => FrequencyOrder::ByCountDesc,
        }
    }
}

/// Headline numbers of the overview tab, also written to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct OverviewMetrics {
    #[serde(rename = "TotalAccidents")]
    #[tabled(rename = "Total Accidents")]
    pub total_accidents: usize,
    #[serde(rename = "TotalStates")]
    #[tabled(rename = "Total States")]
    pub total_states: usize,
    #[serde(rename = "TotalIndustrySectors")]
    #[tabled(rename = "Total Industry Sectors")]
    pub total_industry_sectors: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub filters: BTreeMap<String, String>,
    pub overview: OverviewMetrics,
}
