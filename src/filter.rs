// User-selected equality filters.
use std::collections::BTreeMap;
use std::fmt;

use crate::dataset::{Dataset, DatasetView};
use crate::error::{DashboardError, Result};
use crate::types::Column;

/// Columns the filter controls expose.
pub const FILTERABLE: [Column; 2] = [Column::State, Column::Severity];

pub const ALL: &str = "All";

/// One control's value: no constraint, or a single exact value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Parse a control value; the `All` sentinel means no constraint.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == ALL {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str(ALL),
            Selection::Only(v) => f.write_str(v),
        }
    }
}

/// The active constraints. Columns without an entry are unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterContext {
    constraints: BTreeMap<Column, String>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `column` set to `selection`.
    pub fn with(&self, column: Column, selection: Selection) -> Result<Self> {
        if !FILTERABLE.contains(&column) {
            return Err(DashboardError::InvalidFilter { column });
        }
        let mut next = self.clone();
        match selection {
            Selection::All => {
                next.constraints.remove(&column);
            }
            Selection::Only(v) => {
                next.constraints.insert(column, v);
            }
        }
        Ok(next)
    }

    pub fn selection(&self, column: Column) -> Selection {
        self.constraints
            .get(&column)
            .map_or(Selection::All, |v| Selection::Only(v.clone()))
    }

    pub fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Keep rows matching every constraint. Filtering an already filtered
    /// view by the same context changes nothing.
    pub fn apply<'a>(&self, view: &DatasetView<'a>) -> DatasetView<'a> {
        if self.is_unconstrained() {
            return view.clone();
        }
        let filtered = view.retain(|r| {
            self.constraints
                .iter()
                .all(|(column, want)| r.value(*column).is_some_and(|v| v == want.as_str()))
        });
        if filtered.is_empty() {
            log::debug!("Filters {} matched no rows", self.caption());
        }
        filtered
    }

    /// Title suffix describing the filters, e.g. ` - State: Kerala & Severity: Fatal`.
    pub fn caption(&self) -> String {
        if self.is_unconstrained() {
            return " (All Data)".to_string();
        }
        let parts: Vec<String> = FILTERABLE
            .iter()
            .filter_map(|c| {
                self.constraints.get(c).map(|v| match c {
                    Column::Severity => format!("Severity: {}", v),
                    _ => format!("{}: {}", c, v),
                })
            })
            .collect();
        format!(" - {}", parts.join(" & "))
    }

    /// Column name to selected value for every filterable column.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        FILTERABLE
            .iter()
            .map(|c| (c.to_string(), self.selection(*c).to_string()))
            .collect()
    }
}

/// Values offered by a filter control: `All`, then the observed values of
/// `column` in sorted order.
pub fn filter_options(dataset: &Dataset, column: Column) -> Result<Vec<String>> {
    if !FILTERABLE.contains(&column) {
        return Err(DashboardError::InvalidFilter { column });
    }
    let mut values: Vec<String> = dataset
        .records()
        .iter()
        .filter_map(|r| r.value(column).map(|v| v.into_owned()))
        .collect();
    values.sort();
    values.dedup();
    let mut out = Vec::with_capacity(values.len() + 1);
    out.push(ALL.to_string());
    out.extend(values);
    Ok(out)
}
