use crate::dataset::Dataset;
use crate::derive;
use crate::error::{DashboardError, Result};
use crate::types::{RawRow, Record};
use crate::util::parse_i32_safe;
use csv::ReaderBuilder;
use once_cell::sync::OnceCell;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read the accident CSV at `path` into a typed dataset.
///
/// The file must exist and every row must type-check; there is no partial
/// load.
pub fn load(path: &Path) -> Result<Dataset> {
    let file = File::open(path).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = load_from_reader(file)?;
    log::info!("Loaded {} accident records from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn load_from_reader<R: Read>(reader: R) -> Result<Dataset> {
    // Not flexible: a ragged row is a parse failure, not a short record.
    let mut rdr = ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers = rdr.headers().map_err(csv_parse_error)?.clone();
    let mut records: Vec<Record> = Vec::new();

    for result in rdr.records() {
        let raw = result.map_err(csv_parse_error)?;
        let line = raw.position().map_or(0, |p| p.line());
        let row: RawRow = raw
            .deserialize(Some(&headers))
            .map_err(|e| DashboardError::Parse {
                line,
                message: e.to_string(),
            })?;

        let year = parse_i32_safe(&row.year).ok_or_else(|| DashboardError::Parse {
            line,
            message: format!("Year `{}` is not an integer", row.year),
        })?;
        let age = parse_i32_safe(&row.age).ok_or_else(|| DashboardError::Parse {
            line,
            message: format!("Age `{}` is not an integer", row.age),
        })?;

        records.push(Record {
            state: row.state.trim().to_string(),
            industry_sector: row.industry_sector.trim().to_string(),
            accident_type: row.accident_type.trim().to_string(),
            severity: row.severity.trim().to_string(),
            year,
            month: row.month.trim().to_string(),
            day_of_week: row.day_of_week.trim().to_string(),
            shift: row.shift.trim().to_string(),
            hour_type: row.hour_type.trim().to_string(),
            age,
            gender: row.gender.trim().to_string(),
            employee_type: row.employee_type.trim().to_string(),
            critical_risk: row.critical_risk.trim().to_string(),
            safety_gear: row.safety_gear.trim().to_string(),
            local: row.local.trim().to_string(),
            age_band: None,
        });
    }

    Ok(Dataset::new(records))
}

fn csv_parse_error(e: csv::Error) -> DashboardError {
    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
        return DashboardError::Csv(e);
    }
    let line = e.position().map_or(0, |p| p.line());
    DashboardError::Parse {
        line,
        message: e.to_string(),
    }
}

/// Write-once holder for the prepared dataset.
///
/// The first `get` reads and derives; every later call returns the same
/// instance without touching the file again.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    cell: OnceCell<Dataset>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<&Dataset> {
        self.cell
            .get_or_try_init(|| load(&self.path).and_then(derive::prepare))
    }
}
