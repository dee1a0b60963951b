use geojson::{FeatureCollection, GeoJson};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::aggregate::{PivotTable, ShapedResult};
use crate::error::{DashboardError, Result};
use crate::region::RegionCompletion;
use crate::util::{format_int, format_number};

fn write_text(path: &Path, text: String) -> Result<()> {
    std::fs::write(path, text).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    write_text(path, s)
}

pub fn write_geojson(path: &Path, collection: FeatureCollection) -> Result<()> {
    write_text(path, GeoJson::from(collection).to_string())
}

fn shaped_header(result: &ShapedResult) -> Vec<String> {
    let mut header: Vec<String> = result.columns.iter().map(|c| c.to_string()).collect();
    header.push("Count".to_string());
    if result.rows.iter().any(|r| r.percentage.is_some()) {
        header.push("Percentage".to_string());
    }
    header
}

/// One line per group: key columns, `Count`, then `Percentage` when the
/// result carries one.
pub fn write_shaped_csv(path: &Path, result: &ShapedResult) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(shaped_header(result))?;
    for row in &result.rows {
        let mut record = row.key.clone();
        record.push(row.count.to_string());
        if let Some(p) = row.percentage {
            record.push(format!("{:.2}", p));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Matrix layout: the first column holds row labels.
pub fn write_pivot_csv(path: &Path, table: &PivotTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec![format!("{} \\ {}", table.row_column, table.col_column)];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;
    for (label, cells) in table.rows.iter().zip(&table.cells) {
        let mut record = vec![label.clone()];
        record.extend(cells.iter().map(u64::to_string));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Chart heading followed by its reading notes, if any.
pub fn preview_heading(title: &str, chart: &str, note: Option<&str>) {
    println!("{} [{}]", title, chart);
    if let Some(n) = note {
        println!("Insights:\n{}", n);
    }
    println!();
}

fn print_builder(builder: Builder, rows_shown: usize, rows_total: usize) {
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows_total > rows_shown {
        println!("... {} more rows", format_int(rows_total - rows_shown));
    }
    println!();
}

pub fn preview_shaped(result: &ShapedResult, max_rows: usize) {
    if result.is_empty() {
        println!("No data available for the selected filters.\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(shaped_header(result));
    for row in result.rows.iter().take(max_rows) {
        let mut record = row.key.clone();
        record.push(format_int(row.count));
        if let Some(p) = row.percentage {
            record.push(format!("{}%", format_number(p, 1)));
        }
        builder.push_record(record);
    }
    print_builder(builder, max_rows.min(result.len()), result.len());
    println!("Total: {} accidents\n", format_int(result.total()));
}

pub fn preview_pivot(table: &PivotTable, max_rows: usize) {
    if table.is_empty() {
        println!("No data available for the selected filters.\n");
        return;
    }
    let mut builder = Builder::default();
    let mut header = vec![table.row_column.to_string()];
    header.extend(table.columns.iter().cloned());
    builder.push_record(header);
    for (label, cells) in table.rows.iter().zip(&table.cells).take(max_rows) {
        let mut record = vec![label.clone()];
        record.extend(cells.iter().map(|c| format_int(*c)));
        builder.push_record(record);
    }
    print_builder(builder, max_rows.min(table.rows.len()), table.rows.len());
}

pub fn preview_regions(completion: &RegionCompletion, max_rows: usize) {
    let mut builder = Builder::default();
    builder.push_record(["State", "Accidents", "Status"]);
    let mut entries: Vec<_> = completion.entries.iter().collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.region.cmp(&b.region)));
    for e in entries.iter().take(max_rows) {
        builder.push_record([
            e.region.clone(),
            format_int(e.count),
            e.status.as_str().to_string(),
        ]);
    }
    print_builder(builder, max_rows.min(entries.len()), entries.len());
    match completion.scale {
        Some(s) => println!(
            "Color scale: {} to {} accidents (states without data drawn separately)\n",
            format_int(s.min),
            format_int(s.max)
        ),
        None => println!("Color scale: no state has data\n"),
    }
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{pivot, shape, AggregationSpec, PercentageBase};
    use crate::fixtures;
    use crate::types::Column;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let file = format!("accident_dashboard_{}_{}", std::process::id(), name);
        std::env::temp_dir().join(file)
    }

    #[test]
    fn shaped_csv_has_header_and_percentages() {
        let ds = fixtures::dataset();
        let spec = AggregationSpec::frequency(Column::HourType)
            .with_percentage(PercentageBase::GrandTotal);
        let result = shape(&ds.view(), &spec).unwrap();
        let path = temp_path("hour_type.csv");
        write_shaped_csv(&path, &result).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Hour Type,Count,Percentage");
        assert_eq!(lines[1], "Regular,7,70.00");
        assert_eq!(lines[2], "Overtime,3,30.00");
    }

    #[test]
    fn pivot_csv_is_a_matrix() {
        let ds = fixtures::dataset();
        let table = pivot(&ds.view(), Column::State, Column::IndustrySector).unwrap();
        let path = temp_path("state_sector.csv");
        write_pivot_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "State \\ Industry Sector,Chemical,Mining,Textile");
        assert_eq!(lines[1], "Gujarat,2,1,2");
        assert_eq!(lines[3], "Orissa,0,2,0");
    }
}
