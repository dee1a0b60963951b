// Grouping, counting and percentage shaping over a filtered view.
//
// Every chart in the dashboard is one `AggregationSpec` run through
// `shape`. The three chart families map onto `AggregationSpec` like this:
// - frequency: one column, observed-only
// - pivot: two columns, complete-with-zero (dense matrix)
// - hierarchy: two or three columns, observed-only (sparse)
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::dataset::{Dataset, DatasetView};
use crate::error::{DashboardError, Result};
use crate::types::{Column, FrequencyOrder};
use crate::util::percent;

pub const MAX_GROUPING_COLUMNS: usize = 3;

/// Denominator used for the percentage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentageBase {
    None,
    /// Share of all rows in the view.
    GrandTotal,
    /// Share of the rows sharing this row's `by` value, e.g. with
    /// `by = State` each state's severities add up to 100.
    PerGroup { by: Column },
}

/// Whether unobserved category combinations appear as zero rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    ObservedOnly,
    /// Fill the cartesian product of observed values (plus any declared
    /// domain) with explicit zeros.
    CompleteWithZero,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    pub columns: Vec<Column>,
    pub percentage: PercentageBase,
    pub completion: Completion,
    /// Keep only the first `n` rows after ordering. Percentages are still
    /// computed against the full result.
    pub limit: Option<usize>,
}

impl AggregationSpec {
    pub fn frequency(column: Column) -> Self {
        Self {
            columns: vec![column],
            percentage: PercentageBase::None,
            completion: Completion::ObservedOnly,
            limit: None,
        }
    }

    pub fn pivot(row: Column, column: Column) -> Self {
        Self {
            columns: vec![row, column],
            percentage: PercentageBase::None,
            completion: Completion::CompleteWithZero,
            limit: None,
        }
    }

    pub fn hierarchy(columns: &[Column]) -> Self {
        Self {
            columns: columns.to_vec(),
            percentage: PercentageBase::None,
            completion: Completion::ObservedOnly,
            limit: None,
        }
    }

    pub fn with_percentage(mut self, percentage: PercentageBase) -> Self {
        self.percentage = percentage;
        self
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn validate(&self, dataset: &Dataset) -> Result<()> {
        if self.columns.is_empty() || self.columns.len() > MAX_GROUPING_COLUMNS {
            return Err(DashboardError::invalid_spec(format!(
                "expected 1 to {} grouping columns, got {}",
                MAX_GROUPING_COLUMNS,
                self.columns.len()
            )));
        }
        let mut seen = HashSet::new();
        for c in &self.columns {
            dataset.require(*c)?;
            if !seen.insert(*c) {
                return Err(DashboardError::invalid_spec(format!(
                    "column `{}` is grouped twice",
                    c
                )));
            }
        }
        if let PercentageBase::PerGroup { by } = self.percentage {
            dataset.require(by)?;
            if !self.columns.contains(&by) {
                return Err(DashboardError::invalid_spec(format!(
                    "percentage base `{}` is not a grouping column",
                    by
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedRow {
    pub key: Vec<String>,
    pub count: u64,
    pub percentage: Option<f64>,
}

/// Chart-ready output: group keys in a fixed order with their counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedResult {
    pub columns: Vec<Column>,
    pub rows: Vec<ShapedRow>,
}

impl ShapedResult {
    pub fn empty(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Nest the rows by key prefix for treemap/sunburst consumers. Each
    /// parent carries the sum of its children.
    pub fn to_hierarchy(&self) -> Vec<HierarchyNode> {
        let mut roots: Vec<HierarchyNode> = Vec::new();
        for row in &self.rows {
            let mut level = &mut roots;
            for label in &row.key {
                let idx = match level.iter().position(|n| &n.label == label) {
                    Some(i) => i,
                    None => {
                        level.push(HierarchyNode {
                            label: label.clone(),
                            count: 0,
                            children: Vec::new(),
                        });
                        level.len() - 1
                    }
                };
                let node = &mut level[idx];
                node.count += row.count;
                level = &mut node.children;
            }
        }
        roots
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub label: String,
    pub count: u64,
    pub children: Vec<HierarchyNode>,
}

/// Dense two-way count matrix for heatmaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotTable {
    pub row_column: Column,
    pub col_column: Column,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<u64>>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

}

/// Run one aggregation over a view.
pub fn shape(view: &DatasetView<'_>, spec: &AggregationSpec) -> Result<ShapedResult> {
    let dataset = view.dataset();
    spec.validate(dataset)?;
    if view.is_empty() {
        return Ok(ShapedResult::empty(spec.columns.clone()));
    }

    let mut counts: HashMap<Vec<String>, u64> = HashMap::new();
    for r in view.records() {
        let key = spec
            .columns
            .iter()
            .map(|c| {
                r.value(*c)
                    .map(Cow::into_owned)
                    .ok_or_else(|| DashboardError::Schema { column: *c })
            })
            .collect::<Result<Vec<String>>>()?;
        *counts.entry(key).or_insert(0) += 1;
    }

    if spec.completion == Completion::CompleteWithZero {
        complete_with_zero(&mut counts, &spec.columns, dataset);
    }

    let mut rows: Vec<ShapedRow> = counts
        .into_iter()
        .map(|(key, count)| ShapedRow {
            key,
            count,
            percentage: None,
        })
        .collect();
    sort_rows(&mut rows, &spec.columns, dataset);
    fill_percentages(&mut rows, spec);
    if let Some(n) = spec.limit {
        rows.truncate(n);
    }

    log::debug!(
        "Shaped {} rows into {} groups over [{}]",
        view.len(),
        rows.len(),
        spec.columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(ShapedResult {
        columns: spec.columns.clone(),
        rows,
    })
}

pub fn frequency(view: &DatasetView<'_>, column: Column) -> Result<ShapedResult> {
    shape(view, &AggregationSpec::frequency(column))
}

pub fn hierarchy(view: &DatasetView<'_>, columns: &[Column]) -> Result<ShapedResult> {
    shape(view, &AggregationSpec::hierarchy(columns))
}

/// Cross-tabulate `row` against `column` with zero-filled cells.
pub fn pivot(view: &DatasetView<'_>, row: Column, column: Column) -> Result<PivotTable> {
    let shaped = shape(view, &AggregationSpec::pivot(row, column))?;
    to_pivot(&shaped, view.dataset())
}

/// Lay a two-column result out as a matrix. Cells absent from `shaped`
/// read as zero.
pub fn to_pivot(shaped: &ShapedResult, dataset: &Dataset) -> Result<PivotTable> {
    let [row_column, col_column] = shaped.columns.as_slice() else {
        return Err(DashboardError::invalid_spec(format!(
            "a pivot needs exactly 2 columns, got {}",
            shaped.columns.len()
        )));
    };
    let (row_column, col_column) = (*row_column, *col_column);
    let mut rows: Vec<String> = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    for r in &shaped.rows {
        if let [a, b] = r.key.as_slice() {
            if !rows.contains(a) {
                rows.push(a.clone());
            }
            if !columns.contains(b) {
                columns.push(b.clone());
            }
        }
    }
    rows.sort_by(|a, b| dataset.compare_keys(row_column, a, b));
    columns.sort_by(|a, b| dataset.compare_keys(col_column, a, b));

    let mut cells = vec![vec![0u64; columns.len()]; rows.len()];
    for r in &shaped.rows {
        if let [a, b] = r.key.as_slice() {
            let ri = rows.iter().position(|v| v == a);
            let ci = columns.iter().position(|v| v == b);
            if let (Some(ri), Some(ci)) = (ri, ci) {
                cells[ri][ci] += r.count;
            }
        }
    }
    Ok(PivotTable {
        row_column,
        col_column,
        rows,
        columns,
        cells,
    })
}

fn complete_with_zero(
    counts: &mut HashMap<Vec<String>, u64>,
    columns: &[Column],
    dataset: &Dataset,
) {
    let mut axes: Vec<Vec<String>> = Vec::with_capacity(columns.len());
    for (i, c) in columns.iter().enumerate() {
        let mut axis: Vec<String> = dataset
            .declared_domain(*c)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        for key in counts.keys() {
            if !axis.contains(&key[i]) {
                axis.push(key[i].clone());
            }
        }
        axes.push(axis);
    }

    // Odometer over the cartesian product of the axes.
    let mut idx = vec![0usize; axes.len()];
    if axes.iter().any(Vec::is_empty) {
        return;
    }
    loop {
        let key: Vec<String> = idx.iter().zip(&axes).map(|(&i, a)| a[i].clone()).collect();
        counts.entry(key).or_insert(0);

        let mut pos = axes.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            idx[pos] += 1;
            if idx[pos] < axes[pos].len() {
                break;
            }
            idx[pos] = 0;
        }
    }
}

fn compare_key_tuples(
    a: &[String],
    b: &[String],
    columns: &[Column],
    dataset: &Dataset,
) -> Ordering {
    for (i, c) in columns.iter().enumerate() {
        let ord = dataset.compare_keys(*c, &a[i], &b[i]);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn sort_rows(rows: &mut [ShapedRow], columns: &[Column], dataset: &Dataset) {
    match columns {
        [only] if only.frequency_order() == FrequencyOrder::ByCountDesc => {
            rows.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| compare_key_tuples(&a.key, &b.key, columns, dataset))
            });
        }
        _ => rows.sort_by(|a, b| compare_key_tuples(&a.key, &b.key, columns, dataset)),
    }
}

fn fill_percentages(rows: &mut [ShapedRow], spec: &AggregationSpec) {
    match spec.percentage {
        PercentageBase::None => {}
        PercentageBase::GrandTotal => {
            let total: u64 = rows.iter().map(|r| r.count).sum();
            for r in rows.iter_mut() {
                r.percentage = Some(percent(r.count, total));
            }
        }
        PercentageBase::PerGroup { by } => {
            let Some(i) = spec.columns.iter().position(|c| *c == by) else {
                return;
            };
            let mut totals: HashMap<String, u64> = HashMap::new();
            for r in rows.iter() {
                *totals.entry(r.key[i].clone()).or_insert(0) += r.count;
            }
            for r in rows.iter_mut() {
                let whole = totals.get(&r.key[i]).copied().unwrap_or(0);
                r.percentage = Some(percent(r.count, whole));
            }
        }
    }
}

#[cfg(test)]
impl ShapedResult {
    pub fn get(&self, key: &[&str]) -> Option<&ShapedRow> {
        self.rows
            .iter()
            .find(|r| r.key.len() == key.len() && r.key.iter().zip(key).all(|(a, b)| a == b))
    }

    pub fn count_of(&self, key: &[&str]) -> Option<u64> {
        self.get(key).map(|r| r.count)
    }
}

#[cfg(test)]
impl PivotTable {
    pub fn get(&self, row: &str, column: &str) -> Option<u64> {
        let r = self.rows.iter().position(|v| v == row)?;
        let c = self.columns.iter().position(|v| v == column)?;
        Some(self.cells[r][c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterContext, Selection};
    use crate::fixtures;

    fn keys(result: &ShapedResult) -> Vec<String> {
        result.rows.iter().map(|r| r.key.join("/")).collect()
    }

    fn empty_view(ds: &Dataset) -> DatasetView<'_> {
        FilterContext::new()
            .with(Column::State, Selection::Only("Atlantis".into()))
            .unwrap()
            .apply(&ds.view())
    }

    #[test]
    fn frequency_conserves_counts() {
        let ds = fixtures::dataset();
        for column in [
            Column::State,
            Column::IndustrySector,
            Column::Severity,
            Column::Year,
            Column::Month,
            Column::AgeRange,
            Column::Local,
        ] {
            let result = frequency(&ds.view(), column).unwrap();
            assert_eq!(result.total(), ds.len() as u64, "{column}");
        }

        let kerala = FilterContext::new()
            .with(Column::State, Selection::Only("Kerala".into()))
            .unwrap()
            .apply(&ds.view());
        assert_eq!(frequency(&kerala, Column::Shift).unwrap().total(), 3);
    }

    #[test]
    fn nominal_frequency_orders_by_count() {
        let ds = fixtures::dataset();
        let result = frequency(&ds.view(), Column::State).unwrap();
        assert_eq!(keys(&result), vec!["Gujarat", "Kerala", "Orissa"]);
        assert_eq!(result.rows[0].count, 5);

        // Chemical and Mining tie at 4; ties break by key.
        let sectors = frequency(&ds.view(), Column::IndustrySector).unwrap();
        assert_eq!(keys(&sectors), vec!["Chemical", "Mining", "Textile"]);
    }

    #[test]
    fn ordinal_frequency_orders_by_key() {
        let ds = fixtures::dataset();
        let years = frequency(&ds.view(), Column::Year).unwrap();
        assert_eq!(keys(&years), vec!["2020", "2021", "2022"]);
        assert_eq!(
            years.rows.iter().map(|r| r.count).collect::<Vec<_>>(),
            vec![3, 4, 3]
        );

        let months = frequency(&ds.view(), Column::Month).unwrap();
        assert_eq!(
            keys(&months),
            vec!["January", "February", "March", "July", "December"]
        );

        let ages = frequency(&ds.view(), Column::AgeRange).unwrap();
        assert_eq!(
            keys(&ages),
            vec!["18-22", "23-27", "28-32", "38-42", "43-47", "48-52", "63-65", "Unbucketed"]
        );
    }

    #[test]
    fn completed_frequency_includes_declared_domain() {
        let ds = fixtures::dataset();
        let spec = AggregationSpec::frequency(Column::AgeRange)
            .with_completion(Completion::CompleteWithZero);
        let result = shape(&ds.view(), &spec).unwrap();
        // ten buckets plus the observed out-of-range age
        assert_eq!(result.len(), 11);
        assert_eq!(result.count_of(&["53-57"]), Some(0));
        assert_eq!(result.total(), 10);
    }

    #[test]
    fn grand_total_percentages_sum_to_100() {
        let ds = fixtures::dataset();
        let spec = AggregationSpec::frequency(Column::HourType)
            .with_percentage(PercentageBase::GrandTotal);
        let result = shape(&ds.view(), &spec).unwrap();
        let sum: f64 = result.rows.iter().filter_map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 0.1);
        let regular = result.get(&["Regular"]).unwrap();
        assert!((regular.percentage.unwrap() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn per_group_percentages_use_the_named_denominator() {
        let ds = fixtures::dataset();
        let spec = AggregationSpec::hierarchy(&[Column::SafetyGear, Column::Severity])
            .with_percentage(PercentageBase::PerGroup { by: Column::SafetyGear });
        let result = shape(&ds.view(), &spec).unwrap();

        for gear in ["Yes", "No"] {
            let sum: f64 = result
                .rows
                .iter()
                .filter(|r| r.key[0] == gear)
                .filter_map(|r| r.percentage)
                .sum();
            assert!((sum - 100.0).abs() < 0.1, "{gear}: {sum}");
        }
        let fatal_without_gear = result.get(&["No", "Fatal"]).unwrap();
        assert!((fatal_without_gear.percentage.unwrap() - 75.0).abs() < 1e-9);

        // Same grouping, inner column as denominator: each severity sums to 100.
        let spec = AggregationSpec::hierarchy(&[Column::SafetyGear, Column::Severity])
            .with_percentage(PercentageBase::PerGroup { by: Column::Severity });
        let result = shape(&ds.view(), &spec).unwrap();
        let fatal_without_gear = result.get(&["No", "Fatal"]).unwrap();
        assert!((fatal_without_gear.percentage.unwrap() - 100.0).abs() < 1e-9);
        let minor_with_gear = result.get(&["Yes", "Minor"]).unwrap();
        assert!((minor_with_gear.percentage.unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn pivot_zero_fills_every_combination() {
        let ds = fixtures::dataset();
        let table = pivot(&ds.view(), Column::Year, Column::Month).unwrap();
        assert_eq!(table.rows, vec!["2020", "2021", "2022"]);
        assert_eq!(table.columns.len(), 12);
        assert_eq!(table.columns[0], "January");
        assert_eq!(table.columns[11], "December");
        assert_eq!(table.get("2020", "January"), Some(2));
        assert_eq!(table.get("2022", "March"), Some(0));
        assert_eq!(table.get("2020", "June"), Some(0));
        let total: u64 = table.cells.iter().flatten().sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn pivot_without_declared_domain_uses_observed_values() {
        let ds = fixtures::dataset();
        let table = pivot(&ds.view(), Column::State, Column::IndustrySector).unwrap();
        assert_eq!(table.rows, vec!["Gujarat", "Kerala", "Orissa"]);
        assert_eq!(table.columns, vec!["Chemical", "Mining", "Textile"]);
        assert_eq!(table.get("Orissa", "Chemical"), Some(0));
        assert_eq!(table.get("Kerala", "Textile"), Some(0));
        assert_eq!(table.get("Gujarat", "Chemical"), Some(2));
    }

    #[test]
    fn hierarchy_is_sparse() {
        let ds = fixtures::dataset();
        let result = hierarchy(&ds.view(), &[Column::State, Column::IndustrySector]).unwrap();
        assert_eq!(result.count_of(&["Orissa", "Chemical"]), None);
        assert_eq!(result.count_of(&["Orissa", "Mining"]), Some(2));
        assert_eq!(result.total(), 10);
        assert_eq!(keys(&result)[0], "Gujarat/Chemical");
    }

    #[test]
    fn hierarchy_nodes_sum_children() {
        let ds = fixtures::dataset();
        let result = hierarchy(
            &ds.view(),
            &[Column::IndustrySector, Column::CriticalRisk, Column::SafetyGear],
        )
        .unwrap();
        let tree = result.to_hierarchy();
        assert_eq!(
            tree.iter().map(|n| n.label.as_str()).collect::<Vec<_>>(),
            vec!["Chemical", "Mining", "Textile"]
        );
        for node in &tree {
            let children: u64 = node.children.iter().map(|c| c.count).sum();
            assert_eq!(node.count, children);
        }
        let chemical = &tree[0];
        assert_eq!(chemical.count, 4);
        let explosion = chemical.children.iter().find(|c| c.label == "Explosion").unwrap();
        assert_eq!(explosion.count, 3);
        assert_eq!(explosion.children.len(), 2);
    }

    #[test]
    fn limit_keeps_top_rows() {
        let ds = fixtures::dataset();
        let spec = AggregationSpec::frequency(Column::Local)
            .with_percentage(PercentageBase::GrandTotal)
            .with_limit(2);
        let result = shape(&ds.view(), &spec).unwrap();
        assert_eq!(keys(&result), vec!["Surat", "Cuttack"]);
        assert!((result.rows[0].percentage.unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn empty_view_gives_empty_result_in_every_mode() {
        let ds = fixtures::dataset();
        let view = empty_view(&ds);
        assert!(frequency(&view, Column::State).unwrap().is_empty());
        assert!(pivot(&view, Column::Year, Column::Month).unwrap().is_empty());
        assert!(hierarchy(&view, &[Column::State, Column::AccidentType])
            .unwrap()
            .is_empty());
        let spec = AggregationSpec::frequency(Column::Gender)
            .with_percentage(PercentageBase::GrandTotal);
        assert!(shape(&view, &spec).unwrap().is_empty());
    }

    #[test]
    fn unknown_column_is_schema_error() {
        let raw = fixtures::raw_dataset();
        let err = frequency(&raw.view(), Column::AgeRange).unwrap_err();
        assert!(matches!(err, DashboardError::Schema { column: Column::AgeRange }));
    }

    #[test]
    fn inconsistent_specs_are_rejected() {
        let ds = fixtures::dataset();
        let view = ds.view();
        assert!(matches!(
            shape(&view, &AggregationSpec::hierarchy(&[])),
            Err(DashboardError::InvalidSpec { .. })
        ));
        let four = [Column::State, Column::Year, Column::Month, Column::Shift];
        assert!(matches!(
            shape(&view, &AggregationSpec::hierarchy(&four)),
            Err(DashboardError::InvalidSpec { .. })
        ));
        assert!(matches!(
            shape(&view, &AggregationSpec::hierarchy(&[Column::State, Column::State])),
            Err(DashboardError::InvalidSpec { .. })
        ));
        let spec = AggregationSpec::frequency(Column::State)
            .with_percentage(PercentageBase::PerGroup { by: Column::Severity });
        assert!(matches!(shape(&view, &spec), Err(DashboardError::InvalidSpec { .. })));
    }
}
