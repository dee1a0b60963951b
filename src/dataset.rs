// The in-memory accident table and filtered views over it.
//
// A `Dataset` is built once and never mutated afterwards; derivation steps
// consume it and hand back a new one. Every filter produces a
// `DatasetView`, which is just a list of row indices into the dataset.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{DashboardError, Result};
use crate::types::{Column, Record};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    derived: BTreeSet<Column>,
    domains: BTreeMap<Column, Vec<String>>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            derived: BTreeSet::new(),
            domains: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Raw columns are always present; derived ones only after their
    /// derivation step ran.
    pub fn has_column(&self, column: Column) -> bool {
        !column.is_derived() || self.derived.contains(&column)
    }

    pub fn require(&self, column: Column) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DashboardError::Schema { column })
        }
    }

    /// The explicit value order attached to `column`, if any.
    pub fn declared_domain(&self, column: Column) -> Option<&[String]> {
        self.domains.get(&column).map(Vec::as_slice)
    }

    pub fn view(&self) -> DatasetView<'_> {
        DatasetView {
            dataset: self,
            rows: (0..self.records.len()).collect(),
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (Vec<Record>, BTreeSet<Column>, BTreeMap<Column, Vec<String>>) {
        (self.records, self.derived, self.domains)
    }

    pub(crate) fn from_parts(
        records: Vec<Record>,
        derived: BTreeSet<Column>,
        domains: BTreeMap<Column, Vec<String>>,
    ) -> Self {
        Self {
            records,
            derived,
            domains,
        }
    }

    /// Total order over the values of one column.
    ///
    /// Declared domains win; values outside the declaration follow it in
    /// lexical order. Integer columns compare numerically. Everything else
    /// is lexical.
    pub fn compare_keys(&self, column: Column, a: &str, b: &str) -> Ordering {
        if let Some(domain) = self.declared_domain(column) {
            let rank = |v: &str| domain.iter().position(|d| d == v).unwrap_or(domain.len());
            return rank(a).cmp(&rank(b)).then_with(|| a.cmp(b));
        }
        if column.is_numeric() {
            if let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) {
                return x.cmp(&y);
            }
        }
        a.cmp(b)
    }
}

/// A subset of a dataset's rows, in source order.
#[derive(Debug, Clone)]
pub struct DatasetView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> DatasetView<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.rows.iter().map(move |&i| &records[i])
    }

    pub fn retain<F>(&self, mut keep: F) -> DatasetView<'a>
    where
        F: FnMut(&Record) -> bool,
    {
        let records = self.dataset.records();
        DatasetView {
            dataset: self.dataset,
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|&i| keep(&records[i]))
                .collect(),
        }
    }

    /// Number of distinct values of `column` among the view's rows.
    pub fn distinct_count(&self, column: Column) -> Result<usize> {
        self.dataset.require(column)?;
        let mut seen: HashSet<String> = HashSet::new();
        for r in self.records() {
            if let Some(v) = r.value(column) {
                seen.insert(v.into_owned());
            }
        }
        Ok(seen.len())
    }
}

impl PartialEq for DatasetView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.dataset, other.dataset) && self.rows == other.rows
    }
}
