// Application state shared by the menu handlers.
//
// Holds the write-once dataset cache, the region resolver and the current
// filter selection. Handlers borrow it; nothing here is global.
use std::path::{Path, PathBuf};

use crate::config::Args;
use crate::dashboard::{self, Panel, Tab};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{FilterContext, Selection};
use crate::loader::DatasetCache;
use crate::region::RegionResolver;
use crate::types::{Column, SummaryStats};

pub struct AppContext {
    cache: DatasetCache,
    regions: RegionResolver,
    filters: FilterContext,
    out_dir: PathBuf,
}

impl AppContext {
    pub fn new(args: &Args) -> Self {
        Self::with_parts(
            DatasetCache::new(&args.data),
            RegionResolver::load(args.geojson.as_deref(), &args.region_property),
            &args.out_dir,
        )
    }

    pub fn with_parts(cache: DatasetCache, regions: RegionResolver, out_dir: &Path) -> Self {
        Self {
            cache,
            regions,
            filters: FilterContext::new(),
            out_dir: out_dir.to_path_buf(),
        }
    }

    /// The prepared dataset; reads the file on first use only.
    pub fn dataset(&self) -> Result<&Dataset> {
        self.cache.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_loaded()
    }

    pub fn data_path(&self) -> &Path {
        self.cache.path()
    }

    pub fn regions(&self) -> &RegionResolver {
        &self.regions
    }

    pub fn filters(&self) -> &FilterContext {
        &self.filters
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn set_filter(&mut self, column: Column, selection: Selection) -> Result<()> {
        self.filters = self.filters.with(column, selection)?;
        log::info!("Filters now{}", self.filters.caption());
        Ok(())
    }

    pub fn render(&self, tab: Tab) -> Result<Vec<Panel>> {
        dashboard::render_tab(self.dataset()?, &self.filters, &self.regions, tab)
    }

    pub fn summary(&self) -> Result<SummaryStats> {
        let dataset = self.dataset()?;
        let view = self.filters.apply(&dataset.view());
        Ok(SummaryStats {
            filters: self.filters.to_map(),
            overview: dashboard::overview_metrics(&view)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn filters_flow_into_summary_and_tabs() {
        let path = std::env::temp_dir().join(format!(
            "accident_dashboard_context_{}.csv",
            std::process::id()
        ));
        std::fs::write(&path, fixtures::CSV).unwrap();
        let mut ctx = AppContext::with_parts(
            DatasetCache::new(&path),
            RegionResolver::builtin(),
            Path::new("."),
        );
        assert!(!ctx.is_loaded());
        assert_eq!(ctx.dataset().unwrap().len(), 10);
        std::fs::remove_file(&path).unwrap();

        ctx.set_filter(Column::State, Selection::Only("Gujarat".into()))
            .unwrap();
        let summary = ctx.summary().unwrap();
        assert_eq!(summary.overview.total_accidents, 5);
        assert_eq!(summary.filters.get("State").map(String::as_str), Some("Gujarat"));
        assert_eq!(
            summary.filters.get("Accident Severity").map(String::as_str),
            Some("All")
        );

        let panels = ctx.render(Tab::Temporal).unwrap();
        assert!(!panels.is_empty());

        assert!(ctx
            .set_filter(Column::Local, Selection::Only("Surat".into()))
            .is_err());
    }
}
