use clap::Parser;
use std::path::PathBuf;

/// Industrial accidents analysis dashboard.
///
/// Loads the accident CSV once, then evaluates every dashboard tab against
/// the selected filters and exports each chart's table.
#[derive(Debug, Clone, Parser)]
#[command(name = "accident_dashboard", version)]
pub struct Args {
    /// Accident records CSV.
    #[arg(long, default_value = "Indian_Industrial_Accidents.csv")]
    pub data: PathBuf,

    /// GeoJSON FeatureCollection with one polygon per state. Without it,
    /// states are drawn as small octagons around their centroids.
    #[arg(long)]
    pub geojson: Option<PathBuf>,

    /// Feature property holding the state name in the GeoJSON file.
    #[arg(long, default_value = "ST_NM")]
    pub region_property: String,

    /// Directory for exported CSV/JSON/GeoJSON files.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["accident_dashboard"]);
        assert_eq!(args.data, PathBuf::from("Indian_Industrial_Accidents.csv"));
        assert_eq!(args.geojson, None);
        assert_eq!(args.region_property, "ST_NM");
        assert_eq!(args.out_dir, PathBuf::from("."));
    }

    #[test]
    fn overrides() {
        let args = Args::parse_from([
            "accident_dashboard",
            "--data",
            "a.csv",
            "--geojson",
            "india.geojson",
            "--region-property",
            "NAME_1",
            "--out-dir",
            "out",
        ]);
        assert_eq!(args.data, PathBuf::from("a.csv"));
        assert_eq!(args.geojson, Some(PathBuf::from("india.geojson")));
        assert_eq!(args.region_property, "NAME_1");
        assert_eq!(args.out_dir, PathBuf::from("out"));
    }
}
