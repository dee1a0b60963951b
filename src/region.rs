// State name resolution and choropleth completion.
//
// Names are matched exactly (after trimming and case folding) or through
// an enumerated alias table. There is no fuzzy matching: a name that does
// not resolve is reported as unresolved and still gets an entry.
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;
use std::path::Path;

use geo::{Centroid, Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue};
use serde::Serialize;

use crate::aggregate::ShapedResult;
use crate::error::{DashboardError, Result};
use crate::types::Column;

/// Known states and their approximate centroids as (lat, lon).
pub const STATE_CENTROIDS: &[(&str, f64, f64)] = &[
    ("Andhra Pradesh", 15.9129, 79.7400),
    ("Karnataka", 15.3173, 75.7139),
    ("Tamil Nadu", 11.1271, 78.6569),
    ("Kerala", 10.8505, 76.2711),
    ("Maharashtra", 19.7515, 75.7139),
    ("Gujarat", 22.2587, 71.1924),
    ("Rajasthan", 27.0238, 74.2179),
    ("Uttar Pradesh", 26.8467, 80.9462),
    ("Madhya Pradesh", 22.9734, 78.6569),
    ("West Bengal", 22.9868, 87.8550),
    ("Odisha", 20.9517, 85.0985),
    ("Telangana", 18.1124, 79.0193),
    ("Punjab", 31.1471, 75.3412),
    ("Haryana", 29.0588, 76.0856),
    ("Bihar", 25.0961, 85.3131),
    ("Jharkhand", 23.6102, 85.2799),
    ("Chhattisgarh", 21.2787, 81.8661),
    ("Uttarakhand", 30.0668, 79.0193),
    ("Himachal Pradesh", 31.1048, 77.1734),
    ("Assam", 26.2006, 92.9376),
    ("Goa", 15.2993, 74.1240),
];

/// Alternate and older spellings mapped to the canonical state name.
pub const ALIASES: &[(&str, &str)] = &[
    ("Orissa", "Odisha"),
    ("Uttaranchal", "Uttarakhand"),
    ("Chattisgarh", "Chhattisgarh"),
    ("Chhatisgarh", "Chhattisgarh"),
    ("Tamilnadu", "Tamil Nadu"),
    ("Telengana", "Telangana"),
    ("Pondicherry", "Puducherry"),
    ("Bombay", "Maharashtra"),
    ("NCT of Delhi", "Delhi"),
    ("Jammu & Kashmir", "Jammu and Kashmir"),
    ("Andaman & Nicobar Island", "Andaman and Nicobar Islands"),
    ("Andaman & Nicobar", "Andaman and Nicobar Islands"),
];

/// Radius in degrees of the placeholder polygon drawn when no boundary
/// file supplies a real shape.
const SYNTHETIC_RADIUS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub centroid: Point<f64>,
    pub boundary: MultiPolygon<f64>,
    pub synthesized: bool,
}

#[derive(Debug, Clone)]
pub struct RegionResolver {
    regions: Vec<Region>,
    by_name: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

fn fold(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Regular octagon of `radius` degrees around `center`.
fn octagon(center: Point<f64>, radius: f64) -> MultiPolygon<f64> {
    let ring: Vec<Coord<f64>> = (0..=8u32)
        .map(|i| {
            let theta = f64::from(i % 8) * PI / 4.0;
            Coord {
                x: center.x() + radius * theta.cos(),
                y: center.y() + radius * theta.sin(),
            }
        })
        .collect();
    MultiPolygon::new(vec![Polygon::new(LineString::from(ring), vec![])])
}

impl RegionResolver {
    /// Built-in states with synthesized boundaries.
    pub fn builtin() -> Self {
        let regions = STATE_CENTROIDS
            .iter()
            .map(|(name, lat, lon)| {
                let centroid = Point::new(*lon, *lat);
                Region {
                    name: (*name).to_string(),
                    centroid,
                    boundary: octagon(centroid, SYNTHETIC_RADIUS),
                    synthesized: true,
                }
            })
            .collect();
        Self::from_regions(regions)
    }

    fn from_regions(mut regions: Vec<Region>) -> Self {
        regions.sort_by(|a, b| a.name.cmp(&b.name));
        let by_name = regions
            .iter()
            .enumerate()
            .map(|(i, r)| (fold(&r.name), i))
            .collect();
        let aliases = ALIASES
            .iter()
            .map(|(alias, canonical)| (fold(alias), (*canonical).to_string()))
            .collect();
        Self {
            regions,
            by_name,
            aliases,
        }
    }

    /// Built-in states overlaid with the polygons of a GeoJSON
    /// FeatureCollection. Features whose `property` names a state we do not
    /// know yet become additional regions. A state split over several
    /// features gets all of their polygons.
    pub fn from_geojson(text: &str, property: &str) -> Result<Self> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(DashboardError::Boundary(
                "expected a FeatureCollection".to_string(),
            ));
        };
        let resolver = Self::builtin();
        // Folded canonical name -> (display name, merged polygons).
        let mut shapes: BTreeMap<String, (String, MultiPolygon<f64>)> = BTreeMap::new();

        for feature in collection.features {
            let Some(name) = feature.property(property).and_then(JsonValue::as_str) else {
                log::warn!("Boundary feature without `{}` property skipped", property);
                continue;
            };
            let name = name.trim().to_string();
            let Some(geometry) = feature.geometry else {
                log::warn!("Boundary feature `{}` has no geometry", name);
                continue;
            };
            let boundary = match geo::Geometry::<f64>::try_from(geometry)? {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => {
                    log::warn!("Boundary feature `{}` is not a polygon", name);
                    continue;
                }
            };

            let canonical = match resolver.index_of(&name) {
                Some(i) => resolver.regions[i].name.clone(),
                None => resolver.canonical_alias(&name).unwrap_or(name),
            };
            let (display, merged) = shapes
                .entry(fold(&canonical))
                .or_insert_with(|| (canonical, MultiPolygon::new(Vec::new())));
            merged.0.extend(boundary.0);
            log::debug!("Boundary `{}` now has {} polygons", display, merged.0.len());
        }

        let mut regions = resolver.regions;
        for (key, (name, boundary)) in shapes {
            let Some(centroid) = boundary.centroid() else {
                log::warn!("Boundary for `{}` has no area", name);
                continue;
            };
            match regions.iter_mut().find(|r| fold(&r.name) == key) {
                Some(region) => {
                    region.centroid = centroid;
                    region.boundary = boundary;
                    region.synthesized = false;
                }
                None => regions.push(Region {
                    name,
                    centroid,
                    boundary,
                    synthesized: false,
                }),
            }
        }
        Ok(Self::from_regions(regions))
    }

    /// Read boundaries from `path` when given. A missing or unusable file
    /// falls back to the built-in synthesized shapes.
    pub fn load(path: Option<&Path>, property: &str) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        let parsed = std::fs::read_to_string(path)
            .map_err(|source| DashboardError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|text| Self::from_geojson(&text, property));
        match parsed {
            Ok(resolver) => {
                let real = resolver.regions.iter().filter(|r| !r.synthesized).count();
                log::info!(
                    "Loaded {} region boundaries from {} ({} synthesized)",
                    real,
                    path.display(),
                    resolver.regions.len() - real
                );
                resolver
            }
            Err(e) => {
                log::warn!("Falling back to synthesized boundaries: {}", e);
                Self::builtin()
            }
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.by_name.get(&fold(name)) {
            return Some(*i);
        }
        let canonical = self.canonical_alias(name)?;
        self.by_name.get(&fold(&canonical)).copied()
    }

    fn canonical_alias(&self, name: &str) -> Option<String> {
        self.aliases.get(&fold(name)).cloned()
    }

    pub fn resolve(&self, name: &str) -> Option<&Region> {
        self.index_of(name).map(|i| &self.regions[i])
    }

    /// Every known region, sorted by name.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegionStatus {
    Data,
    NoData,
    /// The dataset names a state the resolver does not know.
    Unresolved,
}

impl RegionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionStatus::Data => "data",
            RegionStatus::NoData => "no data",
            RegionStatus::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: u64,
    pub status: RegionStatus,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Color scale bounds, taken from non-zero counts only so regions without
/// data stay visually apart from low-count regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorScale {
    pub min: u64,
    pub max: u64,
}

impl ColorScale {
    pub fn from_counts<I: IntoIterator<Item = u64>>(counts: I) -> Option<Self> {
        let mut nonzero = counts.into_iter().filter(|c| *c > 0);
        let first = nonzero.next()?;
        let (min, max) = nonzero.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c)));
        Some(Self { min, max })
    }

    /// Position of `count` on the scale in `[0, 1]`; `None` for zero,
    /// which is drawn as "no data" rather than the low end.
    pub fn position(&self, count: u64) -> Option<f64> {
        if count == 0 {
            return None;
        }
        if self.max == self.min {
            return Some(1.0);
        }
        let clamped = count.clamp(self.min, self.max);
        Some((clamped - self.min) as f64 / (self.max - self.min) as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCompletion {
    pub entries: Vec<RegionCount>,
    pub scale: Option<ColorScale>,
}

/// Per-region totals for resolved names, and raw totals for the rest.
fn state_totals(
    result: &ShapedResult,
    resolver: &RegionResolver,
) -> Result<(BTreeMap<String, u64>, BTreeMap<String, u64>)> {
    if result.columns != [Column::State] {
        return Err(DashboardError::invalid_spec(
            "region completion needs a frequency grouped by State",
        ));
    }
    let mut resolved: BTreeMap<String, u64> = BTreeMap::new();
    let mut unresolved: BTreeMap<String, u64> = BTreeMap::new();
    for row in &result.rows {
        let Some(name) = row.key.first() else {
            continue;
        };
        match resolver.resolve(name) {
            Some(region) => *resolved.entry(region.name.clone()).or_insert(0) += row.count,
            None => *unresolved.entry(name.clone()).or_insert(0) += row.count,
        }
    }
    Ok((resolved, unresolved))
}

/// One entry per known region (zero and `NoData` when absent from
/// `counts`), followed by `Unresolved` entries for names the resolver
/// cannot place. Scale bounds come from `scale_source`, normally the
/// unfiltered frequency, so colors stay stable across filter changes.
pub fn complete_regions(
    counts: &ShapedResult,
    scale_source: &ShapedResult,
    resolver: &RegionResolver,
) -> Result<RegionCompletion> {
    let (resolved, unresolved) = state_totals(counts, resolver)?;
    let (reference, _) = state_totals(scale_source, resolver)?;

    let mut entries: Vec<RegionCount> = resolver
        .regions()
        .iter()
        .map(|region| {
            let count = resolved.get(&region.name).copied().unwrap_or(0);
            RegionCount {
                region: region.name.clone(),
                count,
                status: if count > 0 {
                    RegionStatus::Data
                } else {
                    RegionStatus::NoData
                },
                lat: Some(region.centroid.y()),
                lon: Some(region.centroid.x()),
            }
        })
        .collect();

    for (name, count) in unresolved {
        log::warn!("State `{}` ({} accidents) has no known region", name, count);
        entries.push(RegionCount {
            region: name,
            count,
            status: RegionStatus::Unresolved,
            lat: None,
            lon: None,
        });
    }

    Ok(RegionCompletion {
        entries,
        scale: ColorScale::from_counts(reference.into_values()),
    })
}

impl RegionCompletion {
    /// Choropleth input: one feature per resolved region carrying its
    /// boundary plus `name`, `count`, `status` and `scale` properties.
    /// Unresolved names become features without geometry.
    pub fn to_feature_collection(&self, resolver: &RegionResolver) -> FeatureCollection {
        let features = self
            .entries
            .iter()
            .map(|entry| {
                let geometry = resolver
                    .resolve(&entry.region)
                    .filter(|_| entry.status != RegionStatus::Unresolved)
                    .map(|r| Geometry::new(geojson::Value::from(&r.boundary)));
                let mut properties = JsonObject::new();
                properties.insert("name".to_string(), JsonValue::from(entry.region.clone()));
                properties.insert("count".to_string(), JsonValue::from(entry.count));
                properties.insert("status".to_string(), JsonValue::from(entry.status.as_str()));
                let position = self.scale.and_then(|s| s.position(entry.count));
                properties.insert(
                    "scale".to_string(),
                    position.map_or(JsonValue::Null, JsonValue::from),
                );
                Feature {
                    bbox: None,
                    geometry,
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{frequency, ShapedRow};
    use crate::fixtures;

    fn state_counts(rows: &[(&str, u64)]) -> ShapedResult {
        ShapedResult {
            columns: vec![Column::State],
            rows: rows
                .iter()
                .map(|(name, count)| ShapedRow {
                    key: vec![(*name).to_string()],
                    count: *count,
                    percentage: None,
                })
                .collect(),
        }
    }

    #[test]
    fn resolves_exact_and_case_folded_names() {
        let resolver = RegionResolver::builtin();
        assert_eq!(resolver.resolve("Kerala").map(|r| r.name.as_str()), Some("Kerala"));
        assert_eq!(
            resolver.resolve("  tamil   NADU ").map(|r| r.name.as_str()),
            Some("Tamil Nadu")
        );
    }

    #[test]
    fn resolves_enumerated_aliases_only() {
        let resolver = RegionResolver::builtin();
        assert_eq!(resolver.resolve("Orissa").map(|r| r.name.as_str()), Some("Odisha"));
        assert_eq!(
            resolver.resolve("Uttaranchal").map(|r| r.name.as_str()),
            Some("Uttarakhand")
        );
        // close, but not an enumerated alias
        assert!(resolver.resolve("Keralaa").is_none());
        // alias to a region the built-in list does not carry
        assert!(resolver.resolve("Pondicherry").is_none());
    }

    #[test]
    fn builtin_regions_have_synthesized_octagons() {
        let resolver = RegionResolver::builtin();
        assert_eq!(resolver.regions().len(), STATE_CENTROIDS.len());
        let goa = resolver.resolve("Goa").unwrap();
        assert!(goa.synthesized);
        let ring = &goa.boundary.0[0].exterior().0;
        assert_eq!(ring.len(), 9);
        let c = goa.boundary.centroid().unwrap();
        assert!((c.x() - 74.1240).abs() < 1e-6);
        assert!((c.y() - 15.2993).abs() < 1e-6);
    }

    #[test]
    fn completion_has_one_entry_per_known_region() {
        let resolver = RegionResolver::builtin();
        // Kerala 10, Gujarat 50, Odisha absent, everything else missing.
        let counts = state_counts(&[("Gujarat", 50), ("Kerala", 10)]);
        let completion = complete_regions(&counts, &counts, &resolver).unwrap();

        assert_eq!(completion.entries.len(), resolver.regions().len());
        let odisha = completion.entries.iter().find(|e| e.region == "Odisha").unwrap();
        assert_eq!(odisha.count, 0);
        assert_eq!(odisha.status, RegionStatus::NoData);
        let kerala = completion.entries.iter().find(|e| e.region == "Kerala").unwrap();
        assert_eq!((kerala.count, kerala.status), (10, RegionStatus::Data));

        assert_eq!(completion.scale, Some(ColorScale { min: 10, max: 50 }));
    }

    #[test]
    fn scale_ignores_zero_entries() {
        assert_eq!(ColorScale::from_counts([0, 0, 7, 3, 0]), Some(ColorScale { min: 3, max: 7 }));
        assert_eq!(ColorScale::from_counts([0, 0]), None);
        let scale = ColorScale { min: 10, max: 50 };
        assert_eq!(scale.position(0), None);
        assert_eq!(scale.position(10), Some(0.0));
        assert_eq!(scale.position(50), Some(1.0));
    }

    #[test]
    fn unresolved_names_are_reported_not_dropped() {
        let resolver = RegionResolver::builtin();
        let counts = state_counts(&[("Kerala", 4), ("Atlantis", 2)]);
        let completion = complete_regions(&counts, &counts, &resolver).unwrap();
        assert_eq!(completion.entries.len(), resolver.regions().len() + 1);
        let last = completion.entries.last().unwrap();
        assert_eq!(last.region, "Atlantis");
        assert_eq!(last.status, RegionStatus::Unresolved);
        assert_eq!(last.count, 2);
    }

    #[test]
    fn aliases_fold_into_canonical_region() {
        let resolver = RegionResolver::builtin();
        let ds = fixtures::dataset();
        let counts = frequency(&ds.view(), Column::State).unwrap();
        let completion = complete_regions(&counts, &counts, &resolver).unwrap();
        let odisha = completion.entries.iter().find(|e| e.region == "Odisha").unwrap();
        assert_eq!(odisha.count, 2);
        assert!(completion
            .entries
            .iter()
            .all(|e| e.status != RegionStatus::Unresolved));
    }

    #[test]
    fn scale_comes_from_reference_not_filtered_counts() {
        let resolver = RegionResolver::builtin();
        let filtered = state_counts(&[("Kerala", 3)]);
        let reference = state_counts(&[("Kerala", 3), ("Gujarat", 5), ("Orissa", 2)]);
        let completion = complete_regions(&filtered, &reference, &resolver).unwrap();
        assert_eq!(completion.scale, Some(ColorScale { min: 2, max: 5 }));
    }

    #[test]
    fn empty_counts_complete_to_all_no_data() {
        let resolver = RegionResolver::builtin();
        let empty = ShapedResult::empty(vec![Column::State]);
        let completion = complete_regions(&empty, &empty, &resolver).unwrap();
        assert_eq!(completion.entries.len(), resolver.regions().len());
        assert!(completion.entries.iter().all(|e| e.status == RegionStatus::NoData));
        assert_eq!(completion.scale, None);
    }

    #[test]
    fn rejects_non_state_results() {
        let resolver = RegionResolver::builtin();
        let ds = fixtures::dataset();
        let by_year = frequency(&ds.view(), Column::Year).unwrap();
        assert!(matches!(
            complete_regions(&by_year, &by_year, &resolver),
            Err(DashboardError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn geojson_overrides_boundaries_and_adds_regions() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"ST_NM": "Orissa"},
                 "geometry": {"type": "Polygon",
                  "coordinates": [[[84,20],[86,20],[86,22],[84,22],[84,20]]]}},
                {"type": "Feature", "properties": {"ST_NM": "Puducherry"},
                 "geometry": {"type": "Polygon",
                  "coordinates": [[[79,11],[80,11],[80,12],[79,12],[79,11]]]}},
                {"type": "Feature", "properties": {"other": "x"},
                 "geometry": {"type": "Point", "coordinates": [0, 0]}}
            ]
        }"#;
        let resolver = RegionResolver::from_geojson(text, "ST_NM").unwrap();
        assert_eq!(resolver.regions().len(), STATE_CENTROIDS.len() + 1);

        let odisha = resolver.resolve("Odisha").unwrap();
        assert!(!odisha.synthesized);
        assert!((odisha.centroid.x() - 85.0).abs() < 1e-9);
        assert!((odisha.centroid.y() - 21.0).abs() < 1e-9);

        // now known, and reachable through its alias
        assert_eq!(
            resolver.resolve("Pondicherry").map(|r| r.name.as_str()),
            Some("Puducherry")
        );
        assert!(resolver.resolve("Kerala").unwrap().synthesized);
    }

    #[test]
    fn split_features_merge_into_one_region() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"ST_NM": "Kerala"},
                 "geometry": {"type": "Polygon",
                  "coordinates": [[[75,10],[76,10],[76,11],[75,11],[75,10]]]}},
                {"type": "Feature", "properties": {"ST_NM": "kerala "},
                 "geometry": {"type": "Polygon",
                  "coordinates": [[[76,8],[77,8],[77,9],[76,9],[76,8]]]}},
                {"type": "Feature", "properties": {"ST_NM": "Lakshadweep"},
                 "geometry": {"type": "Polygon",
                  "coordinates": [[[72,10],[73,10],[73,11],[72,11],[72,10]]]}},
                {"type": "Feature", "properties": {"ST_NM": "Lakshadweep"},
                 "geometry": {"type": "MultiPolygon",
                  "coordinates": [[[[72,8],[73,8],[73,9],[72,9],[72,8]]]]}}
            ]
        }"#;
        let resolver = RegionResolver::from_geojson(text, "ST_NM").unwrap();
        assert_eq!(resolver.regions().len(), STATE_CENTROIDS.len() + 1);
        assert_eq!(resolver.resolve("Kerala").unwrap().boundary.0.len(), 2);
        let lakshadweep = resolver.resolve("Lakshadweep").unwrap();
        assert_eq!(lakshadweep.boundary.0.len(), 2);
        assert!((lakshadweep.centroid.y() - 9.5).abs() < 1e-9);

        let counts = state_counts(&[("Lakshadweep", 7)]);
        let completion = complete_regions(&counts, &counts, &resolver).unwrap();
        let entries: Vec<u64> = completion
            .entries
            .iter()
            .filter(|e| e.region == "Lakshadweep")
            .map(|e| e.count)
            .collect();
        assert_eq!(entries, vec![7]);
        assert_eq!(completion.entries.iter().map(|e| e.count).sum::<u64>(), 7);
    }

    #[test]
    fn non_collection_geojson_is_rejected() {
        let text = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(
            RegionResolver::from_geojson(text, "ST_NM"),
            Err(DashboardError::Boundary(_))
        ));
    }

    #[test]
    fn missing_boundary_file_falls_back() {
        let resolver = RegionResolver::load(Some(Path::new("/nonexistent/india.geojson")), "ST_NM");
        assert_eq!(resolver.regions().len(), STATE_CENTROIDS.len());
        assert!(resolver.regions().iter().all(|r| r.synthesized));
    }

    #[test]
    fn feature_collection_marks_status() {
        let resolver = RegionResolver::builtin();
        let counts = state_counts(&[("Kerala", 4), ("Atlantis", 2)]);
        let completion = complete_regions(&counts, &counts, &resolver).unwrap();
        let fc = completion.to_feature_collection(&resolver);
        assert_eq!(fc.features.len(), completion.entries.len());
        let atlantis = fc.features.last().unwrap();
        assert!(atlantis.geometry.is_none());
        assert_eq!(
            atlantis.property("status").and_then(JsonValue::as_str),
            Some("unresolved")
        );
        let kerala = fc
            .features
            .iter()
            .find(|f| f.property("name").and_then(JsonValue::as_str) == Some("Kerala"))
            .unwrap();
        assert!(kerala.geometry.is_some());
        assert_eq!(kerala.property("count").and_then(JsonValue::as_u64), Some(4));
    }
}
