//! GeoJSON search-result parsing.
//!
//! Accepts either a FeatureCollection or a bare array of features, as saved
//! from a provider's search endpoint. Features without an id, satellite id or
//! strip id are dropped; a missing or unparseable timestamp or a non-polygon
//! geometry is kept as `None` so the record simply never matches.

use super::ImageRecord;
use chrono::{DateTime, Utc};
use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResults {
    Collection { features: Vec<Feature> },
    Features(Vec<Feature>),
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default, deserialize_with = "string_or_number")]
    id: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Deserialize, Default)]
struct Properties {
    #[serde(default, deserialize_with = "string_or_number")]
    satellite_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    strip_id: Option<String>,
    #[serde(default)]
    acquired: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    item_type: Option<String>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse an RFC 3339 acquisition timestamp
pub fn parse_acquired(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_ring(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    let coords = positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    // Closed ring needs at least three distinct corners
    if coords.len() < 4 {
        return None;
    }
    Some(LineString::new(coords))
}

fn parse_polygon(geometry: &Geometry) -> Option<Polygon<f64>> {
    if geometry.kind != "Polygon" {
        return None;
    }
    let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(geometry.coordinates.clone()).ok()?;
    let mut rings = rings.iter();
    let exterior = parse_ring(rings.next()?)?;
    let interiors = rings.map(|r| parse_ring(r)).collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

impl Feature {
    fn into_record(self) -> Option<ImageRecord> {
        let Some(id) = self.id else {
            tracing::warn!("skipping feature without id");
            return None;
        };
        let props = self.properties;
        let (Some(satellite_id), Some(strip_id)) = (props.satellite_id, props.strip_id) else {
            tracing::warn!(id = %id, "skipping feature without satellite or strip id");
            return None;
        };

        let acquired = props.acquired.as_deref().and_then(parse_acquired);
        if acquired.is_none() {
            tracing::debug!(id = %id, "feature has no usable acquisition time");
        }
        let footprint = self.geometry.as_ref().and_then(parse_polygon);
        if footprint.is_none() {
            tracing::debug!(id = %id, "feature has no polygon footprint");
        }

        Some(ImageRecord {
            id,
            satellite_id,
            strip_id,
            acquired,
            footprint,
            provider: props.provider,
            item_type: props.item_type,
        })
    }
}

/// Parse a GeoJSON polygon (bare geometry or a Feature wrapping one)
pub fn parse_polygon_geojson(json: &str) -> Option<Polygon<f64>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Feature { geometry: Geometry },
        Geometry(Geometry),
    }

    match serde_json::from_str::<Shape>(json).ok()? {
        Shape::Feature { geometry } | Shape::Geometry(geometry) => parse_polygon(&geometry),
    }
}

/// Parse saved search results into image records
pub fn parse_search_results(json: &str) -> Result<Vec<ImageRecord>, serde_json::Error> {
    let features = match serde_json::from_str::<SearchResults>(json)? {
        SearchResults::Collection { features } => features,
        SearchResults::Features(features) => features,
    };
    Ok(features.into_iter().filter_map(Feature::into_record).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "id": "20170312_184317_0c22",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-122.54, 37.81], [-122.38, 37.84], [-122.35, 37.71], [-122.53, 37.70], [-122.54, 37.81]]]
                },
                "properties": {
                    "satellite_id": "0c22",
                    "strip_id": 419561,
                    "acquired": "2017-03-12T18:43:17.563155Z",
                    "provider": "planetscope",
                    "item_type": "PSScene3Band"
                }
            },
            {
                "id": "no_geometry",
                "geometry": null,
                "properties": {
                    "satellite_id": "0c22",
                    "strip_id": "419561",
                    "acquired": "2017-03-12T18:43:18Z"
                }
            },
            {
                "id": "no_strip",
                "properties": { "satellite_id": "0c22" }
            }
        ]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let records = parse_search_results(COLLECTION).unwrap();

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.id, "20170312_184317_0c22");
        assert_eq!(first.strip_id, "419561");
        assert_eq!(first.provider.as_deref(), Some("planetscope"));
        assert!(first.acquired.is_some());
        assert!(first.footprint.as_ref().unwrap().unsigned_area() > 0.0);
    }

    #[test]
    fn missing_geometry_is_kept_as_none() {
        let records = parse_search_results(COLLECTION).unwrap();
        assert_eq!(records[1].id, "no_geometry");
        assert!(records[1].footprint.is_none());
        assert!(records[1].acquired.is_some());
    }

    #[test]
    fn parses_bare_feature_array() {
        let json = r#"[{"id": "a", "properties": {"satellite_id": "s", "strip_id": "1", "acquired": "not a time"}}]"#;
        let records = parse_search_results(json).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].acquired.is_none());
    }

    #[test]
    fn non_polygon_geometry_has_no_footprint() {
        let json = r#"[{"id": "a", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                       "properties": {"satellite_id": "s", "strip_id": "1"}}]"#;
        let records = parse_search_results(json).unwrap();
        assert!(records[0].footprint.is_none());
    }

    #[test]
    fn parses_area_of_interest() {
        let aoi = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}"#;
        let polygon = parse_polygon_geojson(aoi).unwrap();
        assert_eq!(polygon.unsigned_area(), 1.0);

        let feature = format!(r#"{{"type": "Feature", "geometry": {}}}"#, aoi);
        assert!(parse_polygon_geojson(&feature).is_some());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_search_results("{not json").is_err());
    }

    #[test]
    fn timestamps_with_offsets_are_normalized() {
        let a = parse_acquired("2017-03-12T18:43:17Z").unwrap();
        let b = parse_acquired("2017-03-12T20:43:17+02:00").unwrap();
        assert_eq!(a, b);
    }
}
