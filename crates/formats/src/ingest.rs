use foundation::math::{Vec3, world_from_degrees};
use scene::{AttributeValue, Attributes, FeatureGeometry, FeatureId, FeatureStore};
use serde_json::{Map, Value};

use crate::geojson::{FeatureCollection, GeoJsonGeometry, GeoPoint};

/// Pushes every feature of `collection` into `store` and returns the new ids in order.
///
/// Multi-part geometries become one feature per part, each carrying a copy of
/// the source attributes. Polygons keep their outer ring only. Features with
/// a `null` geometry are skipped.
pub fn ingest_feature_collection(
    store: &mut FeatureStore,
    collection: &FeatureCollection,
) -> Vec<FeatureId> {
    let mut ids = Vec::new();
    for feature in &collection.features {
        let Some(geometry) = &feature.geometry else {
            tracing::debug!(id = ?feature.id, "skipping feature without geometry");
            continue;
        };
        let attributes = attributes_from_properties(&feature.properties);

        match geometry {
            GeoJsonGeometry::Point(p) => {
                ids.push(store.spawn(attributes, point(p)));
            }
            GeoJsonGeometry::MultiPoint(points) => {
                for p in points {
                    ids.push(store.spawn(attributes.clone(), point(p)));
                }
            }
            GeoJsonGeometry::LineString(points) => {
                ids.push(store.spawn(attributes, line(points)));
            }
            GeoJsonGeometry::MultiLineString(lines) => {
                for points in lines {
                    ids.push(store.spawn(attributes.clone(), line(points)));
                }
            }
            GeoJsonGeometry::Polygon(rings) => {
                ids.push(store.spawn(attributes, area(rings)));
            }
            GeoJsonGeometry::MultiPolygon(polys) => {
                for rings in polys {
                    ids.push(store.spawn(attributes.clone(), area(rings)));
                }
            }
        }
    }
    ids
}

/// Converts GeoJSON properties into ordered attributes.
///
/// Arrays and objects are kept as their JSON text.
pub fn attributes_from_properties(properties: &Map<String, Value>) -> Attributes {
    properties
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => AttributeValue::Text(s.clone()),
                Value::Number(n) => n
                    .as_f64()
                    .map(AttributeValue::Number)
                    .unwrap_or_else(|| AttributeValue::Text(n.to_string())),
                Value::Bool(b) => AttributeValue::Bool(*b),
                Value::Null => AttributeValue::Null,
                other => AttributeValue::Text(other.to_string()),
            };
            (key.clone(), value)
        })
        .collect()
}

fn world(p: &GeoPoint) -> Vec3 {
    world_from_degrees(p.lon_deg, p.lat_deg, p.height_m.unwrap_or(0.0))
}

fn point(p: &GeoPoint) -> FeatureGeometry {
    FeatureGeometry::Point { position: world(p) }
}

fn line(points: &[GeoPoint]) -> FeatureGeometry {
    FeatureGeometry::Polyline {
        positions: points.iter().map(world).collect(),
    }
}

fn area(rings: &[Vec<GeoPoint>]) -> FeatureGeometry {
    let hierarchy = rings
        .first()
        .map(|outer| outer.iter().map(world).collect())
        .unwrap_or_default();
    FeatureGeometry::Polygon { hierarchy }
}

#[cfg(test)]
mod tests {
    use super::ingest_feature_collection;
    use crate::geojson::FeatureCollection;
    use scene::{AttributeValue, FeatureStore, GeometryKind};

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "{a} != {b} (eps {eps})");
    }

    #[test]
    fn multi_parts_become_separate_features() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"owner":"Acme Ltd","levels":[1,2]},
             "geometry":{"type":"MultiPolygon","coordinates":[
                [[[0,0],[0,1],[1,1],[1,0],[0,0]]],
                [[[2,2],[2,3],[3,3],[3,2],[2,2]]]
             ]}},
            {"type":"Feature","properties":{},"geometry":null},
            {"type":"Feature","properties":{"kind":"door"},
             "geometry":{"type":"Point","coordinates":[0.5,0.5]}}
        ]}"#;
        let fc = FeatureCollection::from_geojson_str(payload).expect("parse");
        let mut store = FeatureStore::new();
        let ids = ingest_feature_collection(&mut store, &fc);

        assert_eq!(ids.len(), 3);
        assert_eq!(store.ids_of_kind(GeometryKind::Polygon), ids[..2].to_vec());
        for id in &ids[..2] {
            let feature = store.get(*id).expect("feature");
            assert_eq!(feature.attributes.text("owner"), Some("Acme Ltd"));
            assert_eq!(
                feature.attributes.get("levels"),
                Some(&AttributeValue::Text("[1,2]".to_string()))
            );
        }

        let ring = store.ring(ids[1]).expect("ring");
        assert_close(ring.points()[2].lon_deg, 3.0, 1e-7);
        assert_close(ring.points()[2].lat_deg, 3.0, 1e-7);
    }
}
