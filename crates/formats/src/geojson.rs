use serde_json::{Map, Value};

/// A GeoJSON position; the optional third coordinate is kept as a height in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub height_m: Option<f64>,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            height_m: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoJsonGeometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoJsonFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// `None` for `null` or unsupported geometries; they carry attributes only.
    pub geometry: Option<GeoJsonGeometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<GeoJsonFeature>,
}

#[derive(Debug)]
pub enum GeoJsonError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(msg) => write!(f, "JSON parse error: {msg}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| GeoJsonError::Json(e.to_string()))?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(GeoJsonError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: &str| GeoJsonError::InvalidFeature {
                index,
                reason: reason.to_string(),
            };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object"))?;

            let feat_type = feat_obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| invalid("feature missing type"))?;
            if feat_type != "Feature" {
                return Err(invalid(&format!("unexpected feature type: {feat_type}")));
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let geometry = match feat_obj.get("geometry") {
                None => return Err(invalid("feature missing geometry")),
                Some(Value::Null) => None,
                Some(g) => parse_geometry(g)
                    .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?,
            };

            features.push(GeoJsonFeature {
                id,
                properties,
                geometry,
            });
        }

        Ok(Self { features })
    }
}

/// `Ok(None)` for geometry types the viewer does not draw; the feature keeps
/// its attributes and is skipped at ingest like a `null` geometry.
fn parse_geometry(value: &Value) -> Result<Option<GeoJsonGeometry>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = move || {
        obj.get("coordinates")
            .ok_or("geometry missing coordinates".to_string())
    };

    let geometry = match ty {
        "Point" => GeoJsonGeometry::Point(parse_point(coords()?)?),
        "MultiPoint" => GeoJsonGeometry::MultiPoint(parse_points(coords()?)?),
        "LineString" => GeoJsonGeometry::LineString(parse_points(coords()?)?),
        "MultiLineString" => GeoJsonGeometry::MultiLineString(parse_lines(coords()?)?),
        "Polygon" => GeoJsonGeometry::Polygon(parse_lines(coords()?)?),
        "MultiPolygon" => {
            let polys = coords()?
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_lines(poly)?);
            }
            GeoJsonGeometry::MultiPolygon(out)
        }
        other => {
            tracing::debug!(geometry_type = other, "skipping unsupported geometry");
            return Ok(None);
        }
    };
    Ok(Some(geometry))
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint {
        lon_deg: lon,
        lat_deg: lat,
        height_m: arr.get(2).and_then(Value::as_f64),
    })
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_lines(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of position arrays".to_string())?;
    arr.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError, GeoJsonGeometry};

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 17,
                "properties": { "Client Name": "Acme Ltd", "_Tenure": "Freehold" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]]
                }
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": { "type": "Point", "coordinates": [-1.49, 53.42, 80.5] }
            },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#;

    #[test]
    fn parses_boundary_collection() {
        let fc = FeatureCollection::from_geojson_str(BOUNDARIES).expect("parse");
        assert_eq!(fc.features.len(), 3);
        assert_eq!(fc.features[0].id.as_deref(), Some("17"));
        assert_eq!(
            fc.features[0].properties.get("Client Name").and_then(|v| v.as_str()),
            Some("Acme Ltd")
        );
        match &fc.features[0].geometry {
            Some(GeoJsonGeometry::Polygon(rings)) => assert_eq!(rings[0].len(), 5),
            other => panic!("unexpected geometry: {other:?}"),
        }
        match &fc.features[1].geometry {
            Some(GeoJsonGeometry::Point(p)) => assert_eq!(p.height_m, Some(80.5)),
            other => panic!("unexpected geometry: {other:?}"),
        }
        assert!(fc.features[2].geometry.is_none());
    }

    #[test]
    fn rejects_non_collections() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));

        let err = FeatureCollection::from_geojson_str("{").unwrap_err();
        assert!(matches!(err, GeoJsonError::Json(_)));
    }

    #[test]
    fn reports_index_of_bad_feature() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":["east", 1]}}
        ]}"#;
        let err = FeatureCollection::from_geojson_str(payload).unwrap_err();
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn unsupported_geometry_does_not_abort_collection() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"owner":"Acme Ltd"},
             "geometry":{"type":"GeometryCollection","geometries":[
                {"type":"Point","coordinates":[0, 0]}
             ]}},
            {"type":"Feature","properties":{"owner":"Beta Estates"},
             "geometry":{"type":"Polygon","coordinates":[[[0, 0], [1, 0], [1, 1], [0, 0]]]}}
        ]}"#;
        let fc = FeatureCollection::from_geojson_str(payload).expect("parse");
        assert_eq!(fc.features.len(), 2);
        assert!(fc.features[0].geometry.is_none());
        assert_eq!(
            fc.features[0].properties.get("owner").and_then(|v| v.as_str()),
            Some("Acme Ltd")
        );
        assert!(matches!(
            fc.features[1].geometry,
            Some(GeoJsonGeometry::Polygon(_))
        ));
    }
}
