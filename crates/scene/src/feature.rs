use foundation::math::Vec3;

/// Stable id of a feature within its [`crate::FeatureStore`]; ids follow ingestion order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u32);

impl FeatureId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view; numeric strings (e.g. `"12.5"`) are accepted as well.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Scalar rendering used for feature-id style lookups. `Null` has none.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) => Some(s.clone()),
            AttributeValue::Number(n) => Some(n.to_string()),
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Null => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

/// Ordered attribute pairs as delivered by the data source.
///
/// Keys are case-sensitive; heterogeneous sources spell the same concept
/// differently, so lookups try explicit key lists rather than normalizing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    pairs: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new(pairs: Vec<(String, AttributeValue)>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_text)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttributeValue::as_number)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Polygon,
    Polyline,
    Point,
}

/// Geometry in world coordinates (ECEF metres).
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// Outer boundary of a polygon hierarchy.
    Polygon { hierarchy: Vec<Vec3> },
    Polyline { positions: Vec<Vec3> },
    Point { position: Vec3 },
}

impl FeatureGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            FeatureGeometry::Polygon { .. } => GeometryKind::Polygon,
            FeatureGeometry::Polyline { .. } => GeometryKind::Polyline,
            FeatureGeometry::Point { .. } => GeometryKind::Point,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        match self {
            FeatureGeometry::Polygon { hierarchy } => hierarchy,
            FeatureGeometry::Polyline { positions } => positions,
            FeatureGeometry::Point { position } => std::slice::from_ref(position),
        }
    }

    /// Polygons and polylines carry overlay shape; points never do.
    pub fn is_shape(&self) -> bool {
        !matches!(self, FeatureGeometry::Point { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub attributes: Attributes,
    pub geometry: FeatureGeometry,
    pub visible: bool,
}

impl Feature {
    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeValue, Attributes, FeatureGeometry, GeometryKind};
    use foundation::math::Vec3;

    #[test]
    fn attribute_lookup_is_case_sensitive() {
        let attrs: Attributes = [("Owner", "Acme Ltd")].into_iter().collect();
        assert_eq!(attrs.text("Owner"), Some("Acme Ltd"));
        assert_eq!(attrs.text("owner"), None);
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let mut attrs = Attributes::default();
        attrs.insert("height", 12.0);
        attrs.insert("height", "14.5");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.number("height"), Some(14.5));
    }

    #[test]
    fn scalar_strings() {
        assert_eq!(
            AttributeValue::Number(42.0).to_scalar_string(),
            Some("42".to_string())
        );
        assert_eq!(AttributeValue::Null.to_scalar_string(), None);
    }

    #[test]
    fn point_positions_are_a_single_slice() {
        let g = FeatureGeometry::Point {
            position: Vec3::new(1.0, 2.0, 3.0),
        };
        assert_eq!(g.kind(), GeometryKind::Point);
        assert_eq!(g.positions().len(), 1);
        assert!(!g.is_shape());
    }
}
