use std::collections::{BTreeMap, BTreeSet};

use scene::Attributes;
use serde::{Deserialize, Serialize};

use crate::client_index::ClientIdentity;

/// Keys tried, in order, to single out one building in the tiled asset.
pub const BUILDING_ID_KEYS: &[&str] = &["elementId", "id", "osm_id", "fid"];

/// Attribute pair that identifies one building feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BuildingKey {
    pub key: String,
    pub value: String,
}

/// Finds the attribute that identifies a building.
///
/// Known id keys are tried first (empty values skipped); failing that, the
/// first attribute with a scalar value is used.
pub fn building_feature_id(attributes: &Attributes) -> Option<BuildingKey> {
    let known = BUILDING_ID_KEYS.iter().find_map(|key| {
        let value = attributes.get(key)?.to_scalar_string()?;
        (!value.is_empty()).then(|| BuildingKey {
            key: key.to_string(),
            value,
        })
    });
    known.or_else(|| {
        attributes.iter().find_map(|(key, value)| {
            value.to_scalar_string().map(|value| BuildingKey {
                key: key.to_string(),
                value,
            })
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingHeightRule {
    pub default_height_m: f64,
    pub metres_per_level: f64,
}

impl Default for BuildingHeightRule {
    fn default() -> Self {
        Self {
            default_height_m: 30.0,
            metres_per_level: 3.0,
        }
    }
}

impl BuildingHeightRule {
    /// Height from `height`, else `building:levels` times the storey height.
    ///
    /// A present but non-numeric `height` does not fall through to levels.
    /// Non-finite or non-positive results use the default height.
    pub fn height_of(&self, attributes: &Attributes) -> f64 {
        let height = match attributes.get("height") {
            Some(value) => value.as_number().unwrap_or(f64::NAN),
            None => attributes.number("building:levels").unwrap_or(0.0) * self.metres_per_level,
        };
        if height.is_finite() && height > 0.0 {
            height
        } else {
            self.default_height_m
        }
    }
}

/// How the building asset is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum BuildingsStyle {
    /// Solid red masses.
    #[default]
    Normal,
    /// Semi-transparent grey so an indoor overlay shows through.
    RoofOff,
    /// Normal style with one building hidden.
    HideOne(BuildingKey),
}

/// Buildings attributed to clients through clicks, deduplicated per client.
#[derive(Debug, Clone, Default)]
pub struct BuildingIndex {
    by_client: BTreeMap<ClientIdentity, BTreeSet<BuildingKey>>,
}

impl BuildingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the building was not yet attributed to `client`.
    pub fn record(&mut self, client: ClientIdentity, building: BuildingKey) -> bool {
        self.by_client.entry(client).or_default().insert(building)
    }

    pub fn count_for(&self, client: &ClientIdentity) -> usize {
        self.by_client.get(client).map_or(0, BTreeSet::len)
    }

    pub fn buildings_of(&self, client: &ClientIdentity) -> impl Iterator<Item = &BuildingKey> {
        self.by_client.get(client).into_iter().flatten()
    }

    pub fn clear(&mut self) {
        self.by_client.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildingHeightRule, BuildingIndex, BuildingKey, building_feature_id};
    use crate::client_index::ClientIdentity;
    use scene::{AttributeValue, Attributes};

    #[test]
    fn known_id_keys_take_priority() {
        let attrs: Attributes = [("name", "Town Hall"), ("osm_id", "w123"), ("id", "")]
            .into_iter()
            .collect();
        let key = building_feature_id(&attrs).expect("id");
        assert_eq!(
            key,
            BuildingKey {
                key: "osm_id".to_string(),
                value: "w123".to_string()
            }
        );
    }

    #[test]
    fn falls_back_to_first_scalar() {
        let attrs = Attributes::new(vec![
            ("roof".to_string(), AttributeValue::Null),
            ("levels".to_string(), AttributeValue::Number(4.0)),
        ]);
        let key = building_feature_id(&attrs).expect("id");
        assert_eq!((key.key.as_str(), key.value.as_str()), ("levels", "4"));
        assert_eq!(building_feature_id(&Attributes::default()), None);
    }

    #[test]
    fn height_rules() {
        let rule = BuildingHeightRule::default();
        let h = |pairs: Vec<(&str, AttributeValue)>| {
            rule.height_of(&pairs.into_iter().collect::<Attributes>())
        };
        assert_eq!(h(vec![("height", AttributeValue::Number(18.5))]), 18.5);
        assert_eq!(h(vec![("building:levels", AttributeValue::Number(4.0))]), 12.0);
        assert_eq!(h(vec![("height", AttributeValue::from("tall"))]), 30.0);
        assert_eq!(h(vec![("height", AttributeValue::Number(-2.0))]), 30.0);
        assert_eq!(h(vec![]), 30.0);
    }

    #[test]
    fn attributed_buildings_are_deduplicated() {
        let mut index = BuildingIndex::new();
        let acme = ClientIdentity::new("Acme Ltd");
        let b = BuildingKey {
            key: "id".to_string(),
            value: "7".to_string(),
        };
        assert!(index.record(acme.clone(), b.clone()));
        assert!(!index.record(acme.clone(), b));
        assert_eq!(index.count_for(&acme), 1);
        assert_eq!(index.count_for(&ClientIdentity::new("Other")), 0);
    }
}
