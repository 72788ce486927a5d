use foundation::math::Vec3;

use crate::feature::{Attributes, Feature, FeatureGeometry, FeatureId, GeometryKind};
use crate::ring::Ring;

/// Features of one data source (boundaries, floorplan, ...), kept in ingestion order.
///
/// The store is the session's view of the renderer's entity collection:
/// position sets are replaced wholesale and visibility is tracked per feature.
#[derive(Debug, Default, Clone)]
pub struct FeatureStore {
    features: Vec<Feature>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, attributes: Attributes, geometry: FeatureGeometry) -> FeatureId {
        let id = FeatureId(self.features.len() as u32);
        self.features.push(Feature {
            id,
            attributes,
            geometry,
            visible: true,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.index())
    }

    /// Features in ingestion order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn ids_of_kind(&self, kind: GeometryKind) -> Vec<FeatureId> {
        self.features
            .iter()
            .filter(|f| f.kind() == kind)
            .map(|f| f.id)
            .collect()
    }

    pub fn positions(&self, id: FeatureId) -> Option<&[Vec3]> {
        self.get(id).map(|f| f.geometry.positions())
    }

    /// Geographic ring of a polygon, derived from its current positions.
    ///
    /// Never cached: positions can change under drag or offset restore.
    pub fn ring(&self, id: FeatureId) -> Option<Ring> {
        let feature = self.get(id)?;
        match &feature.geometry {
            FeatureGeometry::Polygon { hierarchy } if !hierarchy.is_empty() => {
                Some(Ring::from_positions(hierarchy))
            }
            _ => None,
        }
    }

    /// Replaces the full position set of a polygon or polyline in one step.
    ///
    /// Returns `false` (and changes nothing) for unknown ids and points.
    pub fn replace_positions(&mut self, id: FeatureId, positions: Vec<Vec3>) -> bool {
        let Some(feature) = self.features.get_mut(id.index()) else {
            return false;
        };
        match &mut feature.geometry {
            FeatureGeometry::Polygon { hierarchy } => *hierarchy = positions,
            FeatureGeometry::Polyline { positions: current } => *current = positions,
            FeatureGeometry::Point { .. } => return false,
        }
        true
    }

    pub fn set_visible(&mut self, id: FeatureId, visible: bool) -> bool {
        let Some(feature) = self.features.get_mut(id.index()) else {
            return false;
        };
        let changed = feature.visible != visible;
        feature.visible = visible;
        changed
    }

    pub fn is_visible(&self, id: FeatureId) -> bool {
        self.get(id).is_some_and(|f| f.visible)
    }

    /// Sets visibility on every feature accepted by `filter`; returns the ids that changed.
    pub fn set_visible_where(
        &mut self,
        visible: bool,
        mut filter: impl FnMut(&Feature) -> bool,
    ) -> Vec<FeatureId> {
        let mut changed = Vec::new();
        for feature in &mut self.features {
            if !filter(feature) || feature.visible == visible {
                continue;
            }
            feature.visible = visible;
            changed.push(feature.id);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureStore;
    use crate::feature::{Attributes, FeatureGeometry, FeatureId, GeometryKind};
    use foundation::math::Vec3;

    fn line(store: &mut FeatureStore) -> FeatureId {
        store.spawn(
            Attributes::default(),
            FeatureGeometry::Polyline {
                positions: vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
            },
        )
    }

    #[test]
    fn ids_follow_ingestion_order() {
        let mut store = FeatureStore::new();
        let a = line(&mut store);
        let b = store.spawn(
            Attributes::default(),
            FeatureGeometry::Point {
                position: Vec3::ZERO,
            },
        );
        assert_eq!((a, b), (FeatureId(0), FeatureId(1)));
        assert_eq!(store.ids_of_kind(GeometryKind::Point), vec![b]);
    }

    #[test]
    fn replace_positions_swaps_whole_set() {
        let mut store = FeatureStore::new();
        let id = line(&mut store);
        assert!(store.replace_positions(id, vec![Vec3::new(9.0, 9.0, 9.0)]));
        assert_eq!(store.positions(id), Some(&[Vec3::new(9.0, 9.0, 9.0)][..]));
    }

    #[test]
    fn points_and_unknown_ids_are_not_replaced() {
        let mut store = FeatureStore::new();
        let p = store.spawn(
            Attributes::default(),
            FeatureGeometry::Point {
                position: Vec3::ZERO,
            },
        );
        assert!(!store.replace_positions(p, vec![Vec3::new(1.0, 1.0, 1.0)]));
        assert!(!store.replace_positions(FeatureId(42), Vec::new()));
        assert_eq!(store.positions(p), Some(&[Vec3::ZERO][..]));
    }

    #[test]
    fn visibility_changes_are_reported() {
        let mut store = FeatureStore::new();
        let a = line(&mut store);
        let b = line(&mut store);
        assert!(store.set_visible(a, false));
        assert!(!store.set_visible(a, false));

        let changed = store.set_visible_where(false, |_| true);
        assert_eq!(changed, vec![b]);
        assert!(!store.is_visible(a));
        assert!(!store.is_visible(b));
    }
}
