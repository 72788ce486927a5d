use foundation::math::{Vec3, mean};
use scene::{FeatureId, FeatureStore};

/// Arithmetic mean of every polygon and polyline vertex; points are excluded.
pub fn centroid(store: &FeatureStore) -> Option<Vec3> {
    mean(
        store
            .iter()
            .filter(|f| f.geometry.is_shape())
            .flat_map(|f| f.geometry.positions().iter().copied()),
    )
}

/// Moves every polygon and polyline vertex by `delta`.
///
/// Each feature's position set is replaced in one step. Returns the ids
/// whose positions changed so they can be pushed to the renderer.
pub fn translate(store: &mut FeatureStore, delta: Vec3) -> Vec<FeatureId> {
    let moved: Vec<(FeatureId, Vec<Vec3>)> = store
        .iter()
        .filter(|f| f.geometry.is_shape())
        .map(|f| {
            let positions = f.geometry.positions().iter().map(|p| *p + delta).collect();
            (f.id, positions)
        })
        .collect();
    apply(store, moved)
}

fn apply(store: &mut FeatureStore, moved: Vec<(FeatureId, Vec<Vec3>)>) -> Vec<FeatureId> {
    moved
        .into_iter()
        .filter_map(|(id, positions)| store.replace_positions(id, positions).then_some(id))
        .collect()
}

/// Shape positions captured at a known instant, e.g. the start of a drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionSnapshot {
    shapes: Vec<(FeatureId, Vec<Vec3>)>,
}

impl PositionSnapshot {
    pub fn capture(store: &FeatureStore) -> Self {
        Self {
            shapes: store
                .iter()
                .filter(|f| f.geometry.is_shape())
                .map(|f| (f.id, f.geometry.positions().to_vec()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Sets every captured shape to its snapshot positions plus `delta`.
    ///
    /// Repeated calls never accumulate: each is relative to the capture.
    pub fn translate_into(&self, store: &mut FeatureStore, delta: Vec3) -> Vec<FeatureId> {
        let moved = self
            .shapes
            .iter()
            .map(|(id, positions)| (*id, positions.iter().map(|p| *p + delta).collect()))
            .collect();
        apply(store, moved)
    }
}
