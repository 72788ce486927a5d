use foundation::Millis;
use foundation::math::{LonLat, Vec3, degrees_from_world, world_from_degrees};
use persistence::{OffsetStore, OverlayOffset, StorageError};
use scene::{FeatureId, FeatureStore};

use crate::transform::{centroid, translate};

/// Persists the overlay centroid's longitude/latitude, overwriting any earlier record.
///
/// `Ok(None)` when the overlay has no eligible vertices; nothing is written.
pub fn save_offset<S: OffsetStore + ?Sized>(
    store: &FeatureStore,
    offsets: &mut S,
    now: Millis,
) -> Result<Option<OverlayOffset>, StorageError> {
    let Some(center) = centroid(store) else {
        return Ok(None);
    };
    let (location, _) = degrees_from_world(center);
    let offset = OverlayOffset {
        longitude: location.lon_deg,
        latitude: location.lat_deg,
        timestamp: now.0,
    };
    offsets.save(&offset)?;
    tracing::info!(
        lon = offset.longitude,
        lat = offset.latitude,
        "overlay position saved"
    );
    Ok(Some(offset))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOffset {
    pub target: LonLat,
    pub delta: Vec3,
    pub changed: Vec<FeatureId>,
    /// Whether the target came from a saved record rather than the anchor.
    pub from_saved: bool,
}

/// Moves the overlay so its centroid sits over the saved position, or `anchor` without one.
///
/// The centroid keeps its height above the ellipsoid. Returns `None` and
/// changes nothing when the overlay has no eligible vertices.
pub fn apply_offset(
    store: &mut FeatureStore,
    anchor: LonLat,
    saved: Option<&OverlayOffset>,
) -> Option<AppliedOffset> {
    let current = centroid(store)?;
    let (_, altitude_m) = degrees_from_world(current);
    let target = saved.map_or(anchor, |s| LonLat::new(s.longitude, s.latitude));

    let delta = world_from_degrees(target.lon_deg, target.lat_deg, altitude_m) - current;
    let changed = translate(store, delta);
    Some(AppliedOffset {
        target,
        delta,
        changed,
        from_saved: saved.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::{apply_offset, save_offset};
    use crate::transform::centroid;
    use foundation::Millis;
    use foundation::math::{LonLat, degrees_from_world, world_from_degrees};
    use persistence::{InMemoryOffsetStore, OffsetStore, OverlayOffset};
    use scene::{Attributes, FeatureGeometry, FeatureStore};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    /// Small room footprint at `(lon, lat)` raised `height` metres.
    fn room(lon: f64, lat: f64, height: f64) -> FeatureStore {
        let d = 0.0001;
        let mut store = FeatureStore::new();
        let hierarchy = [(lon - d, lat - d), (lon + d, lat - d), (lon + d, lat + d), (lon - d, lat + d)]
            .iter()
            .map(|&(x, y)| world_from_degrees(x, y, height))
            .collect();
        store.spawn(Attributes::default(), FeatureGeometry::Polygon { hierarchy });
        store
    }

    #[test]
    fn save_then_apply_lands_on_saved_position() {
        let mut offsets = InMemoryOffsetStore::new();
        let placed = room(-1.4901, 53.4230, 40.0);
        let saved = save_offset(&placed, &mut offsets, Millis(1_000))
            .unwrap()
            .expect("saved");
        assert_eq!(saved.timestamp, 1_000);
        assert_eq!(offsets.load().unwrap(), Some(saved));

        let mut fresh = room(0.0, 0.0, 40.0);
        let (_, alt_before) = degrees_from_world(centroid(&fresh).unwrap());
        let applied = apply_offset(&mut fresh, LonLat::new(-1.489934, 53.422742), Some(&saved))
            .expect("applied");
        assert!(applied.from_saved);

        let (location, alt_after) = degrees_from_world(centroid(&fresh).unwrap());
        assert_close(location.lon_deg, saved.longitude, 1e-7);
        assert_close(location.lat_deg, saved.latitude, 1e-7);
        assert_close(alt_after, alt_before, 1e-3);
    }

    #[test]
    fn falls_back_to_anchor() {
        let mut store = room(10.0, 10.0, 5.0);
        let anchor = LonLat::new(-1.489934, 53.422742);
        let applied = apply_offset(&mut store, anchor, None).expect("applied");
        assert!(!applied.from_saved);
        assert_eq!(applied.target, anchor);
        let (location, _) = degrees_from_world(centroid(&store).unwrap());
        assert_close(location.lon_deg, anchor.lon_deg, 1e-7);
        assert_close(location.lat_deg, anchor.lat_deg, 1e-7);
    }

    #[test]
    fn empty_overlay_is_a_no_op() {
        let mut store = FeatureStore::new();
        let mut offsets = InMemoryOffsetStore::with_offset(OverlayOffset {
            longitude: 1.0,
            latitude: 2.0,
            timestamp: 3,
        });
        assert_eq!(save_offset(&store, &mut offsets, Millis(9)).unwrap(), None);
        assert_eq!(offsets.load().unwrap().map(|o| o.timestamp), Some(3));
        assert!(apply_offset(&mut store, LonLat::default(), None).is_none());
    }
}
