use foundation::math::LonLat;

use crate::feature::FeatureId;
use crate::ring::Ring;
use crate::store::FeatureStore;

/// Even-odd point-in-polygon test in geographic degrees.
///
/// Casts a ray from `(x, y)` (longitude, latitude) towards +longitude and
/// counts crossings of each edge, including the closing edge. Rings with fewer
/// than three vertices contain nothing. Comparisons are exact; points on the
/// boundary fall wherever the half-open edge rule puts them.
pub fn point_in_ring(x: f64, y: f64, ring: &Ring) -> bool {
    let pts = ring.points();
    if pts.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let (pi, pj) = (pts[i], pts[j]);
        if (pi.lat_deg > y) != (pj.lat_deg > y) {
            let cross_lon = (pj.lon_deg - pi.lon_deg) * (y - pi.lat_deg)
                / (pj.lat_deg - pi.lat_deg)
                + pi.lon_deg;
            if x < cross_lon {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// First polygon in `candidates` whose current ring contains `at`.
///
/// Candidates are tested in the order given (ingestion order for the boundary
/// index) and the search stops at the first hit, so where polygons overlap the
/// earliest one wins. Non-polygons and empty geometries are skipped.
pub fn first_containing(
    store: &FeatureStore,
    candidates: &[FeatureId],
    at: LonLat,
) -> Option<FeatureId> {
    candidates.iter().copied().find(|id| {
        store
            .ring(*id)
            .is_some_and(|ring| point_in_ring(at.lon_deg, at.lat_deg, &ring))
    })
}

#[cfg(test)]
mod tests {
    use super::{first_containing, point_in_ring};
    use crate::feature::{Attributes, FeatureGeometry};
    use crate::ring::Ring;
    use crate::store::FeatureStore;
    use foundation::math::{LonLat, world_from_degrees};

    fn unit_square() -> Ring {
        Ring::from_degrees(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])
    }

    #[test]
    fn unit_square_inside_and_outside() {
        let ring = unit_square();
        assert!(point_in_ring(0.5, 0.5, &ring));
        assert!(!point_in_ring(1.5, 0.5, &ring));
        assert!(!point_in_ring(0.5, -0.5, &ring));
    }

    #[test]
    fn unit_square_origin_corner_is_inside_under_half_open_rule() {
        // Boundary behavior is implementation-defined; pin it down here.
        assert!(point_in_ring(0.0, 0.0, &unit_square()));
        assert!(!point_in_ring(1.0, 1.0, &unit_square()));
    }

    #[test]
    fn degenerate_rings_contain_nothing() {
        assert!(!point_in_ring(0.0, 0.0, &Ring::default()));
        let two = Ring::from_degrees(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(!point_in_ring(0.5, 0.5, &two));
    }

    #[test]
    fn concave_ring_uses_closing_edge() {
        // U shape opening to the north; the notch is outside.
        let ring = Ring::from_degrees(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]);
        assert!(point_in_ring(0.5, 2.0, &ring));
        assert!(!point_in_ring(1.5, 2.0, &ring));
        assert!(point_in_ring(1.5, 0.5, &ring));
    }

    fn square(store: &mut FeatureStore, lon0: f64, lat0: f64, size: f64) -> crate::FeatureId {
        let hierarchy = [
            (lon0, lat0),
            (lon0, lat0 + size),
            (lon0 + size, lat0 + size),
            (lon0 + size, lat0),
        ]
        .iter()
        .map(|&(lon, lat)| world_from_degrees(lon, lat, 0.0))
        .collect();
        store.spawn(Attributes::default(), FeatureGeometry::Polygon { hierarchy })
    }

    #[test]
    fn overlapping_polygons_resolve_to_first_ingested() {
        let mut store = FeatureStore::new();
        let big = square(&mut store, 0.0, 0.0, 2.0);
        let small = square(&mut store, 0.5, 0.5, 0.5);

        let hit = first_containing(&store, &[big, small], LonLat::new(0.7, 0.7));
        assert_eq!(hit, Some(big));
        let hit = first_containing(&store, &[small, big], LonLat::new(0.7, 0.7));
        assert_eq!(hit, Some(small));
        assert_eq!(
            first_containing(&store, &[big, small], LonLat::new(5.0, 5.0)),
            None
        );
    }
}
