use foundation::math::{LonLat, Vec3, degrees_from_world};

/// Polygon boundary as `(longitude, latitude)` degrees, in vertex order.
///
/// No closing duplicate is required; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring {
    points: Vec<LonLat>,
}

impl Ring {
    pub fn new(points: Vec<LonLat>) -> Self {
        Self { points }
    }

    pub fn from_degrees(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(lon, lat)| LonLat::new(lon, lat))
                .collect(),
        )
    }

    /// Projects world positions to the ellipsoid, dropping heights.
    pub fn from_positions(positions: &[Vec3]) -> Self {
        Self::new(
            positions
                .iter()
                .map(|p| degrees_from_world(*p).0)
                .collect(),
        )
    }

    pub fn points(&self) -> &[LonLat] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Ring;
    use foundation::math::world_from_degrees;

    #[test]
    fn projects_world_positions_to_degrees() {
        let positions = vec![
            world_from_degrees(-1.5, 53.4, 120.0),
            world_from_degrees(-1.4, 53.5, 80.0),
        ];
        let ring = Ring::from_positions(&positions);
        assert_eq!(ring.len(), 2);
        assert!((ring.points()[0].lon_deg - -1.5).abs() < 1e-7);
        assert!((ring.points()[1].lat_deg - 53.5).abs() < 1e-7);
    }
}
