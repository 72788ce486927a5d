use crate::math::LonLat;

/// Axis-aligned geographic bounds in degrees (`[lon, lat]`).
///
/// Starts empty; `extend` grows it to cover each accumulated point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    pub fn extend(&mut self, p: LonLat) {
        self.min[0] = self.min[0].min(p.lon_deg);
        self.min[1] = self.min[1].min(p.lat_deg);
        self.max[0] = self.max[0].max(p.lon_deg);
        self.max[1] = self.max[1].max(p.lat_deg);
    }

    /// Midpoint of the box (not a geometry-weighted centroid).
    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        )
    }

    /// `(lon_extent, lat_extent)` in degrees.
    pub fn extent(&self) -> (f64, f64) {
        (self.max[0] - self.min[0], self.max[1] - self.min[1])
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;
    use crate::math::LonLat;

    #[test]
    fn extends_from_empty() {
        let mut b = Aabb2::empty();
        assert!(b.is_empty());
        b.extend(LonLat::new(2.0, -1.0));
        b.extend(LonLat::new(-2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b, Aabb2::new([-2.0, -1.0], [2.0, 3.0]));
        assert_eq!(b.center(), LonLat::new(0.0, 1.0));
        assert_eq!(b.extent(), (4.0, 4.0));
    }
}
