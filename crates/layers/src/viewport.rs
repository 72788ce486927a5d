use foundation::Aabb2;
use foundation::math::{LonLat, degrees_from_world};
use scene::{FeatureGeometry, FeatureId, FeatureStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeTier {
    /// Applies when the padded extent is strictly greater than this (degrees).
    pub above_extent_deg: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Fraction added to each extent before tier lookup (0.2 pads by 20%).
    pub padding: f64,
    /// Checked in descending threshold order.
    pub tiers: Vec<AltitudeTier>,
    pub min_altitude_m: f64,
    pub fly_duration_s: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        let tier = |above_extent_deg, altitude_m| AltitudeTier {
            above_extent_deg,
            altitude_m,
        };
        Self {
            padding: 0.2,
            tiers: vec![
                tier(10.0, 5_000_000.0),
                tier(5.0, 2_000_000.0),
                tier(2.0, 500_000.0),
                tier(0.5, 100_000.0),
            ],
            min_altitude_m: 50_000.0,
            fly_duration_s: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Orientation {
    pub const fn pitched(pitch: f64) -> Self {
        Self {
            heading: 0.0,
            pitch,
            roll: 0.0,
        }
    }

    pub const fn top_down() -> Self {
        Self::pitched(-std::f64::consts::FRAC_PI_2)
    }
}

/// Camera fly destination handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    pub center: LonLat,
    pub altitude_m: f64,
    /// `None` keeps the renderer's current orientation.
    pub orientation: Option<Orientation>,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFit {
    pub center: LonLat,
    pub bounds: Aabb2,
    /// `(lon, lat)` extents after padding, degrees.
    pub padded_extent: (f64, f64),
    pub altitude_m: f64,
}

impl ViewportFit {
    pub fn max_extent(&self) -> f64 {
        self.padded_extent.0.max(self.padded_extent.1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewportFitter {
    config: ViewportConfig,
}

impl ViewportFitter {
    pub fn new(config: ViewportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Frames the current geometry of `polygons`.
    ///
    /// Returns `None` when none of them has vertices; the camera should not move.
    pub fn fit(&self, store: &FeatureStore, polygons: &[FeatureId]) -> Option<ViewportFit> {
        let mut bounds = Aabb2::empty();
        for id in polygons {
            let Some(FeatureGeometry::Polygon { hierarchy }) = store.get(*id).map(|f| &f.geometry)
            else {
                continue;
            };
            for position in hierarchy {
                bounds.extend(degrees_from_world(*position).0);
            }
        }
        if bounds.is_empty() {
            return None;
        }

        let (lon_extent, lat_extent) = bounds.extent();
        let pad = 1.0 + self.config.padding;
        let padded_extent = (lon_extent * pad, lat_extent * pad);
        let altitude_m = self.altitude_for_extent(padded_extent.0.max(padded_extent.1));
        Some(ViewportFit {
            center: bounds.center(),
            bounds,
            padded_extent,
            altitude_m,
        })
    }

    pub fn altitude_for_extent(&self, max_extent_deg: f64) -> f64 {
        self.config
            .tiers
            .iter()
            .find(|tier| max_extent_deg > tier.above_extent_deg)
            .map_or(self.config.min_altitude_m, |tier| tier.altitude_m)
    }

    pub fn camera_target(&self, fit: &ViewportFit) -> CameraTarget {
        CameraTarget {
            center: fit.center,
            altitude_m: fit.altitude_m,
            orientation: None,
            duration_s: self.config.fly_duration_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ViewportConfig, ViewportFitter};
    use foundation::math::world_from_degrees;
    use scene::{Attributes, FeatureGeometry, FeatureId, FeatureStore};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn polygon(store: &mut FeatureStore, pts: &[(f64, f64)]) -> FeatureId {
        let hierarchy = pts
            .iter()
            .map(|&(lon, lat)| world_from_degrees(lon, lat, 0.0))
            .collect();
        store.spawn(Attributes::default(), FeatureGeometry::Polygon { hierarchy })
    }

    #[test]
    fn two_polygons_spanning_unit_degree() {
        let mut store = FeatureStore::new();
        let a = polygon(&mut store, &[(0.0, 0.0), (0.4, 0.0), (0.4, 0.4)]);
        let b = polygon(&mut store, &[(0.6, 0.6), (1.0, 0.6), (1.0, 1.0)]);

        let fitter = ViewportFitter::default();
        let fit = fitter.fit(&store, &[a, b]).expect("fit");
        assert_close(fit.center.lon_deg, 0.5, 1e-7);
        assert_close(fit.center.lat_deg, 0.5, 1e-7);
        assert_close(fit.max_extent(), 1.2, 1e-7);
        assert_eq!(fit.altitude_m, 100_000.0);

        let target = fitter.camera_target(&fit);
        assert_eq!(target.duration_s, 2.0);
        assert!(target.orientation.is_none());
    }

    #[test]
    fn tier_thresholds_are_strict() {
        let fitter = ViewportFitter::default();
        assert_eq!(fitter.altitude_for_extent(0.5), 50_000.0);
        assert_eq!(fitter.altitude_for_extent(0.51), 100_000.0);
        assert_eq!(fitter.altitude_for_extent(2.0), 100_000.0);
        assert_eq!(fitter.altitude_for_extent(5.0), 500_000.0);
        assert_eq!(fitter.altitude_for_extent(10.0), 2_000_000.0);
        assert_eq!(fitter.altitude_for_extent(10.5), 5_000_000.0);
    }

    #[test]
    fn nothing_to_frame() {
        let mut store = FeatureStore::new();
        let empty = polygon(&mut store, &[]);
        let point = store.spawn(
            Attributes::default(),
            FeatureGeometry::Point {
                position: world_from_degrees(1.0, 1.0, 0.0),
            },
        );
        let fitter = ViewportFitter::default();
        assert!(fitter.fit(&store, &[]).is_none());
        assert!(fitter.fit(&store, &[empty, point, FeatureId(99)]).is_none());
    }

    #[test]
    fn config_overrides_padding() {
        let mut store = FeatureStore::new();
        let a = polygon(&mut store, &[(0.0, 0.0), (3.0, 1.0)]);
        let fitter = ViewportFitter::new(ViewportConfig {
            padding: 0.0,
            ..ViewportConfig::default()
        });
        let fit = fitter.fit(&store, &[a]).expect("fit");
        assert_close(fit.max_extent(), 3.0, 1e-7);
        assert_eq!(fit.altitude_m, 500_000.0);
    }
}
