use foundation::Millis;
use foundation::math::{LonLat, Vec3};
use layers::{BuildingHeightRule, CameraTarget, Orientation};
use persistence::{DEFAULT_OFFSET_KEY, OffsetStore, OverlayOffset, StorageError};
use scene::{FeatureId, FeatureStore};
use serde::{Deserialize, Serialize};

use crate::drag::{DragSession, DragUpdate, HandleView};
use crate::offset::{AppliedOffset, apply_offset, save_offset};
use crate::transform::centroid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Default overlay placement when nothing has been saved.
    pub site_longitude: f64,
    pub site_latitude: f64,
    /// Inspected buildings within this many degrees of the site get the overlay.
    pub site_radius_deg: f64,
    pub storage_key: String,
    /// Height above the roof for the top-down inspect view.
    pub inspect_clearance_m: f64,
    pub building_height: BuildingHeightRule,
    pub inspect_duration_s: f64,
    pub restore_pitch_rad: f64,
    pub restore_duration_s: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            site_longitude: -1.489934,
            site_latitude: 53.422742,
            site_radius_deg: 0.01,
            storage_key: DEFAULT_OFFSET_KEY.to_string(),
            inspect_clearance_m: 120.0,
            building_height: BuildingHeightRule::default(),
            inspect_duration_s: 1.6,
            restore_pitch_rad: -0.5,
            restore_duration_s: 1.0,
        }
    }
}

impl OverlayConfig {
    pub fn site_anchor(&self) -> LonLat {
        LonLat::new(self.site_longitude, self.site_latitude)
    }

    pub fn is_at_site(&self, location: LonLat) -> bool {
        (location.lon_deg - self.site_longitude).abs() < self.site_radius_deg
            && (location.lat_deg - self.site_latitude).abs() < self.site_radius_deg
    }

    /// Top-down view above a building of `building_height_m`.
    pub fn inspect_target(&self, location: LonLat, building_height_m: f64) -> CameraTarget {
        CameraTarget {
            center: location,
            altitude_m: building_height_m + self.inspect_clearance_m,
            orientation: Some(Orientation::top_down()),
            duration_s: self.inspect_duration_s,
        }
    }

    /// Tilts the camera back to an oblique view without moving it.
    pub fn restore_target(&self, camera: LonLat, camera_altitude_m: f64) -> CameraTarget {
        CameraTarget {
            center: camera,
            altitude_m: camera_altitude_m,
            orientation: Some(Orientation::pitched(self.restore_pitch_rad)),
            duration_s: self.restore_duration_s,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverlayKey {
    Save,
    Reset,
    Info,
    ToggleHandle,
    Cancel,
}

impl OverlayKey {
    /// Maps a DOM-style key name (`"s"`, `"S"`, `"Escape"`, ...).
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "s" | "S" => Some(OverlayKey::Save),
            "r" | "R" => Some(OverlayKey::Reset),
            "i" | "I" => Some(OverlayKey::Info),
            "h" | "H" => Some(OverlayKey::ToggleHandle),
            "Escape" | "Esc" => Some(OverlayKey::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// `None` when the overlay had nothing to save.
    Saved(Option<OverlayOffset>),
    Reset { removed: bool },
    Info(Option<OverlayOffset>),
    HandleVisibility(HandleView),
    HandleRemoved,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub applied: Option<AppliedOffset>,
    pub visibility: Vec<(FeatureId, bool)>,
    pub handle: HandleView,
}

/// Owns the movable overlay (an indoor floorplan) and its drag handle.
///
/// Hidden until activated; activation places it at the saved offset or the
/// given anchor, shows its shapes, hides its points and creates the handle.
#[derive(Debug, Clone, Default)]
pub struct OverlayController {
    store: FeatureStore,
    active: bool,
    drag: Option<DragSession>,
}

impl OverlayController {
    pub fn new(store: FeatureStore) -> Self {
        Self {
            store,
            active: false,
            drag: None,
        }
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn handle(&self) -> Option<HandleView> {
        self.drag.as_ref().map(DragSession::handle)
    }

    /// Initial visibility for a freshly loaded overlay: everything hidden.
    pub fn hide_all(&mut self) -> Vec<FeatureId> {
        self.store.set_visible_where(false, |_| true)
    }

    pub fn activate(
        &mut self,
        anchor: LonLat,
        saved: Option<&OverlayOffset>,
        camera_position: Vec3,
    ) -> Activation {
        let applied = apply_offset(&mut self.store, anchor, saved);
        if applied.is_none() {
            tracing::warn!("overlay has no geometry to place");
        }

        let mut visibility = Vec::new();
        for id in self.store.set_visible_where(true, |f| f.geometry.is_shape()) {
            visibility.push((id, true));
        }
        for id in self.store.set_visible_where(false, |f| !f.geometry.is_shape()) {
            visibility.push((id, false));
        }

        let handle_position = centroid(&self.store).unwrap_or(camera_position);
        let drag = DragSession::new(handle_position);
        let handle = drag.handle();
        self.drag = Some(drag);
        self.active = true;
        Activation {
            applied,
            visibility,
            handle,
        }
    }

    /// Hides the overlay shapes and removes the handle; returns the ids hidden.
    pub fn deactivate(&mut self) -> Vec<FeatureId> {
        self.active = false;
        self.drag = None;
        self.store.set_visible_where(false, |f| f.geometry.is_shape())
    }

    pub fn key<S: OffsetStore + ?Sized>(
        &mut self,
        key: OverlayKey,
        offsets: &mut S,
        now: Millis,
    ) -> Result<KeyOutcome, StorageError> {
        if !self.active {
            return Ok(KeyOutcome::Ignored);
        }
        let outcome = match key {
            OverlayKey::Save => KeyOutcome::Saved(save_offset(&self.store, offsets, now)?),
            OverlayKey::Reset => {
                let removed = offsets.clear()?;
                tracing::info!(removed, "saved overlay position cleared");
                KeyOutcome::Reset { removed }
            }
            OverlayKey::Info => KeyOutcome::Info(offsets.load()?),
            OverlayKey::ToggleHandle => match self.drag.as_mut() {
                Some(drag) => {
                    drag.toggle_visible();
                    KeyOutcome::HandleVisibility(drag.handle())
                }
                None => KeyOutcome::Ignored,
            },
            OverlayKey::Cancel => match self.drag.take() {
                Some(_) => KeyOutcome::HandleRemoved,
                None => KeyOutcome::Ignored,
            },
        };
        Ok(outcome)
    }

    pub fn pointer_down(&mut self, hits_handle: bool, pick: Option<Vec3>) -> bool {
        match self.drag.as_mut() {
            Some(drag) => drag.pointer_down(hits_handle, pick, &self.store),
            None => false,
        }
    }

    pub fn pointer_move(&mut self, pick: Option<Vec3>) -> Option<DragUpdate> {
        self.drag.as_mut()?.pointer_move(pick, &mut self.store)
    }

    pub fn pointer_up(&mut self) -> Option<HandleView> {
        let drag = self.drag.as_mut()?;
        drag.pointer_up().then(|| drag.handle())
    }
}
