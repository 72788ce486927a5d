use foundation::Millis;
use foundation::math::{LonLat, degrees_from_world, world_from_degrees};
use formats::{FeatureCollection, ingest_feature_collection};
use layers::{
    BuildingIndex, BuildingKey, BuildingsStyle, ClickAttribution, ClientIdentity, ClientSummary,
    GeometryIndex, PickedAsset, Tenure, ViewportFitter, attribute_click, building_feature_id,
};
use overlay::{KeyOutcome, OverlayController, OverlayKey};
use persistence::{OffsetStore, OverlayOffset};
use runtime::{Clock, ListenerId, Listeners, TimerSlots};
use scene::{Attributes, FeatureId, FeatureStore, GeometryKind};
use streaming::{TileResilienceManager, ToleranceChange};

use crate::config::ViewerConfig;
use crate::events::SessionEvent;
use crate::host::{CameraState, LayerKind, Notice, NoticeKind, Pick, SceneHost};

const NOTICE_KINDS: [NoticeKind; 4] = [
    NoticeKind::PositionSaved,
    NoticeKind::PositionReset,
    NoticeKind::PositionInfo,
    NoticeKind::StorageFailed,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected { polygons: usize, camera_moved: bool },
    /// Boundaries are not indexed yet; the selection is applied once they are.
    Pending,
    /// Not in the loaded boundaries; retried on the next boundary load.
    Unknown,
}

/// The building chosen for inspection by the last right click.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedBuilding {
    pub location: LonLat,
    pub height_m: f64,
    pub key: Option<BuildingKey>,
}

/// Turns per-frame camera poses into move-start / move-end edges.
#[derive(Debug, Clone, Default)]
struct CameraTracker {
    last: Option<CameraState>,
    moving: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CameraEdge {
    Started,
    Ended,
}

impl CameraTracker {
    const POSITION_EPS_M: f64 = 0.01;
    const ANGLE_EPS_RAD: f64 = 1e-6;

    fn observe(&mut self, camera: CameraState) -> Option<CameraEdge> {
        let moved = self.last.is_some_and(|last| {
            last.position.distance(camera.position) > Self::POSITION_EPS_M
                || (last.heading - camera.heading).abs() > Self::ANGLE_EPS_RAD
                || (last.pitch - camera.pitch).abs() > Self::ANGLE_EPS_RAD
                || (last.roll - camera.roll).abs() > Self::ANGLE_EPS_RAD
        });
        self.last = Some(camera);
        match (moved, self.moving) {
            (true, false) => {
                self.moving = true;
                Some(CameraEdge::Started)
            }
            (false, true) => {
                self.moving = false;
                Some(CameraEdge::Ended)
            }
            _ => None,
        }
    }
}

/// One viewer: boundaries, buildings, the floorplan overlay and the tiled
/// building stream, driven by host events.
///
/// All state lives here; nothing is global. Handlers are called from the
/// host's single-threaded event loop and push their results back through
/// the [`SceneHost`]. Delayed work (notice expiry, tile tolerance
/// restoration) fires from [`ViewerSession::tick`].
pub struct ViewerSession<H: SceneHost, S: OffsetStore, C: Clock> {
    host: H,
    offsets: S,
    clock: C,
    config: ViewerConfig,
    boundaries: FeatureStore,
    index: Option<GeometryIndex>,
    buildings: BuildingIndex,
    fitter: ViewportFitter,
    overlay: Option<OverlayController>,
    tiles: TileResilienceManager,
    selection: Option<ClientIdentity>,
    pending_selection: Option<String>,
    inspected: Option<InspectedBuilding>,
    notices: TimerSlots<NoticeKind>,
    camera: CameraTracker,
    listeners: Listeners<SessionEvent>,
}

impl<H: SceneHost, S: OffsetStore, C: Clock> ViewerSession<H, S, C> {
    pub fn new(mut host: H, offsets: S, clock: C, config: ViewerConfig) -> Self {
        let tiles = TileResilienceManager::new(config.effective_resilience());
        host.set_tile_tolerance(tiles.tolerance());
        host.set_buildings_style(BuildingsStyle::Normal);
        Self {
            host,
            offsets,
            clock,
            fitter: ViewportFitter::new(config.viewport.clone()),
            config,
            boundaries: FeatureStore::new(),
            index: None,
            buildings: BuildingIndex::new(),
            overlay: None,
            tiles,
            selection: None,
            pending_selection: None,
            inspected: None,
            notices: TimerSlots::new(),
            camera: CameraTracker::default(),
            listeners: Listeners::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn offsets(&self) -> &S {
        &self.offsets
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn boundaries(&self) -> &FeatureStore {
        &self.boundaries
    }

    pub fn index(&self) -> Option<&GeometryIndex> {
        self.index.as_ref()
    }

    pub fn overlay(&self) -> Option<&OverlayController> {
        self.overlay.as_ref()
    }

    pub fn tiles(&self) -> &TileResilienceManager {
        &self.tiles
    }

    pub fn selection(&self) -> Option<&ClientIdentity> {
        self.selection.as_ref()
    }

    pub fn pending_selection(&self) -> Option<&str> {
        self.pending_selection.as_deref()
    }

    pub fn inspected(&self) -> Option<&InspectedBuilding> {
        self.inspected.as_ref()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn emit(&mut self, event: SessionEvent) {
        self.listeners.emit(&event);
    }

    /// Appends boundary features and rebuilds the client index over all of them.
    ///
    /// Returns the number of features added. A selection made before the
    /// first load, or of a client no earlier source had, is retried here.
    pub fn load_boundaries(&mut self, collection: &FeatureCollection) -> usize {
        let ids = ingest_feature_collection(&mut self.boundaries, collection);
        for &id in &ids {
            let Some(feature) = self.boundaries.get(id) else {
                continue;
            };
            if feature.kind() == GeometryKind::Polygon {
                let style = Tenure::classify(&feature.attributes).style();
                self.host.set_fill_style(LayerKind::Boundaries, id, style);
            }
        }

        let index = GeometryIndex::build(&self.boundaries);
        let clients = index.client_count();
        self.index = Some(index);
        self.emit(SessionEvent::BoundariesLoaded {
            features: ids.len(),
            clients,
        });

        let applied = match self.pending_selection.take() {
            Some(pending) => {
                tracing::info!(client = %pending, "applying pending selection");
                matches!(self.select_client(&pending), SelectOutcome::Selected { .. })
            }
            None => false,
        };
        if !applied && let Some(selected) = self.selection.clone() {
            self.apply_visibility(Some(selected.as_str()));
        }
        ids.len()
    }

    /// Replaces the overlay with `collection`, fully hidden until inspected.
    pub fn load_overlay(&mut self, collection: &FeatureCollection) -> usize {
        if self.overlay.as_ref().is_some_and(OverlayController::is_active) {
            self.deactivate_overlay();
        }
        let mut store = FeatureStore::new();
        let ids = ingest_feature_collection(&mut store, collection);
        let mut controller = OverlayController::new(store);
        let hidden = controller.hide_all();
        push_visibility(&mut self.host, LayerKind::Overlay, &hidden, false);
        self.overlay = Some(controller);
        tracing::info!(features = ids.len(), "overlay loaded");
        self.emit(SessionEvent::OverlayLoaded {
            features: ids.len(),
        });
        ids.len()
    }

    pub fn clients(&self) -> Vec<ClientSummary> {
        self.index
            .as_ref()
            .map(|index| index.summaries(Some(&self.buildings)))
            .unwrap_or_default()
    }

    pub fn search(&self, query: &str) -> Vec<ClientIdentity> {
        self.index
            .as_ref()
            .map(|index| index.search(query).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Shows only `client`'s boundaries and flies to frame them.
    pub fn select_client(&mut self, client: &str) -> SelectOutcome {
        let Some(index) = self.index.as_ref() else {
            self.pending_selection = Some(client.to_string());
            self.emit(SessionEvent::SelectionPending {
                client: client.to_string(),
            });
            return SelectOutcome::Pending;
        };
        if !index.contains_client(client) {
            tracing::debug!(client, "client not loaded, selection kept pending");
            self.pending_selection = Some(client.to_string());
            return SelectOutcome::Unknown;
        }
        let polygons = index.features_of(client).to_vec();
        self.pending_selection = None;

        self.apply_visibility(Some(client));
        let camera_moved = match self.fitter.fit(&self.boundaries, &polygons) {
            Some(fit) => {
                tracing::info!(
                    client,
                    lon = fit.center.lon_deg,
                    lat = fit.center.lat_deg,
                    altitude = fit.altitude_m,
                    "framing client"
                );
                self.host.fly_to(self.fitter.camera_target(&fit));
                true
            }
            None => false,
        };

        let identity = ClientIdentity::new(client);
        self.selection = Some(identity.clone());
        self.emit(SessionEvent::ClientSelected {
            client: identity,
            polygons: polygons.len(),
            camera_moved,
        });
        SelectOutcome::Selected {
            polygons: polygons.len(),
            camera_moved,
        }
    }

    /// Selects the first client matching `query`; `None` when nothing matches.
    pub fn search_and_select(&mut self, query: &str) -> Option<SelectOutcome> {
        let client = self.index.as_ref()?.first_match(query)?.clone();
        Some(self.select_client(client.as_str()))
    }

    /// Clears the selection and shows every boundary. The camera stays put.
    pub fn show_all(&mut self) {
        self.selection = None;
        self.pending_selection = None;
        self.apply_visibility(None);
        self.emit(SessionEvent::SelectionCleared);
    }

    fn apply_visibility(&mut self, client: Option<&str>) {
        let index = self.index.as_ref();
        let belongs = |id: FeatureId| match client {
            None => true,
            Some(name) => index
                .and_then(|i| i.client_of(id))
                .is_some_and(|owner| owner.as_str() == name),
        };
        let shown = self.boundaries.set_visible_where(true, |f| belongs(f.id));
        let hidden = self.boundaries.set_visible_where(false, |f| !belongs(f.id));
        push_visibility(&mut self.host, LayerKind::Boundaries, &shown, true);
        push_visibility(&mut self.host, LayerKind::Boundaries, &hidden, false);
    }

    /// Attributes a building click to the boundary it stands in.
    ///
    /// Buildings clicked inside a client's boundary are recorded for that client.
    pub fn on_left_click(&mut self, pick: &Pick) -> Option<ClickAttribution> {
        let index = self.index.as_ref()?;
        let attribution = attribute_click(
            index,
            &self.boundaries,
            pick.asset?,
            pick.world_position?,
        )?;
        let building = pick
            .building_properties
            .as_ref()
            .and_then(building_feature_id);
        let newly_recorded = match (&attribution.client, &building) {
            (Some(client), Some(key)) => self.buildings.record(client.clone(), key.clone()),
            _ => false,
        };
        self.emit(SessionEvent::ClickAttributed {
            attribution: attribution.clone(),
            building,
            newly_recorded,
        });
        Some(attribution)
    }

    /// Remembers a right-clicked building as the inspection target.
    pub fn on_right_click(&mut self, pick: &Pick) -> bool {
        if pick.asset != Some(PickedAsset::Buildings) {
            return false;
        }
        let Some(position) = pick.world_position else {
            return false;
        };
        let (location, _) = degrees_from_world(position);
        let empty = Attributes::default();
        let properties = pick.building_properties.as_ref().unwrap_or(&empty);
        let height_m = self.config.overlay.building_height.height_of(properties);
        self.inspected = Some(InspectedBuilding {
            location,
            height_m,
            key: building_feature_id(properties),
        });
        tracing::debug!(
            lon = location.lon_deg,
            lat = location.lat_deg,
            height_m,
            "building marked for inspection"
        );
        true
    }

    /// Flies top-down over the inspected building with roofs off.
    ///
    /// Near the overlay site the floorplan is shown at its saved position,
    /// or at the building when nothing is saved; elsewhere it is hidden.
    pub fn inspect_overlay(&mut self) -> bool {
        let Some(building) = self.inspected.clone() else {
            return false;
        };
        let overlay_config = &self.config.overlay;
        self.host.fly_to(overlay_config.inspect_target(building.location, building.height_m));
        self.host.set_buildings_style(BuildingsStyle::RoofOff);

        if !overlay_config.is_at_site(building.location) {
            if self.overlay.as_ref().is_some_and(OverlayController::is_active) {
                self.deactivate_overlay();
            }
            return true;
        }

        let saved = match self.offsets.load() {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(error = %e, "saved overlay position unreadable, using default");
                None
            }
        };
        let fallback = self.camera.last.map(|c| c.position).unwrap_or_else(|| {
            world_from_degrees(
                building.location.lon_deg,
                building.location.lat_deg,
                building.height_m,
            )
        });

        let Some(controller) = self.overlay.as_mut() else {
            tracing::debug!("inspect at site without a loaded overlay");
            return true;
        };
        let activation = controller.activate(building.location, saved.as_ref(), fallback);
        let from_saved = activation.applied.as_ref().is_some_and(|a| a.from_saved);
        if let Some(applied) = &activation.applied {
            push_positions(&mut self.host, controller.store(), &applied.changed);
        }
        for &(id, visible) in &activation.visibility {
            self.host.set_feature_visible(LayerKind::Overlay, id, visible);
        }
        self.host.set_drag_handle(Some(activation.handle));
        tracing::info!(from_saved, "overlay activated");
        self.emit(SessionEvent::OverlayActivated { from_saved });
        true
    }

    /// Hides the inspected building in the normal building style.
    pub fn hide_inspected_building(&mut self) -> bool {
        let Some(key) = self.inspected.as_ref().and_then(|b| b.key.clone()) else {
            return false;
        };
        self.host.set_buildings_style(BuildingsStyle::HideOne(key));
        true
    }

    /// Leaves inspection: overlay hidden, handle gone, buildings and camera pitch restored.
    pub fn restore_normal_view(&mut self, camera: &CameraState) {
        if self.overlay.as_ref().is_some_and(OverlayController::is_active) {
            self.deactivate_overlay();
        }
        self.host.set_buildings_style(BuildingsStyle::Normal);
        let (location, altitude) = degrees_from_world(camera.position);
        self.host
            .fly_to(self.config.overlay.restore_target(location, altitude));
    }

    fn deactivate_overlay(&mut self) {
        let Some(controller) = self.overlay.as_mut() else {
            return;
        };
        let hidden = controller.deactivate();
        push_visibility(&mut self.host, LayerKind::Overlay, &hidden, false);
        self.host.set_drag_handle(None);
        self.emit(SessionEvent::OverlayDeactivated);
    }

    /// Starts a handle drag; the host should suspend camera input while this returns `true`.
    pub fn pointer_down(&mut self, pick: &Pick) -> bool {
        let Some(controller) = self.overlay.as_mut() else {
            return false;
        };
        if !controller.pointer_down(pick.hits_handle, pick.world_position) {
            return false;
        }
        self.host.set_drag_handle(controller.handle());
        true
    }

    pub fn pointer_move(&mut self, pick: &Pick) -> bool {
        let Some(controller) = self.overlay.as_mut() else {
            return false;
        };
        let Some(update) = controller.pointer_move(pick.world_position) else {
            return false;
        };
        push_positions(&mut self.host, controller.store(), &update.changed);
        self.host.set_drag_handle(Some(update.handle));
        true
    }

    pub fn pointer_up(&mut self) -> bool {
        let Some(handle) = self.overlay.as_mut().and_then(OverlayController::pointer_up) else {
            return false;
        };
        self.host.set_drag_handle(Some(handle));
        true
    }

    /// Handles an overlay key by DOM key name. `None` when the key is not bound,
    /// no overlay is loaded, or storage failed (reported as a notice).
    pub fn key(&mut self, name: &str) -> Option<KeyOutcome> {
        let key = OverlayKey::from_key_name(name)?;
        let now = self.clock.now();
        let result = self.overlay.as_mut()?.key(key, &mut self.offsets, now);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(?key, error = %e, "overlay position storage failed");
                let message = format!("Could not access saved position: {e}");
                self.notify(NoticeKind::StorageFailed, message.clone(), self.config.notices.error_ms);
                self.emit(SessionEvent::StorageFailed(message));
                return None;
            }
        };

        match &outcome {
            KeyOutcome::Saved(Some(offset)) => {
                self.notify(
                    NoticeKind::PositionSaved,
                    "Position saved!".to_string(),
                    self.config.notices.saved_ms,
                );
                self.emit(SessionEvent::OffsetSaved(*offset));
            }
            KeyOutcome::Saved(None) => {
                tracing::debug!("overlay has no geometry, nothing saved");
            }
            KeyOutcome::Reset { removed } => {
                self.notify(
                    NoticeKind::PositionReset,
                    "Position reset to default!".to_string(),
                    self.config.notices.reset_ms,
                );
                self.emit(SessionEvent::OffsetReset { removed: *removed });
            }
            KeyOutcome::Info(Some(offset)) => {
                self.notify(
                    NoticeKind::PositionInfo,
                    describe_offset(offset),
                    self.config.notices.info_ms,
                );
            }
            KeyOutcome::HandleVisibility(view) => self.host.set_drag_handle(Some(*view)),
            KeyOutcome::HandleRemoved => self.host.set_drag_handle(None),
            KeyOutcome::Info(None) | KeyOutcome::Ignored => {}
        }
        Some(outcome)
    }

    fn notify(&mut self, kind: NoticeKind, message: String, duration_ms: u64) {
        let now = self.clock.now();
        self.host.show_notice(Notice { kind, message });
        self.notices.arm(kind, now.after(duration_ms));
    }

    /// Per-frame camera sample; derives movement edges for the tile manager.
    pub fn on_camera_frame(&mut self, camera: CameraState) {
        match self.camera.observe(camera) {
            Some(CameraEdge::Started) => self.tiles.on_camera_moving(),
            Some(CameraEdge::Ended) => {
                let now = self.clock.now();
                self.tiles.on_camera_move_end(now);
            }
            None => {}
        }
    }

    pub fn on_tile_failed(&mut self) {
        let now = self.clock.now();
        if let Some(change) = self.tiles.on_tile_failed(now) {
            self.apply_tolerance(change);
        }
    }

    pub fn on_all_tiles_loaded(&mut self) {
        let now = self.clock.now();
        self.tiles.on_all_tiles_loaded(now);
    }

    pub fn force_detail_boost(&mut self) -> bool {
        let now = self.clock.now();
        match self.tiles.force_detail_boost(now) {
            Some(change) => {
                self.apply_tolerance(change);
                true
            }
            None => false,
        }
    }

    fn apply_tolerance(&mut self, change: ToleranceChange) {
        self.host.set_tile_tolerance(change.to);
        self.emit(SessionEvent::ToleranceChanged(change));
    }

    /// Fires everything due: tile tolerance restorations, then notice expiry.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        for change in self.tiles.poll(now) {
            self.apply_tolerance(change);
        }
        while let Some(kind) = self.notices.pop_due(now) {
            self.host.hide_notice(kind);
        }
    }

    /// Earliest pending deadline, for hosts that schedule their own wake-ups.
    pub fn next_deadline(&self) -> Option<Millis> {
        NOTICE_KINDS
            .iter()
            .filter_map(|&kind| self.notices.deadline(kind))
            .chain(self.tiles.next_deadline())
            .min()
    }

    /// Drops listeners, pending notices and the drag handle.
    pub fn teardown(&mut self) {
        self.listeners.clear();
        for kind in NOTICE_KINDS {
            if self.notices.cancel(kind) {
                self.host.hide_notice(kind);
            }
        }
        if self.overlay.as_ref().is_some_and(OverlayController::is_active) {
            self.deactivate_overlay();
        }
        tracing::debug!("viewer session torn down");
    }

    pub fn into_parts(self) -> (H, S) {
        (self.host, self.offsets)
    }
}

fn push_visibility<H: SceneHost + ?Sized>(
    host: &mut H,
    layer: LayerKind,
    ids: &[FeatureId],
    visible: bool,
) {
    for &id in ids {
        host.set_feature_visible(layer, id, visible);
    }
}

fn push_positions<H: SceneHost + ?Sized>(host: &mut H, store: &FeatureStore, ids: &[FeatureId]) {
    for &id in ids {
        if let Some(positions) = store.positions(id) {
            host.replace_positions(LayerKind::Overlay, id, positions);
        }
    }
}

fn describe_offset(offset: &OverlayOffset) -> String {
    format!(
        "Saved position: longitude {:.6}, latitude {:.6} (saved at {} ms)",
        offset.longitude, offset.latitude, offset.timestamp
    )
}

#[cfg(test)]
mod tests {
    use super::{CameraEdge, CameraTracker, describe_offset};
    use crate::host::CameraState;
    use foundation::math::Vec3;
    use persistence::OverlayOffset;

    #[test]
    fn camera_edges_fire_once_per_motion() {
        let mut tracker = CameraTracker::default();
        let still = CameraState::at(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(tracker.observe(still), None);
        assert_eq!(tracker.observe(still), None);

        let moved = CameraState::at(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(tracker.observe(moved), Some(CameraEdge::Started));
        let further = CameraState::at(Vec3::new(9.0, 0.0, 0.0));
        assert_eq!(tracker.observe(further), None);
        assert_eq!(tracker.observe(further), Some(CameraEdge::Ended));
        assert_eq!(tracker.observe(further), None);

        let turned = CameraState {
            heading: 0.5,
            ..further
        };
        assert_eq!(tracker.observe(turned), Some(CameraEdge::Started));
    }

    #[test]
    fn offset_description_uses_six_decimals() {
        let text = describe_offset(&OverlayOffset {
            longitude: -1.4899341234,
            latitude: 53.4227426,
            timestamp: 1_700_000_000_000,
        });
        assert_eq!(
            text,
            "Saved position: longitude -1.489934, latitude 53.422743 (saved at 1700000000000 ms)"
        );
    }
}
