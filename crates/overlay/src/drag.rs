use foundation::math::Vec3;
use scene::{FeatureId, FeatureStore};

use crate::transform::PositionSnapshot;

/// What the renderer needs to draw the drag handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleView {
    pub position: Vec3,
    pub visible: bool,
    /// Drawn enlarged and highlighted while a drag is in progress.
    pub dragging: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum DragState {
    Idle,
    Dragging {
        start_pick: Vec3,
        handle_start: Vec3,
        snapshot: PositionSnapshot,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragUpdate {
    pub changed: Vec<FeatureId>,
    pub handle: HandleView,
}

/// Handle-driven drag of an overlay: `Idle -> Dragging -> Idle`.
///
/// Each move re-bases on the positions captured at pointer-down, so the
/// overlay ends exactly `current - start` away from where the drag began.
/// Dropping the session is the cancel path; it removes the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    handle: Vec3,
    visible: bool,
    state: DragState,
}

impl DragSession {
    pub fn new(handle_position: Vec3) -> Self {
        Self {
            handle: handle_position,
            visible: true,
            state: DragState::Idle,
        }
    }

    pub fn handle(&self) -> HandleView {
        HandleView {
            position: self.handle,
            visible: self.visible,
            dragging: self.is_dragging(),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Flips handle visibility and returns the new value.
    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Starts a drag when the press hit the handle and produced a world position.
    pub fn pointer_down(
        &mut self,
        hits_handle: bool,
        pick: Option<Vec3>,
        overlay: &FeatureStore,
    ) -> bool {
        if !hits_handle || !self.visible || self.is_dragging() {
            return false;
        }
        let Some(start_pick) = pick else {
            return false;
        };
        self.state = DragState::Dragging {
            start_pick,
            handle_start: self.handle,
            snapshot: PositionSnapshot::capture(overlay),
        };
        tracing::debug!("overlay drag started");
        true
    }

    /// Moves the overlay and handle by `pick - start_pick`.
    ///
    /// Ignored while idle and for moves that did not hit the scene.
    pub fn pointer_move(
        &mut self,
        pick: Option<Vec3>,
        overlay: &mut FeatureStore,
    ) -> Option<DragUpdate> {
        let DragState::Dragging {
            start_pick,
            handle_start,
            snapshot,
        } = &self.state
        else {
            return None;
        };
        let delta = pick? - *start_pick;
        let changed = snapshot.translate_into(overlay, delta);
        self.handle = *handle_start + delta;
        Some(DragUpdate {
            changed,
            handle: self.handle(),
        })
    }

    /// Ends a drag; returns whether one was in progress.
    pub fn pointer_up(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.state = DragState::Idle;
        if was_dragging {
            tracing::debug!("overlay drag finished");
        }
        was_dragging
    }
}

#[cfg(test)]
mod tests {
    use super::DragSession;
    use crate::transform::centroid;
    use foundation::math::Vec3;
    use scene::{Attributes, FeatureGeometry, FeatureStore};

    fn overlay() -> FeatureStore {
        let mut store = FeatureStore::new();
        store.spawn(
            Attributes::default(),
            FeatureGeometry::Polyline {
                positions: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
            },
        );
        store
    }

    #[test]
    fn drag_moves_overlay_and_handle_relative_to_start() {
        let mut store = overlay();
        let mut drag = DragSession::new(Vec3::new(1.0, 0.0, 0.0));
        assert!(drag.pointer_down(true, Some(Vec3::new(5.0, 5.0, 0.0)), &store));
        assert!(drag.handle().dragging);

        drag.pointer_move(Some(Vec3::new(6.0, 5.0, 0.0)), &mut store)
            .expect("moved");
        let update = drag
            .pointer_move(Some(Vec3::new(8.0, 7.0, 0.0)), &mut store)
            .expect("moved");
        assert_eq!(update.handle.position, Vec3::new(4.0, 2.0, 0.0));
        assert_eq!(centroid(&store), Some(Vec3::new(4.0, 2.0, 0.0)));

        assert!(drag.pointer_up());
        assert!(!drag.handle().dragging);
        assert!(!drag.pointer_up());
    }

    #[test]
    fn moves_without_pick_or_drag_are_ignored() {
        let mut store = overlay();
        let mut drag = DragSession::new(Vec3::ZERO);
        assert!(drag.pointer_move(Some(Vec3::new(1.0, 0.0, 0.0)), &mut store).is_none());

        assert!(drag.pointer_down(true, Some(Vec3::ZERO), &store));
        assert!(drag.pointer_move(None, &mut store).is_none());
        assert_eq!(centroid(&store), Some(Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn press_must_hit_visible_handle() {
        let store = overlay();
        let mut drag = DragSession::new(Vec3::ZERO);
        assert!(!drag.pointer_down(false, Some(Vec3::ZERO), &store));
        assert!(!drag.pointer_down(true, None, &store));
        assert!(!drag.toggle_visible());
        assert!(!drag.pointer_down(true, Some(Vec3::ZERO), &store));
    }
}
