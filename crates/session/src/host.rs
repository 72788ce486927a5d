use foundation::math::Vec3;
use layers::{BuildingsStyle, CameraTarget, FillStyle, PickedAsset};
use overlay::HandleView;
use scene::{Attributes, FeatureId};

/// Which renderer collection a feature id refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Boundaries,
    Overlay,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoticeKind {
    PositionSaved,
    PositionReset,
    PositionInfo,
    StorageFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Result of a screen-space pick, as reported by the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pick {
    /// World position under the pointer, if the scene was hit.
    pub world_position: Option<Vec3>,
    pub asset: Option<PickedAsset>,
    pub hits_handle: bool,
    /// Attributes of the picked building, when the buildings asset was hit.
    pub building_properties: Option<Attributes>,
}

impl Pick {
    pub fn at(world_position: Vec3, asset: PickedAsset) -> Self {
        Self {
            world_position: Some(world_position),
            asset: Some(asset),
            ..Self::default()
        }
    }

    pub fn with_building(mut self, properties: Attributes) -> Self {
        self.building_properties = Some(properties);
        self
    }

    pub fn on_handle(mut self) -> Self {
        self.hits_handle = true;
        self
    }
}

/// Camera pose sampled once per rendered frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl CameraState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }
}

/// The renderer as seen by a [`crate::ViewerSession`].
///
/// Every call is fire-and-forget; the session never reads state back
/// through this trait.
pub trait SceneHost {
    fn fly_to(&mut self, target: CameraTarget);
    fn replace_positions(&mut self, layer: LayerKind, feature: FeatureId, positions: &[Vec3]);
    fn set_feature_visible(&mut self, layer: LayerKind, feature: FeatureId, visible: bool);
    fn set_fill_style(&mut self, layer: LayerKind, feature: FeatureId, style: FillStyle);
    fn set_tile_tolerance(&mut self, tolerance: f64);
    fn set_drag_handle(&mut self, handle: Option<HandleView>);
    fn set_buildings_style(&mut self, style: BuildingsStyle);
    fn show_notice(&mut self, notice: Notice);
    fn hide_notice(&mut self, kind: NoticeKind);
}
