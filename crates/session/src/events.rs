use layers::{BuildingKey, ClickAttribution, ClientIdentity};
use persistence::OverlayOffset;
use streaming::ToleranceChange;

/// Observable session changes, delivered to [`crate::ViewerSession::subscribe`] listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    BoundariesLoaded {
        features: usize,
        clients: usize,
    },
    OverlayLoaded {
        features: usize,
    },
    ClientSelected {
        client: ClientIdentity,
        polygons: usize,
        camera_moved: bool,
    },
    /// Selection requested before boundaries were indexed.
    SelectionPending {
        client: String,
    },
    SelectionCleared,
    ClickAttributed {
        attribution: ClickAttribution,
        building: Option<BuildingKey>,
        newly_recorded: bool,
    },
    OverlayActivated {
        from_saved: bool,
    },
    OverlayDeactivated,
    OffsetSaved(OverlayOffset),
    OffsetReset {
        removed: bool,
    },
    StorageFailed(String),
    ToleranceChanged(ToleranceChange),
}
