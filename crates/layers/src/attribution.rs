use foundation::math::{LonLat, Vec3, degrees_from_world};
use scene::picking::first_containing;
use scene::{FeatureId, FeatureStore};

use crate::client_index::{ClientIdentity, GeometryIndex};

/// What a screen pick landed on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PickedAsset {
    Buildings,
    Boundary,
    Overlay,
    DragHandle,
    Terrain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickAttribution {
    pub location: LonLat,
    pub boundary: FeatureId,
    /// `None` when the containing boundary has no client identity.
    pub client: Option<ClientIdentity>,
}

/// Attributes a building pick to the boundary polygon it stands in.
///
/// Only picks on the building asset are considered. The renderer's own
/// feature picking is not used; containment is tested against the current
/// boundary rings in ingestion order. No containing boundary yields `None`.
pub fn attribute_click(
    index: &GeometryIndex,
    boundaries: &FeatureStore,
    asset: PickedAsset,
    world_position: Vec3,
) -> Option<ClickAttribution> {
    if asset != PickedAsset::Buildings {
        return None;
    }
    let (location, _) = degrees_from_world(world_position);
    let boundary = first_containing(boundaries, index.polygons(), location)?;
    let client = index.client_of(boundary).cloned();
    tracing::debug!(
        lon = location.lon_deg,
        lat = location.lat_deg,
        boundary = boundary.0,
        client = client.as_ref().map(ClientIdentity::as_str),
        "click attributed"
    );
    Some(ClickAttribution {
        location,
        boundary,
        client,
    })
}
