//! Offline inspection of boundary files and saved overlay positions.

use std::path::Path;

use formats::{FeatureCollection, GeoJsonError, ingest_feature_collection};
use foundation::math::world_from_degrees;
use layers::{ClientSummary, GeometryIndex, PickedAsset, ViewportFitter, attribute_click};
use persistence::StorageError;
use scene::FeatureStore;
use serde::Serialize;

#[derive(Debug)]
pub enum ToolError {
    Io(String),
    GeoJson(GeoJsonError),
    Storage(StorageError),
    UnknownClient(String),
    NoGeometry(String),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolError::Io(msg) => write!(f, "io error: {msg}"),
            ToolError::GeoJson(e) => write!(f, "{e}"),
            ToolError::Storage(e) => write!(f, "{e}"),
            ToolError::UnknownClient(client) => write!(f, "no boundaries for client {client:?}"),
            ToolError::NoGeometry(client) => write!(f, "client {client:?} has no geometry"),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<GeoJsonError> for ToolError {
    fn from(e: GeoJsonError) -> Self {
        ToolError::GeoJson(e)
    }
}

impl From<StorageError> for ToolError {
    fn from(e: StorageError) -> Self {
        ToolError::Storage(e)
    }
}

/// Boundary features of one file and the client index over them.
pub struct Boundaries {
    pub store: FeatureStore,
    pub index: GeometryIndex,
}

impl Boundaries {
    pub fn from_geojson_str(raw: &str) -> Result<Self, ToolError> {
        let collection = FeatureCollection::from_geojson_str(raw)?;
        let mut store = FeatureStore::new();
        ingest_feature_collection(&mut store, &collection);
        let index = GeometryIndex::build(&store);
        Ok(Self { store, index })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ToolError::Io(format!("read {}: {e}", path.display())))?;
        Self::from_geojson_str(&raw)
    }

    pub fn clients(&self, search: Option<&str>) -> Vec<ClientSummary> {
        let summaries = self.index.summaries(None);
        match search {
            Some(query) => {
                let matches = self.index.search(query);
                summaries
                    .into_iter()
                    .filter(|s| matches.contains(&&s.client))
                    .collect()
            }
            None => summaries,
        }
    }

    pub fn fit(&self, fitter: &ViewportFitter, client: &str) -> Result<FitReport, ToolError> {
        if !self.index.contains_client(client) {
            return Err(ToolError::UnknownClient(client.to_string()));
        }
        let polygons = self.index.features_of(client);
        let fit = fitter
            .fit(&self.store, polygons)
            .ok_or_else(|| ToolError::NoGeometry(client.to_string()))?;
        Ok(FitReport {
            client: client.to_string(),
            polygons: polygons.len(),
            center_lon: fit.center.lon_deg,
            center_lat: fit.center.lat_deg,
            padded_extent_lon: fit.padded_extent.0,
            padded_extent_lat: fit.padded_extent.1,
            altitude_m: fit.altitude_m,
            duration_s: fitter.config().fly_duration_s,
        })
    }

    /// Which boundary (and client) a building at `lon`, `lat` belongs to.
    pub fn attribute(&self, lon: f64, lat: f64) -> Option<AttributionReport> {
        let world = world_from_degrees(lon, lat, 0.0);
        let attribution = attribute_click(&self.index, &self.store, PickedAsset::Buildings, world)?;
        Some(AttributionReport {
            boundary: attribution.boundary.0,
            client: attribution.client.map(|c| c.as_str().to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub client: String,
    pub polygons: usize,
    pub center_lon: f64,
    pub center_lat: f64,
    pub padded_extent_lon: f64,
    pub padded_extent_lat: f64,
    pub altitude_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionReport {
    pub boundary: u32,
    pub client: Option<String>,
}
