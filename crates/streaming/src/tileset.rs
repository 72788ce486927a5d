use serde::{Deserialize, Serialize};

/// Load options for the building tileset, tuned to keep request volume low.
///
/// Field names serialize in the renderer's camelCase so the options can be
/// handed over as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TilesetOptions {
    pub maximum_screen_space_error: f64,
    pub cull_with_children_bounds: bool,
    pub cull_requests_while_moving: bool,
    pub preload_when_hidden: bool,
    pub preload_flight_destinations: bool,
    pub skip_level_of_detail: bool,
    pub base_screen_space_error: f64,
    pub skip_screen_space_error_factor: f64,
    pub skip_levels: u32,
    pub immediately_load_desired_level_of_detail: bool,
    pub load_siblings: bool,
    pub foveated_screen_space_error: bool,
    pub dynamic_screen_space_error: bool,
    pub dynamic_screen_space_error_density: f64,
    pub dynamic_screen_space_error_factor: f64,
    pub dynamic_screen_space_error_height_falloff: f64,
}

impl Default for TilesetOptions {
    fn default() -> Self {
        Self {
            maximum_screen_space_error: 32.0,
            cull_with_children_bounds: true,
            cull_requests_while_moving: true,
            preload_when_hidden: false,
            preload_flight_destinations: false,
            skip_level_of_detail: true,
            base_screen_space_error: 1024.0,
            skip_screen_space_error_factor: 16.0,
            skip_levels: 1,
            immediately_load_desired_level_of_detail: false,
            load_siblings: false,
            foveated_screen_space_error: false,
            dynamic_screen_space_error: true,
            dynamic_screen_space_error_density: 0.00278,
            dynamic_screen_space_error_factor: 2.0,
            dynamic_screen_space_error_height_falloff: 0.25,
        }
    }
}

impl TilesetOptions {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// One load attempt: the tuned options, then the renderer defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum TilesetAttempt {
    Tuned(TilesetOptions),
    Basic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TilesetLoadError {
    /// Every attempt failed; holds the reason of each, in order.
    Exhausted(Vec<String>),
}

impl std::fmt::Display for TilesetLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TilesetLoadError::Exhausted(reasons) => {
                write!(f, "tileset failed to load: {}", reasons.join("; "))
            }
        }
    }
}

impl std::error::Error for TilesetLoadError {}

/// Primary-then-fallback loading of the building tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetLoadPlan {
    pub asset_id: u64,
    pub options: TilesetOptions,
}

impl TilesetLoadPlan {
    pub fn new(asset_id: u64, options: TilesetOptions) -> Self {
        Self { asset_id, options }
    }

    pub fn attempts(&self) -> [TilesetAttempt; 2] {
        [TilesetAttempt::Tuned(self.options.clone()), TilesetAttempt::Basic]
    }

    /// Runs `load` for each attempt until one succeeds.
    pub fn execute<T, E, F>(&self, mut load: F) -> Result<(T, TilesetAttempt), TilesetLoadError>
    where
        E: std::fmt::Display,
        F: FnMut(u64, &TilesetAttempt) -> Result<T, E>,
    {
        let mut reasons = Vec::new();
        for attempt in self.attempts() {
            match load(self.asset_id, &attempt) {
                Ok(tileset) => {
                    if matches!(attempt, TilesetAttempt::Basic) {
                        tracing::warn!(asset = self.asset_id, "tileset loaded with basic options");
                    }
                    return Ok((tileset, attempt));
                }
                Err(e) => {
                    tracing::warn!(asset = self.asset_id, error = %e, "tileset load attempt failed");
                    reasons.push(e.to_string());
                }
            }
        }
        Err(TilesetLoadError::Exhausted(reasons))
    }
}
