use scene::Attributes;
use serde::Serialize;

pub const TENURE_ATTRIBUTE: &str = "_Tenure";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Tenure {
    Freehold,
    Leasehold,
    Other,
}

impl Tenure {
    /// Substring match on the lowercased `_Tenure` text; freehold is tested first.
    pub fn classify(attributes: &Attributes) -> Self {
        let Some(raw) = attributes.text(TENURE_ATTRIBUTE) else {
            return Tenure::Other;
        };
        let lower = raw.trim().to_lowercase();
        if lower.contains("freehold") {
            Tenure::Freehold
        } else if lower.contains("leasehold") {
            Tenure::Leasehold
        } else {
            Tenure::Other
        }
    }

    pub fn style(self) -> FillStyle {
        match self {
            Tenure::Freehold => FillStyle::new([0.0, 0.0, 1.0, 0.4]),
            Tenure::Leasehold => FillStyle::new([0.0, 0.5, 0.0, 0.4]),
            Tenure::Other => FillStyle::new([1.0, 0.647, 0.0, 0.4]),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct FillStyle {
    pub visible: bool,
    pub color: [f32; 4],
    /// Boundaries follow the terrain surface.
    pub clamp_to_ground: bool,
}

impl FillStyle {
    pub const fn new(color: [f32; 4]) -> Self {
        Self {
            visible: true,
            color,
            clamp_to_ground: true,
        }
    }
}

impl Default for FillStyle {
    fn default() -> Self {
        Tenure::Other.style()
    }
}
