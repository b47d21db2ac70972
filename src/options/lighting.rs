use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Lighting", inline)]
#[serde(default)]
/// Scene light parameters.
pub struct LightingOptions {
    /// Ambient light intensity.
    #[schemars(title = "Ambient", range(min = 0.0, max = 2.0), extend("step" = 0.05))]
    pub ambient: f32,
    /// Directional light intensity.
    #[schemars(title = "Key Light", range(min = 0.0, max = 3.0), extend("step" = 0.05))]
    pub directional: f32,
    /// Directional light position; the light points from here at the origin.
    #[schemars(skip)]
    pub directional_position: [f32; 3],
    /// Light color shared by both lights.
    #[schemars(skip)]
    pub color: [f32; 3],
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            ambient: 0.6,
            directional: 0.6,
            directional_position: [3.0, 5.0, 6.0],
            color: [1.0, 1.0, 1.0],
        }
    }
}
