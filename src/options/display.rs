use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How atoms and bonds are drawn.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStyle {
    /// Ball-and-stick: element spheres joined by thin cylinders.
    #[default]
    Stick,
    /// Enlarged spheres with slightly thicker bonds.
    Spacefill,
    /// Wireframe spheres with line-segment bonds.
    Wireframe,
}

impl DisplayStyle {
    /// All styles in menu order.
    pub const ALL: [Self; 3] = [Self::Stick, Self::Spacefill, Self::Wireframe];

    /// Multiplier applied to the element's base radius.
    #[must_use]
    pub fn atom_radius_factor(self) -> f32 {
        match self {
            Self::Stick => 1.0,
            Self::Spacefill => 1.15,
            Self::Wireframe => 0.9,
        }
    }

    /// Multiplier applied to the base bond radius. Wireframe draws lines,
    /// so its factor only matters to callers that still want a thickness.
    #[must_use]
    pub fn bond_radius_factor(self) -> f32 {
        match self {
            Self::Spacefill => 0.9,
            Self::Stick | Self::Wireframe => 0.7,
        }
    }

    /// Whether bonds are drawn as line segments instead of cylinders.
    #[must_use]
    pub fn uses_lines(self) -> bool {
        matches!(self, Self::Wireframe)
    }

    /// Human-readable label for menus.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Stick => "Ball & Stick",
            Self::Spacefill => "Space-filling",
            Self::Wireframe => "Wireframe",
        }
    }

    /// Identifier used in option files and on the command line.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Stick => "stick",
            Self::Spacefill => "spacefill",
            Self::Wireframe => "wireframe",
        }
    }
}

impl fmt::Display for DisplayStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when a style identifier is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyle(pub String);

impl fmt::Display for UnknownStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown display style '{}' (expected stick, spacefill or wireframe)",
            self.0
        )
    }
}

impl std::error::Error for UnknownStyle {}

impl FromStr for DisplayStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStyle(wanted.to_owned()))
    }
}

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Display", inline)]
#[serde(default)]
/// Display selections.
pub struct DisplayOptions {
    /// Atom and bond drawing style.
    #[schemars(title = "Style")]
    pub style: DisplayStyle,
    /// Window frame-rate cap (0 = unlimited). Immersive sessions are not
    /// capped.
    #[schemars(title = "Target FPS", range(max = 240))]
    pub target_fps: u32,
}
