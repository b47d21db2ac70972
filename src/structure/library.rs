//! Built-in molecule presets and focus-topic suggestion.

/// A preset molecule identified by its PubChem compound ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    /// Stable identifier (`"benzene"`, `"custom-962"`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// PubChem compound ID.
    pub cid: String,
    /// Molecular formula, `"n/a"` for custom entries.
    pub formula: String,
    /// One-line teaching hook.
    pub highlight: String,
    /// Topic tags used by [`suggest`].
    pub tags: Vec<String>,
}

struct PresetDef {
    id: &'static str,
    name: &'static str,
    cid: &'static str,
    formula: &'static str,
    highlight: &'static str,
    tags: &'static [&'static str],
}

const PRESETS: &[PresetDef] = &[
    PresetDef {
        id: "benzene",
        name: "Benzene",
        cid: "241",
        formula: "C6H6",
        highlight: "Show resonance and aromaticity in 3D.",
        tags: &["aromatic", "plan", "goal"],
    },
    PresetDef {
        id: "caffeine",
        name: "Caffeine",
        cid: "2519",
        formula: "C8H10N4O2",
        highlight: "Great icebreaker for kinetics & functional groups.",
        tags: &["focus", "reflection", "goal"],
    },
    PresetDef {
        id: "ethanol",
        name: "Ethanol",
        cid: "702",
        formula: "C2H6O",
        highlight: "Spot hydrogen bonding angles instantly.",
        tags: &["lab", "monitor"],
    },
    PresetDef {
        id: "aspirin",
        name: "Aspirin",
        cid: "2244",
        formula: "C9H8O4",
        highlight: "Map out esterification steps spatially.",
        tags: &["goal", "help"],
    },
    PresetDef {
        id: "glucose",
        name: "D-Glucose",
        cid: "5793",
        formula: "C6H12O6",
        highlight: "Visualise chair flips and stereochemistry.",
        tags: &["monitor", "reflection"],
    },
    PresetDef {
        id: "sodium-chloride",
        name: "Sodium Chloride",
        cid: "5234",
        formula: "NaCl",
        highlight: "Crystal lattice anchor for ionic bonding talks.",
        tags: &["help", "lab"],
    },
];

impl PresetDef {
    fn to_preset(&self) -> Preset {
        Preset {
            id: self.id.to_owned(),
            name: self.name.to_owned(),
            cid: self.cid.to_owned(),
            formula: self.formula.to_owned(),
            highlight: self.highlight.to_owned(),
            tags: self.tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }
}

impl Preset {
    /// A user-supplied CID. The label falls back to `"PubChem CID {cid}"`
    /// when blank.
    #[must_use]
    pub fn custom(cid: &str, label: &str) -> Self {
        let cid = cid.trim();
        let label = label.trim();
        let name = if label.is_empty() {
            format!("PubChem CID {cid}")
        } else {
            label.to_owned()
        };
        Self {
            id: format!("custom-{cid}"),
            name,
            cid: cid.to_owned(),
            formula: "n/a".to_owned(),
            highlight: "Fetched directly from PubChem.".to_owned(),
            tags: vec!["custom".to_owned()],
        }
    }
}

/// All built-in presets in display order.
#[must_use]
pub fn presets() -> Vec<Preset> {
    PRESETS.iter().map(PresetDef::to_preset).collect()
}

/// Look up a built-in preset by id.
#[must_use]
pub fn find(id: &str) -> Option<Preset> {
    PRESETS.iter().find(|p| p.id == id).map(PresetDef::to_preset)
}

/// Pick a preset for a study focus topic: the first preset with a tag that
/// appears in the lower-cased topic, or that contains the topic. Returns
/// `None` for a missing topic or no match.
#[must_use]
pub fn suggest(focus_topic: Option<&str>) -> Option<Preset> {
    let focus = focus_topic?.trim().to_lowercase();
    if focus.is_empty() {
        return None;
    }
    PRESETS
        .iter()
        .find(|p| {
            p.tags
                .iter()
                .any(|tag| focus.contains(*tag) || tag.contains(focus.as_str()))
        })
        .map(PresetDef::to_preset)
}

/// The preset to show first: the suggestion for `focus_topic`, else the
/// first built-in preset.
#[must_use]
pub fn default_for(focus_topic: Option<&str>) -> Preset {
    suggest(focus_topic).unwrap_or_else(|| PRESETS[0].to_preset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_matches_tags_both_ways() {
        assert_eq!(suggest(Some("Lab safety")).unwrap().id, "ethanol");
        assert_eq!(suggest(Some("REFLECTION")).unwrap().id, "caffeine");
        // Topic contained in a tag.
        assert_eq!(suggest(Some("arom")).unwrap().id, "benzene");
        assert!(suggest(Some("quantum")).is_none());
        assert!(suggest(None).is_none());
        assert!(suggest(Some("  ")).is_none());
    }

    #[test]
    fn default_falls_back_to_first_preset() {
        assert_eq!(default_for(None).id, "benzene");
        assert_eq!(default_for(Some("quantum")).id, "benzene");
        assert_eq!(default_for(Some("help me")).id, "aspirin");
    }

    #[test]
    fn custom_preset_labels() {
        let water = Preset::custom(" 962 ", "");
        assert_eq!(water.id, "custom-962");
        assert_eq!(water.name, "PubChem CID 962");
        assert_eq!(Preset::custom("962", " Water ").name, "Water");
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(find("glucose").unwrap().cid, "5793");
        assert!(find("unobtainium").is_none());
        assert_eq!(presets().len(), 6);
    }
}
