//! Named display presets: a filter temperature paired with a dim level.

use anyhow::Result;
use std::path::Path;

use super::builder::update_config_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPreset {
    pub name: &'static str,
    pub temperature: i32,
    pub dim_level: i32,
}

pub const PRESETS: &[DisplayPreset] = &[
    DisplayPreset {
        name: "office",
        temperature: 5500,
        dim_level: 0,
    },
    DisplayPreset {
        name: "game",
        temperature: 6200,
        dim_level: 0,
    },
    DisplayPreset {
        name: "movie",
        temperature: 5000,
        dim_level: 30,
    },
    DisplayPreset {
        name: "reading",
        temperature: 4500,
        dim_level: 20,
    },
    DisplayPreset {
        name: "night",
        temperature: 3400,
        dim_level: 50,
    },
    DisplayPreset {
        name: "custom",
        temperature: 5000,
        dim_level: 0,
    },
];

/// Look up a preset by name, ignoring case.
pub fn find_preset(name: &str) -> Option<&'static DisplayPreset> {
    PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name))
}

/// Comma-separated preset names for messages.
pub fn preset_names() -> String {
    PRESETS
        .iter()
        .map(|preset| preset.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write the preset's temperature and dim level into the config at `path`.
pub fn apply_preset(path: &Path, preset: &DisplayPreset) -> Result<()> {
    update_config_values(
        path,
        &[
            ("temperature", preset.temperature.to_string()),
            ("dim_level", preset.dim_level.to_string()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_preset("Night").map(|p| p.temperature), Some(3400));
        assert!(find_preset("disco").is_none());
    }

    #[test]
    fn every_preset_passes_validation_ranges() {
        for preset in PRESETS {
            assert!((MINIMUM_TEMP..=MAXIMUM_TEMP).contains(&preset.temperature));
            assert!((MINIMUM_DIM..=MAXIMUM_DIM).contains(&preset.dim_level));
        }
    }
}
