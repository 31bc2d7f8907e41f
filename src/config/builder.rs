//! Default config file creation and in-place value updates.
//!
//! The default file is produced by [`ConfigBuilder`], which aligns every
//! trailing comment to one column. [`update_config_values`] rewrites single
//! settings while keeping whatever spacing and comments the user has.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Write the commented default configuration to `path`.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let content = default_config_content();
    fs::write(path, content)
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default config file: {}", private_path(path));
    Ok(())
}

pub(crate) fn default_config_content() -> String {
    let mut content = ConfigBuilder::new()
        .add_section("Blue light filter")
        .add_setting(
            "filter_enabled",
            "false",
            "Apply the color temperature filter on start",
        )
        .add_setting(
            "temperature",
            &DEFAULT_FILTER_TEMP.to_string(),
            &format!("Filter color temperature ({MINIMUM_TEMP}-{MAXIMUM_TEMP}) Kelvin"),
        )
        .add_section("Screen dimming")
        .add_setting("dim_enabled", "false", "Darken every display on start")
        .add_setting(
            "dim_level",
            &DEFAULT_DIM.to_string(),
            &format!("Overlay opacity ({MINIMUM_DIM}-{MAXIMUM_DIM})"),
        )
        .add_section("Focus mode")
        .add_setting(
            "focus_enabled",
            "false",
            "Dim everything except the active window",
        )
        .add_setting(
            "focus_dim_level",
            &DEFAULT_FOCUS_DIM.to_string(),
            &format!("Overlay opacity ({MINIMUM_FOCUS_DIM}-{MAXIMUM_FOCUS_DIM})"),
        )
        .add_section("Break reminders")
        .add_setting(
            "break_enabled",
            "false",
            "Start the work/break cycle on start",
        )
        .add_setting(
            "break_mode",
            &format!("\"{DEFAULT_BREAK_MODE}\""),
            "Select: \"pomodoro\", \"20-20-20\" or \"custom\"",
        )
        .add_setting(
            "work_duration",
            &DEFAULT_WORK_DURATION.to_string(),
            "Work phase for custom mode (seconds)",
        )
        .add_setting(
            "break_duration",
            &DEFAULT_BREAK_DURATION.to_string(),
            "Break phase for custom mode (seconds)",
        )
        .add_setting(
            "force_break",
            &DEFAULT_FORCE_BREAK.to_string(),
            "Break screen cannot be skipped",
        )
        .add_section("Sunset schedule")
        .add_setting(
            "schedule_enabled",
            "false",
            "Filter between sunset and sunrise",
        )
        .add_setting(
            "latitude",
            &format!("{DEFAULT_LATITUDE:.6}"),
            "Geographic latitude (-90 to 90)",
        )
        .add_setting(
            "longitude",
            &format!("{DEFAULT_LONGITUDE:.6}"),
            "Geographic longitude (-180 to 180)",
        )
        .add_section("Displays")
        .add_setting(
            "topology_poll_interval",
            &DEFAULT_TOPOLOGY_POLL_SECS.to_string(),
            &format!(
                "Seconds between display hot-plug checks ({MINIMUM_TOPOLOGY_POLL_SECS}-{MAXIMUM_TOPOLOGY_POLL_SECS})"
            ),
        )
        .build();
    content.push('\n');
    content
}

/// Rewrite `key = value` pairs in the config file at `path`.
///
/// Existing lines keep their comment and spacing. Keys missing from the file
/// are appended at the end.
pub fn update_config_values(path: &Path, updates: &[(&str, String)]) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let updated = apply_updates(&content, updates);

    fs::write(path, updated)
        .with_context(|| format!("Failed to write updated config to {}", private_path(path)))?;
    Ok(())
}

pub(crate) fn apply_updates(content: &str, updates: &[(&str, String)]) -> String {
    let mut updated = content.to_string();
    let mut missing = Vec::new();

    for (key, value) in updates {
        match find_config_line(&updated, key) {
            Some(line) => {
                let new_line = preserve_comment_formatting(&line, key, value);
                updated = updated.replacen(&line, &new_line, 1);
            }
            None => missing.push(format!("{key} = {value}")),
        }
    }

    if !missing.is_empty() {
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        for line in missing {
            updated.push_str(&line);
            updated.push('\n');
        }
    }

    updated
}

/// Builds a config file whose trailing comments line up in one column.
struct ConfigBuilder {
    entries: Vec<Entry>,
}

enum Entry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(Entry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Setting { line, .. } => Some(line.len()),
                Entry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut lines = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Section(header) => {
                    if !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(header);
                }
                Entry::Setting { line, comment } => {
                    let padding = " ".repeat(width - line.len());
                    lines.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        lines.join("\n")
    }
}

/// Find the uncommented line that assigns `key`.
pub(crate) fn find_config_line(content: &str, key: &str) -> Option<String> {
    content
        .lines()
        .find(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with('#')
                && trimmed
                    .split_once('=')
                    .is_some_and(|(name, _)| name.trim() == key)
        })
        .map(str::to_string)
}

/// Replace the value on `original_line`, keeping the spacing before its comment.
pub(crate) fn preserve_comment_formatting(original_line: &str, key: &str, new_value: &str) -> String {
    let key_value = format!("{key} = {new_value}");

    let Some(comment_pos) = original_line.find('#') else {
        return key_value;
    };
    let before_comment = &original_line[..comment_pos];
    let comment = &original_line[comment_pos..];

    let old_width = before_comment.trim_end().trim_start().len();
    let spacing = before_comment.len() - before_comment.trim_end().len();
    let indent = before_comment.len() - before_comment.trim_start().len();

    // Keep the comment column when the new value fits before it.
    let column = indent + old_width + spacing;
    let padding = if key_value.len() < column {
        column - key_value.len()
    } else {
        spacing.max(1)
    };

    format!("{key_value}{}{comment}", " ".repeat(padding))
}
