//! Small helpers shared across modules.

use std::path::Path;

/// Render a path for logs with the home directory collapsed to `~`.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        return format!("~/{}", stripped.display());
    }
    path.display().to_string()
}

/// Clamp a signed level into `min..=max` and narrow it to a byte.
pub fn clamp_level(level: i32, min: i32, max: i32) -> u8 {
    level.clamp(min, max).clamp(0, u8::MAX as i32) as u8
}

/// Format a second count as `MM:SS`, or `H:MM:SS` past an hour.
pub fn format_countdown(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_level_respects_bounds() {
        assert_eq!(clamp_level(-20, 0, 200), 0);
        assert_eq!(clamp_level(250, 0, 200), 200);
        assert_eq!(clamp_level(999, 0, 255), 255);
        assert_eq!(clamp_level(120, 0, 200), 120);
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(1500), "25:00");
        assert_eq!(format_countdown(3725), "1:02:05");
    }

    #[test]
    fn private_path_outside_home_is_unchanged() {
        let path = Path::new("/etc/eyeshade/eyeshade.toml");
        if dirs::home_dir().is_some_and(|home| path.starts_with(home)) {
            return;
        }
        assert_eq!(private_path(path), "/etc/eyeshade/eyeshade.toml");
    }
}
