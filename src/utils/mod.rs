//! Common utilities and helpers

pub mod logging;

use std::time::Duration;

/// Formatting helpers for command output
pub struct Utils;

impl Utils {
    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let milliseconds = duration.subsec_millis();

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Format a media timestamp given in seconds
    pub fn format_seconds(seconds: f64) -> String {
        if !seconds.is_finite() || seconds < 0.0 {
            return "--:--.---".to_string();
        }
        Self::format_duration(Duration::from_secs_f64(seconds))
    }

    /// Format file size for display
    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(Utils::format_duration(Duration::from_millis(75_250)), "01:15.250");
        assert_eq!(
            Utils::format_duration(Duration::from_secs(3_725)),
            "01:02:05.000"
        );
    }

    #[test]
    fn test_format_seconds_rejects_negative() {
        assert_eq!(Utils::format_seconds(30.0), "00:30.000");
        assert_eq!(Utils::format_seconds(-1.0), "--:--.---");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(Utils::format_file_size(512), "512 B");
        assert_eq!(Utils::format_file_size(1536), "1.50 KB");
    }
}
