//! Integration tests for configuration management
//!
//! These tests verify that the configuration system works correctly
//! across module boundaries.

use r_focusplay::config::Settings;
use r_focusplay::player::PlayerOptions;
use std::error::Error;
use std::time::Duration;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("focusplay").join("config.json");
        let media_dir = dir.path().join("music");
        std::fs::create_dir(&media_dir)?;

        let settings = Settings {
            media_dir: Some(media_dir.clone()),
            duck_volume: 0.2,
            progress_interval_ms: 500,
            state_update_capacity: 64,
            log_filter: "r_focusplay=debug".to_string(),
        };
        settings.validate()?;
        settings.save(&config_path)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded.media_dir, Some(media_dir));
        assert_eq!(loaded.log_filter, "r_focusplay=debug");

        // Loaded settings drive the player options
        let options = PlayerOptions::from(&loaded);
        assert_eq!(options.duck_volume, 0.2);
        assert_eq!(options.progress_interval, Duration::from_millis(500));
        assert_eq!(options.state_update_capacity, 64);

        // Overriding and saving again
        let mut updated = loaded;
        updated.duck_volume = 0.05;
        updated.save(&config_path)?;
        assert_eq!(Settings::load(&config_path)?.duck_volume, 0.05);

        Ok(())
    }

    /// Test invalid configuration handling
    #[test]
    fn test_invalid_config_validation() {
        let invalid_settings = Settings {
            duck_volume: -0.5,
            ..Default::default()
        };

        let result = invalid_settings.validate();
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("duck_volume"));
        }
    }
}
