//! Tests for configuration management module

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.media_dir.is_none());
        assert_eq!(settings.duck_volume, 0.1);
        assert_eq!(settings.progress_interval_ms, 1000);
        assert_eq!(settings.state_update_capacity, 32);
        assert_eq!(settings.log_filter, "r_focusplay=info");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_save_and_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        let settings = Settings {
            media_dir: Some(PathBuf::from("/srv/music")),
            duck_volume: 0.3,
            ..Default::default()
        };
        settings.save(&config_path)?;
        assert!(config_path.exists());

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded, settings);

        Ok(())
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let loaded = Settings::load(&dir.path().join("absent.json"))?;
        assert_eq!(loaded, Settings::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "duck_volume": 0.2 }"#)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded.duck_volume, 0.2);
        assert_eq!(loaded.progress_interval_ms, 1000);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{ not json").unwrap();

        assert!(matches!(Settings::load(&config_path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_settings_validation() {
        let too_loud = Settings { duck_volume: 1.5, ..Default::default() };
        assert!(matches!(too_loud.validate(), Err(ConfigError::ValidationError(_))));

        let no_interval = Settings { progress_interval_ms: 0, ..Default::default() };
        assert!(no_interval.validate().is_err());

        let no_capacity = Settings { state_update_capacity: 0, ..Default::default() };
        assert!(no_capacity.validate().is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        let not_a_dir = Settings { media_dir: Some(file.path().to_path_buf()), ..Default::default() };
        assert!(not_a_dir.validate().is_err());
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        let path = Settings::default_path();
        assert!(path.ends_with("focusplay/config.json"));
    }
}
