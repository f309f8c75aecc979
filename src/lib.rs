//! r-focusplay library core functionality
//!
//! Plays one audio stream at a time while cooperating with a shared audio focus arbiter.

pub mod audio;
pub mod config;
pub mod focus;
pub mod library;
pub mod player;
pub mod ui;

/// Initialize the application directories
pub fn init_app_dirs() -> std::io::Result<()> {
    let default_path = config::Settings::default_path();
    if let Some(config_dir) = default_path.parent() {
        if !config_dir.exists() {
            std::fs::create_dir_all(config_dir)?;
        }
    }
    Ok(())
}
