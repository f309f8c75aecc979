//! Integration tests for the media library feeding the player

use crate::test_utils::Harness;
use r_focusplay::library::{DirectoryLibrary, MediaSource};
use r_focusplay::player::SessionState;
use std::error::Error;
use tempfile::tempdir;

#[cfg(test)]
mod library_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_listed_record_is_playable() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("zebra.mp3"), b"x")?;
        std::fs::write(dir.path().join("Aardvark.ogg"), b"x")?;

        let records = DirectoryLibrary::new(dir.path()).list_media()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Aardvark");

        let h = Harness::new();
        let id = h.start_playing(&records[0].locator).await;
        assert_eq!(h.engine.locator(id).as_deref(), Some(records[0].locator.as_str()));
        assert_eq!(h.snapshot().await.session, SessionState::Playing);
        Ok(())
    }
}
