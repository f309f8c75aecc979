//! Tests for the media library

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_lists_audio_files_sorted_by_title() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("beta.mp3"), b"not audio")?;
        fs::write(dir.path().join("Alpha.FLAC"), b"not audio")?;
        fs::write(dir.path().join("notes.txt"), b"skip me")?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("gamma.ogg"), b"not audio")?;

        let records = DirectoryLibrary::new(dir.path()).list_media()?;
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "beta", "gamma"]);

        let nested = &records[2];
        assert!(nested.locator.ends_with("gamma.ogg"));
        assert_eq!(nested.album, UNKNOWN_TAG);
        assert_eq!(nested.artist, UNKNOWN_TAG);
        Ok(())
    }

    #[test]
    fn test_empty_directory_gives_empty_list() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert!(DirectoryLibrary::new(dir.path()).list_media()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        match DirectoryLibrary::new(&missing).list_media() {
            Err(LibraryError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
