//! Media source provider: enumerates playable files with their tags

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey, Tag};
use symphonia::core::probe::Hint;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

#[cfg(test)]
mod tests;

const LOG_TARGET: &str = "r_focusplay::library";

/// Fallback for album and artist when the file carries no tag.
pub const UNKNOWN_TAG: &str = "<unknown>";

/// File extensions treated as playable audio.
const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "mp4", "mka", "webm"];

/// One playable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    pub locator: String,
    pub title: String,
    pub album: String,
    pub artist: String,
}

#[derive(Debug)]
pub enum LibraryError {
    NotFound(PathBuf),
    Io(io::Error),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::NotFound(path) => write!(f, "Media directory not found: {}", path.display()),
            LibraryError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for LibraryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LibraryError::Io(e) => Some(e),
            LibraryError::NotFound(_) => None,
        }
    }
}

impl From<io::Error> for LibraryError {
    fn from(err: io::Error) -> Self {
        LibraryError::Io(err)
    }
}

/// Anything that can enumerate playable media.
pub trait MediaSource {
    /// Returns every playable record, sorted by title ascending. May be empty.
    fn list_media(&self) -> Result<Vec<MediaRecord>, LibraryError>;
}

/// Scans a directory tree for audio files.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryLibrary { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_audio_file(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

impl MediaSource for DirectoryLibrary {
    fn list_media(&self) -> Result<Vec<MediaRecord>, LibraryError> {
        if !self.root.is_dir() {
            return Err(LibraryError::NotFound(self.root.clone()));
        }

        let mut records: Vec<MediaRecord> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(target: LOG_TARGET, "Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && Self::is_audio_file(entry.path()))
            .map(|entry| record_for(entry.path()))
            .collect();

        records.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.locator.cmp(&b.locator))
        });
        info!(target: LOG_TARGET, root = %self.root.display(), count = records.len(), "Media library scanned.");
        Ok(records)
    }
}

#[derive(Default)]
struct Tags {
    title: Option<String>,
    album: Option<String>,
    artist: Option<String>,
    album_artist: Option<String>,
}

impl Tags {
    fn absorb(&mut self, tags: &[Tag]) {
        for tag in tags {
            let slot = match tag.std_key {
                Some(StandardTagKey::TrackTitle) => &mut self.title,
                Some(StandardTagKey::Album) => &mut self.album,
                Some(StandardTagKey::Artist) => &mut self.artist,
                Some(StandardTagKey::AlbumArtist) => &mut self.album_artist,
                _ => continue,
            };
            let value = tag.value.to_string();
            if slot.is_none() && !value.trim().is_empty() {
                *slot = Some(value.trim().to_string());
            }
        }
    }
}

fn record_for(path: &Path) -> MediaRecord {
    let tags = read_tags(path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    MediaRecord {
        locator: path.to_string_lossy().into_owned(),
        title: tags.title.unwrap_or(stem),
        album: tags.album.unwrap_or_else(|| UNKNOWN_TAG.to_string()),
        artist: tags
            .artist
            .or(tags.album_artist)
            .unwrap_or_else(|| UNKNOWN_TAG.to_string()),
    }
}

/// Probes `path` and collects its tags. Unreadable or unrecognised files yield no tags.
fn read_tags(path: &Path) -> Tags {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(target: LOG_TARGET, path = %path.display(), "Cannot open for tags: {}", e);
            return Tags::default();
        }
    };
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(e) => {
            trace!(target: LOG_TARGET, path = %path.display(), "No tags, probe failed: {}", e);
            return Tags::default();
        }
    };

    let mut tags = Tags::default();
    // Container tags win over tags found while probing (e.g. ID3 ahead of the stream).
    if let Some(revision) = probed.format.metadata().current() {
        tags.absorb(revision.tags());
    }
    if let Some(metadata) = probed.metadata.get() {
        if let Some(revision) = metadata.current() {
            tags.absorb(revision.tags());
        }
    }
    tags
}
