//! Folder ingestion
//!
//! Every audio file under a directory becomes a [`Track`] with a fresh id,
//! a `file://` URL and the configured preview window. Durations are read
//! from the container headers.

use crate::config::{LibrarySettings, PreviewSettings};
use crate::error::{CliError, Result};
use encore_decoder::{file_url, probe_duration};
use encore_playback::{QueueStore, Track, TrackId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Audio file extensions accepted on ingestion
const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "flac", "ogg"];

/// Check if a file has a supported audio extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Scanner for audio files in directories
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    follow_links: bool,
    max_depth: Option<usize>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &LibrarySettings) -> Self {
        Self {
            follow_links: settings.follow_links,
            max_depth: settings.max_depth,
        }
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Audio files under `path`, sorted by path
    pub fn scan_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !path.is_dir() {
            return Err(CliError::Library(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let mut walker = WalkDir::new(path).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut audio_files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        audio_files.sort();

        Ok(audio_files)
    }
}

/// Tracks ingested from a folder
#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Vec<Track>,
    titles: HashMap<TrackId, String>,
}

impl Library {
    /// Ingest every audio file under `dir`
    ///
    /// Files whose headers cannot be read are kept without a duration; the
    /// engine reports them as unreadable when they are played.
    pub fn ingest(dir: &Path, scanner: &FileScanner, preview: &PreviewSettings) -> Result<Self> {
        let mut library = Self::default();

        for path in scanner.scan_directory(dir)? {
            let url = file_url(&path)?;
            let id = Uuid::new_v4().to_string();

            let mut track =
                Track::new(id.clone(), url).with_preview(preview.start_sec, preview.end_sec);
            match probe_duration(&path) {
                Ok(Some(duration)) => track = track.with_duration(duration.as_secs_f64()),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not probe file");
                }
            }

            let title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.clone());
            library.titles.insert(id, title);
            library.tracks.push(track);
        }

        tracing::info!(dir = %dir.display(), tracks = library.tracks.len(), "Library ingested");
        Ok(library)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Display name (file stem) for a track id
    pub fn title<'a>(&'a self, id: &'a str) -> &'a str {
        self.titles.get(id).map_or(id, String::as_str)
    }

    /// Display names keyed by track id
    pub fn titles(&self) -> &HashMap<TrackId, String> {
        &self.titles
    }

    /// Track ids for comma-separated file names, in order
    ///
    /// Names match file stems case-insensitively; unknown names are dropped.
    pub fn resolve_names(&self, names: &str) -> Vec<TrackId> {
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| {
                self.tracks
                    .iter()
                    .find(|track| self.title(&track.id).eq_ignore_ascii_case(name))
                    .map(|track| track.id.clone())
            })
            .collect()
    }
}

/// Queue persisted as a one-line text file
///
/// Ids are regenerated on every run, so the file stores titles and maps them
/// back to the current library on load.
pub struct FileQueueStore<'a> {
    path: PathBuf,
    library: &'a Library,
}

impl<'a> FileQueueStore<'a> {
    pub fn new(path: impl Into<PathBuf>, library: &'a Library) -> Self {
        Self {
            path: path.into(),
            library,
        }
    }
}

impl QueueStore for FileQueueStore<'_> {
    fn load(&self) -> Option<String> {
        let names = std::fs::read_to_string(&self.path).ok()?;
        Some(self.library.resolve_names(names.trim()).join(","))
    }

    fn save(&self, value: &str) {
        let names: Vec<&str> = value
            .split(',')
            .filter(|id| !id.is_empty())
            .map(|id| self.library.title(id))
            .collect();
        if let Err(e) = std::fs::write(&self.path, names.join(",")) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to save queue");
        }
    }
}
