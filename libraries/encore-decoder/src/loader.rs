//! Source loader for local files
//!
//! Track URLs are either `file://` URLs or plain filesystem paths.

use crate::error::{DecodeError, Result};
use crate::file::FileSource;
use encore_playback::{MediaSource, Result as PlaybackResult, SourceLoader};
use std::path::PathBuf;
use url::Url;

/// Opens [`FileSource`]s for track URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl SourceLoader for FileLoader {
    fn open(&self, url: &str, sample_rate: u32) -> PlaybackResult<Box<dyn MediaSource>> {
        let path = resolve_path(url)?;
        let source = FileSource::open(&path, sample_rate)?;
        Ok(Box::new(source))
    }
}

/// Map a track URL to a filesystem path
///
/// Anything with a scheme other than `file` is rejected; strings without a
/// scheme are taken as paths.
pub fn resolve_path(url: &str) -> Result<PathBuf> {
    if url.starts_with("file:") {
        let parsed = Url::parse(url)
            .map_err(|e| DecodeError::UnsupportedSource(format!("{url}: {e}")))?;
        return parsed
            .to_file_path()
            .map_err(|()| DecodeError::UnsupportedSource(url.to_string()));
    }

    if url.contains("://") {
        return Err(DecodeError::UnsupportedSource(url.to_string()));
    }

    Ok(PathBuf::from(url))
}

/// `file://` URL for a local path
pub fn file_url(path: &std::path::Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| DecodeError::UnsupportedSource(absolute.display().to_string()))
}
