//! Host integration tests over synthesized WAV folders

use encore_cli::commands::{self, PlayArgs, PreviewArgs, SpectrumArgs};
use encore_cli::{AppConfig, FileQueueStore, FileScanner, Library, Reporter};
use encore_playback::{QueueStore, TrackId};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(path: &Path, duration_secs: f64) {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let frames = (48000.0 * duration_secs) as usize;
    for i in 0..frames {
        let t = i as f64 / 48000.0;
        let sample = ((t * 330.0 * 2.0 * std::f64::consts::PI).sin() * 12000.0) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Folder with one `secs`-long WAV file per name
fn folder(names: &[&str], secs: f64) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in names {
        write_wav(&dir.path().join(format!("{name}.wav")), secs);
    }
    dir
}

fn short_preview_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.preview.start_sec = 0.1;
    config.preview.end_sec = 0.4;
    config
}

const TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Ingestion
// ============================================================================

#[test]
fn ingest_builds_tracks_with_probed_durations() {
    let dir = folder(&["b", "a"], 1.0);
    std::fs::write(dir.path().join("cover.jpg"), b"not audio").unwrap();

    let config = AppConfig::default();
    let library = Library::ingest(dir.path(), &FileScanner::new(), &config.preview).unwrap();

    assert_eq!(library.len(), 2);
    let first = &library.tracks()[0];
    assert_eq!(library.title(&first.id), "a");
    assert!(first.url.starts_with("file://"));
    assert_eq!(first.preview_start_sec, Some(45.0));
    assert_eq!(first.preview_end_sec, Some(75.0));
    assert!((first.duration_sec.unwrap() - 1.0).abs() < 1e-6);

    // Ids are unique per track
    assert_ne!(library.tracks()[0].id, library.tracks()[1].id);
}

#[test]
fn queue_file_stores_titles() {
    let dir = folder(&["one", "two", "three"], 0.1);
    let config = AppConfig::default();
    let library = Library::ingest(dir.path(), &FileScanner::new(), &config.preview).unwrap();
    let queue_path = dir.path().join("queue.txt");

    let ids: Vec<TrackId> = library.resolve_names("three, one, missing");
    assert_eq!(ids.len(), 2);

    let store = FileQueueStore::new(&queue_path, &library);
    store.save(&ids.join(","));
    assert_eq!(std::fs::read_to_string(&queue_path).unwrap(), "three,one");
    assert_eq!(store.load().unwrap(), ids.join(","));
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn preview_walks_the_folder() {
    let dir = folder(&["a", "b", "c"], 1.0);
    let args = PreviewArgs {
        dir: dir.path().to_path_buf(),
        start_sec: None,
        end_sec: None,
        limit: None,
        fast: true,
    };

    let result = tokio::time::timeout(
        TIMEOUT,
        commands::preview(short_preview_config(), args, Reporter::new(true)),
    )
    .await
    .unwrap();
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn preview_respects_limit() {
    let dir = folder(&["a", "b", "c", "d"], 1.0);
    let args = PreviewArgs {
        dir: dir.path().to_path_buf(),
        start_sec: Some(0.0),
        end_sec: Some(0.3),
        limit: Some(1),
        fast: true,
    };

    let result = tokio::time::timeout(
        TIMEOUT,
        commands::preview(AppConfig::default(), args, Reporter::new(false)),
    )
    .await
    .unwrap();
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn preview_rejects_empty_folders() {
    let dir = TempDir::new().unwrap();
    let args = PreviewArgs {
        dir: dir.path().to_path_buf(),
        start_sec: None,
        end_sec: None,
        limit: None,
        fast: true,
    };
    let result = commands::preview(AppConfig::default(), args, Reporter::new(false)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn play_runs_the_queue_and_persists_it() {
    let dir = folder(&["first", "second", "third"], 0.5);
    let mut config = AppConfig::default();
    let queue_path = dir.path().join("queue.txt");
    config.library.queue_file = Some(queue_path.clone());

    let args = PlayArgs {
        dir: dir.path().to_path_buf(),
        queue: Some("third,first".to_string()),
        fast: true,
    };
    let result = tokio::time::timeout(
        TIMEOUT,
        commands::play(config, args, Reporter::new(false)),
    )
    .await
    .unwrap();
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(std::fs::read_to_string(&queue_path).unwrap(), "third,first");
}

#[tokio::test]
async fn play_rejects_unknown_queue_names() {
    let dir = folder(&["first"], 0.2);
    let args = PlayArgs {
        dir: dir.path().to_path_buf(),
        queue: Some("nope".to_string()),
        fast: true,
    };
    let result = commands::play(AppConfig::default(), args, Reporter::new(false)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn spectrum_writes_png_frames() {
    let dir = folder(&["tone"], 2.0);
    let out = dir.path().join("bars.png");
    let args = SpectrumArgs {
        file: dir.path().join("tone.wav"),
        at: 0.5,
        frames: 3,
        width: Some(320),
        height: Some(180),
        square: false,
        out: out.clone(),
    };

    commands::spectrum(AppConfig::default(), args, Reporter::new(false))
        .await
        .unwrap();

    for index in 0..3 {
        let path: PathBuf = commands::frame_path(&out, index, 3);
        let frame = image::open(&path).unwrap().to_rgba8();
        assert_eq!(frame.dimensions(), (320, 180));
        // Background colour fills the top-left corner
        assert_eq!(frame.get_pixel(0, 0).0, [0x0b, 0x10, 0x20, 255]);
    }
}
