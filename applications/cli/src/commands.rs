//! Subcommand implementations

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::library::{FileQueueStore, FileScanner, Library};
use crate::raster::RasterSurface;
use crate::report::{Event, Reporter};
use crate::runner::{Pace, Pump};
use encore_decoder::{file_url, FileLoader};
use encore_playback::{
    save_selection, ContinuousPreview, EndReason, HeadlessOutput, MemoryQueueStore, PlayRequest,
    PreviewEngine, QueueController, QueueStore, Subscription,
};
use encore_spectrum::BlockBars;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ===== Shared setup =====

fn build_engine(config: &AppConfig, engine: encore_playback::EngineConfig) -> PreviewEngine {
    PreviewEngine::with_config(
        engine,
        Arc::new(HeadlessOutput::new(config.output.sample_rate)),
        Arc::new(FileLoader::new()),
    )
}

fn pace(fast: bool) -> Pace {
    if fast {
        Pace::Fast
    } else {
        Pace::RealTime
    }
}

/// Forward engine events to the reporter for as long as the guards live
fn report_engine(engine: &PreviewEngine, reporter: &Reporter) -> Vec<Subscription> {
    let mut subscriptions = Vec::new();
    if reporter.is_json() {
        let ticks = reporter.clone();
        subscriptions.push(engine.on_tick(move |tick| ticks.report(&Event::Tick(tick))));
    }
    let ends = reporter.clone();
    subscriptions.push(engine.on_preview_end(move |info| ends.report(&Event::PreviewEnd(info))));
    subscriptions
}

fn ingest(config: &AppConfig, dir: &Path) -> Result<Library> {
    let scanner = FileScanner::from_settings(&config.library);
    let library = Library::ingest(dir, &scanner, &config.preview)?;
    if library.is_empty() {
        return Err(CliError::Library(format!(
            "No audio files found in {}",
            dir.display()
        )));
    }
    Ok(library)
}

/// Let a pending fade-out finish before the process exits
fn drain_fade(pump: &mut Pump, config: &AppConfig) {
    let fade = config
        .engine
        .fade_out_sec()
        .max(config.engine.preview_end_fade_sec());
    pump.advance(Duration::from_secs_f64(fade) + pump.block_duration());
}

// ===== preview =====

#[derive(Debug, Clone)]
pub struct PreviewArgs {
    pub dir: PathBuf,
    pub start_sec: Option<f64>,
    pub end_sec: Option<f64>,
    pub limit: Option<usize>,
    pub fast: bool,
}

/// Preview every track in a folder back to back
pub async fn preview(mut config: AppConfig, args: PreviewArgs, reporter: Reporter) -> Result<()> {
    if let Some(start) = args.start_sec {
        config.preview.start_sec = start;
    }
    if let Some(end) = args.end_sec {
        config.preview.end_sec = end;
    }
    config.validate()?;

    let library = ingest(&config, &args.dir)?;
    let reporter = reporter.with_titles(library.titles().clone());
    let engine = build_engine(&config, config.engine.clone());
    let _subscriptions = report_engine(&engine, &reporter);

    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let _counter = engine.on_preview_end(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let sequencer = ContinuousPreview::with_config(
        engine.clone(),
        library.tracks().to_vec(),
        config.sequencer.clone(),
    );
    let changes = reporter.clone();
    sequencer.on_track_change(move |index, id| {
        changes.report(&Event::TrackChange {
            index,
            id,
            title: changes.title(id),
        });
    });

    let limit = args.limit.unwrap_or(usize::MAX);
    let mut pump = Pump::new(
        engine.clone(),
        config.output.sample_rate,
        config.output.block_frames,
        pace(args.fast),
    );

    sequencer.start_from_index(0).await?;
    loop {
        let done = || !sequencer.running() || finished.load(Ordering::SeqCst) >= limit;
        pump.run_until(|| done() || engine.state().paused, None)
            .await;
        if done() {
            break;
        }

        // Paused mid-sequence: the current file could not be loaded
        let next = sequencer.current_index().map_or(0, |index| index + 1);
        tracing::warn!(
            track = ?sequencer.current_id(),
            "Track could not be played; skipping"
        );
        sequencer.start_from_index(next).await?;
    }

    sequencer.stop_continuous();
    drain_fade(&mut pump, &config);
    tracing::info!(
        previews = finished.load(Ordering::SeqCst),
        "Continuous preview finished"
    );
    Ok(())
}

// ===== play =====

#[derive(Debug, Clone)]
pub struct PlayArgs {
    pub dir: PathBuf,
    /// Comma-separated file names (stems) to queue
    pub queue: Option<String>,
    pub fast: bool,
}

/// Play a folder in full through the queue
pub async fn play(config: AppConfig, args: PlayArgs, reporter: Reporter) -> Result<()> {
    config.validate()?;

    let library = ingest(&config, &args.dir)?;
    let reporter = reporter.with_titles(library.titles().clone());

    let store: Box<dyn QueueStore + '_> = match &config.library.queue_file {
        Some(path) => Box::new(FileQueueStore::new(path, &library)),
        None => Box::new(MemoryQueueStore::new()),
    };

    match &args.queue {
        Some(names) => {
            let ids = library.resolve_names(names);
            if ids.is_empty() {
                return Err(CliError::Library(format!("No tracks match {names}")));
            }
            save_selection(store.as_ref(), &ids);
        }
        None if store.load().is_none() => {
            let ids: Vec<&str> = library.tracks().iter().map(|t| t.id.as_str()).collect();
            save_selection(store.as_ref(), &ids);
        }
        None => {}
    }

    let first = store
        .load()
        .and_then(|raw| raw.split(',').next().map(str::to_string))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| library.tracks()[0].id.clone());

    let engine = build_engine(&config, config.engine.clone());
    let _subscriptions = report_engine(&engine, &reporter);

    let controller = QueueController::new(
        engine.clone(),
        library.tracks().to_vec(),
        store.as_ref(),
        &first,
    );
    let queue = controller.queue();
    let last = queue.last().cloned().unwrap_or_else(|| first.clone());
    tracing::info!(len = queue.len(), "Queue ready");

    let routes = reporter.clone();
    let positions = queue.clone();
    controller.on_route(move |id| {
        let index = positions.iter().position(|q| q == id).unwrap_or(0);
        routes.report(&Event::TrackChange {
            index,
            id,
            title: routes.title(id),
        });
    });

    let last_ended = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&last_ended);
    let last_id = last.clone();
    let _last = engine.on_preview_end(move |info| {
        if info.id == last_id && info.reason == EndReason::Ended {
            flag.store(true, Ordering::SeqCst);
        }
    });

    let mut pump = Pump::new(
        engine.clone(),
        config.output.sample_rate,
        config.output.block_frames,
        pace(args.fast),
    );

    controller.play_track(&first).await?;
    loop {
        pump.run_until(|| last_ended.load(Ordering::SeqCst) || engine.state().paused, None)
            .await;
        if last_ended.load(Ordering::SeqCst) || controller.routed_id() == last {
            break;
        }

        tracing::warn!(track = %controller.routed_id(), "Track stopped early; skipping");
        controller.play_next().await?;
    }

    engine.stop();
    drain_fade(&mut pump, &config);
    tracing::info!("Queue finished");
    Ok(())
}

// ===== spectrum =====

#[derive(Debug, Clone)]
pub struct SpectrumArgs {
    pub file: PathBuf,
    pub at: f64,
    pub frames: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub square: bool,
    pub out: PathBuf,
}

/// Output path for frame `index` of `count`
///
/// A single frame is written to `out` as given; sequences get a zero-padded
/// frame number before the extension.
pub fn frame_path(out: &Path, index: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return out.to_path_buf();
    }
    let stem = out
        .file_stem()
        .map_or_else(|| "frame".to_string(), |s| s.to_string_lossy().into_owned());
    let extension = out
        .extension()
        .map_or_else(|| "png".to_string(), |e| e.to_string_lossy().into_owned());
    out.with_file_name(format!("{stem}_{index:04}.{extension}"))
}

/// Render spectrum frames of a file to PNG
pub async fn spectrum(mut config: AppConfig, args: SpectrumArgs, reporter: Reporter) -> Result<()> {
    if let Some(width) = args.width {
        config.spectrum.width = width;
    }
    if let Some(height) = args.height {
        config.spectrum.height = height;
    }
    if args.square {
        config.spectrum.bars.square = true;
    }
    config.validate()?;

    let frames = args.frames.max(1);
    let fps = f64::from(config.spectrum.fps);
    let frame_duration = Duration::from_secs_f64(1.0 / fps);
    let start = args.at.max(0.0);
    // Run past the last frame so the preview end never lands inside the capture
    let end = start + frames as f64 / fps + 1.0;

    let engine = build_engine(&config, config.spectrum_engine());
    let url = file_url(&args.file)?;
    engine.play(PlayRequest::preview("spectrum", url, start, end)).await?;
    if engine.state().paused {
        return Err(CliError::Library(format!(
            "Could not play {}",
            args.file.display()
        )));
    }

    let analyser = engine
        .analyser()
        .ok_or_else(|| CliError::Config("Analyser unavailable".to_string()))?;
    let mut bins = vec![0u8; analyser.frequency_bin_count()];
    let mut bars = BlockBars::new(&config.spectrum.bars)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let width = config.spectrum.width;
    let height = config.spectrum.height;
    let mut pump = Pump::new(
        engine.clone(),
        config.output.sample_rate,
        config.output.block_frames,
        Pace::Fast,
    );

    // Fill the analysis window before the first frame
    let warmup = analyser.fft_size() as f64 / f64::from(config.output.sample_rate);
    pump.advance(Duration::from_secs_f64(warmup));

    for index in 0..frames {
        pump.advance(frame_duration);
        analyser.byte_frequency_data(&mut bins);

        let mut surface = RasterSurface::new(width, height);
        bars.draw(&mut surface, &bins, f64::from(width), f64::from(height));

        let path = frame_path(&args.out, index, frames);
        surface.save(&path)?;
        reporter.report(&Event::Frame {
            index,
            path: &path.display().to_string(),
        });
    }

    engine.stop();
    tracing::info!(frames, "Spectrum frames rendered");
    Ok(())
}
