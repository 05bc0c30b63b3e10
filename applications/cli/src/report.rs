//! Event output for the command-line host
//!
//! In JSON mode every engine event becomes one line on stdout; otherwise
//! only track changes and terminal notifications are printed.

use encore_playback::{PreviewEndInfo, TickInfo};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// One reported event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event<'a> {
    Tick(&'a TickInfo),
    PreviewEnd(&'a PreviewEndInfo),
    TrackChange {
        index: usize,
        id: &'a str,
        title: &'a str,
    },
    Frame {
        index: usize,
        path: &'a str,
    },
}

/// Writes events to stdout
///
/// Cheap to clone; listener callbacks each hold their own copy.
#[derive(Debug, Clone)]
pub struct Reporter {
    json: bool,
    titles: Arc<HashMap<String, String>>,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            titles: Arc::new(HashMap::new()),
        }
    }

    /// Display names used for human output
    pub fn with_titles(mut self, titles: HashMap<String, String>) -> Self {
        self.titles = Arc::new(titles);
        self
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn title<'a>(&'a self, id: &'a str) -> &'a str {
        self.titles.get(id).map_or(id, String::as_str)
    }

    pub fn report(&self, event: &Event<'_>) {
        if let Some(line) = self.format(event) {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{line}") {
                tracing::warn!(error = %e, "Failed to write event");
            }
        }
    }

    /// Text for `event`, `None` when this mode does not print it
    pub fn format(&self, event: &Event<'_>) -> Option<String> {
        if self.json {
            return match serde_json::to_string(event) {
                Ok(line) => Some(line),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize event");
                    None
                }
            };
        }

        match event {
            Event::Tick(_) => None,
            Event::PreviewEnd(info) => Some(format!(
                "  {} ({})",
                self.title(&info.id),
                match info.reason {
                    encore_playback::EndReason::PreviewEnd => "preview end",
                    encore_playback::EndReason::Ended => "ended",
                }
            )),
            Event::TrackChange { index, title, .. } => {
                Some(format!("▶ {:>3}  {title}", index + 1))
            }
            Event::Frame { path, .. } => Some(format!("wrote {path}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_playback::EndReason;

    #[test]
    fn json_lines_are_tagged() {
        let reporter = Reporter::new(true);
        let info = PreviewEndInfo {
            id: "a".to_string(),
            reason: EndReason::PreviewEnd,
        };
        let line = reporter.format(&Event::PreviewEnd(&info)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "preview-end");
        assert_eq!(value["id"], "a");
        assert_eq!(value["reason"], "preview-end");
    }

    #[test]
    fn human_mode_skips_ticks() {
        let reporter = Reporter::new(false);
        assert!(reporter.format(&Event::Tick(&TickInfo::default())).is_none());
    }

    #[test]
    fn human_mode_uses_titles() {
        let titles = HashMap::from([("id-1".to_string(), "Intro".to_string())]);
        let reporter = Reporter::new(false).with_titles(titles);
        let info = PreviewEndInfo {
            id: "id-1".to_string(),
            reason: EndReason::Ended,
        };
        assert_eq!(
            reporter.format(&Event::PreviewEnd(&info)).unwrap(),
            "  Intro (ended)"
        );
    }
}
