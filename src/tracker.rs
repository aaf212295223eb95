use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use crate::common::WatchProgress;
use crate::repo::ProgressSink;

/// How often the playback position is sampled while tracking
pub const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// A position within this many seconds of the last report is not worth a
/// round trip
const REPORT_THRESHOLD_SECS: u64 = 2;

/// How long teardown waits for the final report before abandoning it
const FLUSH_WAIT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerState {
    Idle,
    Tracking,
}

#[derive(Debug, Default)]
struct Playback {
    playing: bool,
    position: u64,
}

/// Background reporter for watch progress, one per playback session.
///
/// A dedicated thread wakes every `REPORT_INTERVAL` and, while playback
/// is active, pushes the current position to the backend when it has
/// moved more than `REPORT_THRESHOLD_SECS` from the last report.
/// Reporting is best-effort telemetry: a failed call is logged and the
/// loop keeps going, playback never notices. Stopping the tracker (or
/// dropping it) sends one final report with the last known position,
/// threshold ignored, and waits at most `FLUSH_WAIT` for it.
pub struct ProgressTracker {
    playback: Arc<Mutex<Playback>>,
    passes: Arc<AtomicU64>,
    stop_tx: mpsc::Sender<()>,
    done_rx: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

impl ProgressTracker {
    pub fn start(sink: Arc<dyn ProgressSink>, video_id: &str) -> ProgressTracker {
        ProgressTracker::start_at_interval(sink, video_id, REPORT_INTERVAL)
    }

    /// `start` with the sampling interval exposed, so tests don't take
    /// five seconds a tick
    pub(crate) fn start_at_interval(
        sink: Arc<dyn ProgressSink>,
        video_id: &str,
        interval: Duration,
    ) -> ProgressTracker {
        let playback = Arc::new(Mutex::new(Playback::default()));
        let passes = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let video_id = video_id.to_string();
        let shared = playback.clone();
        let pass_counter = passes.clone();
        let handle = std::thread::spawn(move || {
            run(&*sink, &video_id, &shared, &pass_counter, &stop_rx, interval);
            let _ = done_tx.send(());
        });

        ProgressTracker {
            playback,
            passes,
            stop_tx,
            done_rx,
            handle: Some(handle),
            stopped: false,
        }
    }

    /// Playback started or paused. While paused nothing is reported.
    pub fn set_playing(&self, playing: bool) {
        self.playback.lock().unwrap().playing = playing;
    }

    /// Current position in whole seconds from the start of the video
    pub fn set_position(&self, position: u64) {
        self.playback.lock().unwrap().position = position;
    }

    /// Sampling passes the reporter thread has completed so far
    #[cfg(test)]
    fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> TrackerState {
        match &self.handle {
            Some(h) if !h.is_finished() => TrackerState::Tracking,
            _ => TrackerState::Idle,
        }
    }

    /// End the session: one final best-effort report, then the thread
    /// shuts down. Dropping the tracker does the same.
    pub fn stop(&mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let _ = self.stop_tx.send(());
        match self.done_rx.recv_timeout(FLUSH_WAIT) {
            Ok(()) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                // Final report still in flight; drop the handle and let
                // the thread finish (or not) on its own
                debug!("Abandoning watch-progress flush still in flight");
                self.handle.take();
            }
        }
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    sink: &dyn ProgressSink,
    video_id: &str,
    playback: &Mutex<Playback>,
    passes: &AtomicU64,
    stop_rx: &mpsc::Receiver<()>,
    interval: Duration,
) {
    info!("Tracking watch progress for {}", video_id);
    let mut last_reported: u64 = 0;

    loop {
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let (playing, position) = {
            let p = playback.lock().unwrap();
            (p.playing, p.position)
        };

        if playing && position.abs_diff(last_reported) > REPORT_THRESHOLD_SECS {
            let progress = WatchProgress {
                video_id: video_id.to_string(),
                position,
            };
            match sink.report(&progress) {
                Ok(()) => {
                    debug!("Reported position {}s for {}", position, video_id);
                    last_reported = position;
                }
                Err(e) => {
                    // Never interrupt playback over lost telemetry
                    warn!("Failed to report watch progress for {}: {}", video_id, e);
                }
            }
        }

        // Counted only once the pass is fully done, report included
        passes.fetch_add(1, Ordering::SeqCst);
    }

    // Final flush with whatever position we last saw, threshold ignored
    let progress = WatchProgress {
        video_id: video_id.to_string(),
        position: playback.lock().unwrap().position,
    };
    if let Err(e) = sink.report(&progress) {
        warn!(
            "Failed to save final watch progress for {}: {}",
            video_id, e
        );
    }
    info!("Stopped tracking {}", video_id);
}
