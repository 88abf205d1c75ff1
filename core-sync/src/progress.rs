//! Monotonic progress reporting
//!
//! Track downloads finish out of order, so each completion bumps an atomic
//! counter and the derived percentage only goes through when it is not
//! below what was last reported.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use parking_lot::Mutex;

/// Host progress callback: `(percent, message)`
pub type ProgressCallback = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// Percent reported once setlists are cached
pub const SETLISTS_DONE: u8 = 25;
/// Percent reported once song metadata is cached
pub const SONGS_DONE: u8 = 50;
/// Share of the bar covered by audio downloads
const AUDIO_SPAN: usize = 45;

pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
    event_bus: Option<EventBus>,
    run_id: String,
    last: Mutex<u8>,
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl ProgressReporter {
    pub fn new(
        run_id: impl Into<String>,
        callback: Option<ProgressCallback>,
        event_bus: Option<EventBus>,
    ) -> Self {
        Self {
            callback,
            event_bus,
            run_id: run_id.into(),
            last: Mutex::new(0),
            completed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    pub fn set_total_tracks(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    /// Report `percent` unless a higher value was already reported.
    ///
    /// The callback runs under the gate lock so observers see values in order.
    pub fn report(&self, percent: u8, message: &str) {
        let percent = percent.min(100);
        let mut last = self.last.lock();
        if percent < *last {
            return;
        }
        *last = percent;

        if let Some(callback) = &self.callback {
            callback(percent, message);
        }
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Sync(SyncEvent::Progress {
                run_id: self.run_id.clone(),
                percent,
                phase: message.to_string(),
            }))
            .ok();
        }
    }

    /// Count one processed track (cached, skipped or failed) and report.
    pub fn track_completed(&self) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);
        self.report(
            audio_percent(done, total),
            &format!("Downloaded {}/{} audio files", done, total),
        );
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// `50 + floor(done / total * 45)`, capped at 95
pub(crate) fn audio_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return SONGS_DONE + AUDIO_SPAN as u8;
    }
    let done = done.min(total);
    SONGS_DONE + (done * AUDIO_SPAN / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<(u8, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback =
            Arc::new(move |p: u8, m: &str| sink.lock().push((p, m.to_string())));
        (callback, seen)
    }

    #[test]
    fn test_audio_percent() {
        assert_eq!(audio_percent(0, 4), 50);
        assert_eq!(audio_percent(1, 4), 61);
        assert_eq!(audio_percent(2, 3), 80);
        assert_eq!(audio_percent(4, 4), 95);
        assert_eq!(audio_percent(9, 4), 95);
        assert_eq!(audio_percent(0, 0), 95);
    }

    #[test]
    fn test_lower_values_are_dropped() {
        let (callback, seen) = recording();
        let reporter = ProgressReporter::new("run", Some(callback), None);

        reporter.report(50, "Songs metadata cached");
        reporter.report(25, "late");
        reporter.report(50, "same");
        reporter.report(100, "Sync complete!");

        let seen = seen.lock();
        let values: Vec<u8> = seen.iter().map(|(p, _)| *p).collect();
        assert_eq!(values, vec![50, 50, 100]);
    }

    #[test]
    fn test_track_completion_messages() {
        let (callback, seen) = recording();
        let reporter = ProgressReporter::new("run", Some(callback), None);
        reporter.set_total_tracks(2);

        reporter.track_completed();
        reporter.track_completed();

        assert_eq!(reporter.completed(), 2);
        let seen = seen.lock();
        assert_eq!(seen[0], (72, "Downloaded 1/2 audio files".to_string()));
        assert_eq!(seen[1], (95, "Downloaded 2/2 audio files".to_string()));
    }

    #[test]
    fn test_concurrent_completions_stay_monotonic() {
        let (callback, seen) = recording();
        let reporter = Arc::new(ProgressReporter::new("run", Some(callback), None));
        reporter.set_total_tracks(64);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        reporter.track_completed();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock();
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.last().map(|(p, _)| *p), Some(95));
    }

    #[tokio::test]
    async fn test_progress_is_published_on_bus() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let reporter = ProgressReporter::new("run-7", None, Some(bus));

        reporter.report(25, "Setlists cached");

        match rx.recv().await.unwrap() {
            CoreEvent::Sync(SyncEvent::Progress { run_id, percent, .. }) => {
                assert_eq!(run_id, "run-7");
                assert_eq!(percent, 25);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
