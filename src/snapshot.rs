extern crate std;

use crate::capture;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// Rate limits snapshot captures. The very first attempt always fires.
pub struct Debouncer {
    interval: Duration,
    last_trigger: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Debouncer {
        return Debouncer{
            interval: interval,
            last_trigger: Mutex::new(None),
        };
    }

    // The read-then-write happens under one lock, so two requests can't
    // both claim the same window.
    pub fn try_fire(&self, now: Instant) -> bool {
        let mut last = match self.last_trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let due = match *last {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= self.interval,
        };
        if due {
            *last = Some(now);
        }
        return due;
    }

    pub fn since_last(&self, now: Instant) -> Option<Duration> {
        let last = match self.last_trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        return last.map(|prev| now.saturating_duration_since(prev));
    }
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub started: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
}

pub struct SnapshotScheduler {
    debouncer: Debouncer,
    capturer: Arc<dyn capture::Capturer>,
    target_url: String,
    output_path: std::path::PathBuf,
    stats: Arc<CaptureStats>,
}

impl SnapshotScheduler {
    pub fn new(interval: Duration,
               capturer: Arc<dyn capture::Capturer>,
               target_url: &str,
               output_path: &std::path::Path) -> SnapshotScheduler {
        return SnapshotScheduler{
            debouncer: Debouncer::new(interval),
            capturer: capturer,
            target_url: target_url.to_string(),
            output_path: output_path.to_path_buf(),
            stats: Arc::new(CaptureStats::default()),
        };
    }

    // Never blocks on the capture itself. If a previous capture is still
    // running when the next window opens, both run.
    pub fn maybe_trigger(&self, now: Instant) -> bool {
        if !self.debouncer.try_fire(now) {
            return false;
        }

        info!("Snapshot triggered at {}", chrono::Local::now().format("%H:%M:%S"));
        self.stats.started.fetch_add(1, Ordering::Relaxed);

        let capturer = self.capturer.clone();
        let target_url = self.target_url.clone();
        let output_path = self.output_path.clone();
        let stats = self.stats.clone();

        let spawned = std::thread::Builder::new()
            .name("snapshot".to_string())
            .spawn(move || {
                run_capture(capturer.as_ref(), &target_url, &output_path, &stats);
            });

        if let Err(err) = spawned {
            error!("Could not start snapshot thread: {}", err);
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        return true;
    }

    pub fn stats(&self) -> &CaptureStats {
        return &self.stats;
    }

    pub fn since_last_trigger(&self, now: Instant) -> Option<Duration> {
        return self.debouncer.since_last(now);
    }

    pub fn output_path(&self) -> &std::path::Path {
        return &self.output_path;
    }
}

fn run_capture(capturer: &dyn capture::Capturer,
               target_url: &str,
               output_path: &std::path::Path,
               stats: &CaptureStats) {
    let started = Instant::now();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        capturer.capture(target_url, output_path)
    }));

    match outcome {
        Ok(Ok(())) => {
            stats.succeeded.fetch_add(1, Ordering::Relaxed);
            info!("Snapshot saved to {} in {:?}", output_path.display(), started.elapsed());
        },
        Ok(Err(err)) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            error!("Snapshot failed: {}", err);
        },
        Err(_) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            error!("Snapshot capture panicked");
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::capture::Capturer;
    use crate::result::CaptureError;

    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex, mpsc};
    use std::time::{Duration, Instant};

    struct FakeCapturer {
        calls: Mutex<mpsc::Sender<(String, std::path::PathBuf)>>,
        fail: bool,
    }

    impl Capturer for FakeCapturer {
        fn capture(&self, target_url: &str, output_path: &std::path::Path) -> Result<(), CaptureError> {
            let _ = self.calls.lock().unwrap().send((target_url.to_string(), output_path.to_path_buf()));
            if self.fail {
                return Err(CaptureError::NotReady("fake".to_string()));
            }
            return Ok(());
        }
    }

    struct PanickingCapturer;

    impl Capturer for PanickingCapturer {
        fn capture(&self, _target_url: &str, _output_path: &std::path::Path) -> Result<(), CaptureError> {
            panic!("browser went away");
        }
    }

    fn scheduler(fail: bool) -> (super::SnapshotScheduler, mpsc::Receiver<(String, std::path::PathBuf)>) {
        let (tx, rx) = mpsc::channel();
        let capturer = Arc::new(FakeCapturer{calls: Mutex::new(tx), fail: fail});
        let scheduler = super::SnapshotScheduler::new(
            Duration::from_secs(30), capturer, "http://localhost:5001/", std::path::Path::new("static/image.png"));
        return (scheduler, rx);
    }

    fn wait_for<F: Fn() -> bool>(condition: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn debounce_windows() {
        let debouncer = super::Debouncer::new(Duration::from_secs(30));
        let t0 = Instant::now();

        assert!(debouncer.try_fire(t0));
        assert!(!debouncer.try_fire(t0 + Duration::from_secs(10)));
        assert!(!debouncer.try_fire(t0 + Duration::from_secs(29)));
        assert!(debouncer.try_fire(t0 + Duration::from_secs(30)));
        assert!(!debouncer.try_fire(t0 + Duration::from_secs(59)));
        assert!(debouncer.try_fire(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn clock_going_backwards_does_not_fire() {
        let debouncer = super::Debouncer::new(Duration::from_secs(30));
        let t0 = Instant::now() + Duration::from_secs(100);

        assert!(debouncer.try_fire(t0));
        assert!(!debouncer.try_fire(t0 - Duration::from_secs(50)));
    }

    #[test]
    fn concurrent_callers_claim_one_window() {
        let debouncer = Arc::new(super::Debouncer::new(Duration::from_secs(30)));
        let now = Instant::now();

        let handles: Vec<_> = (0..16).map(|_| {
            let debouncer = debouncer.clone();
            std::thread::spawn(move || debouncer.try_fire(now))
        }).collect();
        let fired = handles.into_iter()
            .map(|h| h.join().expect("join"))
            .filter(|fired| *fired)
            .count();

        assert_eq!(1, fired);
    }

    #[test]
    fn trigger_runs_capture_in_background() {
        let (scheduler, rx) = scheduler(false);
        let t0 = Instant::now();

        assert!(scheduler.maybe_trigger(t0));
        let (url, path) = rx.recv_timeout(Duration::from_secs(5)).expect("capture called");
        assert_eq!("http://localhost:5001/", url);
        assert_eq!(std::path::PathBuf::from("static/image.png"), path);

        assert!(!scheduler.maybe_trigger(t0 + Duration::from_secs(10)));
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        wait_for(|| scheduler.stats().succeeded.load(Ordering::Relaxed) == 1);
        assert_eq!(1, scheduler.stats().started.load(Ordering::Relaxed));
    }

    #[test]
    fn failed_capture_does_not_poison_scheduler() {
        let (scheduler, rx) = scheduler(true);
        let t0 = Instant::now();

        assert!(scheduler.maybe_trigger(t0));
        rx.recv_timeout(Duration::from_secs(5)).expect("first capture");
        wait_for(|| scheduler.stats().failed.load(Ordering::Relaxed) == 1);

        assert!(scheduler.maybe_trigger(t0 + Duration::from_secs(30)));
        rx.recv_timeout(Duration::from_secs(5)).expect("second capture");
        wait_for(|| scheduler.stats().failed.load(Ordering::Relaxed) == 2);
    }

    #[test]
    fn panicking_capture_is_contained() {
        let scheduler = super::SnapshotScheduler::new(
            Duration::from_secs(30), Arc::new(PanickingCapturer), "http://localhost:5001/",
            std::path::Path::new("static/image.png"));
        let t0 = Instant::now();

        assert!(scheduler.maybe_trigger(t0));
        wait_for(|| scheduler.stats().failed.load(Ordering::Relaxed) == 1);
        assert!(scheduler.maybe_trigger(t0 + Duration::from_secs(31)));
    }

    #[test]
    fn reports_time_since_trigger() {
        let (scheduler, _rx) = scheduler(false);
        let t0 = Instant::now();

        assert_eq!(None, scheduler.since_last_trigger(t0));
        scheduler.maybe_trigger(t0);
        assert_eq!(Some(Duration::from_secs(12)), scheduler.since_last_trigger(t0 + Duration::from_secs(12)));
    }
}
