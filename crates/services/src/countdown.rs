//! Cancellable per-question countdown.
//!
//! A `Countdown` ticks once per whole second, reports the seconds left, fires
//! expiry once and stops. Cancellation is synchronous: once `cancel` returns,
//! the run it stopped can no longer call its observer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, trace};

const TICK: Duration = Duration::from_secs(1);

/// Receives countdown callbacks.
///
/// Callbacks run while the countdown holds its run lock, so they must not call
/// `cancel` or `reset` on the countdown that invoked them. Forward to a queue
/// instead.
pub trait CountdownObserver: Send + Sync + 'static {
    /// Called after each elapsed second with the seconds left, ending with `0`.
    fn on_tick(&self, remaining: u32);

    /// Called exactly once after the final tick, unless the run was cancelled.
    fn on_expire(&self);
}

struct FnObserver<T, E> {
    on_tick: T,
    on_expire: E,
}

impl<T, E> CountdownObserver for FnObserver<T, E>
where
    T: Fn(u32) + Send + Sync + 'static,
    E: Fn() + Send + Sync + 'static,
{
    fn on_tick(&self, remaining: u32) {
        (self.on_tick)(remaining);
    }

    fn on_expire(&self) {
        (self.on_expire)();
    }
}

// `None` once the run has expired or been cancelled.
type Slot = Arc<Mutex<Option<Arc<dyn CountdownObserver>>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Arc<dyn CountdownObserver>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Run {
    slot: Slot,
    task: JoinHandle<()>,
}

/// A countdown bound to one observer. Each `start`/`reset` begins a new run.
pub struct Countdown {
    observer: Arc<dyn CountdownObserver>,
    duration_secs: u32,
    run: Option<Run>,
}

impl Countdown {
    /// Starts counting down `duration_secs` seconds with closure callbacks.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start<T, E>(duration_secs: u32, on_tick: T, on_expire: E) -> Self
    where
        T: Fn(u32) + Send + Sync + 'static,
        E: Fn() + Send + Sync + 'static,
    {
        Self::with_observer(duration_secs, Arc::new(FnObserver { on_tick, on_expire }))
    }

    /// Starts counting down `duration_secs` seconds, reporting to `observer`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn with_observer(duration_secs: u32, observer: Arc<dyn CountdownObserver>) -> Self {
        let mut countdown = Self {
            observer,
            duration_secs,
            run: None,
        };
        countdown.arm();
        countdown
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// True while the current run can still tick or expire.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| lock(&run.slot).is_some())
    }

    /// Stops the current run.
    ///
    /// Returns `true` if this call stopped a run that had not yet expired. A run
    /// is either cancelled or expired, never both.
    pub fn cancel(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        let stopped = lock(&run.slot).take().is_some();
        run.task.abort();
        if stopped {
            debug!(duration_secs = self.duration_secs, "countdown cancelled");
        }
        stopped
    }

    /// Cancels the current run and starts a new one with the same observer.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn reset(&mut self, duration_secs: u32) {
        self.cancel();
        self.duration_secs = duration_secs;
        self.arm();
    }

    fn arm(&mut self) {
        let slot: Slot = Arc::new(Mutex::new(Some(Arc::clone(&self.observer))));
        let task = tokio::spawn(count_down(Arc::clone(&slot), self.duration_secs));
        trace!(duration_secs = self.duration_secs, "countdown armed");
        self.run = Some(Run { slot, task });
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("duration_secs", &self.duration_secs)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn count_down(slot: Slot, duration_secs: u32) {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    let mut remaining = duration_secs;

    while remaining > 0 {
        ticker.tick().await;
        remaining -= 1;
        let guard = lock(&slot);
        let Some(observer) = guard.as_ref() else {
            return;
        };
        observer.on_tick(remaining);
    }

    // Held across `on_expire` so a concurrent `cancel` waits for it.
    let mut guard = lock(&slot);
    if let Some(observer) = guard.take() {
        observer.on_expire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        ticks: Mutex<Vec<u32>>,
        expired: AtomicUsize,
    }

    impl Recorder {
        fn ticks(&self) -> Vec<u32> {
            self.ticks.lock().unwrap().clone()
        }

        fn expired(&self) -> usize {
            self.expired.load(Ordering::SeqCst)
        }
    }

    impl CountdownObserver for Recorder {
        fn on_tick(&self, remaining: u32) {
            self.ticks.lock().unwrap().push(remaining);
        }

        fn on_expire(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorder() -> Arc<Recorder> {
        Arc::new(Recorder::default())
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_second_then_expires_once() {
        let rec = recorder();
        let countdown = Countdown::with_observer(3, rec.clone());
        assert!(countdown.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(rec.ticks(), vec![2, 1, 0]);
        assert_eq!(rec.expired(), 1);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_all_further_callbacks() {
        let rec = recorder();
        let mut countdown = Countdown::with_observer(3, rec.clone());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(rec.ticks(), vec![2]);

        assert!(countdown.cancel());
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(rec.ticks(), vec![2]);
        assert_eq!(rec.expired(), 0);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_expiry_reports_nothing_stopped() {
        let rec = recorder();
        let mut countdown = Countdown::with_observer(1, rec.clone());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rec.expired(), 1);
        assert!(!countdown.cancel());
        assert!(!countdown.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restarts_with_new_duration() {
        let rec = recorder();
        let mut countdown = Countdown::with_observer(5, rec.clone());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(rec.ticks(), vec![4, 3]);

        countdown.reset(2);
        assert_eq!(countdown.duration_secs(), 2);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(rec.ticks(), vec![4, 3, 1, 0]);
        assert_eq!(rec.expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels() {
        let rec = recorder();
        let countdown = Countdown::with_observer(2, rec.clone());
        drop(countdown);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rec.ticks().is_empty());
        assert_eq!(rec.expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_expires_without_ticking() {
        let rec = recorder();
        let _countdown = Countdown::with_observer(0, rec.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rec.ticks().is_empty());
        assert_eq!(rec.expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closure_callbacks_are_supported() {
        let expired = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));
        let (e, t) = (Arc::clone(&expired), Arc::clone(&ticks));
        let _countdown = Countdown::start(
            2,
            move |_| {
                t.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                e.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }
}
