//! Sample rate gate for sensor-driven frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default minimum spacing between sensor-driven sends
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Admission control between the sensor callback and the transport.
///
/// `sending` is flipped by the control surface, `last_send` is touched by
/// the sensor context. Both may live on different threads.
#[derive(Debug)]
pub struct SampleGate {
    min_interval: Duration,
    sending: AtomicBool,
    last_send: Mutex<Option<Instant>>,
}

impl SampleGate {
    /// New gate, initially stopped.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            sending: AtomicBool::new(false),
            last_send: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        self.sending.store(true, Ordering::SeqCst);
        tracing::info!("Sample sending started");
    }

    pub fn stop(&self) {
        self.sending.store(false, Ordering::SeqCst);
        tracing::info!("Sample sending stopped");
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// Admit a sample taken at `now`, recording it as the last send.
    pub fn should_send(&self, now: Instant) -> bool {
        if !self.is_sending() {
            return false;
        }

        // A poisoned lock only means another sampler panicked mid-check
        let mut last_send = self
            .last_send
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let due = match *last_send {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        };

        if due {
            *last_send = Some(now);
        }
        due
    }
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_stopped_gate_admits_nothing() {
        let gate = SampleGate::default();
        assert!(!gate.should_send(Instant::now()));
    }

    #[test]
    fn test_interval() {
        let gate = SampleGate::default();
        gate.start();

        let t0 = Instant::now();
        assert!(gate.should_send(t0));
        assert!(!gate.should_send(t0 + Duration::from_millis(10)));
        assert!(!gate.should_send(t0 + Duration::from_millis(999)));
        assert!(gate.should_send(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_rejection_has_no_side_effects() {
        let gate = SampleGate::new(Duration::from_millis(100));
        gate.start();

        let t0 = Instant::now();
        assert!(gate.should_send(t0));
        // Rejected at +60 must not push the window forward
        assert!(!gate.should_send(t0 + Duration::from_millis(60)));
        assert!(gate.should_send(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_stop_then_start() {
        let gate = SampleGate::new(Duration::from_millis(100));
        gate.start();
        let t0 = Instant::now();
        assert!(gate.should_send(t0));

        gate.stop();
        assert!(!gate.is_sending());
        assert!(!gate.should_send(t0 + Duration::from_millis(500)));

        gate.start();
        assert!(gate.should_send(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_concurrent_samplers_admit_one() {
        let gate = Arc::new(SampleGate::default());
        gate.start();
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.should_send(now))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 1);
    }
}
