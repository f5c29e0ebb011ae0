use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide "one long operation at a time" flag, passed around by handle.
#[derive(Debug, Clone, Default)]
pub struct BusyGate {
    busy: Arc<AtomicBool>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if another operation holds the gate. Never waits.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped.
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected() {
        let gate = BusyGate::new();
        let guard = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());
        assert!(gate.clone().try_acquire().is_none());
        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn released_on_early_error_return() {
        fn work(gate: &BusyGate) -> Result<(), String> {
            let _guard = gate.try_acquire().ok_or("busy")?;
            Err("failed halfway".into())
        }
        let gate = BusyGate::new();
        assert!(work(&gate).is_err());
        assert!(!gate.is_busy());
    }

    #[test]
    fn released_on_panic() {
        let gate = BusyGate::new();
        let inner = gate.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.try_acquire().unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!gate.is_busy());
    }
}
