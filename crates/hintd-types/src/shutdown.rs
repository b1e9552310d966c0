//! Cooperative shutdown flag shared by the receive loop, the worker and the
//! `exit` command.

use std::sync::{Arc, OnceLock};

/// Cloneable handle to a process-wide shutdown request.
///
/// The first request wins: later calls do not overwrite the exit status.
/// The status is stored together with the request, so any thread that sees
/// [`ShutdownSignal::is_requested`] also sees the right exit status.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    exit_status: Arc<OnceLock<i32>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown with the given process exit status.
    ///
    /// Returns `true` if this call was the first request.
    pub fn request(&self, exit_status: i32) -> bool {
        self.exit_status.set(exit_status).is_ok()
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.exit_status.get().is_some()
    }

    /// Exit status recorded by the first request (0 if none).
    pub fn exit_status(&self) -> i32 {
        self.exit_status.get().copied().unwrap_or(0)
    }

    /// Guard that requests shutdown with status 1 if the owning thread
    /// unwinds while holding it.
    pub fn panic_guard(&self) -> PanicGuard {
        PanicGuard {
            signal: self.clone(),
        }
    }
}

/// See [`ShutdownSignal::panic_guard`].
#[derive(Debug)]
pub struct PanicGuard {
    signal: ShutdownSignal,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("unexpected error: thread panicked, terminating");
            self.signal.request(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        let s = ShutdownSignal::new();
        assert!(!s.is_requested());
        assert_eq!(s.exit_status(), 0);
    }

    #[test]
    fn clones_share_state() {
        let s = ShutdownSignal::new();
        let other = s.clone();
        other.request(0);
        assert!(s.is_requested());
    }

    #[test]
    fn first_request_wins() {
        let s = ShutdownSignal::new();
        assert!(s.request(1));
        assert!(!s.request(0));
        assert_eq!(s.exit_status(), 1);
    }

    #[test]
    fn visible_across_threads() {
        let s = ShutdownSignal::new();
        let t = s.clone();
        std::thread::spawn(move || t.request(3)).join().unwrap();
        assert!(s.is_requested());
        assert_eq!(s.exit_status(), 3);
    }

    #[test]
    fn observer_never_sees_request_without_status() {
        for _ in 0..200 {
            let s = ShutdownSignal::new();
            let t = s.clone();
            let requester = std::thread::spawn(move || {
                t.request(7);
            });
            loop {
                if s.is_requested() {
                    assert_eq!(s.exit_status(), 7);
                    break;
                }
                std::hint::spin_loop();
            }
            requester.join().unwrap();
        }
    }

    #[test]
    fn panic_guard_requests_failure_on_unwind() {
        let s = ShutdownSignal::new();
        let t = s.clone();
        let result = std::thread::spawn(move || {
            let _guard = t.panic_guard();
            panic!("handler blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(s.is_requested());
        assert_eq!(s.exit_status(), 1);
    }

    #[test]
    fn panic_guard_is_silent_on_normal_exit() {
        let s = ShutdownSignal::new();
        {
            let _guard = s.panic_guard();
        }
        assert!(!s.is_requested());
    }
}
