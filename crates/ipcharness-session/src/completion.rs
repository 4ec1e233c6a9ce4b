use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot signal that the supervised process has exited.
///
/// Written once by the supervisor, read by the listener. Setting is
/// idempotent and never reverts.
#[derive(Debug, Default)]
pub struct CompletionFlag {
    done: AtomicBool,
}

impl CompletionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark completion. Returns `true` only for the call that set the flag.
    pub fn set(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn starts_unset_and_sets_once() {
        let flag = CompletionFlag::new();
        assert!(!flag.is_set());
        assert!(flag.set());
        assert!(flag.is_set());
        assert!(!flag.set(), "second set must report no transition");
        assert!(flag.is_set());
    }

    #[test]
    fn only_one_concurrent_setter_wins() {
        let flag = CompletionFlag::new();
        let winners = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if flag.set() {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::Relaxed), 1);
        assert!(flag.is_set());
    }
}
