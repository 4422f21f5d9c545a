//! Correlation ref generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Strictly increasing ref counter, one per client.
///
/// The first ref handed out is 1; 0 is reserved for uncorrelated frames.
/// Backed by an atomic so channel operations may run from any task or thread.
#[derive(Debug)]
pub struct RefCounter {
    next: AtomicU64,
}

impl RefCounter {
    /// Create a counter whose first ref is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next ref. Never returns the same value twice.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RefCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_one_and_increments() {
        let refs = RefCounter::new();
        assert_eq!(refs.next(), 1);
        assert_eq!(refs.next(), 2);
        assert_eq!(refs.next(), 3);
    }

    #[test]
    fn independent_counters_do_not_share_state() {
        let a = RefCounter::new();
        let b = RefCounter::new();
        assert_eq!(a.next(), 1);
        assert_eq!(a.next(), 2);
        assert_eq!(b.next(), 1);
    }

    #[test]
    fn concurrent_callers_never_see_duplicates() {
        let refs = Arc::new(RefCounter::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let refs = Arc::clone(&refs);
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| refs.next()).collect::<Vec<_>>()
            }));
        }
        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();
        let before = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), before, "duplicate refs handed out");
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen.last(), Some(&8000));
    }
}
