//! Bounded last-resort memory queue
//!
//! Holds records only while BOTH primary and fallback storage are
//! unreachable. Capacity is a global entry count across all logical
//! files; when the cap is exceeded the globally oldest entry is evicted.
//! Lossy by design under sustained dual-storage failure — the system
//! chooses bounded memory over completeness, and the loss is surfaced
//! through metrics rather than blocking any producer.

use std::collections::{BTreeMap, HashMap, VecDeque};

use verdant_core::LogicalPath;

/// One queued payload. The sequence number is a process-wide monotonic
/// counter, giving a true global FIFO across keys.
#[derive(Debug, Clone)]
struct OverflowEntry {
    seq: u64,
    payload: String,
}

/// Size-capped mapping from logical file to pending payloads.
///
/// Pure data structure; no I/O. Exclusively owned and mutated by the
/// resilience manager.
#[derive(Debug)]
pub struct OverflowBuffer {
    queues: HashMap<LogicalPath, VecDeque<OverflowEntry>>,
    max_entries: usize,
    total: usize,
    next_seq: u64,
}

impl OverflowBuffer {
    /// Create a buffer capped at `max_entries` across all keys.
    pub fn new(max_entries: usize) -> Self {
        Self {
            queues: HashMap::new(),
            max_entries,
            total: 0,
            next_seq: 0,
        }
    }

    /// Append a payload under `key`. If the global cap is exceeded, the
    /// single oldest entry across all keys is evicted so the cap holds
    /// at rest. Returns `true` if an entry was evicted.
    pub fn push(&mut self, key: LogicalPath, payload: String) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.queues
            .entry(key)
            .or_default()
            .push_back(OverflowEntry { seq, payload });
        self.total += 1;

        if self.total > self.max_entries {
            self.evict_oldest();
            true
        } else {
            false
        }
    }

    /// Remove and return all payloads for `key` in insertion order.
    pub fn drain(&mut self, key: &LogicalPath) -> Vec<String> {
        match self.queues.remove(key) {
            Some(entries) => {
                self.total -= entries.len();
                entries.into_iter().map(|e| e.payload).collect()
            }
            None => Vec::new(),
        }
    }

    /// Clone the payloads queued for `key` in insertion order, leaving
    /// the buffer untouched. The manager peeks before attempting a
    /// downstream write and drains only once that write succeeded, so a
    /// failed drain never loses entries.
    pub fn peek(&self, key: &LogicalPath) -> Vec<String> {
        match self.queues.get(key) {
            Some(entries) => entries.iter().map(|e| e.payload.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Whether `key` has at least one queued payload.
    pub fn contains(&self, key: &LogicalPath) -> bool {
        self.queues.get(key).is_some_and(|q| !q.is_empty())
    }

    /// All keys currently holding entries.
    pub fn keys(&self) -> Vec<LogicalPath> {
        self.queues.keys().cloned().collect()
    }

    /// Total queued entries across all keys.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Whether the buffer holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Per-key entry counts, for the metrics snapshot.
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        self.queues
            .iter()
            .map(|(k, q)| (k.as_str().to_string(), q.len()))
            .collect()
    }

    /// Drop the entry with the smallest sequence number across all keys.
    fn evict_oldest(&mut self) {
        let oldest_key = self
            .queues
            .iter()
            .filter_map(|(k, q)| q.front().map(|e| (e.seq, k.clone())))
            .min_by_key(|(seq, _)| *seq)
            .map(|(_, k)| k);

        if let Some(key) = oldest_key {
            if let Some(queue) = self.queues.get_mut(&key) {
                queue.pop_front();
                self.total -= 1;
                if queue.is_empty() {
                    self.queues.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn key(name: &str) -> LogicalPath {
        LogicalPath::normalize(name, Path::new("/sd"))
    }

    #[test]
    fn test_push_and_drain_preserves_order() {
        let mut buf = OverflowBuffer::new(10);
        buf.push(key("a.csv"), "1\n".into());
        buf.push(key("a.csv"), "2\n".into());
        buf.push(key("a.csv"), "3\n".into());

        assert_eq!(buf.drain(&key("a.csv")), vec!["1\n", "2\n", "3\n"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_drain_unknown_key_is_empty() {
        let mut buf = OverflowBuffer::new(10);
        assert!(buf.drain(&key("missing.csv")).is_empty());
    }

    #[test]
    fn test_cap_never_exceeded_at_rest() {
        let mut buf = OverflowBuffer::new(3);
        for i in 0..20 {
            buf.push(key("a.csv"), format!("{i}\n"));
            assert!(buf.len() <= 3);
        }
        // Most recent entries retained.
        assert_eq!(buf.drain(&key("a.csv")), vec!["17\n", "18\n", "19\n"]);
    }

    #[test]
    fn test_eviction_is_global_fifo_across_keys() {
        // Cap 2, three writes A, B, C to distinct keys: A (oldest) evicted.
        let mut buf = OverflowBuffer::new(2);
        buf.push(key("a.csv"), "A\n".into());
        buf.push(key("b.csv"), "B\n".into());
        let evicted = buf.push(key("c.csv"), "C\n".into());

        assert!(evicted);
        assert_eq!(buf.len(), 2);
        assert!(!buf.contains(&key("a.csv")));
        assert!(buf.contains(&key("b.csv")));
        assert!(buf.contains(&key("c.csv")));
    }

    #[test]
    fn test_eviction_order_interleaved_keys() {
        let mut buf = OverflowBuffer::new(2);
        buf.push(key("x.csv"), "x1\n".into());
        buf.push(key("y.csv"), "y1\n".into());
        buf.push(key("x.csv"), "x2\n".into()); // evicts x1
        buf.push(key("y.csv"), "y2\n".into()); // evicts y1

        assert_eq!(buf.drain(&key("x.csv")), vec!["x2\n"]);
        assert_eq!(buf.drain(&key("y.csv")), vec!["y2\n"]);
    }

    #[test]
    fn test_peek_leaves_entries_in_place() {
        let mut buf = OverflowBuffer::new(10);
        buf.push(key("a.csv"), "1\n".into());
        buf.push(key("a.csv"), "2\n".into());

        assert_eq!(buf.peek(&key("a.csv")), vec!["1\n", "2\n"]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.drain(&key("a.csv")), vec!["1\n", "2\n"]);
    }

    #[test]
    fn test_snapshot_counts_per_key() {
        let mut buf = OverflowBuffer::new(10);
        buf.push(key("a.csv"), "1\n".into());
        buf.push(key("a.csv"), "2\n".into());
        buf.push(key("b.csv"), "3\n".into());

        let snap = buf.snapshot();
        assert_eq!(snap.get("a.csv"), Some(&2));
        assert_eq!(snap.get("b.csv"), Some(&1));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_empty_queues_removed_after_eviction() {
        let mut buf = OverflowBuffer::new(1);
        buf.push(key("a.csv"), "A\n".into());
        buf.push(key("b.csv"), "B\n".into()); // evicts the only "a" entry

        assert!(!buf.snapshot().contains_key("a.csv"));
        assert_eq!(buf.keys().len(), 1);
    }
}
