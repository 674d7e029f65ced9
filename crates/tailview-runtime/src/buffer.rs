//! Bounded recency buffer for a source's log lines.

use std::collections::VecDeque;

use tailview_core::BufferConfig;

/// Ordered buffer of the most recent lines from one source.
///
/// Appends are unbounded until the buffer passes `max_lines_per_source`;
/// at that point it is trimmed in one step down to exactly
/// `cleanup_threshold` most-recent lines. The gap between the two bounds
/// keeps trimming off the per-line hot path.
#[derive(Debug)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
    cleanup_threshold: usize,
}

impl LineBuffer {
    /// Create an empty buffer. `config` has been validated: the threshold
    /// is nonzero and no larger than the maximum.
    pub fn new(config: BufferConfig) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: config.max_lines_per_source,
            cleanup_threshold: config.cleanup_threshold,
        }
    }

    /// Append a line, trimming the oldest entries if the buffer would
    /// exceed its maximum.
    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
        if self.lines.len() > self.max_lines {
            let excess = self.lines.len() - self.cleanup_threshold;
            self.lines.drain(..excess);
        }
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// The most recent `count` lines, oldest first.
    pub fn recent(&self, count: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(max_lines: usize, cleanup_threshold: usize) -> LineBuffer {
        LineBuffer::new(BufferConfig {
            max_lines_per_source: max_lines,
            cleanup_threshold,
        })
    }

    #[test]
    fn trims_to_threshold_when_max_exceeded() {
        let mut buf = buffer(5, 3);
        for n in 1..=6 {
            buf.push(n.to_string());
        }
        assert_eq!(buf.snapshot(), ["4", "5", "6"]);
    }

    #[test]
    fn never_exceeds_max_lines() {
        let mut buf = buffer(10, 4);
        for n in 0..1000 {
            buf.push(n.to_string());
            assert!(buf.len() <= 10);
        }
        // 1000 pushes: after the last trim the buffer grew back from 4.
        let snapshot = buf.snapshot();
        assert_eq!(snapshot.last().unwrap(), "999");
        // Order preserved, no duplicates.
        let parsed: Vec<usize> = snapshot.iter().map(|s| s.parse().unwrap()).collect();
        for pair in parsed.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[test]
    fn no_trim_below_max() {
        let mut buf = buffer(5, 3);
        for n in 1..=5 {
            buf.push(n.to_string());
        }
        assert_eq!(buf.snapshot(), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn recent_returns_tail() {
        let mut buf = buffer(100, 50);
        for n in 1..=10 {
            buf.push(n.to_string());
        }
        assert_eq!(buf.recent(3), ["8", "9", "10"]);
        assert_eq!(buf.recent(100).len(), 10);
        assert!(buf.recent(0).is_empty());
    }

    #[test]
    fn equal_max_and_threshold_keeps_exactly_max() {
        let mut buf = buffer(3, 3);
        for n in 1..=4 {
            buf.push(n.to_string());
        }
        assert_eq!(buf.snapshot(), ["2", "3", "4"]);
    }
}
