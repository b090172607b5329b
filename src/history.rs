use std::collections::VecDeque;

/// Default number of lines kept.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Bounded list of entered lines, oldest first.
///
/// Empty lines and a line equal to the most recent entry are not recorded.
/// When full, the oldest entry is dropped.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_SIZE)),
            capacity,
        }
    }

    /// Records `line`. Returns `true` if it was added.
    pub fn push(&mut self, line: &str) -> bool {
        if line.is_empty() || self.capacity == 0 {
            return false;
        }
        if self.entries.back().is_some_and(|last| last == line) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_owned());
        true
    }

    /// Entry at `index`, counting from the oldest (0).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_empty_and_repeated_lines() {
        let mut history = History::new(10);
        assert!(history.push("ls"));
        assert!(!history.push("ls"));
        assert!(!history.push(""));
        assert!(history.push("pwd"));
        assert!(history.push("ls"));
        assert_eq!(history.iter().collect::<Vec<_>>(), ["ls", "pwd", "ls"]);
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut history = History::new(3);
        for line in ["a", "b", "c", "d"] {
            history.push(line);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.get(0), Some("b"));
        assert_eq!(history.get(2), Some("d"));
        assert_eq!(history.get(3), None);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut history = History::new(0);
        assert!(!history.push("ls"));
        assert!(history.is_empty());
    }
}
