use std::collections::BTreeMap;

/// Answers recorded for a running session, keyed by question index.
///
/// Skipped questions are stored as the empty string so that a complete
/// session always has exactly one entry per index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerAccumulator {
    slots: BTreeMap<usize, String>,
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, replacing any earlier entry for the same index
    pub fn commit(&mut self, index: usize, text: impl Into<String>) {
        self.slots.insert(index, text.into());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(&index).map(String::as_str)
    }

    /// Number of committed slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when every index in `0..total` has an entry
    pub fn is_complete(&self, total: usize) -> bool {
        (0..total).all(|i| self.slots.contains_key(&i))
    }

    /// Build the submission payload of exactly `total` answers.
    ///
    /// Gaps are filled with the empty string.
    pub fn to_ordered_array(&self, total: usize) -> Vec<String> {
        (0..total)
            .map(|i| self.slots.get(&i).cloned().unwrap_or_default())
            .collect()
    }
}
