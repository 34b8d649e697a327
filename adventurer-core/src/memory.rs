//! Bounded, importance-ranked memory of flagged facts.
//!
//! Records decay a little every turn and the lowest-importance record is
//! evicted once the store exceeds capacity. Near-duplicate content merges
//! into the existing record instead of inserting a second row.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Default maximum number of records retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default containment ratio above which two contents are near-duplicates.
///
/// Heuristic and known to misfire on very short strings, so it is
/// configurable rather than fixed.
pub const DEFAULT_SIMILARITY_RATIO: f64 = 0.8;

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub content: String,
    pub importance: f64,
    pub turn: u32,
    pub location: String,
    pub score: i32,
    pub moves: u32,
}

/// Bounded store of memory records, kept sorted by descending importance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    records: Vec<MemoryRecord>,
    capacity: usize,
    similarity_ratio: f64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that retains at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
            similarity_ratio: DEFAULT_SIMILARITY_RATIO,
        }
    }

    /// Override the near-duplicate containment ratio.
    pub fn with_similarity_ratio(mut self, ratio: f64) -> Self {
        self.similarity_ratio = ratio;
        self
    }

    /// Add a fact to the store.
    ///
    /// Blank content is a no-op. Content near-duplicate to an existing
    /// record merges into it, keeping the higher importance. Otherwise the
    /// record is inserted, the store re-sorted, and the lowest-importance
    /// records evicted past capacity. Returns `true` only when a new record
    /// was inserted.
    pub fn add(
        &mut self,
        content: &str,
        importance: f64,
        turn: u32,
        location: &str,
        score: i32,
        moves: u32,
    ) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }

        for existing in &mut self.records {
            if is_similar(content, &existing.content, self.similarity_ratio) {
                if importance > existing.importance {
                    existing.importance = importance;
                }
                debug!(content, merged_into = existing.content.as_str(), "duplicate memory merged");
                self.sort();
                return false;
            }
        }

        self.records.push(MemoryRecord {
            content: content.to_string(),
            importance,
            turn,
            location: location.to_string(),
            score,
            moves,
        });
        self.sort();

        while self.records.len() > self.capacity {
            // Sorted descending, so the tail is the least important.
            let evicted = self.records.pop();
            if let Some(evicted) = evicted {
                debug!(content = evicted.content.as_str(), "memory evicted");
            }
        }

        true
    }

    /// Multiply every record's importance by `factor`.
    ///
    /// Called once per turn, after arbitration, so advocates see pre-decay
    /// values during the turn.
    pub fn decay_all(&mut self, factor: f64) {
        for record in &mut self.records {
            record.importance *= factor;
        }
    }

    /// The `k` most important records, as copies.
    pub fn top_k(&self, k: usize) -> Vec<MemoryRecord> {
        self.records.iter().take(k).cloned().collect()
    }

    /// All records at a location (case-insensitive), as copies.
    pub fn by_location(&self, location: &str) -> Vec<MemoryRecord> {
        self.records
            .iter()
            .filter(|r| r.location.eq_ignore_ascii_case(location))
            .cloned()
            .collect()
    }

    /// All records, sorted by descending importance, as copies.
    pub fn all(&self) -> Vec<MemoryRecord> {
        self.records.clone()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace the contents from a persistence snapshot.
    pub fn restore(&mut self, records: Vec<MemoryRecord>) {
        self.records = records;
        self.sort();
        self.records.truncate(self.capacity);
    }

    /// A compact text summary of the top records, for reasoner context.
    pub fn summary(&self, limit: usize) -> String {
        self.records
            .iter()
            .take(limit)
            .map(|r| {
                format!(
                    "[turn {} @ {}] {} (importance {:.0})",
                    r.turn, r.location, r.content, r.importance
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sort(&mut self) {
        self.records.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(Ordering::Equal)
        });
    }
}

/// Near-duplicate check: exact match, or one string contained in the other
/// with a length ratio above `ratio`.
pub(crate) fn is_similar(a: &str, b: &str, ratio: f64) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return true;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    longer.contains(shorter.as_str())
        && shorter.len() as f64 / longer.len() as f64 > ratio
}
