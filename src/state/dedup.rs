use std::collections::HashSet;

/// Run-scoped ledger of item identifiers already captured
///
/// Catalog pages frequently re-list the same item across overlapping offsets
/// and re-fetches; the ledger is consulted before a record is admitted to
/// the sink or triggers an image download, so each identifier produces at
/// most one dataset row per run.
///
/// The ledger is not persisted. On resume it is reconstructed from the
/// identifiers already present in the previous run's dataset file, so a
/// resumed run does not re-emit rows it already published.
#[derive(Debug, Default)]
pub struct DedupLedger {
    ids: HashSet<String>,
}

impl DedupLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-seeded with identifiers from a prior dataset
    pub fn seeded(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Returns true if the identifier was already captured this run
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Admits an identifier; returns false if it was already present
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    /// Number of identifiers captured so far
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if no identifiers have been captured
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger() {
        let ledger = DedupLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("SKU-1"));
    }

    #[test]
    fn test_insert_and_contains() {
        let mut ledger = DedupLedger::new();

        assert!(ledger.insert("SKU-1"));
        assert!(ledger.contains("SKU-1"));
        assert_eq!(ledger.len(), 1);

        // A repeat insert reports the duplicate
        assert!(!ledger.insert("SKU-1"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_seeded_ledger() {
        let ledger = DedupLedger::seeded(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("A"));
        assert!(ledger.contains("B"));
        assert!(!ledger.contains("C"));
    }
}
