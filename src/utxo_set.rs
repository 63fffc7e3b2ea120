//! Unspent output set
//!
//! [`UtxoSet`] tracks the outputs this node has touched in memory: created
//! outputs as [`OutputStatus::Unspent`] and consumed ones as
//! [`OutputStatus::Spent`]. Anything it does not track is resolved through a
//! [`UtxoLookup`], the seam to persistent storage.
//!
//! Block connection runs against a [`UtxoOverlay`], a copy-on-write view
//! that records the block's changes without touching the base set. Only a
//! fully connected block commits its overlay into a new set.
//!
//! ```text
//! ┌─────────────────┐
//! │  UtxoOverlay    │  ← changes made by the block being connected
//! └────────┬────────┘
//!          │ fallback
//! ┌────────▼────────┐
//! │  UtxoSet        │  ← in-memory tip state
//! └────────┬────────┘
//!          │ fallback
//! ┌────────▼────────┐
//! │  UtxoLookup     │  ← persistent storage
//! └─────────────────┘
//! ```

use crate::types::{Hash, Outpoint, Output, OutputStatus, Transaction};
use std::collections::HashMap;

/// Resolves outpoints the in-memory set does not track.
///
/// Implementations may block on I/O; the core imposes no timeout.
pub trait UtxoLookup {
    fn lookup(&self, outpoint: &Outpoint) -> OutputStatus;
}

impl<F> UtxoLookup for F
where
    F: Fn(&Outpoint) -> OutputStatus,
{
    fn lookup(&self, outpoint: &Outpoint) -> OutputStatus {
        self(outpoint)
    }
}

/// A plain map of unspent outputs, e.g. a snapshot loaded from disk.
impl UtxoLookup for HashMap<Outpoint, Output> {
    fn lookup(&self, outpoint: &Outpoint) -> OutputStatus {
        match self.get(outpoint) {
            Some(output) => OutputStatus::Unspent(output.clone()),
            None => OutputStatus::NoOutput,
        }
    }
}

/// Lookup that knows nothing; every untracked outpoint is an orphan.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStorage;

impl UtxoLookup for NoStorage {
    fn lookup(&self, _outpoint: &Outpoint) -> OutputStatus {
        OutputStatus::NoOutput
    }
}

/// Output statuses tracked in memory, in front of a [`UtxoLookup`].
///
/// `Spent` markers accumulate as blocks connect; they shadow outputs that
/// storage may still report as unspent. The single writer that owns storage
/// should periodically call [`UtxoSet::take_spent`], delete the returned
/// outpoints from storage, and keep the pruned set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    entries: HashMap<Outpoint, OutputStatus>,
}

impl UtxoSet {
    /// Empty set that defers every lookup to storage.
    pub fn as_database() -> Self {
        Self::default()
    }

    /// Set seeded with known unspent outputs.
    pub fn from_unspent(outputs: impl IntoIterator<Item = (Outpoint, Output)>) -> Self {
        UtxoSet {
            entries: outputs
                .into_iter()
                .map(|(outpoint, output)| (outpoint, OutputStatus::Unspent(output)))
                .collect(),
        }
    }

    /// Status of `outpoint`, consulting `lookup` when it is not tracked here.
    pub fn get<L: UtxoLookup + ?Sized>(&self, lookup: &L, outpoint: &Outpoint) -> OutputStatus {
        match self.entries.get(outpoint) {
            Some(status) => status.clone(),
            None => lookup.lookup(outpoint),
        }
    }

    /// Consume `tx`'s inputs and add its outputs under `tx_hash`.
    pub fn handle_transaction<L: UtxoLookup + ?Sized>(
        &mut self,
        lookup: &L,
        tx_hash: &Hash,
        tx: &Transaction,
    ) {
        for input in &tx.inputs {
            if let OutputStatus::Unspent(_) = self.get(lookup, input) {
                self.entries.insert(*input, OutputStatus::Spent);
            }
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            self.entries.insert(
                Outpoint::new(*tx_hash, index as u32),
                OutputStatus::Unspent(output.clone()),
            );
        }
    }

    /// Tracked entries, spent ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&Outpoint, &OutputStatus)> {
        self.entries.iter()
    }

    /// Tracked unspent outputs.
    pub fn unspent(&self) -> impl Iterator<Item = (&Outpoint, &Output)> {
        self.entries.iter().filter_map(|(outpoint, status)| match status {
            OutputStatus::Unspent(output) => Some((outpoint, output)),
            _ => None,
        })
    }

    /// Remove every `Spent` marker and return the outpoints, sorted.
    ///
    /// The caller must delete them from storage before using the pruned set
    /// against that storage again.
    pub fn take_spent(&mut self) -> Vec<Outpoint> {
        let mut spent: Vec<Outpoint> = self
            .entries
            .iter()
            .filter(|(_, status)| matches!(status, OutputStatus::Spent))
            .map(|(outpoint, _)| *outpoint)
            .collect();
        for outpoint in &spent {
            self.entries.remove(outpoint);
        }
        spent.sort();
        spent
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy-on-write view over a [`UtxoSet`].
#[derive(Debug)]
pub struct UtxoOverlay<'a> {
    base: &'a UtxoSet,
    changes: HashMap<Outpoint, OutputStatus>,
}

impl<'a> UtxoOverlay<'a> {
    pub fn new(base: &'a UtxoSet) -> Self {
        UtxoOverlay {
            base,
            changes: HashMap::new(),
        }
    }

    pub fn get<L: UtxoLookup + ?Sized>(&self, lookup: &L, outpoint: &Outpoint) -> OutputStatus {
        match self.changes.get(outpoint) {
            Some(status) => status.clone(),
            None => self.base.get(lookup, outpoint),
        }
    }

    /// Same contract as [`UtxoSet::handle_transaction`], recorded in the overlay.
    pub fn handle_transaction<L: UtxoLookup + ?Sized>(
        &mut self,
        lookup: &L,
        tx_hash: &Hash,
        tx: &Transaction,
    ) {
        for input in &tx.inputs {
            if let OutputStatus::Unspent(_) = self.get(lookup, input) {
                self.changes.insert(*input, OutputStatus::Spent);
            }
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            self.changes.insert(
                Outpoint::new(*tx_hash, index as u32),
                OutputStatus::Unspent(output.clone()),
            );
        }
    }

    /// Number of outpoints changed so far.
    pub fn changes_len(&self) -> usize {
        self.changes.len()
    }

    /// New set: the base with this overlay's changes applied. The base is
    /// copied, so its size should be kept bounded with
    /// [`UtxoSet::take_spent`].
    pub fn commit(self) -> UtxoSet {
        let mut entries = self.base.entries.clone();
        entries.extend(self.changes);
        UtxoSet { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lock, Spend};

    fn output(amount: u64) -> Output {
        Output {
            lock: Lock::PK([7u8; 32]),
            spend: Spend::zen(amount),
        }
    }

    fn spending(inputs: Vec<Outpoint>, outputs: Vec<Output>) -> Transaction {
        Transaction {
            inputs,
            outputs,
            witnesses: vec![],
            contract: None,
        }
    }

    #[test]
    fn test_untracked_falls_back_to_lookup() {
        let stored = Outpoint::new([1u8; 32], 0);
        let mut storage = HashMap::new();
        storage.insert(stored, output(5));

        let set = UtxoSet::as_database();
        assert_eq!(set.get(&storage, &stored), OutputStatus::Unspent(output(5)));
        assert_eq!(
            set.get(&storage, &Outpoint::new([2u8; 32], 0)),
            OutputStatus::NoOutput
        );
    }

    #[test]
    fn test_handle_transaction_spends_and_creates() {
        let prev = Outpoint::new([1u8; 32], 0);
        let mut set = UtxoSet::from_unspent([(prev, output(10))]);
        let tx = spending(vec![prev], vec![output(4), output(6)]);
        let tx_hash = tx.hash();

        set.handle_transaction(&NoStorage, &tx_hash, &tx);

        assert_eq!(set.get(&NoStorage, &prev), OutputStatus::Spent);
        assert_eq!(
            set.get(&NoStorage, &Outpoint::new(tx_hash, 1)),
            OutputStatus::Unspent(output(6))
        );
        assert_eq!(set.unspent().count(), 2);
    }

    #[test]
    fn test_spend_from_storage_is_tracked_locally() {
        let prev = Outpoint::new([1u8; 32], 3);
        let storage = move |outpoint: &Outpoint| {
            if *outpoint == prev {
                OutputStatus::Unspent(output(1))
            } else {
                OutputStatus::NoOutput
            }
        };
        let mut set = UtxoSet::as_database();
        let tx = spending(vec![prev], vec![output(1)]);
        set.handle_transaction(&storage, &tx.hash(), &tx);
        assert_eq!(set.get(&storage, &prev), OutputStatus::Spent);
    }

    #[test]
    fn test_overlay_leaves_base_untouched() {
        let prev = Outpoint::new([1u8; 32], 0);
        let base = UtxoSet::from_unspent([(prev, output(10))]);
        let tx = spending(vec![prev], vec![output(10)]);

        let mut overlay = UtxoOverlay::new(&base);
        overlay.handle_transaction(&NoStorage, &tx.hash(), &tx);

        assert_eq!(overlay.get(&NoStorage, &prev), OutputStatus::Spent);
        assert_eq!(base.get(&NoStorage, &prev), OutputStatus::Unspent(output(10)));
        assert_eq!(overlay.changes_len(), 2);

        let committed = overlay.commit();
        assert_eq!(committed.get(&NoStorage, &prev), OutputStatus::Spent);
        assert_eq!(
            committed.get(&NoStorage, &Outpoint::new(tx.hash(), 0)),
            OutputStatus::Unspent(output(10))
        );
    }

    #[test]
    fn test_overlay_intra_block_spend() {
        let base = UtxoSet::as_database();
        let mut overlay = UtxoOverlay::new(&base);

        let first = spending(vec![], vec![output(3)]);
        let first_hash = first.hash();
        overlay.handle_transaction(&NoStorage, &first_hash, &first);

        let created = Outpoint::new(first_hash, 0);
        let second = spending(vec![created], vec![output(3)]);
        overlay.handle_transaction(&NoStorage, &second.hash(), &second);

        assert_eq!(overlay.get(&NoStorage, &created), OutputStatus::Spent);
    }

    #[test]
    fn test_take_spent_prunes_markers_only() {
        let a = Outpoint::new([1u8; 32], 0);
        let b = Outpoint::new([1u8; 32], 1);
        let mut set = UtxoSet::from_unspent([(a, output(4)), (b, output(6))]);
        let tx = spending(vec![b, a], vec![output(10)]);
        let tx_hash = tx.hash();
        set.handle_transaction(&NoStorage, &tx_hash, &tx);

        assert_eq!(set.take_spent(), vec![a, b]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&NoStorage, &a), OutputStatus::NoOutput);
        assert_eq!(
            set.get(&NoStorage, &Outpoint::new(tx_hash, 0)),
            OutputStatus::Unspent(output(10))
        );
        assert!(set.take_spent().is_empty());
    }
}
