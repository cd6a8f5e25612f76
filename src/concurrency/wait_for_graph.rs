//! Wait-for graph over transactions.

use std::collections::{HashMap, HashSet};

use crate::common::TransactionId;

/// Directed graph with an edge `A → B` whenever A is blocked on a lock B holds.
///
/// A transaction may wait on several holders at once (an exclusive request
/// against a page with many shared holders), so successors are a set.
#[derive(Debug, Default)]
pub struct WaitForGraph {
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `waiter`'s outgoing edges with edges to `holders`.
    pub fn set_waits(
        &mut self,
        waiter: TransactionId,
        holders: impl IntoIterator<Item = TransactionId>,
    ) {
        let successors: HashSet<TransactionId> =
            holders.into_iter().filter(|&h| h != waiter).collect();
        if successors.is_empty() {
            self.edges.remove(&waiter);
        } else {
            self.edges.insert(waiter, successors);
        }
    }

    /// Drop `waiter`'s outgoing edges (it was granted or gave up).
    pub fn clear_waits(&mut self, waiter: TransactionId) {
        self.edges.remove(&waiter);
    }

    /// Remove every edge touching `tid`, in either direction.
    pub fn remove_transaction(&mut self, tid: TransactionId) {
        self.edges.remove(&tid);
        self.edges.retain(|_, successors| {
            successors.remove(&tid);
            !successors.is_empty()
        });
    }

    /// Transactions `waiter` is currently blocked on.
    pub fn waiting_on(&self, waiter: TransactionId) -> Vec<TransactionId> {
        let mut holders: Vec<TransactionId> = self
            .edges
            .get(&waiter)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }

    /// Whether a path leads from `start` back to `start`.
    ///
    /// Iterative depth-first search; each node is expanded once.
    pub fn has_cycle_from(&self, start: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<TransactionId> = match self.edges.get(&start) {
            Some(successors) => successors.iter().copied().collect(),
            None => return false,
        };

        while let Some(tid) = stack.pop() {
            if tid == start {
                return true;
            }
            if !visited.insert(tid) {
                continue;
            }
            if let Some(successors) = self.edges.get(&tid) {
                stack.extend(successors.iter().copied());
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether `tid` appears anywhere in the graph.
    pub fn contains(&self, tid: TransactionId) -> bool {
        self.edges
            .iter()
            .any(|(waiter, successors)| *waiter == tid || successors.contains(&tid))
    }
}
