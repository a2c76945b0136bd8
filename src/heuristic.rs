// Heuristic estimates and their per-episode memo table

use std::collections::HashMap;

use crate::node::{SearchNode, StateKey};
use crate::snapshot::BoardSnapshot;
#[cfg(test)]
use crate::types::Coord;

/// Selects the estimate used to order the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Manhattan distance from the head to the closest food
    NearestFood,
    /// Always zero; turns A* into uniform-cost search
    Zero,
    /// Zero except at one cell; inconsistent, used to force reinsertion
    #[cfg(test)]
    Penalized { cell: Coord, penalty: u32 },
}

impl Heuristic {
    /// Evaluates the heuristic for `node`
    ///
    /// With no food on the board `NearestFood` reports `no_food` instead of failing.
    pub fn estimate(&self, node: &SearchNode, snapshot: &BoardSnapshot, no_food: u32) -> u32 {
        match self {
            Heuristic::NearestFood => snapshot
                .food
                .iter()
                .map(|food| node.head.manhattan(food))
                .min()
                .unwrap_or(no_food),
            Heuristic::Zero => 0,
            #[cfg(test)]
            Heuristic::Penalized { cell, penalty } => {
                if node.head == *cell {
                    *penalty
                } else {
                    0
                }
            }
        }
    }
}

/// Memoizes heuristic values per (heuristic, state) for one episode
#[derive(Debug, Default)]
pub struct HeuristicCache {
    tables: HashMap<Heuristic, HashMap<StateKey, u32>>,
    hits: usize,
    misses: usize,
}

impl HeuristicCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `node`'s state or computes and stores it
    pub fn lookup(
        &mut self,
        heuristic: Heuristic,
        node: &SearchNode,
        snapshot: &BoardSnapshot,
        no_food: u32,
    ) -> u32 {
        let table = self.tables.entry(heuristic).or_default();
        let key = node.state_key();
        if let Some(&h) = table.get(&key) {
            self.hits += 1;
            return h;
        }

        let h = heuristic.estimate(node, snapshot, no_food);
        table.insert(key, h);
        self.misses += 1;
        h
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
