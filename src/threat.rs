// Head-to-head threat prediction
//
// A rival at least as long as us, whose head touches our next cell, is assumed
// to chase its own nearest food. If its A* path starts on that same cell, the
// cell is marked as a threat.

use log::{debug, info};
use std::cmp::Reverse;
use std::collections::HashSet;

use crate::planner::{AStarPlanner, SearchLimits};
use crate::snapshot::{Agent, BoardSnapshot, ObstacleSet};
use crate::types::Coord;

/// Outcome of one threat prediction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatReport {
    /// Cells a dangerous rival is predicted to enter next turn
    pub threats: HashSet<Coord>,
    /// Rivals adjacent to the contested cell and long enough to matter
    pub rivals_considered: usize,
    /// Rivals whose path was actually searched
    pub rivals_searched: usize,
    /// Expansions spent across all rival searches
    pub expansions: usize,
}

impl ThreatReport {
    pub fn is_threatened(&self) -> bool {
        !self.threats.is_empty()
    }
}

pub struct ThreatPredictor<'a> {
    snapshot: &'a BoardSnapshot,
    obstacles: &'a ObstacleSet,
    limits: SearchLimits,
    max_rivals: usize,
    no_food: u32,
}

impl<'a> ThreatPredictor<'a> {
    pub fn new(
        snapshot: &'a BoardSnapshot,
        obstacles: &'a ObstacleSet,
        limits: SearchLimits,
        max_rivals: usize,
    ) -> Self {
        ThreatPredictor {
            snapshot,
            obstacles,
            limits,
            max_rivals,
            no_food: 9999,
        }
    }

    pub fn with_no_food_sentinel(mut self, no_food: u32) -> Self {
        self.no_food = no_food;
        self
    }

    /// Rivals that could contest `first_step`, longest first
    fn contenders(&self, first_step: Coord, previous_head: Coord) -> Vec<&'a Agent> {
        let snapshot: &'a BoardSnapshot = self.snapshot;
        let our_length = snapshot.controlled().len();
        let mut contenders: Vec<&'a Agent> = snapshot
            .rivals()
            .filter(|rival| rival.head() != previous_head)
            .filter(|rival| rival.head().manhattan(&first_step) == 1)
            .filter(|rival| rival.len() >= our_length)
            .collect();
        contenders.sort_by_key(|rival| Reverse(rival.len()));
        contenders
    }

    /// Predicts which rivals will move onto `first_step` next turn
    ///
    /// `previous_head` is where the controlled agent stands now. Failed rival
    /// searches count as "no threat".
    pub fn predict(&self, first_step: Coord, previous_head: Coord) -> ThreatReport {
        let contenders = self.contenders(first_step, previous_head);
        let mut report = ThreatReport {
            rivals_considered: contenders.len(),
            ..ThreatReport::default()
        };

        if contenders.len() > self.max_rivals {
            debug!(
                "{} rivals contest {}, searching only the {} longest",
                contenders.len(),
                first_step,
                self.max_rivals
            );
        }

        for rival in contenders.into_iter().take(self.max_rivals) {
            report.rivals_searched += 1;

            let planner = AStarPlanner::new(self.snapshot, self.obstacles, self.limits)
                .with_no_food_sentinel(self.no_food);
            match planner.plan(&rival.body) {
                Ok(path) => {
                    report.expansions += path.stats.expanded;
                    if path.first_step().map(|n| n.head) == Some(first_step) {
                        info!(
                            "Rival {} (length {}) is heading for {}",
                            rival.id,
                            rival.len(),
                            first_step
                        );
                        report.threats.insert(first_step);
                    }
                }
                Err(e) => {
                    debug!("Search for rival {} failed ({}), treating as no threat", rival.id, e);
                }
            }
        }

        report
    }
}
