// Per-turn decision ladder
//
// Plan to food, check whether a rival contests the first step, re-plan once
// around it if so, and fall back to a random legal move whenever planning
// cannot produce a first step.

use log::{debug, info, warn};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::fmt;
use std::time::Instant;

use crate::config::Config;
use crate::node::{legal_moves, SearchNode};
use crate::planner::{AStarPlanner, PlanError, PlannedPath, SearchLimits};
use crate::snapshot::{BoardSnapshot, ObstacleSet};
use crate::threat::ThreatPredictor;
use crate::types::{Coord, Direction};

/// Why the policy settled for a random legal move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No food on the board, so no search was attempted
    NoFood,
    /// The frontier emptied without reaching food
    NoPath,
    /// The wall-clock deadline passed during a search
    SearchTimedOut,
    /// The plan had no first step (already standing on food)
    AlreadyOnFood,
    /// A threat was found but re-planning around it produced nothing
    ReplanFailed,
}

/// Where the returned move came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Planned,
    Replanned,
    Fallback(FallbackReason),
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionSource::Planned => write!(f, "planned"),
            DecisionSource::Replanned => write!(f, "replanned"),
            DecisionSource::Fallback(reason) => write!(f, "fallback({:?})", reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionStats {
    /// Number of A* runs for the controlled agent (rival searches excluded)
    pub planner_runs: usize,
    /// Expansions across every search this turn, rival searches included
    pub expansions: usize,
    /// Cells marked as contested by the threat predictor, sorted
    pub threats: Vec<Coord>,
    /// Length of the path the move was taken from
    pub path_steps: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub direction: Direction,
    pub source: DecisionSource,
    pub stats: DecisionStats,
}

/// The controlled agent cannot move anywhere without dying
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    #[error("no legal move from {head}")]
    NoLegalMove { head: Coord },
}

/// Picks the controlled agent's move for this turn
///
/// Only `NoLegalMove` is surfaced; every other failure degrades to a random
/// legal move drawn from `rng`.
pub fn decide_move<R: Rng + ?Sized>(
    snapshot: &BoardSnapshot,
    config: &Config,
    deadline: Option<Instant>,
    rng: &mut R,
) -> Result<Decision, DecisionError> {
    let me = snapshot.controlled();
    let head = me.head();
    let obstacles = ObstacleSet::from_snapshot(snapshot);

    let legal = legal_moves(&me.body, snapshot, &obstacles);
    if legal.is_empty() {
        warn!("No legal move from {}", head);
        return Err(DecisionError::NoLegalMove { head });
    }

    let mut stats = DecisionStats::default();

    if snapshot.food.is_empty() {
        debug!("No food on the board, skipping search");
        return fallback(&legal, head, FallbackReason::NoFood, stats, rng);
    }

    let limits = SearchLimits::from_config(&config.search, deadline);
    let path = match plan(snapshot, &obstacles, limits, config, &me.body, &mut stats) {
        Ok(path) => path,
        Err(e) => {
            info!("Planning failed ({}), moving randomly", e);
            let reason = match e {
                PlanError::DeadlineExceeded { .. } => FallbackReason::SearchTimedOut,
                PlanError::NoPathFound { .. } | PlanError::EmptyBody => FallbackReason::NoPath,
            };
            return fallback(&legal, head, reason, stats, rng);
        }
    };

    let (first_step, first_move) = match path.first_step() {
        Some(SearchNode {
            head: step,
            last_move: Some(direction),
            ..
        }) => (*step, *direction),
        _ => return fallback(&legal, head, FallbackReason::AlreadyOnFood, stats, rng),
    };

    if config.threat.enabled {
        let report = ThreatPredictor::new(snapshot, &obstacles, limits, config.threat.max_rivals)
            .with_no_food_sentinel(config.search.no_food_heuristic)
            .predict(first_step, head);
        stats.expansions += report.expansions;

        if report.is_threatened() {
            let mut threats: Vec<Coord> = report.threats.iter().copied().collect();
            threats.sort();
            stats.threats = threats;

            let avoided = obstacles.augmented(&report.threats);
            match plan(snapshot, &avoided, limits, config, &me.body, &mut stats) {
                Ok(replanned) => {
                    if let Some(direction) = replanned.first_move() {
                        stats.path_steps = Some(replanned.steps());
                        return Ok(Decision {
                            direction,
                            source: DecisionSource::Replanned,
                            stats,
                        });
                    }
                }
                Err(e) => info!("Re-plan around {:?} failed ({})", stats.threats, e),
            }

            let safe: Vec<Direction> = legal
                .iter()
                .copied()
                .filter(|dir| !report.threats.contains(&dir.apply(&head)))
                .collect();
            let pool = if safe.is_empty() { &legal } else { &safe };
            return fallback(pool, head, FallbackReason::ReplanFailed, stats, rng);
        }
    }

    stats.path_steps = Some(path.steps());
    Ok(Decision {
        direction: first_move,
        source: DecisionSource::Planned,
        stats,
    })
}

/// A uniformly random legal move, without any search
pub fn random_legal_move<R: Rng + ?Sized>(
    snapshot: &BoardSnapshot,
    rng: &mut R,
) -> Result<Direction, DecisionError> {
    let me = snapshot.controlled();
    let obstacles = ObstacleSet::from_snapshot(snapshot);
    let legal = legal_moves(&me.body, snapshot, &obstacles);
    legal
        .choose(rng)
        .copied()
        .ok_or(DecisionError::NoLegalMove { head: me.head() })
}

fn plan(
    snapshot: &BoardSnapshot,
    obstacles: &ObstacleSet,
    limits: SearchLimits,
    config: &Config,
    body: &[Coord],
    stats: &mut DecisionStats,
) -> Result<PlannedPath, PlanError> {
    stats.planner_runs += 1;
    let result = AStarPlanner::new(snapshot, obstacles, limits)
        .with_no_food_sentinel(config.search.no_food_heuristic)
        .plan(body);

    match &result {
        Ok(path) => {
            stats.expansions += path.stats.expanded;
            debug!(
                "A* {} in {} steps ({} expanded, {} generated, {} reinserted)",
                if path.reached_food { "reached food" } else { "truncated" },
                path.steps(),
                path.stats.expanded,
                path.stats.generated,
                path.stats.reinserted
            );
        }
        Err(e) => {
            if let Some(search) = e.stats() {
                stats.expansions += search.expanded;
            }
        }
    }
    result
}

fn fallback<R: Rng + ?Sized>(
    moves: &[Direction],
    head: Coord,
    reason: FallbackReason,
    stats: DecisionStats,
    rng: &mut R,
) -> Result<Decision, DecisionError> {
    let direction = moves
        .choose(rng)
        .copied()
        .ok_or(DecisionError::NoLegalMove { head })?;
    Ok(Decision {
        direction,
        source: DecisionSource::Fallback(reason),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Agent;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> Config {
        Config::default_hardcoded()
    }

    #[test]
    fn test_no_legal_move_message_names_the_head() {
        let err = DecisionError::NoLegalMove {
            head: Coord::new(2, 3),
        };
        assert_eq!(err.to_string(), "no legal move from (2, 3)");
    }

    #[test]
    fn test_plans_straight_to_food() {
        let snapshot = BoardSnapshot::new(
            5,
            5,
            vec![Coord::new(2, 4)],
            vec![Agent::new("me", vec![Coord::new(2, 2)])],
            0,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let decision = decide_move(&snapshot, &config(), None, &mut rng).unwrap();

        assert_eq!(decision.direction, Direction::Up);
        assert_eq!(decision.source, DecisionSource::Planned);
        assert_eq!(decision.stats.planner_runs, 1);
        assert_eq!(decision.stats.path_steps, Some(2));
    }

    #[test]
    fn test_no_food_skips_search() {
        let snapshot = BoardSnapshot::new(
            5,
            5,
            vec![],
            vec![Agent::new("me", vec![Coord::new(2, 2), Coord::new(2, 1)])],
            0,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let decision = decide_move(&snapshot, &config(), None, &mut rng).unwrap();

        assert_eq!(decision.source, DecisionSource::Fallback(FallbackReason::NoFood));
        assert_eq!(decision.stats.planner_runs, 0);
        assert_eq!(decision.stats.expansions, 0);
        assert_ne!(decision.direction, Direction::Down);
    }

    #[test]
    fn test_standing_on_food_falls_back() {
        let snapshot = BoardSnapshot::new(
            5,
            5,
            vec![Coord::new(2, 2)],
            vec![Agent::new("me", vec![Coord::new(2, 2)])],
            0,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let decision = decide_move(&snapshot, &config(), None, &mut rng).unwrap();

        assert_eq!(decision.source, DecisionSource::Fallback(FallbackReason::AlreadyOnFood));
        assert_eq!(decision.stats.planner_runs, 1);
    }

    #[test]
    fn test_expired_deadline_falls_back() {
        let snapshot = BoardSnapshot::new(
            5,
            5,
            vec![Coord::new(4, 4)],
            vec![Agent::new("me", vec![Coord::new(0, 0)])],
            0,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let decision = decide_move(&snapshot, &config(), Some(Instant::now()), &mut rng).unwrap();

        assert_eq!(decision.source, DecisionSource::Fallback(FallbackReason::SearchTimedOut));
        assert!(matches!(decision.direction, Direction::Up | Direction::Right));
    }

    #[test]
    fn test_random_legal_move_is_seed_reproducible() {
        let snapshot = BoardSnapshot::new(
            7,
            7,
            vec![],
            vec![Agent::new("me", vec![Coord::new(3, 3)])],
            0,
        )
        .unwrap();

        let a = random_legal_move(&snapshot, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = random_legal_move(&snapshot, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decision_source_display() {
        assert_eq!(DecisionSource::Planned.to_string(), "planned");
        assert_eq!(
            DecisionSource::Fallback(FallbackReason::NoPath).to_string(),
            "fallback(NoPath)"
        );
    }
}
