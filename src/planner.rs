// A* search from an agent's current body to the nearest reachable food
//
// Frontier ties on f = g + h are broken FIFO by insertion order, so a given
// snapshot and obstacle set always produce the same path.

use log::debug;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use crate::config::SearchConfig;
use crate::heuristic::{Heuristic, HeuristicCache};
use crate::node::{successors, NodeArena, NodeId, SearchNode, StateKey};
use crate::snapshot::{BoardSnapshot, ObstacleSet};
use crate::types::{Coord, Direction};

/// How often (in pops) the wall-clock deadline is checked
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// Termination bounds for one search
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_expansions: usize,
    pub deadline: Option<Instant>,
}

impl SearchLimits {
    pub fn new(max_expansions: usize) -> Self {
        SearchLimits {
            max_expansions,
            deadline: None,
        }
    }

    pub fn from_config(config: &SearchConfig, deadline: Option<Instant>) -> Self {
        SearchLimits {
            max_expansions: config.max_expansions,
            deadline,
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits::new(2500)
    }
}

/// Counters collected during one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub expanded: usize,
    pub generated: usize,
    pub max_frontier: usize,
    /// Children pushed again because they improved on an already expanded state
    pub reinserted: usize,
    /// Frontier entries dropped on pop because their state was already expanded as cheaply
    pub stale_skipped: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// A successful search result, root first
#[derive(Debug, Clone)]
pub struct PlannedPath {
    pub nodes: Vec<SearchNode>,
    /// False when the expansion bound cut the search short
    pub reached_food: bool,
    pub stats: SearchStats,
    /// Every expanded (state, g) pair in order, when recording was requested
    pub expansion_log: Vec<(StateKey, u32)>,
}

impl PlannedPath {
    /// Number of moves on the path, the root excluded
    pub fn steps(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn truncated(&self) -> bool {
        !self.reached_food
    }

    /// The node reached after the first move
    pub fn first_step(&self) -> Option<&SearchNode> {
        self.nodes.get(1)
    }

    pub fn first_move(&self) -> Option<Direction> {
        self.first_step().and_then(|n| n.last_move)
    }

    pub fn moves(&self) -> Vec<Direction> {
        self.nodes.iter().filter_map(|n| n.last_move).collect()
    }

    pub fn heads(&self) -> Vec<Coord> {
        self.nodes.iter().map(|n| n.head).collect()
    }
}

/// Why a search produced no path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The starting body had no cells
    #[error("cannot plan for an empty body")]
    EmptyBody,
    /// The frontier emptied before any food was reached
    #[error("no path to food after {} expansions", stats.expanded)]
    NoPathFound { stats: SearchStats },
    /// The wall-clock deadline passed mid-search
    #[error("deadline exceeded after {} expansions", stats.expanded)]
    DeadlineExceeded { stats: SearchStats },
}

impl PlanError {
    /// Counters gathered before the search gave up, if it got started
    pub fn stats(&self) -> Option<&SearchStats> {
        match self {
            PlanError::EmptyBody => None,
            PlanError::NoPathFound { stats } | PlanError::DeadlineExceeded { stats } => Some(stats),
        }
    }
}

/// A* planner over hypothetical body positions on a frozen obstacle set
pub struct AStarPlanner<'a> {
    snapshot: &'a BoardSnapshot,
    obstacles: &'a ObstacleSet,
    heuristic: Heuristic,
    limits: SearchLimits,
    no_food: u32,
    record_expansions: bool,
}

impl<'a> AStarPlanner<'a> {
    pub fn new(snapshot: &'a BoardSnapshot, obstacles: &'a ObstacleSet, limits: SearchLimits) -> Self {
        AStarPlanner {
            snapshot,
            obstacles,
            heuristic: Heuristic::NearestFood,
            limits,
            no_food: 9999,
            record_expansions: false,
        }
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_no_food_sentinel(mut self, no_food: u32) -> Self {
        self.no_food = no_food;
        self
    }

    /// Keeps a log of every expansion in the returned path
    pub fn record_expansions(mut self) -> Self {
        self.record_expansions = true;
        self
    }

    /// Searches from `body` (head first) to the closest reachable food
    pub fn plan(&self, body: &[Coord]) -> Result<PlannedPath, PlanError> {
        if body.is_empty() {
            return Err(PlanError::EmptyBody);
        }

        let mut stats = SearchStats::default();
        if self.limits.deadline_passed() {
            return Err(PlanError::DeadlineExceeded { stats });
        }

        let mut arena = NodeArena::new();
        let mut cache = HeuristicCache::new();
        let mut frontier: BinaryHeap<Reverse<(u32, u64, NodeId)>> = BinaryHeap::new();
        let mut visited: HashMap<StateKey, u32> = HashMap::new();
        let mut expansion_log = Vec::new();
        let mut sequence: u64 = 0;
        let mut pops: usize = 0;

        let mut root = SearchNode::root(body);
        let root_h = cache.lookup(self.heuristic, &root, self.snapshot, self.no_food);
        root.h = Some(root_h);
        let root_id = arena.push(root);
        frontier.push(Reverse((root_h, sequence, root_id)));

        while let Some(Reverse((_, _, id))) = frontier.pop() {
            let (g, head, key) = {
                let node = arena.get(id);
                (node.g, node.head, node.state_key())
            };

            if visited.get(&key).map_or(false, |&best| best <= g) {
                stats.stale_skipped += 1;
                continue;
            }

            pops += 1;
            if pops % DEADLINE_CHECK_INTERVAL == 0 && self.limits.deadline_passed() {
                Self::finish_stats(&mut stats, &cache);
                return Err(PlanError::DeadlineExceeded { stats });
            }

            let reached_food = self.snapshot.is_food(&head);
            if reached_food || stats.expanded >= self.limits.max_expansions {
                if !reached_food {
                    debug!(
                        "A* expansion bound ({}) hit, settling for path to {}",
                        self.limits.max_expansions, head
                    );
                }
                Self::finish_stats(&mut stats, &cache);
                return Ok(PlannedPath {
                    nodes: arena.path_to(id),
                    reached_food,
                    stats,
                    expansion_log,
                });
            }

            visited.insert(key.clone(), g);
            if self.record_expansions {
                expansion_log.push((key, g));
            }
            stats.expanded += 1;

            for mut child in successors(&arena, id, self.snapshot, self.obstacles) {
                stats.generated += 1;

                match visited.get(&child.state_key()) {
                    Some(&best) if best <= child.g => continue,
                    // Only reachable with an inconsistent heuristic
                    Some(&best) => {
                        debug!(
                            "Cheaper route to expanded state at {} ({} < {}), reinserting",
                            child.head, child.g, best
                        );
                        stats.reinserted += 1;
                    }
                    None => {}
                }

                let h = cache.lookup(self.heuristic, &child, self.snapshot, self.no_food);
                child.h = Some(h);
                let f = child.g.saturating_add(h);
                let child_id = arena.push(child);

                sequence += 1;
                frontier.push(Reverse((f, sequence, child_id)));
            }

            stats.max_frontier = stats.max_frontier.max(frontier.len());
        }

        Self::finish_stats(&mut stats, &cache);
        Err(PlanError::NoPathFound { stats })
    }

    fn finish_stats(stats: &mut SearchStats, cache: &HeuristicCache) {
        stats.cache_hits = cache.hits();
        stats.cache_misses = cache.misses();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Agent;
    use std::time::Duration;

    fn single_agent(width: i32, height: i32, body: Vec<Coord>, food: Vec<Coord>) -> BoardSnapshot {
        BoardSnapshot::new(width, height, food, vec![Agent::new("me", body)], 0).unwrap()
    }

    #[test]
    fn test_straight_line_to_food() {
        let snapshot = single_agent(5, 5, vec![Coord::new(2, 2)], vec![Coord::new(2, 4)]);
        let obstacles = ObstacleSet::from_snapshot(&snapshot);
        let path = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default())
            .plan(&snapshot.controlled().body)
            .unwrap();

        assert!(path.reached_food);
        assert_eq!(path.steps(), 2);
        assert_eq!(path.moves(), vec![Direction::Up, Direction::Up]);
        assert_eq!(path.nodes[0].parent, None);
    }

    #[test]
    fn test_root_on_food_returns_single_node() {
        let snapshot = single_agent(5, 5, vec![Coord::new(2, 2)], vec![Coord::new(2, 2)]);
        let obstacles = ObstacleSet::default();
        let path = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default())
            .plan(&[Coord::new(2, 2)])
            .unwrap();

        assert_eq!(path.nodes.len(), 1);
        assert_eq!(path.first_move(), None);
    }

    #[test]
    fn test_detours_around_wall() {
        // A rival body forms a wall at x = 2 for y in 0..=3
        let wall: Vec<Coord> = (0..=3).map(|y| Coord::new(2, y)).collect();
        let snapshot = BoardSnapshot::new(
            5,
            5,
            vec![Coord::new(4, 0)],
            vec![Agent::new("me", vec![Coord::new(0, 0)]), Agent::new("wall", wall)],
            0,
        )
        .unwrap();
        let obstacles = ObstacleSet::from_snapshot(&snapshot);
        let path = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default())
            .plan(&[Coord::new(0, 0)])
            .unwrap();

        // Up to y = 4, across, and back down
        assert_eq!(path.steps(), 12);
        assert!(path.heads().iter().all(|c| !obstacles.contains(c) || *c == Coord::new(0, 0)));
    }

    #[test]
    fn test_unreachable_food_is_no_path() {
        let snapshot = BoardSnapshot::new(
            5,
            5,
            vec![Coord::new(4, 4)],
            vec![
                Agent::new("me", vec![Coord::new(0, 0)]),
                Agent::new("fence", vec![Coord::new(3, 4), Coord::new(3, 3), Coord::new(4, 3)]),
            ],
            0,
        )
        .unwrap();
        let obstacles = ObstacleSet::from_snapshot(&snapshot);
        let result = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default()).plan(&[Coord::new(0, 0)]);

        match result {
            Err(PlanError::NoPathFound { stats }) => assert!(stats.expanded > 0),
            other => panic!("expected NoPathFound, got {:?}", other),
        }
    }

    #[test]
    fn test_expansion_bound_settles_for_partial_path() {
        let snapshot = single_agent(20, 20, vec![Coord::new(0, 0)], vec![Coord::new(19, 19)]);
        let obstacles = ObstacleSet::default();
        let path = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::new(3))
            .plan(&[Coord::new(0, 0)])
            .unwrap();

        assert!(path.truncated());
        assert_eq!(path.stats.expanded, 3);
        assert!(path.steps() >= 1);
    }

    #[test]
    fn test_past_deadline_aborts() {
        let snapshot = single_agent(5, 5, vec![Coord::new(0, 0)], vec![Coord::new(4, 4)]);
        let obstacles = ObstacleSet::default();
        let limits = SearchLimits {
            max_expansions: 2500,
            deadline: Some(Instant::now() - Duration::from_millis(1)),
        };
        let result = AStarPlanner::new(&snapshot, &obstacles, limits).plan(&[Coord::new(0, 0)]);
        assert!(matches!(result, Err(PlanError::DeadlineExceeded { .. })));
    }

    #[test]
    fn test_plan_error_messages() {
        let stats = SearchStats {
            expanded: 17,
            ..SearchStats::default()
        };
        assert_eq!(PlanError::EmptyBody.to_string(), "cannot plan for an empty body");
        assert_eq!(
            PlanError::NoPathFound { stats: stats.clone() }.to_string(),
            "no path to food after 17 expansions"
        );
        assert_eq!(
            PlanError::DeadlineExceeded { stats }.to_string(),
            "deadline exceeded after 17 expansions"
        );
    }

    #[test]
    fn test_empty_body_rejected() {
        let snapshot = single_agent(5, 5, vec![Coord::new(0, 0)], vec![Coord::new(4, 4)]);
        let obstacles = ObstacleSet::default();
        let result = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default()).plan(&[]);
        assert_eq!(result.unwrap_err(), PlanError::EmptyBody);
    }

    #[test]
    fn test_ties_resolve_fifo_in_expansion_order() {
        // Food diagonal from the head: left/right/down/up order means "right"
        // is generated before "up" and wins the tie.
        let snapshot = single_agent(5, 5, vec![Coord::new(0, 0)], vec![Coord::new(1, 1)]);
        let obstacles = ObstacleSet::default();
        let planner = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default());

        let first = planner.plan(&[Coord::new(0, 0)]).unwrap();
        let second = planner.plan(&[Coord::new(0, 0)]).unwrap();
        assert_eq!(first.moves(), vec![Direction::Right, Direction::Up]);
        assert_eq!(first.heads(), second.heads());
    }

    #[test]
    fn test_no_state_expanded_twice_without_improvement() {
        let snapshot = single_agent(
            8,
            8,
            vec![Coord::new(0, 0)],
            vec![Coord::new(7, 7)],
        );
        let obstacles = ObstacleSet::default();
        let path = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default())
            .with_heuristic(Heuristic::Zero)
            .record_expansions()
            .plan(&[Coord::new(0, 0)])
            .unwrap();

        let mut best: HashMap<StateKey, u32> = HashMap::new();
        for (key, g) in &path.expansion_log {
            if let Some(&previous) = best.get(key) {
                assert!(*g < previous, "state re-expanded without improvement");
            }
            best.insert(key.clone(), *g);
        }
        assert_eq!(path.steps(), 14);
    }

    #[test]
    fn test_cheaper_route_to_expanded_state_is_reinserted() {
        // Row y=0 is S C X F; a rival at (3,1),(3,2) leaves X as the only way
        // into F. Overestimating C sends the search round the top first, so X
        // is expanded at g=4 before C offers it at g=2.
        let snapshot = BoardSnapshot::new(
            4,
            3,
            vec![Coord::new(3, 0)],
            vec![
                Agent::new("me", vec![Coord::new(0, 0)]),
                Agent::new("rival", vec![Coord::new(3, 1), Coord::new(3, 2)]),
            ],
            0,
        )
        .unwrap();
        let obstacles = ObstacleSet::from_snapshot(&snapshot);
        let path = AStarPlanner::new(&snapshot, &obstacles, SearchLimits::default())
            .with_heuristic(Heuristic::Penalized {
                cell: Coord::new(1, 0),
                penalty: 4,
            })
            .record_expansions()
            .plan(&[Coord::new(0, 0)])
            .unwrap();

        assert!(path.stats.reinserted > 0);
        assert!(path.reached_food);
        assert_eq!(path.steps(), 3);
        assert_eq!(path.moves(), vec![Direction::Right; 3]);

        let x = StateKey::of(&[Coord::new(2, 0)]);
        let expansions_of_x: Vec<u32> = path
            .expansion_log
            .iter()
            .filter(|(key, _)| *key == x)
            .map(|(_, g)| *g)
            .collect();
        assert_eq!(expansions_of_x, vec![4, 2]);
    }
}
