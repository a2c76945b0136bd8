// Welcome to
// __________         __    __  .__                               __
// \______   \_____ _/  |__/  |_|  |   ____   ______ ____ _____  |  | __ ____
//  |    |  _/\__  \\   __\   __\  | _/ __ \ /  ___//    \\__  \ |  |/ // __ \
//  |    |   \ / __ \|  |  |  | |  |_\  ___/ \___ \|   |  \/ __ \|    <\  ___/
//  |________/(______/__|  |__| |____/\_____>______>___|__(______/__|__\\_____>
//
// The snake plans a path to the closest food with A*, looks for rivals that
// would meet it head-on at its next cell, and re-plans once around them.
// For more info see docs.battlesnake.com

use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::policy::{self, Decision, DecisionError, DecisionSource};
use crate::snapshot::BoardSnapshot;
use crate::types::{Battlesnake, Board, Coord, Direction, Game};

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        Bot {
            config,
            debug_logger: DebugLogger::disabled(),
        }
    }

    /// Attaches a debug logger that records every move decision
    pub fn with_debug_logger(mut self, debug_logger: DebugLogger) -> Self {
        self.debug_logger = debug_logger;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "ksiopiolosz-aterlo",
            "color": "#00DEAD",
            "head": "default",
            "tail": "default",
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, game: &Game, _turn: &i32, _board: &Board, _you: &Battlesnake) {
        info!("GAME START {}", game.id);
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self, game: &Game, turn: &i32, _board: &Board, _you: &Battlesnake) {
        info!("GAME OVER {} after {} turns", game.id, turn);
    }

    /// Computes and returns the next move
    /// Corresponds to POST /move endpoint
    ///
    /// The A* decision runs on tokio's blocking pool with a deadline equal to
    /// the effective time budget. If it does not come back in time the bot
    /// answers with a random legal move instead.
    ///
    /// # Returns
    /// * `Value` - JSON response containing the chosen move direction
    pub async fn get_move(&self, _game: &Game, turn: &i32, board: &Board, you: &Battlesnake) -> Value {
        let start_time = Instant::now();
        let turn = *turn;

        info!("Turn {}: Computing move", turn);

        let snapshot = match BoardSnapshot::from_request(board, you) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Turn {}: Rejected board ({}), moving blind", turn, e);
                let direction = Self::last_resort_move(board, you);
                return json!({ "move": direction.as_str() });
            }
        };

        let budget = Duration::from_millis(self.config.timing.effective_budget_ms());
        let deadline = start_time + budget;
        let config = self.config.clone();
        let task_snapshot = snapshot.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let mut rng = Self::turn_rng(&config, turn);
            policy::decide_move(&task_snapshot, &config, Some(deadline), &mut rng)
        });

        let outcome = match tokio::time::timeout(budget, handle).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                error!("Turn {}: Decision task failed: {}", turn, e);
                None
            }
            Err(_) => {
                warn!("Turn {}: Decision exceeded {}ms budget", turn, budget.as_millis());
                None
            }
        };

        let (direction, source) = match outcome {
            Some(Ok(decision)) => {
                Self::log_decision(turn, &decision, start_time);
                (decision.direction, Some(decision.source))
            }
            Some(Err(DecisionError::NoLegalMove { head })) => {
                warn!("Turn {}: Boxed in at {}, accepting the loss", turn, head);
                (Self::last_resort_move(board, you), None)
            }
            None => {
                let mut rng = Self::turn_rng(&self.config, turn);
                match policy::random_legal_move(&snapshot, &mut rng) {
                    Ok(direction) => (direction, None),
                    Err(_) => (Self::last_resort_move(board, you), None),
                }
            }
        };

        self.debug_logger
            .log_move(turn, board.clone(), you.clone(), direction, source);

        json!({ "move": direction.as_str() })
    }

    fn log_decision(turn: i32, decision: &Decision, start_time: Instant) {
        info!(
            "Turn {}: Chose {} ({}, planner runs: {}, expansions: {}, threats: {:?}, time: {}ms)",
            turn,
            decision.direction.as_str(),
            decision.source,
            decision.stats.planner_runs,
            decision.stats.expansions,
            decision.stats.threats,
            start_time.elapsed().as_millis()
        );
        if decision.source == DecisionSource::Replanned {
            info!("Turn {}: Re-planned around contested cells", turn);
        }
    }

    /// Per-turn rng, reproducible when a seed is configured
    fn turn_rng(config: &Config, turn: i32) -> StdRng {
        match config.fallback.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ turn as u64),
            None => StdRng::from_os_rng(),
        }
    }

    /// Move used when no legal move exists: stay on the board if at all possible
    fn last_resort_move(board: &Board, you: &Battlesnake) -> Direction {
        let head = you.body.first().copied().unwrap_or(you.head);
        Direction::all()
            .iter()
            .copied()
            .find(|dir| Self::in_bounds(&dir.apply(&head), board))
            .unwrap_or(Direction::Up)
    }

    fn in_bounds(coord: &Coord, board: &Board) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < board.width && coord.y < board.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_rng_is_seeded_per_turn() {
        use rand::Rng;

        let mut config = Config::default_hardcoded();
        config.fallback.rng_seed = Some(1234);

        let a: u64 = Bot::turn_rng(&config, 5).random();
        let b: u64 = Bot::turn_rng(&config, 5).random();
        let c: u64 = Bot::turn_rng(&config, 6).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_last_resort_prefers_in_bounds() {
        let you = Battlesnake {
            id: "me".to_string(),
            name: "me".to_string(),
            health: 10,
            body: vec![Coord::new(0, 10)],
            head: Coord::new(0, 10),
            length: 1,
            latency: "0".to_string(),
            shout: None,
        };
        let board = Board {
            height: 11,
            width: 11,
            food: vec![],
            snakes: vec![you.clone()],
            hazards: vec![],
        };

        assert_eq!(Bot::last_resort_move(&board, &you), Direction::Down);
    }
}
