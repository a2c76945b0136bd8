// Replay module for analyzing historical game states and debugging decision-making
//
// This module provides functionality to:
// 1. Parse JSONL debug logs
// 2. Re-run the decision policy on historical states
// 3. Compare logged vs replayed moves
// 4. Generate analysis reports

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::policy::{self, DecisionError, DecisionSource};
use crate::snapshot::BoardSnapshot;
use crate::types::{Battlesnake, Board, Direction};

/// Represents a single log entry from the debug JSONL file
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogEntry {
    pub turn: i32,
    /// Older logs lack this; the first snake on the board is assumed then
    #[serde(default)]
    pub you_id: Option<String>,
    /// The controlled snake as it was sent; may be missing from `board.snakes`
    #[serde(default)]
    pub you: Option<Battlesnake>,
    pub chosen_move: String,
    #[serde(default)]
    pub source: Option<String>,
    pub board: Board,
    pub timestamp: String,
}

/// Result of replaying a single turn
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub turn: i32,
    pub original_move: Direction,
    /// `None` when the snake was boxed in on replay
    pub replayed_move: Option<Direction>,
    pub replayed_source: Option<DecisionSource>,
    pub matches: bool,
    pub expansions: usize,
    pub computation_time_ms: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_turns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
    pub fallbacks: usize,
}

/// Replay engine for analyzing debug logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
    seed: u64,
}

impl ReplayEngine {
    /// Creates a new replay engine with the given configuration
    pub fn new(config: Config, verbose: bool) -> Self {
        let seed = config.fallback.rng_seed.unwrap_or(0);
        ReplayEngine {
            config,
            verbose,
            seed,
        }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file = File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Runs the decision policy on one logged board
    pub fn replay_turn(
        &self,
        board: &Board,
        our_snake: &Battlesnake,
        turn: i32,
    ) -> Result<(Result<policy::Decision, DecisionError>, u128), String> {
        let snapshot = BoardSnapshot::from_request(board, our_snake)?;

        let start_time = Instant::now();
        let deadline = start_time + Duration::from_millis(self.config.timing.effective_budget_ms());
        let mut rng = StdRng::seed_from_u64(self.seed ^ turn as u64);
        let outcome = policy::decide_move(&snapshot, &self.config, Some(deadline), &mut rng);

        Ok((outcome, start_time.elapsed().as_millis()))
    }

    /// Replays a single log entry and compares the result
    pub fn replay_entry(&self, entry: &LogEntry) -> Result<ReplayResult, String> {
        if self.verbose {
            info!("Replaying turn {}...", entry.turn);
        }

        let our_snake = Self::controlled_snake(entry)?;
        let original_move: Direction = entry.chosen_move.parse()?;
        let (outcome, computation_time) = self.replay_turn(&entry.board, our_snake, entry.turn)?;

        let (replayed_move, replayed_source, expansions) = match outcome {
            Ok(decision) => (
                Some(decision.direction),
                Some(decision.source),
                decision.stats.expansions,
            ),
            Err(e) => {
                warn!("Turn {}: {}", entry.turn, e);
                (None, None, 0)
            }
        };
        let matches = replayed_move == Some(original_move);

        if self.verbose {
            let replayed = replayed_move.map_or("none", |d| d.as_str());
            if matches {
                info!(
                    "Turn {}: ✓ MATCH - {} ({} expansions, {}ms)",
                    entry.turn, replayed, expansions, computation_time
                );
            } else {
                warn!(
                    "Turn {}: ✗ MISMATCH - Original: {}, Replayed: {} ({} expansions, {}ms)",
                    entry.turn,
                    original_move.as_str(),
                    replayed,
                    expansions,
                    computation_time
                );
            }
        }

        Ok(ReplayResult {
            turn: entry.turn,
            original_move,
            replayed_move,
            replayed_source,
            matches,
            expansions,
            computation_time_ms: computation_time,
        })
    }

    /// The logged `you`, else the snake matching `you_id`, else the first snake
    fn controlled_snake(entry: &LogEntry) -> Result<&Battlesnake, String> {
        if let Some(you) = &entry.you {
            return Ok(you);
        }
        match &entry.you_id {
            Some(id) => entry
                .board
                .snakes
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| format!("Snake with id '{}' not found in board state", id)),
            None => entry
                .board
                .snakes
                .first()
                .ok_or_else(|| "No snakes found in board state".to_string()),
        }
    }

    /// Replays all entries in a log file
    pub fn replay_all(&self, entries: &[LogEntry]) -> Vec<ReplayResult> {
        let mut results = Vec::new();

        for entry in entries {
            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Failed to replay turn {}: {}", entry.turn, e);
                }
            }
        }

        results
    }

    /// Replays specific turns from a log file
    pub fn replay_turns(
        &self,
        entries: &[LogEntry],
        turn_numbers: &[i32],
    ) -> Result<Vec<ReplayResult>, String> {
        let mut results = Vec::new();

        for turn_num in turn_numbers {
            let entry = entries
                .iter()
                .find(|e| e.turn == *turn_num)
                .ok_or_else(|| format!("Turn {} not found in log file", turn_num))?;

            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Failed to replay turn {}: {}", turn_num, e);
                }
            }
        }

        Ok(results)
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_turns = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let fallbacks = results
            .iter()
            .filter(|r| matches!(r.replayed_source, Some(DecisionSource::Fallback(_))))
            .count();
        let match_rate = if total_turns > 0 {
            (matches as f64 / total_turns as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_turns,
            matches,
            mismatches: total_turns - matches,
            match_rate,
            fallbacks,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Turns:    {}", stats.total_turns);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("Random moves:   {}", stats.fallbacks);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 =
                results.iter().map(|r| r.computation_time_ms as f64).sum::<f64>() / results.len() as f64;
            let avg_expansions: f64 =
                results.iter().map(|r| r.expansions as f64).sum::<f64>() / results.len() as f64;

            println!("Average Expansions:         {:.1}", avg_expansions);
            println!("Average Computation Time:   {:.1}ms\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Turn {}: {} → {} ({}, {} expansions, {}ms)",
                    result.turn,
                    result.original_move.as_str(),
                    result.replayed_move.map_or("none", |d| d.as_str()),
                    result
                        .replayed_source
                        .map_or_else(|| "boxed in".to_string(), |s| s.to_string()),
                    result.expansions,
                    result.computation_time_ms
                );
            }
            println!();
        }
    }

    /// Validates that specific expected moves were made
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(i32, Vec<Direction>)], // (turn, acceptable_moves)
    ) -> Result<(), String> {
        for (turn, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.turn == *turn)
                .ok_or_else(|| format!("Turn {} not found in log", turn))?;

            let actual_move: Direction = entry.chosen_move.parse()?;

            if !acceptable.contains(&actual_move) {
                return Err(format!(
                    "Turn {}: Expected one of {:?}, but got {}",
                    turn,
                    acceptable.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                    actual_move.as_str()
                ));
            }
        }

        Ok(())
    }
}
