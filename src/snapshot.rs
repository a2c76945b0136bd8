// Per-turn board view and the static obstacle terrain derived from it

use std::collections::HashSet;

use crate::types::{Battlesnake, Board, Coord};

/// One snake on the board, head-first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub body: Vec<Coord>,
}

impl Agent {
    pub fn new(id: impl Into<String>, body: Vec<Coord>) -> Self {
        Agent { id: id.into(), body }
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// The previously occupied cell, if the snake is longer than one segment
    pub fn neck(&self) -> Option<Coord> {
        self.body.get(1).copied()
    }
}

/// Immutable snapshot of one turn: bounds, food and every agent's body
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub width: i32,
    pub height: i32,
    pub food: HashSet<Coord>,
    pub agents: Vec<Agent>,
    /// Index of the controlled agent in `agents`
    pub you: usize,
}

impl BoardSnapshot {
    /// Builds and validates a snapshot
    pub fn new(
        width: i32,
        height: i32,
        food: impl IntoIterator<Item = Coord>,
        agents: Vec<Agent>,
        you: usize,
    ) -> Result<Self, String> {
        if width <= 0 || height <= 0 {
            return Err(format!("Board must have positive dimensions, got {}x{}", width, height));
        }
        if you >= agents.len() {
            return Err(format!(
                "Controlled agent index {} out of range for {} agents",
                you,
                agents.len()
            ));
        }
        if let Some(empty) = agents.iter().find(|a| a.is_empty()) {
            return Err(format!("Agent '{}' has an empty body", empty.id));
        }

        Ok(BoardSnapshot {
            width,
            height,
            food: food.into_iter().collect(),
            agents,
            you,
        })
    }

    /// Builds a snapshot from an inbound turn payload
    ///
    /// The controlled snake is located by id; when the engine omitted it from
    /// `board.snakes` it is appended from `you`.
    pub fn from_request(board: &Board, you: &Battlesnake) -> Result<Self, String> {
        let mut agents: Vec<Agent> = board.snakes.iter().map(Self::agent_from_wire).collect();

        let you_index = match board.snakes.iter().position(|s| s.id == you.id) {
            Some(idx) => idx,
            None => {
                agents.push(Self::agent_from_wire(you));
                agents.len() - 1
            }
        };

        Self::new(
            board.width,
            board.height,
            board.food.iter().copied(),
            agents,
            you_index,
        )
    }

    fn agent_from_wire(snake: &Battlesnake) -> Agent {
        if let Some(first) = snake.body.first() {
            if *first != snake.head {
                log::debug!(
                    "Snake {} reports head {} but body starts at {}; using body",
                    snake.id,
                    snake.head,
                    first
                );
            }
        }
        Agent::new(snake.id.clone(), snake.body.clone())
    }

    pub fn controlled(&self) -> &Agent {
        &self.agents[self.you]
    }

    /// Iterates every agent other than the controlled one
    pub fn rivals(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents
            .iter()
            .enumerate()
            .filter(move |(idx, _)| *idx != self.you)
            .map(|(_, agent)| agent)
    }

    pub fn in_bounds(&self, coord: &Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    pub fn is_food(&self, coord: &Coord) -> bool {
        self.food.contains(coord)
    }
}

/// Cells treated as impassable for an entire planning episode
///
/// Bodies are frozen where they stand: tails are not vacated as agents move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObstacleSet {
    cells: HashSet<Coord>,
}

impl ObstacleSet {
    /// Every body cell of every agent, the controlled agent included
    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Self {
        let cells = snapshot
            .agents
            .iter()
            .flat_map(|agent| agent.body.iter().copied())
            .collect();
        ObstacleSet { cells }
    }

    pub fn contains(&self, coord: &Coord) -> bool {
        self.cells.contains(coord)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns a new set with `extra` added; `self` is left untouched
    pub fn augmented<'a>(&self, extra: impl IntoIterator<Item = &'a Coord>) -> Self {
        let mut cells = self.cells.clone();
        cells.extend(extra.into_iter().copied());
        ObstacleSet { cells }
    }
}
