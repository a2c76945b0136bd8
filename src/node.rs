// Search tree nodes and successor generation
//
// Nodes live in a per-episode arena and point at their parent by index, so the
// whole tree is released by dropping the arena.

use std::hash::{Hash, Hasher};

use crate::snapshot::{BoardSnapshot, ObstacleSet};
use crate::types::{Coord, Direction};

/// Identity of a hypothetical board position: the full head-first body sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey(Vec<Coord>);

impl StateKey {
    pub fn of(body: &[Coord]) -> Self {
        StateKey(body.to_vec())
    }

    pub fn cells(&self) -> &[Coord] {
        &self.0
    }
}

/// Index of a node inside a `NodeArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A hypothetical future position of one agent
///
/// Equality and hashing consider only `body`; cost, parent and move are
/// bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub head: Coord,
    pub body: Vec<Coord>,
    /// Move that produced this node, `None` for the root
    pub last_move: Option<Direction>,
    pub parent: Option<NodeId>,
    /// Steps taken from the root
    pub g: u32,
    /// Cached heuristic estimate, filled in when the node enters the frontier
    pub h: Option<u32>,
}

impl SearchNode {
    pub fn root(body: &[Coord]) -> Self {
        SearchNode {
            head: body[0],
            body: body.to_vec(),
            last_move: None,
            parent: None,
            g: 0,
            h: None,
        }
    }

    pub fn state_key(&self) -> StateKey {
        StateKey::of(&self.body)
    }

    /// Estimated total cost `g + h`, `None` until `h` is known
    pub fn f(&self) -> Option<u32> {
        self.h.map(|h| self.g.saturating_add(h))
    }
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl Eq for SearchNode {}

impl Hash for SearchNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.body.hash(state);
    }
}

/// Owns every node created during one planning episode
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<SearchNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena { nodes: Vec::new() }
    }

    pub fn push(&mut self, node: SearchNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows parent links from `id` back to the root and returns the nodes root-first
    pub fn path_to(&self, id: NodeId) -> Vec<SearchNode> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current);
            path.push(node.clone());
            cursor = node.parent;
        }
        path.reverse();
        path
    }
}

/// Produces the legal children of `id`, in left, right, down, up order
///
/// A child is rejected when its head leaves the board, lands on an obstacle,
/// or steps straight back onto the parent's head.
pub fn successors(
    arena: &NodeArena,
    id: NodeId,
    snapshot: &BoardSnapshot,
    obstacles: &ObstacleSet,
) -> Vec<SearchNode> {
    let node = arena.get(id);
    let parent = node.parent.map(|p| arena.get(p));

    let mut children = Vec::with_capacity(4);
    for dir in Direction::EXPANSION_ORDER.iter() {
        let next = dir.apply(&node.head);

        if !snapshot.in_bounds(&next) || obstacles.contains(&next) {
            continue;
        }
        if let Some(parent) = parent {
            if parent.head == next {
                continue;
            }
        }

        let mut body = Vec::with_capacity(node.body.len());
        body.push(next);
        body.extend_from_slice(&node.body[..node.body.len() - 1]);

        let child = SearchNode {
            head: next,
            body,
            last_move: Some(*dir),
            parent: Some(id),
            g: node.g + 1,
            h: None,
        };

        if parent.map_or(false, |p| *p == child) {
            continue;
        }
        children.push(child);
    }
    children
}

/// Legal first moves of an agent standing at `body`, in expansion order
pub fn legal_moves(body: &[Coord], snapshot: &BoardSnapshot, obstacles: &ObstacleSet) -> Vec<Direction> {
    let mut arena = NodeArena::new();
    let root = arena.push(SearchNode::root(body));
    successors(&arena, root, snapshot, obstacles)
        .into_iter()
        .filter_map(|child| child.last_move)
        .collect()
}
