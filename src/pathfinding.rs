// Pathfinding - A* search over any value that knows its neighbours and costs
// Graphs are built once and answer any number of independent route queries

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Expansion budget used when the caller has no better bound
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Something that can sit in a [`Graph`].
///
/// `cost` serves as both the edge weight between neighbours and the estimate
/// towards the goal, so it does not need to be admissible.
pub trait Graphable {
    /// Identity used to resolve neighbour references
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;

    /// Keys of every directly reachable value
    fn neighbours(&self) -> Vec<Self::Key>;

    /// Cost of moving from this value to `other`
    fn cost(&self, other: &Self) -> f64;
}

impl<T: Graphable + ?Sized> Graphable for &T {
    type Key = T::Key;

    fn key(&self) -> Self::Key {
        (**self).key()
    }

    fn neighbours(&self) -> Vec<Self::Key> {
        (**self).neighbours()
    }

    fn cost(&self, other: &Self) -> f64 {
        (**self).cost(*other)
    }
}

/// A wrapped value with its id and resolved neighbour ids
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    id: usize,
    value: T,
    neighbours: Vec<usize>,
}

impl<T> GraphNode<T> {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn neighbours(&self) -> &[usize] {
        &self.neighbours
    }
}

/// Outcome of a single search
#[derive(Debug, Clone, PartialEq)]
pub struct PathReport<T> {
    /// Start to goal inclusive, empty when no path was found
    pub path: Vec<T>,
    /// Nodes popped from the open set
    pub iterations: usize,
    /// The search stopped with nodes still open
    pub budget_exhausted: bool,
}

impl<T> PathReport<T> {
    fn empty(iterations: usize, budget_exhausted: bool) -> Self {
        Self {
            path: Vec::new(),
            iterations,
            budget_exhausted,
        }
    }

    pub fn found(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Immutable node/edge table with ids assigned in input order
#[derive(Debug, Clone)]
pub struct Graph<T: Graphable> {
    nodes: Vec<GraphNode<T>>,
    index: HashMap<T::Key, usize>,
}

impl<T: Graphable> Graph<T> {
    /// Wrap `values` into a graph.
    ///
    /// Values whose key was already seen are skipped. Fails when a value
    /// names a neighbour that is not among `values`.
    pub fn build<I: IntoIterator<Item = T>>(values: I) -> Result<Self> {
        let mut nodes: Vec<GraphNode<T>> = Vec::new();
        let mut index = HashMap::new();

        for value in values {
            let key = value.key();
            if index.contains_key(&key) {
                continue;
            }
            let id = nodes.len();
            index.insert(key, id);
            nodes.push(GraphNode {
                id,
                value,
                neighbours: Vec::new(),
            });
        }

        for node in nodes.iter_mut() {
            let mut resolved = Vec::new();
            for key in node.value.neighbours() {
                let id = *index
                    .get(&key)
                    .ok_or_else(|| Error::MissingNeighbour(format!("{:?}", key)))?;
                if !resolved.contains(&id) {
                    resolved.push(id);
                }
            }
            node.neighbours = resolved;
        }

        Ok(Self { nodes, index })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> Option<&GraphNode<T>> {
        self.nodes.get(id)
    }

    pub fn id_of(&self, key: &T::Key) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<T>> {
        self.nodes.iter()
    }
}

impl<T: Graphable + Clone> Graph<T> {
    /// Path from `start` to `goal` inclusive; empty when either is absent or
    /// nothing was reached within `max_iterations` expansions
    pub fn find_path(&self, start: &T, goal: &T, max_iterations: usize) -> Vec<T> {
        self.search(&start.key(), &goal.key(), max_iterations).path
    }

    /// Full search outcome between two keys
    pub fn search(&self, start: &T::Key, goal: &T::Key, max_iterations: usize) -> PathReport<T> {
        let (Some(start), Some(goal)) = (self.id_of(start), self.id_of(goal)) else {
            return PathReport::empty(0, false);
        };
        if start == goal {
            return PathReport {
                path: vec![self.nodes[start].value.clone()],
                iterations: 0,
                budget_exhausted: false,
            };
        }

        let goal_value = &self.nodes[goal].value;
        let mut state = SearchState::new(self.nodes.len());
        state.open(start, 0.0, self.nodes[start].value.cost(goal_value), None);

        let mut iterations = 0;
        while iterations < max_iterations {
            let Some(current) = state.pop() else {
                return PathReport::empty(iterations, false);
            };
            iterations += 1;

            if current == goal {
                let path = state
                    .reconstruct(goal)
                    .into_iter()
                    .map(|id| self.nodes[id].value.clone())
                    .collect();
                return PathReport {
                    path,
                    iterations,
                    budget_exhausted: false,
                };
            }

            state.closed[current] = true;
            let current_node = &self.nodes[current];
            for &neighbour in &current_node.neighbours {
                if state.closed[neighbour] {
                    continue;
                }
                let neighbour_value = &self.nodes[neighbour].value;
                let tentative_g = state.g[current] + current_node.value.cost(neighbour_value);
                if !state.in_open[neighbour] || tentative_g < state.g[neighbour] {
                    let h = neighbour_value.cost(goal_value);
                    state.open(neighbour, tentative_g, h, Some(current));
                }
            }
        }

        let budget_exhausted = !state.frontier.is_empty();
        if budget_exhausted {
            tracing::debug!(
                max_iterations,
                open = state.frontier.len(),
                "path search ran out of iterations"
            );
        }
        PathReport::empty(iterations, budget_exhausted)
    }
}

// =============================================================================
// SEARCH SCRATCH STATE
// =============================================================================

/// Open-set entry ordered by F, ties broken by the lower node id
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f64,
    id: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f.total_cmp(&other.f).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

/// Per-query G/H/parent tables indexed by node id
struct SearchState {
    g: Vec<f64>,
    h: Vec<f64>,
    parent: Vec<Option<usize>>,
    in_open: Vec<bool>,
    closed: Vec<bool>,
    frontier: BTreeSet<OpenEntry>,
}

impl SearchState {
    fn new(len: usize) -> Self {
        Self {
            g: vec![0.0; len],
            h: vec![0.0; len],
            parent: vec![None; len],
            in_open: vec![false; len],
            closed: vec![false; len],
            frontier: BTreeSet::new(),
        }
    }

    fn entry(&self, id: usize) -> OpenEntry {
        OpenEntry {
            f: self.g[id] + self.h[id],
            id,
        }
    }

    /// Insert or re-key a node in the open set
    fn open(&mut self, id: usize, g: f64, h: f64, parent: Option<usize>) {
        if self.in_open[id] {
            let stale = self.entry(id);
            self.frontier.remove(&stale);
        }
        self.g[id] = g;
        self.h[id] = h;
        self.parent[id] = parent;
        self.in_open[id] = true;
        let fresh = self.entry(id);
        self.frontier.insert(fresh);
    }

    fn pop(&mut self) -> Option<usize> {
        let entry = self.frontier.pop_first()?;
        self.in_open[entry.id] = false;
        Some(entry.id)
    }

    fn reconstruct(&self, goal: usize) -> Vec<usize> {
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(parent) = self.parent[current] {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}

// =============================================================================
// TESTS
// =============================================================================
