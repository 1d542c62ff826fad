//! Generalised A* over a [`Grid`].
//!
//! Cost, heuristic and passability are injected per call, so one search
//! serves shortest-path mazes, terrain-weighted routes and fog-of-war
//! planning alike. Search state lives in a scratch table allocated for each
//! call; nothing is stored on the grid.

use crate::error::{GridError, Result};
use crate::generation::terrain::MAX_ELEVATION;
use crate::grid::{Connectivity, Grid, Position};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::f64::consts::SQRT_2;
use tracing::{debug, trace};

/// Geometric length of a single step: 1 orthogonally, √2 diagonally
pub fn step_length(from: Position, to: Position) -> f64 {
    if from.is_diagonal_to(&to) {
        SQRT_2
    } else {
        1.0
    }
}

/// Cost of moving between two adjacent cells. Must be non-negative.
pub trait MovementCost {
    fn cost(&self, grid: &Grid, from: Position, to: Position) -> f64;
}

impl<F> MovementCost for F
where
    F: Fn(&Grid, Position, Position) -> f64,
{
    fn cost(&self, grid: &Grid, from: Position, to: Position) -> f64 {
        self(grid, from, to)
    }
}

/// Plain shortest path
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCost;

impl MovementCost for UniformCost {
    fn cost(&self, _grid: &Grid, from: Position, to: Position) -> f64 {
        step_length(from, to)
    }
}

/// Penalises climbing and descending: step length plus `weight` per unit of
/// elevation difference.
#[derive(Debug, Clone, Copy)]
pub struct EasiestPath {
    pub weight: f64,
}

impl Default for EasiestPath {
    fn default() -> Self {
        EasiestPath { weight: 0.1 }
    }
}

impl MovementCost for EasiestPath {
    fn cost(&self, grid: &Grid, from: Position, to: Position) -> f64 {
        let climb = (grid.elevation(to) - grid.elevation(from)).abs() as f64;
        step_length(from, to) + self.weight * climb
    }
}

/// Prefers high ground: the lower the destination, the dearer the step
#[derive(Debug, Clone, Copy)]
pub struct HighestPath {
    pub weight: f64,
}

impl Default for HighestPath {
    fn default() -> Self {
        HighestPath { weight: 10.0 }
    }
}

impl MovementCost for HighestPath {
    fn cost(&self, grid: &Grid, from: Position, to: Position) -> f64 {
        let depth = ((MAX_ELEVATION - grid.elevation(to)) / MAX_ELEVATION).max(0.0) as f64;
        step_length(from, to) + self.weight * depth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    Red,
    Green,
    Blue,
    /// Euclidean magnitude of all three
    #[default]
    All,
}

impl Channel {
    /// Channel intensity of `rgb` normalised to [0, 1]
    pub fn intensity(self, rgb: [u8; 3]) -> f64 {
        let [r, g, b] = rgb.map(|c| c as f64 / 255.0);
        match self {
            Channel::Red => r,
            Channel::Green => g,
            Channel::Blue => b,
            Channel::All => ((r * r + g * g + b * b) / 3.0).sqrt(),
        }
    }
}

/// Steers by colour: brighter cells in the chosen channel cost more
#[derive(Debug, Clone, Copy)]
pub struct ColorGuided {
    pub channel: Channel,
    pub weight: f64,
}

impl Default for ColorGuided {
    fn default() -> Self {
        ColorGuided {
            channel: Channel::All,
            weight: 5.0,
        }
    }
}

impl MovementCost for ColorGuided {
    fn cost(&self, grid: &Grid, from: Position, to: Position) -> f64 {
        step_length(from, to) + self.weight * self.channel.intensity(grid.color(to))
    }
}

/// Estimated remaining cost. Must not overestimate for the result to be
/// optimal.
pub trait Heuristic {
    fn estimate(&self, from: Position, goal: Position) -> f64;
}

impl<F> Heuristic for F
where
    F: Fn(Position, Position) -> f64,
{
    fn estimate(&self, from: Position, goal: Position) -> f64 {
        self(from, goal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Manhattan,
    /// `√2·min(dx,dy) + |dx−dy|`
    Octile,
    Euclidean,
    /// Turns A* into Dijkstra
    Zero,
}

impl Distance {
    /// The admissible default for a movement mode
    pub fn for_connectivity(connectivity: Connectivity) -> Self {
        match connectivity {
            Connectivity::Orthogonal => Distance::Manhattan,
            Connectivity::Octile => Distance::Octile,
        }
    }
}

impl Heuristic for Distance {
    fn estimate(&self, from: Position, goal: Position) -> f64 {
        let dx = (from.x - goal.x).abs() as f64;
        let dy = (from.y - goal.y).abs() as f64;
        match self {
            Distance::Manhattan => dx + dy,
            Distance::Octile => SQRT_2 * dx.min(dy) + (dx - dy).abs(),
            Distance::Euclidean => (dx * dx + dy * dy).sqrt(),
            Distance::Zero => 0.0,
        }
    }
}

/// Decides whether a search may enter a cell
pub trait Passable {
    fn passable(&self, grid: &Grid, pos: Position) -> bool;
}

impl<F> Passable for F
where
    F: Fn(&Grid, Position) -> bool,
{
    fn passable(&self, grid: &Grid, pos: Position) -> bool {
        self(grid, pos)
    }
}

/// Anything that is not a wall
#[derive(Debug, Clone, Copy, Default)]
pub struct Walkable;

impl Passable for Walkable {
    fn passable(&self, grid: &Grid, pos: Position) -> bool {
        grid.is_open(pos)
    }
}

/// Built-in cost policies, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    #[default]
    Uniform,
    Easiest,
    Highest,
    Color,
}

impl CostKind {
    pub fn boxed(self) -> Box<dyn MovementCost> {
        match self {
            CostKind::Uniform => Box::new(UniformCost),
            CostKind::Easiest => Box::new(EasiestPath::default()),
            CostKind::Highest => Box::new(HighestPath::default()),
            CostKind::Color => Box::new(ColorGuided::default()),
        }
    }
}

/// The cost, heuristic and movement mode an agent plans with
pub struct Planner {
    pub connectivity: Connectivity,
    cost: Box<dyn MovementCost>,
    heuristic: Box<dyn Heuristic>,
}

impl Planner {
    /// Uniform steps with the admissible heuristic for `connectivity`
    pub fn new(connectivity: Connectivity) -> Self {
        Planner {
            connectivity,
            cost: Box::new(UniformCost),
            heuristic: Box::new(Distance::for_connectivity(connectivity)),
        }
    }

    pub fn with_cost<C: MovementCost + 'static>(mut self, cost: C) -> Self {
        self.cost = Box::new(cost);
        self
    }

    pub fn with_boxed_cost(mut self, cost: Box<dyn MovementCost>) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_heuristic<H: Heuristic + 'static>(mut self, heuristic: H) -> Self {
        self.heuristic = Box::new(heuristic);
        self
    }

    pub fn step_cost(&self, grid: &Grid, from: Position, to: Position) -> f64 {
        self.cost.cost(grid, from, to).max(0.0)
    }

    pub fn plan<P: Passable + ?Sized>(&self, grid: &Grid, start: Position, goal: Position, passable: &P) -> Result<Path> {
        find_path(
            grid,
            start,
            goal,
            self.cost.as_ref(),
            self.heuristic.as_ref(),
            passable,
            self.connectivity,
        )
    }
}

impl fmt::Debug for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("connectivity", &self.connectivity)
            .finish_non_exhaustive()
    }
}

/// Ordered sequence of cells from (excluding) start to (including) goal,
/// consumed through a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    cells: Vec<Position>,
    total_cost: f64,
    expanded: usize,
    cursor: usize,
}

impl Path {
    pub fn new(cells: Vec<Position>, total_cost: f64) -> Self {
        Path {
            cells,
            total_cost,
            expanded: 0,
            cursor: 0,
        }
    }

    pub fn cells(&self) -> &[Position] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Accumulated cost of the whole path under the policy that found it
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Nodes closed by the search that produced this path
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn goal(&self) -> Option<Position> {
        self.cells.last().copied()
    }

    /// Next cell to step onto, without consuming it
    pub fn peek(&self) -> Option<Position> {
        self.cells.get(self.cursor).copied()
    }

    /// Consume the next cell
    pub fn advance(&mut self) -> Option<Position> {
        let next = self.peek()?;
        self.cursor += 1;
        Some(next)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.cells.len()
    }

    pub fn remaining(&self) -> &[Position] {
        &self.cells[self.cursor.min(self.cells.len())..]
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains(&pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unseen,
    Open,
    Closed,
}

/// Per-search record for one cell
#[derive(Debug, Clone, Copy)]
struct Node {
    g: f64,
    h: f64,
    f: f64,
    parent: Option<usize>,
    state: NodeState,
    /// When the cell first entered the open set
    order: u64,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            g: f64::INFINITY,
            h: 0.0,
            f: f64::INFINITY,
            parent: None,
            state: NodeState::Unseen,
            order: 0,
        }
    }
}

/// Open-set entry. Entries are never updated in place; an improved node is
/// pushed again and the outdated entry is skipped when popped.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f64,
    order: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; equal f goes to the earliest inserted
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Shortest path with unit/√2 steps, the admissible heuristic for the
/// connectivity and plain wall blocking
pub fn shortest_path(grid: &Grid, start: Position, goal: Position, connectivity: Connectivity) -> Result<Path> {
    find_path(
        grid,
        start,
        goal,
        &UniformCost,
        &Distance::for_connectivity(connectivity),
        &Walkable,
        connectivity,
    )
}

/// A* from `start` to `goal`.
///
/// Returns the path excluding `start`; `start == goal` yields an empty path.
/// An exhausted open set is reported as [`GridError::NoPathFound`].
pub fn find_path<C, H, P>(
    grid: &Grid,
    start: Position,
    goal: Position,
    cost: &C,
    heuristic: &H,
    passable: &P,
    connectivity: Connectivity,
) -> Result<Path>
where
    C: MovementCost + ?Sized,
    H: Heuristic + ?Sized,
    P: Passable + ?Sized,
{
    let start_index = grid.index(start).ok_or(GridError::OutOfBounds {
        x: start.x,
        y: start.y,
        cols: grid.cols,
        rows: grid.rows,
    })?;
    let goal_index = grid.index(goal).ok_or(GridError::OutOfBounds {
        x: goal.x,
        y: goal.y,
        cols: grid.cols,
        rows: grid.rows,
    })?;

    if start_index == goal_index {
        return Ok(Path::new(Vec::new(), 0.0));
    }

    let mut nodes = vec![Node::default(); grid.len()];
    let mut open = BinaryHeap::new();
    let mut next_order: u64 = 0;
    let mut expanded = 0usize;

    let h = heuristic.estimate(start, goal).max(0.0);
    nodes[start_index] = Node {
        g: 0.0,
        h,
        f: h,
        parent: None,
        state: NodeState::Open,
        order: next_order,
    };
    open.push(OpenEntry {
        f: h,
        order: next_order,
        index: start_index,
    });
    next_order += 1;

    while let Some(entry) = open.pop() {
        let current = nodes[entry.index];
        if current.state != NodeState::Open || entry.f != current.f {
            continue;
        }

        if entry.index == goal_index {
            let mut path = reconstruct(grid, &nodes, goal_index, start_index);
            path.expanded = expanded;
            debug!(
                %start,
                %goal,
                steps = path.len(),
                cost = path.total_cost,
                expanded,
                "path found"
            );
            return Ok(path);
        }

        nodes[entry.index].state = NodeState::Closed;
        expanded += 1;
        let pos = grid.position_of(entry.index);

        for neighbor in grid.neighbors_where(pos, connectivity, |p| passable.passable(grid, p)) {
            let Some(ni) = grid.index(neighbor) else {
                continue;
            };
            if nodes[ni].state == NodeState::Closed {
                continue;
            }

            let step = cost.cost(grid, pos, neighbor);
            debug_assert!(step >= 0.0, "negative step cost {} from {} to {}", step, pos, neighbor);
            let tentative = current.g + step.max(0.0);

            let node = &mut nodes[ni];
            if node.state == NodeState::Open && node.g <= tentative {
                continue;
            }
            if node.state == NodeState::Unseen {
                node.state = NodeState::Open;
                node.order = next_order;
                next_order += 1;
            }
            node.parent = Some(entry.index);
            node.g = tentative;
            node.h = heuristic.estimate(neighbor, goal).max(0.0);
            node.f = node.g + node.h;
            open.push(OpenEntry {
                f: node.f,
                order: node.order,
                index: ni,
            });
        }
    }

    debug!(%start, %goal, expanded, "open set exhausted");
    trace!(closed = expanded, inserted = next_order, "search statistics");
    Err(GridError::NoPathFound { start, goal })
}

fn reconstruct(grid: &Grid, nodes: &[Node], goal_index: usize, start_index: usize) -> Path {
    let mut cells = Vec::new();
    let mut index = goal_index;
    while index != start_index {
        cells.push(grid.position_of(index));
        match nodes[index].parent {
            Some(parent) => index = parent,
            None => break,
        }
    }
    cells.reverse();
    Path::new(cells, nodes[goal_index].g)
}

/// Accumulated cost of walking `cells` from `start` under `cost`
pub fn path_cost<C: MovementCost + ?Sized>(grid: &Grid, start: Position, cells: &[Position], cost: &C) -> f64 {
    let mut total = 0.0;
    let mut previous = start;
    for &cell in cells {
        total += cost.cost(grid, previous, cell);
        previous = cell;
    }
    total
}

/// Format path for display
pub fn format_path(path: &[Position]) -> String {
    if path.is_empty() {
        return "No path".to_string();
    }

    path.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
