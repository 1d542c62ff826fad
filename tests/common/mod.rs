#![allow(dead_code)]

use gridsim::grid::{Connectivity, Grid, Position, Terrain};
use gridsim::pathfinding::{format_path, MovementCost};
use std::collections::VecDeque;

/// Parse a grid written in the ■/□ notation
pub fn grid_from(text: &str) -> Grid {
    Grid::from_ascii(text).expect("test grid should parse")
}

/// Random walls with the given density; `keep_open` cells are never walled
pub fn random_grid(rng: &mut fastrand::Rng, cols: i32, rows: i32, density: f64, keep_open: &[Position]) -> Grid {
    let mut grid = Grid::new(cols, rows);
    for y in 0..rows {
        for x in 0..cols {
            let pos = Position::new(x, y);
            if !keep_open.contains(&pos) && rng.f64() < density {
                grid.set_wall(x, y, true);
            }
        }
    }
    grid
}

/// Give every cell a random elevation in [0, 100]
pub fn randomize_elevation(rng: &mut fastrand::Rng, grid: &mut Grid) {
    for y in 0..grid.rows {
        for x in 0..grid.cols {
            let height = rng.f32() * 100.0;
            grid.set_terrain(Position::new(x, y), Terrain::Elevation(height));
        }
    }
}

/// Give every cell a random colour
pub fn randomize_color(rng: &mut fastrand::Rng, grid: &mut Grid) {
    for y in 0..grid.rows {
        for x in 0..grid.cols {
            let rgb = [rng.u8(..), rng.u8(..), rng.u8(..)];
            grid.set_terrain(Position::new(x, y), Terrain::Color(rgb));
        }
    }
}

/// Cheapest cost from `start` to `goal` by exhaustive relaxation.
///
/// Repeats a pass over every cell until no distance improves, so it shares
/// nothing with A* except the neighbor rule.
pub fn brute_force_cost<C: MovementCost + ?Sized>(
    grid: &Grid,
    start: Position,
    goal: Position,
    cost: &C,
    connectivity: Connectivity,
) -> Option<f64> {
    let index = |p: Position| (p.y * grid.cols + p.x) as usize;
    let mut dist = vec![f64::INFINITY; grid.len()];
    dist[index(start)] = 0.0;

    let mut changed = true;
    while changed {
        changed = false;
        for y in 0..grid.rows {
            for x in 0..grid.cols {
                let from = Position::new(x, y);
                let base = dist[index(from)];
                if !base.is_finite() || grid.is_wall_at(from) {
                    continue;
                }
                for to in grid.neighbors(from, connectivity) {
                    let candidate = base + cost.cost(grid, from, to);
                    if candidate + 1e-9 < dist[index(to)] {
                        dist[index(to)] = candidate;
                        changed = true;
                    }
                }
            }
        }
    }

    let best = dist[index(goal)];
    best.is_finite().then_some(best)
}

/// Orthogonal flood fill, independent of the library's own reachability
pub fn bfs_reachable(grid: &Grid, start: Position, goal: Position) -> bool {
    if grid.is_wall_at(start) || grid.is_wall_at(goal) {
        return false;
    }
    let mut seen = vec![false; grid.len()];
    let mut queue = VecDeque::new();
    seen[(start.y * grid.cols + start.x) as usize] = true;
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        if pos == goal {
            return true;
        }
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let next = pos.offset(dx, dy);
            if !grid.contains(next) || grid.is_wall_at(next) {
                continue;
            }
            let i = (next.y * grid.cols + next.x) as usize;
            if !seen[i] {
                seen[i] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

/// Open cells and orthogonal passages between them
pub fn open_cells_and_edges(grid: &Grid) -> (usize, usize) {
    let mut vertices = 0;
    let mut edges = 0;
    for y in 0..grid.rows {
        for x in 0..grid.cols {
            if grid.is_wall(x, y) {
                continue;
            }
            vertices += 1;
            if !grid.is_wall(x + 1, y) {
                edges += 1;
            }
            if !grid.is_wall(x, y + 1) {
                edges += 1;
            }
        }
    }
    (vertices, edges)
}

/// Whether every open cell can reach every other
pub fn is_connected(grid: &Grid) -> bool {
    let open: Vec<Position> = grid.open_cells().collect();
    match open.first() {
        Some(&first) => open.iter().all(|&p| bfs_reachable(grid, first, p)),
        None => true,
    }
}

/// Mirror the grid left-right
pub fn flip_horizontal(grid: &Grid) -> Grid {
    let mut flipped = Grid::new(grid.cols, grid.rows);
    for y in 0..grid.rows {
        for x in 0..grid.cols {
            if grid.is_wall(x, y) {
                flipped.set_wall(grid.cols - 1 - x, y, true);
            }
        }
    }
    flipped
}

/// Mirror the grid top-bottom
pub fn flip_vertical(grid: &Grid) -> Grid {
    let mut flipped = Grid::new(grid.cols, grid.rows);
    for y in 0..grid.rows {
        for x in 0..grid.cols {
            if grid.is_wall(x, y) {
                flipped.set_wall(x, grid.rows - 1 - y, true);
            }
        }
    }
    flipped
}

/// Visualize a path on a grid
pub fn visualize_path(grid: &Grid, path: &[Position], start: Position, goal: Position) -> String {
    let mut result = format!("\nPath: {}\n", format_path(path));
    result.push_str(&grid.render_with(|pos| {
        if pos == start {
            Some('S')
        } else if pos == goal {
            Some('G')
        } else if path.contains(&pos) {
            Some('*')
        } else {
            None
        }
    }));
    result
}
