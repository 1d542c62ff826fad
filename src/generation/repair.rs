use crate::grid::{Connectivity, Grid, Position};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use tracing::debug;

/// Turn `density` of the open cells (other than `start` and `goal`) into walls.
///
/// The number of converted cells is `round(density * candidates)`, chosen
/// uniformly at random. Returns how many walls were added.
pub fn apply_density<R: Rng + ?Sized>(
    grid: &mut Grid,
    density: f32,
    start: Position,
    goal: Position,
    rng: &mut R,
) -> usize {
    let mut candidates: Vec<Position> = grid
        .open_cells()
        .filter(|&p| p != start && p != goal)
        .collect();

    let count = ((density.clamp(0.0, 1.0) * candidates.len() as f32).round() as usize).min(candidates.len());
    candidates.shuffle(rng);
    for p in &candidates[..count] {
        grid.set_wall(p.x, p.y, true);
    }
    count
}

/// Breadth-first reachability from `start` over open cells
pub fn reachable(grid: &Grid, start: Position, connectivity: Connectivity) -> Vec<bool> {
    let mut seen = vec![false; grid.len()];
    let Some(origin) = grid.index(start) else {
        return seen;
    };
    if grid.is_wall_at(start) {
        return seen;
    }

    seen[origin] = true;
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in grid.neighbors(current, connectivity) {
            if let Some(i) = grid.index(next) {
                if !seen[i] {
                    seen[i] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

pub fn is_reachable(grid: &Grid, start: Position, goal: Position, connectivity: Connectivity) -> bool {
    match grid.index(goal) {
        Some(i) => reachable(grid, start, connectivity)[i],
        None => false,
    }
}

/// Open a corridor from `start` to `goal`, stepping alternately along x then
/// y. Once one axis is aligned the remaining steps all follow the other.
pub fn carve_corridor(grid: &mut Grid, start: Position, goal: Position) {
    let mut current = start;
    grid.set_wall(current.x, current.y, false);
    let mut along_x = true;

    while current != goal {
        let step_x = current.x != goal.x && (along_x || current.y == goal.y);
        if step_x {
            current.x += (goal.x - current.x).signum();
        } else {
            current.y += (goal.y - current.y).signum();
        }
        grid.set_wall(current.x, current.y, false);
        along_x = !along_x;
    }
}

/// Guarantee `goal` is reachable from `start`, carving the fallback corridor
/// when it is not. Returns true when a corridor had to be carved.
///
/// The corridor is orthogonal, so a repaired grid is solvable under either
/// connectivity mode.
pub fn repair_connectivity(grid: &mut Grid, start: Position, goal: Position) -> bool {
    if grid.is_open(start) && is_reachable(grid, start, goal, Connectivity::Orthogonal) {
        return false;
    }
    debug!(%start, %goal, "goal unreachable, carving fallback corridor");
    carve_corridor(grid, start, goal);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_density_zero_and_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Position::new(0, 0);
        let goal = Position::new(4, 4);

        let mut grid = Grid::new(5, 5);
        assert_eq!(apply_density(&mut grid, 0.0, start, goal, &mut rng), 0);
        assert_eq!(grid.wall_count(), 0);

        assert_eq!(apply_density(&mut grid, 1.0, start, goal, &mut rng), 23);
        assert!(grid.is_open(start));
        assert!(grid.is_open(goal));
    }

    #[test]
    fn test_density_fraction() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut grid = Grid::new(10, 10);
        let added = apply_density(&mut grid, 0.25, Position::new(0, 0), Position::new(9, 9), &mut rng);
        assert_eq!(added, 25);
        assert_eq!(grid.wall_count(), 25);
    }

    #[test]
    fn test_corridor_alternates_axes() {
        let mut grid = Grid::filled(5, 5);
        carve_corridor(&mut grid, Position::new(0, 0), Position::new(2, 4));
        let open: Vec<Position> = grid.open_cells().collect();
        let expected = [(0, 0), (1, 0), (1, 1), (2, 1), (2, 2), (2, 3), (2, 4)];
        assert_eq!(open.len(), expected.len());
        for (x, y) in expected {
            assert!(grid.is_open(Position::new(x, y)), "({},{}) should be carved", x, y);
        }
    }

    #[test]
    fn test_repair_fully_walled() {
        let mut grid = Grid::filled(10, 10);
        let start = Position::new(0, 0);
        let goal = Position::new(9, 9);
        assert!(repair_connectivity(&mut grid, start, goal));
        assert!(is_reachable(&grid, start, goal, Connectivity::Orthogonal));
        assert!(!repair_connectivity(&mut grid, start, goal));
    }

    #[test]
    fn test_reachable_from_wall_is_empty() {
        let grid = Grid::filled(3, 3);
        assert!(reachable(&grid, Position::new(1, 1), Connectivity::Orthogonal)
            .iter()
            .all(|s| !s));
    }
}
