use crate::grid::{Grid, Position};
use rand::Rng;

/// Offsets to the cells two steps away; the cell in between is the wall
/// separating them.
const STEP_TWO: [(i32, i32); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];

fn midpoint(a: Position, b: Position) -> Position {
    Position::new((a.x + b.x) / 2, (a.y + b.y) / 2)
}

fn carve(grid: &mut Grid, pos: Position) {
    grid.set_wall(pos.x, pos.y, false);
}

fn step_two_where<F>(grid: &Grid, pos: Position, pred: F) -> Vec<Position>
where
    F: Fn(Position) -> bool,
{
    STEP_TWO
        .iter()
        .map(|&(dx, dy)| pos.offset(dx, dy))
        .filter(|&p| grid.contains(p) && pred(p))
        .collect()
}

/// Depth-first maze carved from (0,0) with an explicit stack.
///
/// Only cells at even coordinates become rooms, so the result is a perfect
/// maze over those rooms and the passages between them.
pub fn recursive_backtracker<R: Rng + ?Sized>(cols: i32, rows: i32, rng: &mut R) -> Grid {
    let mut grid = Grid::filled(cols, rows);
    if grid.is_empty() {
        return grid;
    }

    let origin = Position::new(0, 0);
    carve(&mut grid, origin);
    let mut stack = vec![origin];

    while let Some(&current) = stack.last() {
        let unvisited = step_two_where(&grid, current, |p| grid.is_wall_at(p));
        if unvisited.is_empty() {
            stack.pop();
            continue;
        }

        let next = unvisited[rng.gen_range(0..unvisited.len())];
        carve(&mut grid, midpoint(current, next));
        carve(&mut grid, next);
        stack.push(next);
    }

    grid
}

/// Randomised Prim's maze: grow from (0,0) by repeatedly connecting a random
/// frontier room to a random visited room two steps away.
pub fn prim<R: Rng + ?Sized>(cols: i32, rows: i32, rng: &mut R) -> Grid {
    let mut grid = Grid::filled(cols, rows);
    if grid.is_empty() {
        return grid;
    }

    let mut in_frontier = vec![false; grid.len()];
    let mut frontier: Vec<Position> = Vec::new();

    let origin = Position::new(0, 0);
    carve(&mut grid, origin);
    push_frontier(&grid, origin, &mut frontier, &mut in_frontier);

    while !frontier.is_empty() {
        let cell = frontier.swap_remove(rng.gen_range(0..frontier.len()));

        let visited = step_two_where(&grid, cell, |p| grid.is_open(p));
        // Every frontier room was added by an open neighbor
        if visited.is_empty() {
            continue;
        }
        let link = visited[rng.gen_range(0..visited.len())];
        carve(&mut grid, midpoint(cell, link));
        carve(&mut grid, cell);

        push_frontier(&grid, cell, &mut frontier, &mut in_frontier);
    }

    grid
}

fn push_frontier(grid: &Grid, from: Position, frontier: &mut Vec<Position>, in_frontier: &mut [bool]) {
    for p in step_two_where(grid, from, |p| grid.is_wall_at(p)) {
        if let Some(i) = grid.index(p) {
            if !in_frontier[i] {
                in_frontier[i] = true;
                frontier.push(p);
            }
        }
    }
}

/// Sub-rectangle awaiting division, in cell coordinates (inclusive origin)
#[derive(Debug, Clone, Copy)]
struct Chamber {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Recursive division: an empty room bordered by walls, bisected by wall
/// lines with a single gap each until chambers are narrower than 3 cells.
///
/// Wall lines sit on even coordinates and gaps on odd ones, so a later
/// perpendicular wall can never seal an earlier gap.
pub fn recursive_division<R: Rng + ?Sized>(cols: i32, rows: i32, rng: &mut R) -> Grid {
    let mut grid = Grid::new(cols, rows);
    for x in 0..cols {
        grid.set_wall(x, 0, true);
        grid.set_wall(x, rows - 1, true);
    }
    for y in 0..rows {
        grid.set_wall(0, y, true);
        grid.set_wall(cols - 1, y, true);
    }

    let mut pending = vec![Chamber {
        x: 1,
        y: 1,
        width: cols - 2,
        height: rows - 2,
    }];

    while let Some(chamber) = pending.pop() {
        if chamber.width < 3 || chamber.height < 3 {
            continue;
        }

        let horizontal = if chamber.height > chamber.width {
            true
        } else if chamber.width > chamber.height {
            false
        } else {
            rng.gen_bool(0.5)
        };

        if horizontal {
            let wall_y = pick_parity(rng, chamber.y + 1, chamber.y + chamber.height - 2, 0);
            let gap_x = pick_parity(rng, chamber.x, chamber.x + chamber.width - 1, 1);
            for x in chamber.x..chamber.x + chamber.width {
                if x != gap_x {
                    grid.set_wall(x, wall_y, true);
                }
            }
            pending.push(Chamber {
                height: wall_y - chamber.y,
                ..chamber
            });
            pending.push(Chamber {
                y: wall_y + 1,
                height: chamber.y + chamber.height - wall_y - 1,
                ..chamber
            });
        } else {
            let wall_x = pick_parity(rng, chamber.x + 1, chamber.x + chamber.width - 2, 0);
            let gap_y = pick_parity(rng, chamber.y, chamber.y + chamber.height - 1, 1);
            for y in chamber.y..chamber.y + chamber.height {
                if y != gap_y {
                    grid.set_wall(wall_x, y, true);
                }
            }
            pending.push(Chamber {
                width: wall_x - chamber.x,
                ..chamber
            });
            pending.push(Chamber {
                x: wall_x + 1,
                width: chamber.x + chamber.width - wall_x - 1,
                ..chamber
            });
        }
    }

    grid
}

/// Random value in `lo..=hi` with the given parity, falling back to `lo`
/// when the range holds no such value.
fn pick_parity<R: Rng + ?Sized>(rng: &mut R, lo: i32, hi: i32, parity: i32) -> i32 {
    let candidates: Vec<i32> = (lo..=hi).filter(|v| v.rem_euclid(2) == parity).collect();
    if candidates.is_empty() {
        return lo;
    }
    candidates[rng.gen_range(0..candidates.len())]
}
