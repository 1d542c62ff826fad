use crate::grid::{Grid, Position};
use crate::pathfinding::Passable;
use std::collections::HashSet;

/// Cells on the Bresenham line from `from` to `to`, both endpoints included
pub fn line(from: Position, to: Position) -> Vec<Position> {
    let mut cells = Vec::new();
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);

    loop {
        cells.push(Position::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// True when no wall lies strictly between `from` and `to`
pub fn line_of_sight(grid: &Grid, from: Position, to: Position) -> bool {
    let cells = line(from, to);
    cells
        .iter()
        .skip(1)
        .take(cells.len().saturating_sub(2))
        .all(|&p| grid.is_open(p))
}

/// Every cell within `radius` of `origin` that `origin` can see.
///
/// Walls are included when visible; that is how they get discovered.
pub fn field_of_view(grid: &Grid, origin: Position, radius: i32) -> HashSet<Position> {
    let mut visible = HashSet::new();
    if !grid.contains(origin) {
        return visible;
    }

    let r2 = radius * radius;
    for y in (origin.y - radius).max(0)..=(origin.y + radius).min(grid.rows - 1) {
        for x in (origin.x - radius).max(0)..=(origin.x + radius).min(grid.cols - 1) {
            let target = Position::new(x, y);
            if origin.distance_squared(&target) <= r2 && line_of_sight(grid, origin, target) {
                visible.insert(target);
            }
        }
    }
    visible
}

/// What an agent has learned about the walls around it
#[derive(Debug, Clone)]
pub struct KnowledgeMap {
    cols: i32,
    known_wall: Vec<bool>,
    seen: Vec<bool>,
    visible: HashSet<Position>,
}

impl KnowledgeMap {
    pub fn new(grid: &Grid) -> Self {
        KnowledgeMap {
            cols: grid.cols,
            known_wall: vec![false; grid.len()],
            seen: vec![false; grid.len()],
            visible: HashSet::new(),
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.cols {
            return None;
        }
        let i = (pos.x + pos.y * self.cols) as usize;
        (i < self.seen.len()).then_some(i)
    }

    /// Look around from `origin` and record what is visible.
    ///
    /// Returns the walls that were not known before this observation.
    pub fn observe(&mut self, grid: &Grid, origin: Position, radius: i32) -> Vec<Position> {
        self.visible = field_of_view(grid, origin, radius);
        let mut discovered = Vec::new();
        for &pos in &self.visible {
            let Some(i) = self.index(pos) else {
                continue;
            };
            let wall = grid.is_wall_at(pos);
            if wall && !self.known_wall[i] {
                discovered.push(pos);
            }
            self.known_wall[i] = wall;
            self.seen[i] = true;
        }
        discovered.sort();
        discovered
    }

    pub fn is_known_wall(&self, pos: Position) -> bool {
        self.index(pos).map(|i| self.known_wall[i]).unwrap_or(true)
    }

    pub fn is_seen(&self, pos: Position) -> bool {
        self.index(pos).map(|i| self.seen[i]).unwrap_or(false)
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        self.visible.contains(&pos)
    }

    pub fn visible(&self) -> &HashSet<Position> {
        &self.visible
    }

    pub fn seen_count(&self) -> usize {
        self.seen.iter().filter(|s| **s).count()
    }
}

/// Partial-observability passability: visible cells use the real grid,
/// everything else is open unless remembered as a wall.
#[derive(Debug, Clone, Copy)]
pub struct FogOfWar<'a> {
    pub knowledge: &'a KnowledgeMap,
}

impl Passable for FogOfWar<'_> {
    fn passable(&self, grid: &Grid, pos: Position) -> bool {
        if !grid.contains(pos) {
            return false;
        }
        if self.knowledge.is_visible(pos) {
            grid.is_open(pos)
        } else {
            !self.knowledge.is_known_wall(pos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Connectivity;
    use crate::pathfinding::{find_path, Distance, UniformCost};

    #[test]
    fn test_line_endpoints() {
        let cells = line(Position::new(0, 0), Position::new(3, 1));
        assert_eq!(cells.first(), Some(&Position::new(0, 0)));
        assert_eq!(cells.last(), Some(&Position::new(3, 1)));
        assert_eq!(cells.len(), 4);
    }

    #[test]
    fn test_wall_blocks_sight_but_is_seen() {
        let grid = Grid::from_ascii(
            "\
□□□□□
□□■□□
□□□□□",
        )
        .unwrap();
        let fov = field_of_view(&grid, Position::new(0, 1), 5);
        assert!(fov.contains(&Position::new(2, 1)));
        assert!(!fov.contains(&Position::new(3, 1)));
        assert!(fov.contains(&Position::new(4, 0)) || fov.contains(&Position::new(4, 2)));
    }

    #[test]
    fn test_radius_limits_view() {
        let grid = Grid::new(10, 10);
        let fov = field_of_view(&grid, Position::new(0, 0), 2);
        assert!(fov.contains(&Position::new(2, 0)));
        assert!(!fov.contains(&Position::new(2, 2)));
        assert!(!fov.contains(&Position::new(3, 0)));
    }

    #[test]
    fn test_observe_reports_new_walls_once() {
        let grid = Grid::from_ascii("□□■□\n").unwrap();
        let mut map = KnowledgeMap::new(&grid);
        assert_eq!(map.observe(&grid, Position::new(0, 0), 3), vec![Position::new(2, 0)]);
        assert!(map.is_known_wall(Position::new(2, 0)));
        assert!(map.observe(&grid, Position::new(1, 0), 3).is_empty());
        assert!(!map.is_seen(Position::new(3, 0)));
    }

    #[test]
    fn test_fog_paths_through_unknown() {
        let grid = Grid::from_ascii(
            "\
□□□□□
■■■■□
□□□□□",
        )
        .unwrap();
        let map = KnowledgeMap::new(&grid);
        let fog = FogOfWar { knowledge: &map };
        // Nothing observed yet, so the straight line down looks open
        let path = find_path(
            &grid,
            Position::new(0, 0),
            Position::new(0, 2),
            &UniformCost,
            &Distance::Manhattan,
            &fog,
            Connectivity::Orthogonal,
        )
        .unwrap();
        assert_eq!(path.len(), 2);
    }
}
