use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(&self, other: &Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Calculate Euclidean distance squared (avoid sqrt for performance)
    pub fn distance_squared(&self, other: &Position) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// True when the step to `other` changes both coordinates
    pub fn is_diagonal_to(&self, other: &Position) -> bool {
        self.x != other.x && self.y != other.y
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Terrain attributes carried by a cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum Terrain {
    #[default]
    Flat,
    /// Elevation in [0, 100]
    Elevation(f32),
    /// Independent red/green/blue channels
    Color([u8; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Cell {
    pub is_wall: bool,
    pub terrain: Terrain,
}

/// Neighbor adjacency rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// 4 directions
    #[default]
    Orthogonal,
    /// 8 directions, no corner cutting
    Octile,
}

const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const OCTILE: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

impl Connectivity {
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Connectivity::Orthogonal => &ORTHOGONAL,
            Connectivity::Octile => &OCTILE,
        }
    }
}

/// Grid of cells with walls and terrain.
///
/// Dimensions are fixed for the lifetime of the grid. Every wall edit bumps
/// `revision` so that paths computed against an older layout can be detected
/// as stale.
#[derive(Debug, Clone, Serialize)]
pub struct Grid {
    pub cols: i32,
    pub rows: i32,
    cells: Vec<Cell>,
    /// Revision number - incremented whenever a wall changes
    pub revision: u64,
}

impl Grid {
    /// Create a new grid with every cell open
    pub fn new(cols: i32, rows: i32) -> Self {
        let len = cols.max(0) as usize * rows.max(0) as usize;
        Grid {
            cols: cols.max(0),
            rows: rows.max(0),
            cells: vec![Cell::default(); len],
            revision: 0,
        }
    }

    /// Create a grid where every cell is a wall
    pub fn filled(cols: i32, rows: i32) -> Self {
        let mut grid = Self::new(cols, rows);
        for cell in &mut grid.cells {
            cell.is_wall = true;
        }
        grid
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.cols && y >= 0 && y < self.rows
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.in_bounds(pos.x, pos.y)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Convert (x, y) coordinates to cell ID
    pub fn get_id(&self, x: i32, y: i32) -> i32 {
        x + y * self.cols
    }

    /// Convert cell ID to (x, y) coordinates
    pub fn get_coords(&self, id: i32) -> (i32, i32) {
        (id % self.cols, id / self.cols)
    }

    /// Bounds-checked index into the cell array
    pub fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| self.get_id(pos.x, pos.y) as usize)
    }

    pub fn position_of(&self, index: usize) -> Position {
        let (x, y) = self.get_coords(index as i32);
        Position::new(x, y)
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Check if the cell at (x, y) is a wall. Out of bounds counts as wall.
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        match self.index(Position::new(x, y)) {
            Some(i) => self.cells[i].is_wall,
            None => true,
        }
    }

    pub fn is_wall_at(&self, pos: Position) -> bool {
        self.is_wall(pos.x, pos.y)
    }

    pub fn is_open(&self, pos: Position) -> bool {
        !self.is_wall_at(pos)
    }

    /// Set wall state at (x, y). Out of bounds is ignored.
    pub fn set_wall(&mut self, x: i32, y: i32, wall: bool) {
        if let Some(i) = self.index(Position::new(x, y)) {
            if self.cells[i].is_wall != wall {
                self.cells[i].is_wall = wall;
                self.revision += 1;
            }
        }
    }

    pub fn try_set_wall(&mut self, pos: Position, wall: bool) -> Result<()> {
        if !self.contains(pos) {
            return Err(self.out_of_bounds(pos));
        }
        self.set_wall(pos.x, pos.y, wall);
        Ok(())
    }

    /// Flip a cell between wall and open. Returns the new wall state.
    pub fn toggle_wall(&mut self, pos: Position) -> Result<bool> {
        let wall = !self.is_wall_at(pos);
        self.try_set_wall(pos, wall)?;
        Ok(wall)
    }

    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) {
        if let Some(i) = self.index(pos) {
            self.cells[i].terrain = terrain;
        }
    }

    /// Elevation of a cell, 0 for flat or coloured terrain
    pub fn elevation(&self, pos: Position) -> f32 {
        match self.cell(pos).map(|c| c.terrain) {
            Some(Terrain::Elevation(e)) => e,
            _ => 0.0,
        }
    }

    /// RGB channels of a cell, black for anything without colour
    pub fn color(&self, pos: Position) -> [u8; 3] {
        match self.cell(pos).map(|c| c.terrain) {
            Some(Terrain::Color(rgb)) => rgb,
            _ => [0, 0, 0],
        }
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_wall).count()
    }

    pub fn open_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_wall)
            .map(|(i, _)| self.position_of(i))
    }

    /// In-bounds non-wall neighbors of `pos`
    pub fn neighbors(&self, pos: Position, connectivity: Connectivity) -> Vec<Position> {
        self.neighbors_where(pos, connectivity, |p| self.is_open(p))
    }

    /// In-bounds neighbors of `pos` accepted by `passable`.
    ///
    /// A diagonal step is only offered when both shoulder cells it would
    /// squeeze between are passable too.
    pub fn neighbors_where<F>(&self, pos: Position, connectivity: Connectivity, passable: F) -> Vec<Position>
    where
        F: Fn(Position) -> bool,
    {
        let mut result = Vec::with_capacity(8);
        for &(dx, dy) in connectivity.offsets() {
            let next = pos.offset(dx, dy);
            if !self.contains(next) || !passable(next) {
                continue;
            }
            if dx != 0 && dy != 0 {
                let shoulder_x = pos.offset(dx, 0);
                let shoulder_y = pos.offset(0, dy);
                if !passable(shoulder_x) || !passable(shoulder_y) {
                    continue;
                }
            }
            result.push(next);
        }
        result
    }

    /// Parse a grid from the text notation used in tests and the clipboard:
    /// `■` or `#` is a wall, `□`, `.` or space is open.
    pub fn from_ascii(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .collect();

        let cols = lines.first().map(|l| l.chars().count() as i32).unwrap_or(0);
        let rows = lines.len() as i32;
        if cols == 0 || rows == 0 {
            return Err(GridError::InvalidDimensions { cols, rows });
        }

        let mut grid = Grid::new(cols, rows);
        for (y, line) in lines.iter().enumerate() {
            if line.chars().count() as i32 != cols {
                return Err(GridError::InvalidParameter(format!(
                    "row {} has {} columns, expected {}",
                    y,
                    line.chars().count(),
                    cols
                )));
            }
            for (x, ch) in line.chars().enumerate() {
                match ch {
                    '■' | '#' => grid.set_wall(x as i32, y as i32, true),
                    '□' | '.' | ' ' => {}
                    other => {
                        return Err(GridError::InvalidParameter(format!(
                            "unexpected character '{}' at ({},{})",
                            other, x, y
                        )))
                    }
                }
            }
        }
        grid.revision = 0;
        Ok(grid)
    }

    /// Render the grid in the `■`/`□` notation
    pub fn to_ascii(&self) -> String {
        self.render_with(|_| None)
    }

    /// Render the grid, letting `overlay` replace the symbol of any cell
    pub fn render_with<F>(&self, overlay: F) -> String
    where
        F: Fn(Position) -> Option<char>,
    {
        let mut result = String::with_capacity(self.cells.len() * 3 + self.rows as usize);
        for y in 0..self.rows {
            for x in 0..self.cols {
                let pos = Position::new(x, y);
                let symbol = overlay(pos).unwrap_or(if self.is_wall(x, y) { '■' } else { '□' });
                result.push(symbol);
            }
            result.push('\n');
        }
        result
    }

    fn out_of_bounds(&self, pos: Position) -> GridError {
        GridError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            cols: self.cols,
            rows: self.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_is_wall() {
        let grid = Grid::new(4, 3);
        assert!(grid.is_wall(-1, 0));
        assert!(grid.is_wall(4, 0));
        assert!(grid.is_wall(0, 3));
        assert!(!grid.is_wall(3, 2));
        assert_eq!(grid.index(Position::new(4, 0)), None);
    }

    #[test]
    fn test_revision_only_bumps_on_change() {
        let mut grid = Grid::new(5, 5);
        grid.set_wall(1, 1, true);
        grid.set_wall(1, 1, true);
        assert_eq!(grid.revision, 1);
        grid.set_wall(1, 1, false);
        assert_eq!(grid.revision, 2);
    }

    #[test]
    fn test_try_set_wall_rejects_out_of_bounds() {
        let mut grid = Grid::new(3, 3);
        let err = grid.try_set_wall(Position::new(3, 1), true).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { x: 3, y: 1, .. }));
    }

    #[test]
    fn test_orthogonal_neighbors_at_corner() {
        let grid = Grid::new(5, 5);
        let n = grid.neighbors(Position::new(0, 0), Connectivity::Orthogonal);
        assert_eq!(n, vec![Position::new(1, 0), Position::new(0, 1)]);
    }

    #[test]
    fn test_octile_neighbors_open_field() {
        let grid = Grid::new(5, 5);
        let n = grid.neighbors(Position::new(2, 2), Connectivity::Octile);
        assert_eq!(n.len(), 8);
    }

    #[test]
    fn test_octile_blocks_corner_cutting() {
        let grid = Grid::from_ascii(
            "\
□■□
□□□
□□□",
        )
        .unwrap();
        let n = grid.neighbors(Position::new(0, 1), Connectivity::Octile);
        assert!(!n.contains(&Position::new(1, 0)));

        let n = grid.neighbors(Position::new(0, 0), Connectivity::Octile);
        // shoulder (1,0) is a wall
        assert!(!n.contains(&Position::new(1, 1)));
        assert!(n.contains(&Position::new(0, 1)));
    }

    #[test]
    fn test_ascii_round_trip() {
        let text = "■□■\n□□□\n";
        let grid = Grid::from_ascii(text).unwrap();
        assert_eq!(grid.cols, 3);
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.wall_count(), 2);
        assert_eq!(grid.to_ascii(), text);
    }

    #[test]
    fn test_ascii_rejects_ragged_rows() {
        assert!(Grid::from_ascii("□□□\n□□\n").is_err());
    }

    #[test]
    fn test_terrain_accessors() {
        let mut grid = Grid::new(2, 1);
        grid.set_terrain(Position::new(0, 0), Terrain::Elevation(42.0));
        grid.set_terrain(Position::new(1, 0), Terrain::Color([1, 2, 3]));
        assert_eq!(grid.elevation(Position::new(0, 0)), 42.0);
        assert_eq!(grid.elevation(Position::new(1, 0)), 0.0);
        assert_eq!(grid.color(Position::new(1, 0)), [1, 2, 3]);
    }
}
