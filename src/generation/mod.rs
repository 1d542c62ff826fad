//! Procedural grid generation.
//!
//! Every algorithm is followed by the density pass and the connectivity
//! repair pass, so any grid returned by [`generate_grid`] has a path from
//! `start` to `goal`.

pub mod maze;
pub mod repair;
pub mod terrain;

use crate::error::{GridError, Result};
use crate::grid::{Grid, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::info;

pub use repair::{apply_density, carve_corridor, is_reachable, reachable, repair_connectivity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// No layout, only the density pass places walls
    Open,
    #[default]
    RecursiveBacktracker,
    Prim,
    RecursiveDivision,
    DiamondSquare,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Open,
        Algorithm::RecursiveBacktracker,
        Algorithm::Prim,
        Algorithm::RecursiveDivision,
        Algorithm::DiamondSquare,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Open => "open",
            Algorithm::RecursiveBacktracker => "recursive backtracker",
            Algorithm::Prim => "prim",
            Algorithm::RecursiveDivision => "recursive division",
            Algorithm::DiamondSquare => "diamond-square",
        }
    }
}

/// Which field diamond-square fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    #[default]
    Elevation,
    Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub cols: i32,
    pub rows: i32,
    pub algorithm: Algorithm,
    /// Fraction of remaining open cells turned into walls, in [0, 1]
    pub wall_density: f32,
    pub roughness: f32,
    pub terrain: TerrainKind,
    /// Defaults to the top-left cell
    pub start: Option<Position>,
    /// Defaults to the bottom-right cell
    pub goal: Option<Position>,
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            cols: 21,
            rows: 21,
            algorithm: Algorithm::default(),
            wall_density: 0.0,
            roughness: 0.5,
            terrain: TerrainKind::default(),
            start: None,
            goal: None,
            seed: None,
        }
    }
}

impl GenerationParams {
    pub fn new(cols: i32, rows: i32, algorithm: Algorithm) -> Self {
        GenerationParams {
            cols,
            rows,
            algorithm,
            ..Default::default()
        }
    }

    pub fn start(&self) -> Position {
        self.start.unwrap_or(Position::new(0, 0))
    }

    pub fn goal(&self) -> Position {
        self.goal.unwrap_or(Position::new(self.cols - 1, self.rows - 1))
    }

    pub fn validate(&self) -> Result<()> {
        // Cell ids are i32, so the whole grid must be addressable as one
        if self.cols <= 0 || self.rows <= 0 || self.cols.checked_mul(self.rows).is_none() {
            return Err(GridError::InvalidDimensions {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if !(0.0..=1.0).contains(&self.wall_density) {
            return Err(GridError::InvalidParameter(format!(
                "wall density {} outside [0, 1]",
                self.wall_density
            )));
        }
        if !(self.roughness >= 0.0) {
            return Err(GridError::InvalidParameter(format!(
                "roughness {} must be non-negative",
                self.roughness
            )));
        }
        for pos in [self.start(), self.goal()] {
            if pos.x < 0 || pos.x >= self.cols || pos.y < 0 || pos.y >= self.rows {
                return Err(GridError::OutOfBounds {
                    x: pos.x,
                    y: pos.y,
                    cols: self.cols,
                    rows: self.rows,
                });
            }
        }
        Ok(())
    }
}

/// Generate a grid, seeding the RNG from `params.seed` when present
pub fn generate_grid(params: &GenerationParams) -> Result<Grid> {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    generate_grid_with(params, &mut rng)
}

/// Run the selected algorithm, then the density and repair passes
pub fn generate_grid_with<R: Rng + ?Sized>(params: &GenerationParams, rng: &mut R) -> Result<Grid> {
    params.validate()?;
    let (cols, rows) = (params.cols, params.rows);

    let mut grid = match params.algorithm {
        Algorithm::Open => Grid::new(cols, rows),
        Algorithm::RecursiveBacktracker => maze::recursive_backtracker(cols, rows, rng),
        Algorithm::Prim => maze::prim(cols, rows, rng),
        Algorithm::RecursiveDivision => maze::recursive_division(cols, rows, rng),
        Algorithm::DiamondSquare => match params.terrain {
            TerrainKind::Elevation => terrain::elevation_grid(cols, rows, params.roughness, rng),
            TerrainKind::Color => terrain::color_grid(cols, rows, params.roughness, rng),
        },
    };

    let start = params.start();
    let goal = params.goal();
    let added = apply_density(&mut grid, params.wall_density, start, goal, rng);
    let carved = repair_connectivity(&mut grid, start, goal);
    grid.revision = 0;

    info!(
        algorithm = params.algorithm.name(),
        cols,
        rows,
        walls = grid.wall_count(),
        density_walls = added,
        repaired = carved,
        "generated grid"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Connectivity;

    #[test]
    fn test_rejects_degenerate_dimensions() {
        let params = GenerationParams::new(0, 10, Algorithm::Prim);
        assert_eq!(
            generate_grid(&params).unwrap_err(),
            GridError::InvalidDimensions { cols: 0, rows: 10 }
        );
        let params = GenerationParams::new(5, -1, Algorithm::Open);
        assert!(matches!(generate_grid(&params), Err(GridError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_rejects_bad_density() {
        let params = GenerationParams {
            wall_density: 1.5,
            ..GenerationParams::new(5, 5, Algorithm::Open)
        };
        assert!(matches!(generate_grid(&params), Err(GridError::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_goal_outside_grid() {
        let params = GenerationParams {
            goal: Some(Position::new(5, 0)),
            ..GenerationParams::new(5, 5, Algorithm::Open)
        };
        assert!(matches!(generate_grid(&params), Err(GridError::OutOfBounds { .. })));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let params = GenerationParams {
            seed: Some(1234),
            wall_density: 0.2,
            ..GenerationParams::new(15, 15, Algorithm::Prim)
        };
        let a = generate_grid(&params).unwrap();
        let b = generate_grid(&params).unwrap();
        assert_eq!(a.to_ascii(), b.to_ascii());
    }

    #[test]
    fn test_every_algorithm_is_solvable() {
        for algorithm in Algorithm::ALL {
            for seed in 0..10 {
                let params = GenerationParams {
                    seed: Some(seed),
                    wall_density: 0.3,
                    ..GenerationParams::new(12, 9, algorithm)
                };
                let grid = generate_grid(&params).unwrap();
                assert!(
                    is_reachable(&grid, params.start(), params.goal(), Connectivity::Orthogonal),
                    "{} seed {} unsolvable",
                    algorithm.name(),
                    seed
                );
            }
        }
    }
}
