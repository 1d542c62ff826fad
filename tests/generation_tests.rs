mod common;

use common::{bfs_reachable, is_connected, open_cells_and_edges};
use gridsim::generation::maze::{prim, recursive_backtracker, recursive_division};
use gridsim::generation::terrain::{diamond_square, MAX_ELEVATION, MIN_ELEVATION};
use gridsim::generation::{generate_grid, repair_connectivity, Algorithm, GenerationParams, TerrainKind};
use gridsim::grid::{Grid, Position, Terrain};
use gridsim::GridError;
use rand::rngs::StdRng;
use rand::SeedableRng;

const MAZE_SIZES: [(i32, i32); 5] = [(11, 11), (21, 15), (9, 31), (10, 8), (1, 7)];

fn assert_perfect(grid: &Grid, label: &str) {
    let (vertices, edges) = open_cells_and_edges(grid);
    assert!(vertices > 0, "{}: no open cells", label);
    assert!(is_connected(grid), "{}: open cells are not connected\n{}", label, grid.to_ascii());
    // A connected graph with V-1 edges is a tree: one simple path per pair
    assert_eq!(edges, vertices - 1, "{}: maze has a loop\n{}", label, grid.to_ascii());
}

#[test]
fn test_recursive_backtracker_is_perfect() {
    for (cols, rows) in MAZE_SIZES {
        for seed in 0..20 {
            let grid = recursive_backtracker(cols, rows, &mut StdRng::seed_from_u64(seed));
            assert_perfect(&grid, &format!("backtracker {}x{} seed {}", cols, rows, seed));
        }
    }
}

#[test]
fn test_prim_is_perfect() {
    for (cols, rows) in MAZE_SIZES {
        for seed in 0..20 {
            let grid = prim(cols, rows, &mut StdRng::seed_from_u64(seed));
            assert_perfect(&grid, &format!("prim {}x{} seed {}", cols, rows, seed));
        }
    }
}

#[test]
fn test_recursive_division_keeps_rooms_connected() {
    for seed in 0..20 {
        let grid = recursive_division(21, 15, &mut StdRng::seed_from_u64(seed));
        assert!(is_connected(&grid), "seed {}\n{}", seed, grid.to_ascii());
    }
}

#[test]
fn test_every_generated_grid_is_solvable() {
    let densities = [0.0, 0.1, 0.3, 0.5, 0.75, 0.9, 0.99];
    for algorithm in Algorithm::ALL {
        for &density in &densities {
            for seed in 0..8 {
                let params = GenerationParams {
                    wall_density: density,
                    seed: Some(seed),
                    ..GenerationParams::new(17, 13, algorithm)
                };
                let grid = generate_grid(&params).unwrap();
                assert!(
                    bfs_reachable(&grid, params.start(), params.goal()),
                    "{} density {} seed {} is unsolvable\n{}",
                    algorithm.name(),
                    density,
                    seed,
                    grid.to_ascii()
                );
            }
        }
    }
}

#[test]
fn test_custom_endpoints_are_solvable() {
    let start = Position::new(3, 8);
    let goal = Position::new(12, 1);
    for algorithm in Algorithm::ALL {
        let params = GenerationParams {
            wall_density: 0.6,
            start: Some(start),
            goal: Some(goal),
            seed: Some(11),
            ..GenerationParams::new(15, 10, algorithm)
        };
        let grid = generate_grid(&params).unwrap();
        assert!(bfs_reachable(&grid, start, goal), "{}\n{}", algorithm.name(), grid.to_ascii());
    }
}

#[test]
fn test_fully_walled_grid_is_repaired() {
    let start = Position::new(0, 0);
    let goal = Position::new(9, 9);

    let mut grid = Grid::filled(10, 10);
    assert!(!bfs_reachable(&grid, start, goal));
    assert!(repair_connectivity(&mut grid, start, goal));
    println!("{}", grid.to_ascii());
    assert!(bfs_reachable(&grid, start, goal));
    // Only the corridor was opened
    assert_eq!(grid.open_cells().count(), 19);

    let params = GenerationParams {
        wall_density: 1.0,
        seed: Some(3),
        ..GenerationParams::new(10, 10, Algorithm::Open)
    };
    let grid = generate_grid(&params).unwrap();
    assert!(bfs_reachable(&grid, start, goal));
}

#[test]
fn test_same_seed_same_grid() {
    for algorithm in Algorithm::ALL {
        let params = GenerationParams {
            wall_density: 0.2,
            seed: Some(1234),
            ..GenerationParams::new(19, 19, algorithm)
        };
        let a = generate_grid(&params).unwrap();
        let b = generate_grid(&params).unwrap();
        assert_eq!(a.to_ascii(), b.to_ascii(), "{}", algorithm.name());
        assert_eq!(a.cells(), b.cells());
    }
}

#[test]
fn test_heightmap_stays_in_range() {
    for roughness in [0.0, 0.5, 1.0, 3.0] {
        let map = diamond_square(20, roughness, &mut StdRng::seed_from_u64(2));
        assert_eq!(map.size, 33);
        assert!(map
            .heights
            .iter()
            .all(|h| (MIN_ELEVATION..=MAX_ELEVATION).contains(h)));
    }
}

#[test]
fn test_terrain_kinds_fill_every_cell() {
    let params = GenerationParams {
        seed: Some(8),
        terrain: TerrainKind::Color,
        ..GenerationParams::new(12, 7, Algorithm::DiamondSquare)
    };
    let grid = generate_grid(&params).unwrap();
    assert!(grid.cells().iter().all(|c| matches!(c.terrain, Terrain::Color(_))));

    let params = GenerationParams {
        terrain: TerrainKind::Elevation,
        ..params
    };
    let grid = generate_grid(&params).unwrap();
    assert!(grid.cells().iter().all(|c| matches!(c.terrain, Terrain::Elevation(_))));
}

#[test]
fn test_oversized_grid_is_rejected() {
    for (cols, rows) in [(100_000, 100_000), (i32::MAX, 2), (0, 5), (5, -1)] {
        let params = GenerationParams::new(cols, rows, Algorithm::Open);
        assert_eq!(
            generate_grid(&params).unwrap_err(),
            GridError::InvalidDimensions { cols, rows },
            "{}x{}",
            cols,
            rows
        );
    }
}
