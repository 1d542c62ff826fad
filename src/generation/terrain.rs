use crate::grid::{Grid, Position, Terrain};
use rand::Rng;

pub const MIN_ELEVATION: f32 = 0.0;
pub const MAX_ELEVATION: f32 = 100.0;

/// Square heightmap of side `2^n + 1` produced by diamond-square
pub struct Heightmap {
    pub size: usize,
    pub heights: Vec<f32>,
}

impl Heightmap {
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.heights[y * self.size + x]
    }

    fn set(&mut self, x: usize, y: usize, value: f32) {
        self.heights[y * self.size + x] = value;
    }
}

/// Smallest `2^n + 1` that covers `extent`
pub fn padded_size(extent: usize) -> usize {
    let mut side = 1;
    while side + 1 < extent {
        side *= 2;
    }
    side + 1
}

fn noise<R: Rng + ?Sized>(rng: &mut R, roughness: f32, scale: f32) -> f32 {
    rng.gen_range(-1.0f32..=1.0) * roughness * scale
}

/// Diamond-square midpoint displacement over a map covering `extent` cells
/// on each side.
///
/// Corners start uniformly random in [0, 100]. Each pass displaces centres
/// and edge midpoints by noise scaled with `roughness * scale`, halving
/// `scale` every level. Every value is clamped to [0, 100].
pub fn diamond_square<R: Rng + ?Sized>(extent: usize, roughness: f32, rng: &mut R) -> Heightmap {
    let size = padded_size(extent.max(2));
    let mut map = Heightmap {
        size,
        heights: vec![0.0; size * size],
    };

    let last = size - 1;
    for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
        map.set(x, y, rng.gen_range(MIN_ELEVATION..=MAX_ELEVATION));
    }

    let mut step = last;
    let mut scale = MAX_ELEVATION / 2.0;

    while step > 1 {
        let half = step / 2;

        // Diamond: centre of every square
        for y in (0..last).step_by(step) {
            for x in (0..last).step_by(step) {
                let average = (map.get(x, y)
                    + map.get(x + step, y)
                    + map.get(x, y + step)
                    + map.get(x + step, y + step))
                    / 4.0;
                let value = average + noise(rng, roughness, scale);
                map.set(x + half, y + half, value.clamp(MIN_ELEVATION, MAX_ELEVATION));
            }
        }

        // Square: every edge midpoint, averaging whichever of its four
        // diamond neighbors fall inside the map
        for y in (0..=last).step_by(half) {
            let x_start = if (y / half) % 2 == 0 { half } else { 0 };
            for x in (x_start..=last).step_by(step) {
                let mut sum = 0.0;
                let mut count = 0.0;
                if y >= half {
                    sum += map.get(x, y - half);
                    count += 1.0;
                }
                if y + half <= last {
                    sum += map.get(x, y + half);
                    count += 1.0;
                }
                if x >= half {
                    sum += map.get(x - half, y);
                    count += 1.0;
                }
                if x + half <= last {
                    sum += map.get(x + half, y);
                    count += 1.0;
                }
                let value = sum / count + noise(rng, roughness, scale);
                map.set(x, y, value.clamp(MIN_ELEVATION, MAX_ELEVATION));
            }
        }

        step = half;
        scale /= 2.0;
    }

    map
}

/// Open grid whose cells carry a diamond-square elevation
pub fn elevation_grid<R: Rng + ?Sized>(cols: i32, rows: i32, roughness: f32, rng: &mut R) -> Grid {
    let mut grid = Grid::new(cols, rows);
    let map = diamond_square(cols.max(rows) as usize, roughness, rng);
    for y in 0..rows {
        for x in 0..cols {
            let h = map.get(x as usize, y as usize);
            grid.set_terrain(Position::new(x, y), Terrain::Elevation(h));
        }
    }
    grid
}

/// Open grid whose red, green and blue channels are three independent
/// heightmaps rescaled to [0, 255]
pub fn color_grid<R: Rng + ?Sized>(cols: i32, rows: i32, roughness: f32, rng: &mut R) -> Grid {
    let mut grid = Grid::new(cols, rows);
    let extent = cols.max(rows) as usize;
    let channels = [
        diamond_square(extent, roughness, rng),
        diamond_square(extent, roughness, rng),
        diamond_square(extent, roughness, rng),
    ];
    for y in 0..rows {
        for x in 0..cols {
            let rgb = [0, 1, 2].map(|c| to_channel(channels[c].get(x as usize, y as usize)));
            grid.set_terrain(Position::new(x, y), Terrain::Color(rgb));
        }
    }
    grid
}

fn to_channel(elevation: f32) -> u8 {
    (elevation / MAX_ELEVATION * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(2), 2);
        assert_eq!(padded_size(3), 3);
        assert_eq!(padded_size(4), 5);
        assert_eq!(padded_size(5), 5);
        assert_eq!(padded_size(6), 9);
        assert_eq!(padded_size(50), 65);
    }

    #[test]
    fn test_heights_clamped() {
        let mut rng = StdRng::seed_from_u64(11);
        let map = diamond_square(33, 5.0, &mut rng);
        assert_eq!(map.size, 33);
        assert!(map
            .heights
            .iter()
            .all(|h| (MIN_ELEVATION..=MAX_ELEVATION).contains(h)));
    }

    #[test]
    fn test_zero_roughness_is_smooth() {
        let mut rng = StdRng::seed_from_u64(5);
        let map = diamond_square(9, 0.0, &mut rng);
        let corners = [map.get(0, 0), map.get(8, 0), map.get(0, 8), map.get(8, 8)];
        let lo = corners.iter().cloned().fold(f32::MAX, f32::min);
        let hi = corners.iter().cloned().fold(f32::MIN, f32::max);
        // Pure averaging never leaves the range spanned by the corners
        assert!(map.heights.iter().all(|h| *h >= lo - 1e-3 && *h <= hi + 1e-3));
    }

    #[test]
    fn test_every_cell_filled() {
        let mut rng = StdRng::seed_from_u64(2);
        let grid = elevation_grid(12, 7, 0.6, &mut rng);
        assert_eq!(grid.wall_count(), 0);
        assert!(grid
            .cells()
            .iter()
            .all(|c| matches!(c.terrain, Terrain::Elevation(_))));
    }

    #[test]
    fn test_color_grid_channels() {
        let mut rng = StdRng::seed_from_u64(8);
        let grid = color_grid(6, 6, 0.5, &mut rng);
        assert!(grid.cells().iter().all(|c| matches!(c.terrain, Terrain::Color(_))));
    }
}
