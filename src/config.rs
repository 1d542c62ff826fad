use crate::error::{GridError, Result};
use crate::generation::{Algorithm, GenerationParams, TerrainKind};
use crate::grid::Connectivity;
use crate::pathfinding::CostKind;
use crate::simulation::SimulationSettings;
use serde::Deserialize;
use std::fs;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_cols")]
    pub cols: i32,
    #[serde(default = "default_rows")]
    pub rows: i32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    #[serde(default)]
    pub connectivity: Connectivity,
}

#[derive(Debug, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default = "default_wall_density")]
    pub wall_density: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default)]
    pub terrain: TerrainKind,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_speed")]
    pub speed: u32,
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: f64,
    #[serde(default = "default_max_teleports")]
    pub max_teleports: u32,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub cost: CostKind,
    /// Omit for full knowledge of the grid
    #[serde(default)]
    pub vision_radius: Option<i32>,
    #[serde(default)]
    pub starting_energy: Option<f64>,
    #[serde(default = "default_goal_count")]
    pub goal_count: usize,
    #[serde(default)]
    pub item_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct VisualConfig {
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default = "default_bg_r")]
    pub background_r: u8,
    #[serde(default = "default_bg_g")]
    pub background_g: u8,
    #[serde(default = "default_bg_b")]
    pub background_b: u8,
    #[serde(default = "default_shade_terrain")]
    pub shade_terrain: bool,
    #[serde(default = "default_show_fog")]
    pub show_fog: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

pub const CONFIG_PATH: &str = "config.toml";

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(String),
    Missing(String),
    /// The file exists but did not parse; defaults are in use
    Invalid(GridError),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("loaded configuration from {}", path),
            ConfigSource::Missing(path) => info!("no {} found, using default configuration", path),
            ConfigSource::Invalid(e) => warn!("{}; using default configuration", e),
        }
    }
}

// Default values
fn default_cols() -> i32 { 31 }
fn default_rows() -> i32 { 21 }
fn default_cell_size() -> f32 { 24.0 }
fn default_wall_density() -> f32 { 0.05 }
fn default_roughness() -> f32 { 0.5 }
fn default_speed() -> u32 { 5 }
fn default_base_interval_ms() -> f64 { 500.0 }
fn default_max_teleports() -> u32 { 3 }
fn default_goal_count() -> usize { 1 }
fn default_window_title() -> String { "GridSim - Pathfinding Playground".to_string() }
fn default_bg_r() -> u8 { 30 }
fn default_bg_g() -> u8 { 30 }
fn default_bg_b() -> u8 { 30 }
fn default_shade_terrain() -> bool { true }
fn default_show_fog() -> bool { true }
fn default_log_filter() -> String { "gridsim=info".to_string() }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: default_cols(),
            rows: default_rows(),
            cell_size: default_cell_size(),
            connectivity: Connectivity::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            wall_density: default_wall_density(),
            roughness: default_roughness(),
            terrain: TerrainKind::default(),
            seed: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            base_interval_ms: default_base_interval_ms(),
            max_teleports: default_max_teleports(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cost: CostKind::default(),
            vision_radius: None,
            starting_energy: None,
            goal_count: default_goal_count(),
            item_count: 0,
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            background_r: default_bg_r(),
            background_g: default_bg_g(),
            background_b: default_bg_b(),
            shade_terrain: default_shade_terrain(),
            show_fog: default_show_fog(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            generation: GenerationConfig::default(),
            simulation: SimulationConfig::default(),
            agent: AgentConfig::default(),
            visual: VisualConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if it is missing or
    /// invalid. The outcome is returned rather than logged so callers can
    /// report it once the log subscriber is installed.
    pub fn load_or_default(path: impl AsRef<std::path::Path>) -> (Self, ConfigSource) {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => (config, ConfigSource::File(path.display().to_string())),
                Err(e) => (Config::default(), ConfigSource::Invalid(e)),
            },
            Err(_) => (Config::default(), ConfigSource::Missing(path.display().to_string())),
        }
    }

    /// Load a specific file; unlike [`Config::load_or_default`] a missing file is an error
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| GridError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| GridError::Config(e.to_string()))
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            cols: self.grid.cols,
            rows: self.grid.rows,
            algorithm: self.generation.algorithm,
            wall_density: self.generation.wall_density,
            roughness: self.generation.roughness,
            terrain: self.generation.terrain,
            start: None,
            goal: None,
            seed: self.generation.seed,
        }
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        SimulationSettings {
            connectivity: self.grid.connectivity,
            cost: self.agent.cost,
            vision_radius: self.agent.vision_radius,
            starting_energy: self.agent.starting_energy,
            max_teleports: self.simulation.max_teleports,
            base_interval_ms: self.simulation.base_interval_ms,
            speed: self.simulation.speed,
            goal_count: self.agent.goal_count,
            item_count: self.agent.item_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.grid.cols, 31);
        assert_eq!(config.generation.algorithm, Algorithm::RecursiveBacktracker);
        assert_eq!(config.grid.connectivity, Connectivity::Orthogonal);
        assert_eq!(config.logging.filter, "gridsim=info");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r#"
            [grid]
            cols = 11
            connectivity = "octile"

            [generation]
            algorithm = "diamond_square"
            terrain = "color"
            seed = 9

            [agent]
            cost = "easiest"
            vision_radius = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.cols, 11);
        assert_eq!(config.grid.rows, 21);
        assert_eq!(config.grid.connectivity, Connectivity::Octile);

        let params = config.generation_params();
        assert_eq!(params.algorithm, Algorithm::DiamondSquare);
        assert_eq!(params.terrain, TerrainKind::Color);
        assert_eq!(params.seed, Some(9));

        let settings = config.simulation_settings();
        assert_eq!(settings.cost, CostKind::Easiest);
        assert_eq!(settings.vision_radius, Some(4));
    }

    #[test]
    fn test_load_or_default_reports_source() {
        let dir = std::env::temp_dir().join(format!("gridsim-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("absent.toml");
        let (config, source) = Config::load_or_default(&missing);
        assert_eq!(config.grid.cols, 31);
        assert!(matches!(source, ConfigSource::Missing(_)));

        let broken = dir.join("broken.toml");
        fs::write(&broken, "[grid]\ncols = \"wide\"\n").unwrap();
        let (config, source) = Config::load_or_default(&broken);
        assert_eq!(config.grid.cols, 31);
        assert!(matches!(source, ConfigSource::Invalid(GridError::Config(_))));

        let good = dir.join("good.toml");
        fs::write(&good, "[grid]\ncols = 9\n").unwrap();
        let (config, source) = Config::load_or_default(&good);
        assert_eq!(config.grid.cols, 9);
        assert!(matches!(source, ConfigSource::File(_)));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let err = Config::from_toml_str("[generation]\nalgorithm = \"kruskal\"\n").unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }
}
