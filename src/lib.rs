pub mod agent;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod grid;
pub mod pathfinding;
pub mod simulation;
pub mod telemetry;
pub mod visibility;

pub use agent::Agent;
pub use clock::SimulationClock;
pub use controller::{AgentController, ControllerState, StepEffect, Target};
pub use error::{GridError, Result};
pub use generation::{generate_grid, Algorithm, GenerationParams};
pub use grid::{Connectivity, Grid, Position};
pub use pathfinding::{find_path, shortest_path, Path, Planner};
pub use simulation::{Simulation, SimulationSettings};
