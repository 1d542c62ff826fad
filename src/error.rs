//! Error types for the grid engine.
//!
//! Every fallible operation returns [`GridError`] through the crate's
//! [`Result`] alias.

use crate::grid::Position;

/// Errors that can occur while generating, editing or searching a grid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// The open set was exhausted before the goal was reached.
    #[error("no path from {start} to {goal}")]
    NoPathFound {
        /// Where the search started.
        start: Position,
        /// The unreachable goal.
        goal: Position,
    },

    /// A coordinate fell outside `[0, cols) x [0, rows)`.
    #[error("({x}, {y}) is outside the {cols}x{rows} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        cols: i32,
        rows: i32,
    },

    /// Width or height is not positive.
    #[error("invalid grid dimensions {cols}x{rows}")]
    InvalidDimensions { cols: i32, rows: i32 },

    /// A generation or simulation parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The configuration file could not be understood.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
