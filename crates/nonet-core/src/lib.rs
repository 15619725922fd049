//! Core engine for 9x9 number-place puzzles.
//!
//! Provides the grid model, a randomized backtracking generator, clue-count
//! based puzzle derivation, and pure constraint checks. Session state
//! (moves, notes, mistakes, snapshots) lives in the `nonet-game` crate.

mod generator;
mod grid;
mod validator;

pub use generator::Generator;
pub use grid::{Grid, Position, BLOCK_SIZE, CELL_COUNT, GRID_SIZE};
pub use validator::{is_solved_grid, is_valid_placement};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty level for puzzle derivation.
///
/// Difficulty is controlled purely by how many cells of the solution are
/// revealed as clues; no solvability rating runs at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Number of cells revealed from the solution at this level.
    pub fn clue_count(self) -> usize {
        match self {
            Difficulty::Easy => 45,
            Difficulty::Medium => 35,
            Difficulty::Hard => 25,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        write!(f, "{}", name)
    }
}
