use nonet_core::{is_solved_grid, Grid, Position};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Durable state of one game session, ready for handoff to whatever store
/// the embedding application uses. Grids travel in their compact
/// 81-character form. Elapsed play time is deliberately absent: resuming
/// resets the clock, only grid state and counters persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub puzzle: String,
    pub original: String,
    pub solution: String,
    pub mistakes: usize,
    pub completed: bool,
}

/// The one irrecoverable condition in the engine: a persisted snapshot
/// that cannot be decoded into a coherent game. Prescribed recovery is to
/// discard it and start a fresh game (see `GameState::restore_or_new`).
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot does not parse: {0}")]
    Unreadable(#[from] serde_json::Error),
    #[error("{0} grid does not decode")]
    BadGrid(&'static str),
    #[error("solution grid is not a valid completed grid")]
    InvalidSolution,
    #[error("puzzle and original grids are inconsistent with the solution")]
    Inconsistent,
}

impl Snapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode and cross-check the three grids.
    ///
    /// The solution must be a valid completed grid; every original clue
    /// must match the solution and still be present in the puzzle. Player
    /// entries in the puzzle are only required to decode; they may
    /// legally differ from the solution, since move validation is
    /// constraint-based.
    pub(crate) fn decode_grids(&self) -> Result<(Grid, Grid, Grid), SnapshotError> {
        let puzzle = Grid::from_string(&self.puzzle).ok_or(SnapshotError::BadGrid("puzzle"))?;
        let original =
            Grid::from_string(&self.original).ok_or(SnapshotError::BadGrid("original"))?;
        let solution =
            Grid::from_string(&self.solution).ok_or(SnapshotError::BadGrid("solution"))?;

        if !is_solved_grid(&solution) {
            return Err(SnapshotError::InvalidSolution);
        }
        for pos in Position::all() {
            if let Some(value) = original.get(pos) {
                if solution.get(pos) != Some(value) || puzzle.get(pos) != Some(value) {
                    return Err(SnapshotError::Inconsistent);
                }
            }
        }
        Ok((puzzle, original, solution))
    }
}
