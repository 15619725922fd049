//! Game session layer for the nonet puzzle engine.
//!
//! Wraps a generated puzzle in a [`GameState`] that applies moves against
//! row/column/block constraints, tracks mistakes and pencil notes, hands
//! out hints, and round-trips through a JSON snapshot for external
//! persistence. Grid generation and the pure constraint checks live in
//! `nonet-core`.

mod cache;
mod game;
mod notes;
mod snapshot;

pub use game::{CellFeedback, GameState, Hint, MoveOutcome};
pub use notes::NoteSet;
pub use snapshot::{Snapshot, SnapshotError};
