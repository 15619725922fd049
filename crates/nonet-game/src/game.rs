use crate::cache::QueryCache;
use crate::notes::NoteSet;
use crate::snapshot::{Snapshot, SnapshotError};
use log::{info, warn};
use nonet_core::{
    is_solved_grid, is_valid_placement, Difficulty, Generator, Grid, Position, BLOCK_SIZE,
    GRID_SIZE,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Result of a placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The value was written into the puzzle.
    Accepted,
    /// Nothing was written. A constraint violation also bumps the mistake
    /// counter; attempts on fixed cells or finished games do not.
    Rejected,
}

/// Per-cell feedback mark for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFeedback {
    /// A value was entered successfully.
    Entry,
    /// A rejected, constraint-violating attempt.
    Error,
}

/// The solution value for one currently open cell. Returned by the hint
/// queries; never applied by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub pos: Position,
    pub value: u8,
}

/// One game session.
///
/// Owns the visible puzzle, the fixed original layout, the solution it was
/// derived from, pencil notes, and the mistake/completion counters.
/// Mutations must be serialized by the caller (single-writer); the only
/// heavy phase is solution generation, which is pure and can run on a
/// worker thread before [`GameState::from_solution`] publishes the result.
#[derive(Debug, Clone)]
pub struct GameState {
    puzzle: Grid,
    original: Grid,
    solution: Grid,
    notes: [[NoteSet; GRID_SIZE]; GRID_SIZE],
    mistakes: usize,
    hints_used: usize,
    completed: bool,
    selected: Option<Position>,
    last_feedback: Option<(Position, CellFeedback)>,
    cache: QueryCache,
}

impl GameState {
    /// Start a new game at the given difficulty.
    ///
    /// Runs both phases inline; interactive callers usually run
    /// [`Generator::generate_solution`] on a worker first and pass the
    /// result to [`GameState::from_solution`].
    pub fn new(difficulty: Difficulty) -> Self {
        let mut generator = Generator::new();
        Self::with_generator(&mut generator, difficulty)
    }

    /// Start a new game with a caller-supplied generator, e.g. a seeded
    /// one for reproducible runs.
    pub fn with_generator(generator: &mut Generator, difficulty: Difficulty) -> Self {
        let solution = generator.generate_solution();
        Self::finalize(solution, generator, difficulty)
    }

    /// Cheap finalize phase: derive the puzzle from an already generated
    /// solution and reset all counters. This is the only phase that
    /// produces externally observable state, so it belongs on whatever
    /// thread owns the session.
    pub fn from_solution(solution: Grid, difficulty: Difficulty) -> Self {
        let mut generator = Generator::new();
        Self::finalize(solution, &mut generator, difficulty)
    }

    fn finalize(solution: Grid, generator: &mut Generator, difficulty: Difficulty) -> Self {
        debug_assert!(is_solved_grid(&solution));
        let (puzzle, original) = generator.derive(&solution, difficulty.clue_count());
        info!("new {} game, {} clues", difficulty, difficulty.clue_count());
        Self {
            puzzle,
            original,
            solution,
            notes: [[NoteSet::empty(); GRID_SIZE]; GRID_SIZE],
            mistakes: 0,
            hints_used: 0,
            completed: false,
            selected: None,
            last_feedback: None,
            cache: QueryCache::new(),
        }
    }

    /// Rebuild a session from a decoded snapshot.
    ///
    /// Notes, the cursor and the hint counter are not part of the durable
    /// contract and come back empty.
    pub fn restore(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let (puzzle, original, solution) = snapshot.decode_grids()?;
        Ok(Self {
            puzzle,
            original,
            solution,
            notes: [[NoteSet::empty(); GRID_SIZE]; GRID_SIZE],
            mistakes: snapshot.mistakes,
            hints_used: 0,
            completed: snapshot.completed,
            selected: None,
            last_feedback: None,
            cache: QueryCache::new(),
        })
    }

    /// Resume from persisted JSON, or fall back to a fresh game when the
    /// data is missing or corrupt. The fallback is the prescribed recovery:
    /// a bad save is discarded, never surfaced to the player.
    pub fn restore_or_new(json: &str, difficulty: Difficulty) -> Self {
        match Snapshot::from_json(json).and_then(|snapshot| Self::restore(&snapshot)) {
            Ok(game) => game,
            Err(err) => {
                warn!("discarding unusable save: {}", err);
                Self::new(difficulty)
            }
        }
    }

    /// Capture the durable state for external storage. Callers pull one of
    /// these after each mutation they want persisted; the engine itself
    /// never talks to a store.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            puzzle: self.puzzle.to_string_compact(),
            original: self.original.to_string_compact(),
            solution: self.solution.to_string_compact(),
            mistakes: self.mistakes,
            completed: self.completed,
        }
    }

    // ==================== Moves ====================

    /// Attempt to place `value` at `pos`.
    ///
    /// Fixed cells, out-of-range values and finished games are no-ops
    /// returning [`MoveOutcome::Rejected`] with no side effects. Otherwise
    /// the placement is checked against the current puzzle's row, column
    /// and block: a valid value is written (clearing the cell's notes and
    /// dropping the digit from peer notes), an invalid one is counted as a
    /// mistake and never written. Whether the value matches the generated
    /// solution is irrelevant; the criterion is constraint satisfaction.
    pub fn place_number(&mut self, pos: Position, value: u8) -> MoveOutcome {
        if self.completed || !(1..=9).contains(&value) || !self.cell_is_editable(pos) {
            return MoveOutcome::Rejected;
        }

        if is_valid_placement(&self.puzzle, pos, value) {
            self.puzzle.set(pos, Some(value));
            self.notes[pos.row][pos.col].clear();
            self.drop_peer_notes(pos, value);
            self.last_feedback = Some((pos, CellFeedback::Entry));
            self.cache.invalidate();
            self.check_completion();
            MoveOutcome::Accepted
        } else {
            self.mistakes += 1;
            self.last_feedback = Some((pos, CellFeedback::Error));
            MoveOutcome::Rejected
        }
    }

    /// Clear the player-entered value at `pos`. Returns whether anything
    /// changed. Notes at the cell are independent and untouched.
    pub fn delete_value(&mut self, pos: Position) -> bool {
        if self.completed || !self.cell_is_editable(pos) || self.puzzle.get(pos).is_none() {
            return false;
        }
        self.puzzle.set(pos, None);
        self.cache.invalidate();
        true
    }

    /// Toggle a pencil note at `pos`. Only legal on an editable, currently
    /// empty cell; returns whether the toggle was applied.
    pub fn toggle_note(&mut self, pos: Position, value: u8) -> bool {
        if self.completed
            || !(1..=9).contains(&value)
            || !self.cell_is_editable(pos)
            || self.puzzle.get(pos).is_some()
        {
            return false;
        }
        self.notes[pos.row][pos.col].toggle(value);
        self.cache.invalidate();
        true
    }

    /// Re-derive the completion flag from the current puzzle: full grid,
    /// every row/column/block containing each digit exactly once. Checked
    /// independently of the solution, so an alternate valid completion of
    /// an ambiguous puzzle also finishes the game. A completed game is
    /// terminal for mutations until a new session replaces it.
    pub fn check_completion(&mut self) -> bool {
        self.completed = is_solved_grid(&self.puzzle);
        self.completed
    }

    // ==================== Hints ====================

    /// Pick a uniformly random open editable cell and return its solution
    /// value, without applying it. Counts against [`Self::hints_used`].
    pub fn hint(&mut self) -> Option<Hint> {
        let hint = self.hint_with(&mut rand::thread_rng());
        if hint.is_some() {
            self.hints_used += 1;
        }
        hint
    }

    /// Hint selection with a caller-supplied random source; does not touch
    /// the hint counter.
    pub fn hint_with<R: Rng>(&self, rng: &mut R) -> Option<Hint> {
        let open: Vec<(Position, u8)> = Position::all()
            .filter(|&pos| self.cell_is_editable(pos) && self.puzzle.get(pos).is_none())
            .filter_map(|pos| self.solution.get(pos).map(|value| (pos, value)))
            .collect();
        open.choose(rng).map(|&(pos, value)| Hint { pos, value })
    }

    // ==================== Cached queries ====================

    /// Whether placing `value` at `pos` would violate a row/column/block
    /// constraint. Memoized until the next mutation; never semantically
    /// different from the pure check.
    pub fn is_move_valid(&mut self, pos: Position, value: u8) -> bool {
        debug_assert!((1..=9).contains(&value));
        let puzzle = &self.puzzle;
        self.cache
            .placement(pos, value, || is_valid_placement(puzzle, pos, value))
    }

    /// Whether the cell accepts player input, i.e. it is empty in the
    /// original layout. Memoized alongside the placement cache.
    pub fn is_editable(&mut self, pos: Position) -> bool {
        let original = &self.original;
        self.cache.editable(pos, || original.get(pos).is_none())
    }

    fn cell_is_editable(&self, pos: Position) -> bool {
        self.original.get(pos).is_none()
    }

    fn drop_peer_notes(&mut self, pos: Position, value: u8) {
        for col in 0..GRID_SIZE {
            self.notes[pos.row][col].remove(value);
        }
        for row in 0..GRID_SIZE {
            self.notes[row][pos.col].remove(value);
        }
        let block_row = (pos.row / BLOCK_SIZE) * BLOCK_SIZE;
        let block_col = (pos.col / BLOCK_SIZE) * BLOCK_SIZE;
        for row in block_row..block_row + BLOCK_SIZE {
            for col in block_col..block_col + BLOCK_SIZE {
                self.notes[row][col].remove(value);
            }
        }
    }

    // ==================== Accessors ====================

    pub fn puzzle(&self) -> &Grid {
        &self.puzzle
    }

    pub fn original(&self) -> &Grid {
        &self.original
    }

    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    pub fn notes_at(&self, pos: Position) -> NoteSet {
        self.notes[pos.row][pos.col]
    }

    pub fn mistakes(&self) -> usize {
        self.mistakes
    }

    pub fn hints_used(&self) -> usize {
        self.hints_used
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Feedback mark from the most recent placement attempt, for the
    /// presentation layer's entry/error styling.
    pub fn last_feedback(&self) -> Option<(Position, CellFeedback)> {
        self.last_feedback
    }

    /// UI cursor. Stored for the caller's convenience; the engine's own
    /// logic never reads it.
    pub fn selected(&self) -> Option<Position> {
        self.selected
    }

    pub fn set_selected(&mut self, pos: Option<Position>) {
        self.selected = pos;
    }

    /// Which digits already have all nine instances on the board. Useful
    /// for graying out a keypad.
    pub fn completed_digits(&self) -> [bool; 9] {
        let mut counts = [0u8; 9];
        for pos in Position::all() {
            if let Some(value) = self.puzzle.get(pos) {
                counts[(value - 1) as usize] += 1;
            }
        }
        std::array::from_fn(|i| counts[i] >= 9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLUTION: &str =
        "185362947793148526246795183564239871931874265827516394318427659672951438459683712";

    /// Build a game over the known solution with the given cells blanked
    /// (everything else is a fixed clue).
    fn game_with_open_cells(open: &[(usize, usize)]) -> GameState {
        let mut original: Vec<u8> = SOLUTION.bytes().collect();
        for &(row, col) in open {
            original[row * GRID_SIZE + col] = b'.';
        }
        let original = String::from_utf8(original).expect("ascii grid");
        let snapshot = Snapshot {
            puzzle: original.clone(),
            original,
            solution: SOLUTION.to_string(),
            mistakes: 0,
            completed: false,
        };
        GameState::restore(&snapshot).expect("coherent test snapshot")
    }

    #[test]
    fn correct_placement_is_accepted_without_a_mistake() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let pos = Position::new(0, 0);

        assert_eq!(game.place_number(pos, 1), MoveOutcome::Accepted);
        assert_eq!(game.puzzle().get(pos), Some(1));
        assert_eq!(game.mistakes(), 0);
        assert_eq!(game.last_feedback(), Some((pos, CellFeedback::Entry)));
    }

    #[test]
    fn conflicting_placement_is_rejected_and_counted() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let pos = Position::new(0, 0);

        // 8 already sits at (0,1).
        assert_eq!(game.place_number(pos, 8), MoveOutcome::Rejected);
        assert_eq!(game.puzzle().get(pos), None);
        assert_eq!(game.mistakes(), 1);
        assert_eq!(game.last_feedback(), Some((pos, CellFeedback::Error)));

        // Each rejection counts exactly once.
        assert_eq!(game.place_number(pos, 8), MoveOutcome::Rejected);
        assert_eq!(game.mistakes(), 2);
    }

    #[test]
    fn locally_consistent_wrong_digit_is_accepted() {
        // Open (0,0) plus every 4 its row, column and block can see, so a
        // wrong 4 violates no constraint there.
        let mut game = game_with_open_cells(&[(0, 0), (0, 7), (8, 0), (2, 1)]);
        let pos = Position::new(0, 0);

        assert_ne!(game.solution().get(pos), Some(4));
        assert_eq!(game.place_number(pos, 4), MoveOutcome::Accepted);
        assert_eq!(game.puzzle().get(pos), Some(4));
        assert_eq!(game.mistakes(), 0);
    }

    #[test]
    fn fixed_cells_reject_every_mutation_silently() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let fixed = Position::new(0, 1);

        assert_eq!(game.place_number(fixed, 3), MoveOutcome::Rejected);
        assert_eq!(game.mistakes(), 0);
        assert_eq!(game.last_feedback(), None);
        assert!(!game.delete_value(fixed));
        assert!(!game.toggle_note(fixed, 3));
        assert_eq!(game.puzzle().get(fixed), Some(8));
    }

    #[test]
    fn out_of_range_values_are_noop_rejections() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let pos = Position::new(0, 0);

        assert_eq!(game.place_number(pos, 0), MoveOutcome::Rejected);
        assert_eq!(game.place_number(pos, 10), MoveOutcome::Rejected);
        assert_eq!(game.mistakes(), 0);
    }

    #[test]
    fn delete_clears_only_player_entries() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let pos = Position::new(0, 0);

        assert!(!game.delete_value(pos)); // nothing there yet
        game.place_number(pos, 1);
        assert!(game.delete_value(pos));
        assert_eq!(game.puzzle().get(pos), None);
        assert!(!game.delete_value(pos));
    }

    #[test]
    fn notes_toggle_only_on_open_editable_cells() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let pos = Position::new(0, 0);

        assert!(game.toggle_note(pos, 5));
        assert!(game.notes_at(pos).contains(5));
        assert!(game.toggle_note(pos, 5));
        assert!(game.notes_at(pos).is_empty());

        game.place_number(pos, 1);
        assert!(!game.toggle_note(pos, 5)); // filled now
    }

    #[test]
    fn placement_clears_own_notes_and_peer_notes() {
        let mut game = game_with_open_cells(&[(0, 0), (0, 7), (8, 0), (2, 1)]);
        let target = Position::new(0, 0);
        let row_peer = Position::new(0, 7);
        let col_peer = Position::new(8, 0);

        game.toggle_note(target, 9);
        game.toggle_note(row_peer, 1);
        game.toggle_note(row_peer, 6);
        game.toggle_note(col_peer, 1);

        assert_eq!(game.place_number(target, 1), MoveOutcome::Accepted);
        assert!(game.notes_at(target).is_empty());
        let remaining: Vec<u8> = game.notes_at(row_peer).iter().collect();
        assert_eq!(remaining, vec![6]);
        assert!(game.notes_at(col_peer).is_empty());
    }

    #[test]
    fn completion_is_detected_and_terminal() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        let pos = Position::new(0, 0);

        assert!(!game.is_completed());
        assert_eq!(game.place_number(pos, 1), MoveOutcome::Accepted);
        assert!(game.is_completed());

        // Terminal: no further mutations are applied.
        assert!(!game.delete_value(pos));
        assert_eq!(game.place_number(pos, 1), MoveOutcome::Rejected);
        assert_eq!(game.mistakes(), 0);
    }

    #[test]
    fn check_completion_is_false_on_an_open_board() {
        let mut game = game_with_open_cells(&[(0, 0), (5, 5)]);
        assert!(!game.check_completion());
        assert!(!game.is_completed());
    }

    #[test]
    fn hint_names_an_open_cell_with_its_solution_value() {
        let mut game = game_with_open_cells(&[(3, 3), (6, 2)]);
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);

        let hint = game.hint_with(&mut rng).expect("open cells exist");
        assert!(game.puzzle().get(hint.pos).is_none());
        assert_eq!(game.solution().get(hint.pos), Some(hint.value));
        // Hints are advisory: the board is untouched.
        assert!(game.puzzle().get(hint.pos).is_none());

        assert_eq!(game.hints_used(), 0);
        assert!(game.hint().is_some());
        assert_eq!(game.hints_used(), 1);
    }

    #[test]
    fn hint_is_none_once_the_board_is_full() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        game.place_number(Position::new(0, 0), 1);
        assert!(game.hint().is_none());
        assert_eq!(game.hints_used(), 0);
    }

    #[test]
    fn validity_queries_are_idempotent_and_cache_transparent() {
        let mut game = game_with_open_cells(&[(0, 0), (0, 7), (8, 0), (2, 1)]);
        let pos = Position::new(0, 7);

        // (0,7)'s solution value is 4; nothing blocks it while the other
        // 4-cells are open.
        assert!(game.is_move_valid(pos, 4));
        assert!(game.is_move_valid(pos, 4));
        assert!(!game.is_move_valid(pos, 8));

        // A mutation elsewhere must be reflected: put 4 in the same row.
        assert_eq!(game.place_number(Position::new(0, 0), 4), MoveOutcome::Accepted);
        assert!(!game.is_move_valid(pos, 4));
        assert_eq!(
            game.is_move_valid(pos, 4),
            is_valid_placement(game.puzzle(), pos, 4)
        );
    }

    #[test]
    fn editability_matches_the_original_layout() {
        let mut game = game_with_open_cells(&[(4, 4)]);
        assert!(game.is_editable(Position::new(4, 4)));
        assert!(!game.is_editable(Position::new(0, 0)));
        // Stable across repeated queries and placements.
        game.place_number(Position::new(4, 4), 7);
        assert!(game.is_editable(Position::new(4, 4)));
    }

    #[test]
    fn completed_digits_tracks_full_placement() {
        let game = game_with_open_cells(&[(0, 0)]);
        let digits = game.completed_digits();
        // (0,0) holds the solution's only missing 1.
        assert!(!digits[0]);
        for d in 1..9 {
            assert!(digits[d], "digit {} should be complete", d + 1);
        }
    }

    #[test]
    fn snapshot_round_trip_reproduces_the_session() {
        let mut game = game_with_open_cells(&[(0, 0), (0, 7), (8, 0), (2, 1)]);
        game.place_number(Position::new(0, 0), 8); // rejected, one mistake
        game.place_number(Position::new(0, 0), 1); // accepted

        let json = game.snapshot().to_json();
        let snapshot = Snapshot::from_json(&json).expect("valid json");
        let restored = GameState::restore(&snapshot).expect("coherent snapshot");

        assert_eq!(restored.puzzle(), game.puzzle());
        assert_eq!(restored.original(), game.original());
        assert_eq!(restored.solution(), game.solution());
        assert_eq!(restored.mistakes(), 1);
        assert_eq!(restored.is_completed(), game.is_completed());
    }

    #[test]
    fn restore_or_new_falls_back_on_corrupt_data() {
        let game = GameState::restore_or_new("not json at all", Difficulty::Easy);
        assert_eq!(game.puzzle().filled_count(), Difficulty::Easy.clue_count());
        assert_eq!(game.mistakes(), 0);
        assert!(!game.is_completed());
    }

    #[test]
    fn selected_cell_is_caller_owned_state() {
        let mut game = game_with_open_cells(&[(0, 0)]);
        assert_eq!(game.selected(), None);
        game.set_selected(Some(Position::new(4, 4)));
        assert_eq!(game.selected(), Some(Position::new(4, 4)));
        game.set_selected(None);
        assert_eq!(game.selected(), None);
    }
}
