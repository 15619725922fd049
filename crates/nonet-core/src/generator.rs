use crate::validator::is_valid_placement;
use crate::{Grid, Position, CELL_COUNT, GRID_SIZE};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Solution generator and puzzle deriver.
///
/// Owns its random source; a seeded instance replays the exact same
/// solution and derivation, which is how deterministic tests substitute
/// the randomness.
pub struct Generator {
    rng: StdRng,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Create a generator seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a generator with a fixed seed for reproducibility.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a complete valid solution grid.
    ///
    /// Recursive backtracking over cells in row-major order, trying digits
    /// in a freshly shuffled order at every empty cell. The per-cell
    /// shuffle is what varies the output; a fixed digit order would walk
    /// to the same canonical grid every time. The search always succeeds
    /// from an empty grid, so this never fails.
    ///
    /// This phase is pure and CPU-bound; interactive callers run it on a
    /// worker and hand the result to the finalize path.
    pub fn generate_solution(&mut self) -> Grid {
        let mut grid = Grid::empty();
        let filled = self.fill_from(&mut grid, 0);
        debug_assert!(filled, "search from an empty grid always completes");
        debug!("generated solution grid");
        grid
    }

    fn fill_from(&mut self, grid: &mut Grid, index: usize) -> bool {
        if index == CELL_COUNT {
            return true;
        }
        let pos = Position::new(index / GRID_SIZE, index % GRID_SIZE);
        if grid.get(pos).is_some() {
            return self.fill_from(grid, index + 1);
        }

        let mut digits: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        digits.shuffle(&mut self.rng);

        for &digit in &digits {
            if is_valid_placement(grid, pos, digit) {
                grid.set(pos, Some(digit));
                if self.fill_from(grid, index + 1) {
                    return true;
                }
                grid.set(pos, None);
            }
        }
        false
    }

    /// Derive a playable puzzle by revealing exactly `clue_count` cells of
    /// `solution` at shuffled positions; every other cell stays empty.
    ///
    /// Returns `(puzzle, original)` where `original` is the puzzle as
    /// derived, recording which cells are fixed. Uniqueness of the
    /// result is not verified; only the source solution is guaranteed to
    /// solve it.
    ///
    /// # Panics
    ///
    /// Panics if `clue_count` lies outside `17..=81` (17 is the minimum
    /// clue count for a uniquely solvable 9x9 puzzle). The built-in
    /// difficulty levels always satisfy the bound.
    pub fn derive(&mut self, solution: &Grid, clue_count: usize) -> (Grid, Grid) {
        assert!(
            (17..=CELL_COUNT).contains(&clue_count),
            "clue count {} outside 17..=81",
            clue_count
        );

        let mut coords: Vec<Position> = Position::all().collect();
        coords.shuffle(&mut self.rng);

        let mut puzzle = Grid::empty();
        for &pos in coords.iter().take(clue_count) {
            puzzle.set(pos, solution.get(pos));
        }
        let original = puzzle.clone();
        debug!("derived puzzle with {} clues", clue_count);
        (puzzle, original)
    }
}
