//! Basic example of driving the engine end to end: generate, play a few
//! moves, snapshot, resume.

use nonet_core::{Difficulty, Generator};
use nonet_game::{GameState, MoveOutcome};

fn main() {
    env_logger::init();

    println!("Starting a Medium game...\n");
    let mut game = GameState::new(Difficulty::Medium);
    println!("{}", game.puzzle());
    println!("Clues: {}", game.puzzle().filled_count());
    println!("Open cells: {}", game.puzzle().empty_count());

    // Ask for a hint and play it.
    if let Some(hint) = game.hint() {
        match game.place_number(hint.pos, hint.value) {
            MoveOutcome::Accepted => println!(
                "\nPlaced {} at r{}c{} from a hint",
                hint.value, hint.pos.row, hint.pos.col
            ),
            MoveOutcome::Rejected => println!("\nHint was rejected (this shouldn't happen)"),
        }
    }

    // Hand the durable state to whatever store the application uses.
    let saved = game.snapshot().to_json();
    println!("Snapshot: {} bytes of JSON", saved.len());

    // ...and resume it later. Corrupt data falls back to a fresh game.
    let resumed = GameState::restore_or_new(&saved, Difficulty::Medium);
    println!(
        "Resumed: {} mistakes, completed: {}",
        resumed.mistakes(),
        resumed.is_completed()
    );

    // Seeded generation for scripted runs.
    let mut generator = Generator::with_seed(42);
    let solution = generator.generate_solution();
    println!("\nSeeded solution:\n{}", solution);
}
