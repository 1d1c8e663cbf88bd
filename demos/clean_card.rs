//! Remove the white background from a single card scan.
//!
//! Usage:
//! ```sh
//! cargo run --example clean_card -- card.jpg card.png
//! ```

use std::env;
use std::process;

use card_image_cleaner::{process_file, BasicOptions, Remover};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output.png>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let remover = Remover::Basic(BasicOptions::default());
    match process_file(input.as_ref(), output.as_ref(), &remover) {
        Ok(t) => println!(
            "Done: {}x{} -> {}x{}",
            t.input.0, t.input.1, t.output.0, t.output.1
        ),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
