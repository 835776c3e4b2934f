pub mod config;
pub mod event;
pub mod reconcile;
pub mod task;

use chronoboard_core::{Board, Config, CoreError};
use serde::Serialize;

/// Open the board described by the on-disk configuration.
pub fn open_board() -> Result<Board, CoreError> {
    let config = Config::load()?;
    Board::open(&config)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
