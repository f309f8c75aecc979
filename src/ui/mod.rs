//! Terminal front end

mod cli;
#[cfg(test)]
mod tests;

pub use cli::{format_position, parse_selection, Args, Cli, ControlInput};
