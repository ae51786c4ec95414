//! Command handlers for the Keepsake CLI.

pub mod ask;
pub mod import;

pub use ask::AskCommand;
pub use import::ImportCommand;
