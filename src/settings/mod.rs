//! Service settings loaded from a TOML file, plus the command line that points at it.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
