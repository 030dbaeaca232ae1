pub mod args;
pub mod commands;

pub use args::{AnalysisArgs, Cli, Commands};
pub use commands::run;
