//! Subcommand implementations.

mod exec;
mod run;

pub use exec::exec;
pub use run::run;
