// Each top-level subcommand has its own submodule.

pub mod calendar;
pub mod ensure;
pub mod rule;
pub mod schedule;
pub mod session;
pub mod tenant;
