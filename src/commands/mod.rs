//! Command handlers module.
//!
//! - `consolidate.rs`: consolidation, bootstrap and rule preview
//! - `config.rs`: configuration display command

mod config;
mod consolidate;

pub use config::cmd_config;
pub use consolidate::{ConsolidateArgs, cmd_bootstrap, cmd_consolidate, cmd_rules};
