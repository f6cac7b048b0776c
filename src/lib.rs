//! Merges custom configuration declared in a Cordova `config.xml` into the
//! native project files of each platform.

pub mod backup;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod directive;
pub mod error;
pub mod indexer;
pub mod orchestrator;
pub mod patches;
pub mod selector;
pub mod xml;

pub use crate::config::Settings;
pub use crate::context::RunContext;
pub use crate::descriptor::Descriptor;
pub use crate::error::{MergeError, Result};
pub use crate::orchestrator::{RunReport, run};
