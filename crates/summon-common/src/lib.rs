//! Shared types for the summon injectable resolver.
//!
//! - [`ids`]: module and declaration identities
//! - [`call_context`]: call-context classification of declarations and scopes
//! - [`config`]: resolver configuration loaded from TOML
//! - [`error`]: precondition errors for malformed host input

pub mod call_context;
pub mod config;
pub mod error;
pub mod ids;

pub use call_context::CallContext;
pub use config::{ConfigError, ResolverConfig};
pub use error::ModelError;
pub use ids::{DeclId, ModuleId};
