//! Candidate resolution for compile-time dependency injection.
//!
//! Given the declarations visible at a call site, finds for each requested
//! type the single best producer, then recursively resolves that producer's
//! own dependencies.
//!
//! # Architecture
//!
//! - [`host`]: what the resolver asks of its host
//! - [`injectable`]: the closed set of injectable kinds and their requests
//! - [`scope`]: the scope and injectable arenas of one session, with
//!   memoized candidate lookup
//! - `expand`: the per-scope expansion fixpoint (lifting, nested declaration
//!   scopes, spreading)
//! - `framework`: providers, collections, witnesses and components
//! - [`rank`]: candidate and result ordering
//! - [`resolve`]: the resolver
//! - [`result`]: resolution outcomes

mod expand;
mod framework;
pub mod host;
pub mod injectable;
pub mod rank;
pub mod resolve;
pub mod result;
pub mod scope;

pub use host::{ComponentMember, Host, NoopHost};
pub use injectable::{Injectable, InjectableId, InjectableRequest, Origin, UsageKey};
pub use resolve::Resolver;
pub use result::{Failure, InjectionResult, ResolutionResult, ResolvedValue, Success};
pub use scope::{Scope, ScopeGraph, ScopeId, ScopeSpec};
