//! Type model and unification engine for injectable resolution.
//!
//! # Architecture
//!
//! - [`ty`]: classifiers and type references (`ClassifierRef`, `TypeRef`)
//! - [`subst`]: substitution maps and the single merge law for nullability and tags
//! - [`subtype`]: subtype tests and supertype projection
//! - [`unify`]: `build_context`, matching a producer's type against a request
//! - [`callable`]: the host's declaration model and substitutable callables

pub mod callable;
pub mod subst;
pub mod subtype;
pub mod ty;
pub mod unify;

pub use callable::{CallableRef, Declaration, ParamIndex, Parameter};
pub use subst::Substitution;
pub use subtype::{is_subtype_of, subtype_view, supertype_distance};
pub use ty::{ClassifierBuilder, ClassifierFlags, ClassifierRef, TypeRef};
pub use unify::{build_context, ContextError};
