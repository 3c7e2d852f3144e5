//! The narrow interface the resolver consumes from its host.
//!
//! Lexical visibility is not queried through this trait: the host hands the
//! visible declarations of a position to `ScopeGraph::add_scope`. Everything
//! else the resolver needs on demand goes through [`Host`].

use summon_common::{CallContext, ModuleId};
use summon_types::{ClassifierRef, Declaration, TypeRef};

/// One member of a component classifier, satisfied by a dependency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMember {
    pub name: String,
    pub ty: TypeRef,
}

impl ComponentMember {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        ComponentMember { name: name.into(), ty }
    }
}

pub trait Host {
    /// Whether code in `caller` context may use a producer in `callee` context.
    fn can_call(&self, caller: CallContext, callee: CallContext) -> bool {
        caller.can_call(callee)
    }

    /// The module resolution happens in. Candidates from other modules rank
    /// below local ones.
    fn current_module(&self) -> ModuleId {
        ModuleId(0)
    }

    /// Injectable members of a classifier whose instances are themselves
    /// declaration scopes. Member types may mention the classifier's own
    /// type parameters.
    fn members_of(&self, _classifier: &ClassifierRef) -> Vec<Declaration> {
        Vec::new()
    }

    /// Injectables contributed by the module that declares `classifier`
    /// (its companion, members or package-level declarations).
    fn type_scope_declarations(&self, _classifier: &ClassifierRef) -> Vec<Declaration> {
        Vec::new()
    }

    /// Members of a component classifier. Member types may mention the
    /// classifier's own type parameters.
    fn component_members(&self, _classifier: &ClassifierRef) -> Vec<ComponentMember> {
        Vec::new()
    }
}

/// A host with no nested scopes, type scopes or components.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl Host for NoopHost {}
