//! Injectables and the requests they make.
//!
//! An [`Injectable`] is one way of producing a value of its type. The kinds
//! form a closed set: declaration-backed callables found in scopes, and the
//! framework kinds (collections, providers, witnesses, components) the
//! resolver synthesizes for requests no user injectable satisfies.

use std::fmt;

use summon_common::{CallContext, DeclId, ModuleId};
use summon_types::{CallableRef, ClassifierRef, ParamIndex, Substitution, TypeRef};

use crate::host::ComponentMember;
use crate::scope::ScopeId;

/// Index of an injectable in its session's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InjectableId(pub u32);

impl fmt::Display for InjectableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// One typed dependency slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InjectableRequest {
    pub ty: TypeRef,
    /// Identity of the callable whose parameter this is.
    pub callable: DeclId,
    /// That callable's own type arguments at the point of the request.
    pub callable_type_arguments: Substitution,
    pub parameter_name: String,
    pub parameter_index: ParamIndex,
    /// Optional requests fall back to the parameter's declared default.
    pub is_required: bool,
    pub is_inline: bool,
}

impl InjectableRequest {
    pub fn new(callable: impl Into<DeclId>, name: impl Into<String>, index: ParamIndex, ty: TypeRef) -> Self {
        InjectableRequest {
            ty,
            callable: callable.into(),
            callable_type_arguments: Substitution::new(),
            parameter_name: name.into(),
            parameter_index: index,
            is_required: true,
            is_inline: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    /// One request per parameter of `callable`, receiver first.
    pub fn parameters_of(callable: &CallableRef) -> Vec<InjectableRequest> {
        callable
            .parameter_types()
            .iter()
            .map(|(index, ty)| {
                let declared = callable
                    .declaration()
                    .parameters
                    .iter()
                    .find(|p| p.index == *index);
                InjectableRequest {
                    ty: ty.clone(),
                    callable: callable.id().clone(),
                    callable_type_arguments: callable.type_arguments().clone(),
                    parameter_name: match declared {
                        Some(p) => p.name.clone(),
                        None => "<receiver>".to_string(),
                    },
                    parameter_index: *index,
                    is_required: declared.map_or(true, |p| !p.has_default),
                    is_inline: declared.map_or(false, |p| p.is_inline),
                }
            })
            .collect()
    }
}

impl fmt::Display for InjectableRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}: {})", self.callable, self.parameter_name, self.ty)
    }
}

/// Where an injectable comes from. Divergence detection compares origins.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Declaration(DeclId),
    Collection(ClassifierRef),
    Provider(ClassifierRef),
    Witness(ClassifierRef),
    Component(ClassifierRef),
}

/// Identifies when two resolved injectables stand for the same value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub origin: Origin,
    pub type_arguments: Substitution,
    pub ty: TypeRef,
}

#[derive(Clone, Debug)]
pub enum Injectable {
    /// A declaration visible in a scope, specialized to the request.
    Callable { callable: CallableRef, owner_scope: ScopeId },
    /// Every injectable assignable to the element type of a collection.
    Collection {
        ty: TypeRef,
        elements: Vec<TypeRef>,
        owner_scope: ScopeId,
    },
    /// A function value producing its return type on demand. Its parameters
    /// become injectables of the child scope it resolves in.
    Provider { ty: TypeRef, owner_scope: ScopeId },
    /// Evidence of a generic type argument.
    Witness { ty: TypeRef, owner_scope: ScopeId },
    /// An aggregate whose members are each a dependency.
    Component {
        ty: TypeRef,
        members: Vec<ComponentMember>,
        owner_scope: ScopeId,
    },
}

impl Injectable {
    pub fn ty(&self) -> &TypeRef {
        match self {
            Injectable::Callable { callable, .. } => callable.ty(),
            Injectable::Collection { ty, .. }
            | Injectable::Provider { ty, .. }
            | Injectable::Witness { ty, .. }
            | Injectable::Component { ty, .. } => ty,
        }
    }

    /// Produced type before specialization to the request. Generic
    /// declarations keep their own type parameters here.
    pub fn declared_type(&self) -> &TypeRef {
        match self {
            Injectable::Callable { callable, .. } if !callable.is_lifted() => &callable.declaration().ty,
            _ => self.ty(),
        }
    }

    pub fn owner_scope(&self) -> ScopeId {
        match self {
            Injectable::Callable { owner_scope, .. }
            | Injectable::Collection { owner_scope, .. }
            | Injectable::Provider { owner_scope, .. }
            | Injectable::Witness { owner_scope, .. }
            | Injectable::Component { owner_scope, .. } => *owner_scope,
        }
    }

    pub fn callable(&self) -> Option<&CallableRef> {
        match self {
            Injectable::Callable { callable, .. } => Some(callable),
            _ => None,
        }
    }

    /// Call context needed to use this injectable. Framework kinds can be
    /// used from anywhere.
    pub fn call_context(&self) -> CallContext {
        match self {
            Injectable::Callable { callable, .. } => callable.call_context(),
            _ => CallContext::Default,
        }
    }

    /// Module of the backing declaration. Framework kinds have none.
    pub fn module(&self) -> Option<ModuleId> {
        self.callable().map(|c| c.declaration().module)
    }

    pub fn import_path(&self) -> Option<&str> {
        self.callable().and_then(CallableRef::import_path)
    }

    pub fn chain_length(&self) -> usize {
        self.callable().map_or(0, CallableRef::chain_length)
    }

    /// Whether dependencies resolve in a child scope of the resolving scope.
    pub fn has_dependency_scope(&self) -> bool {
        matches!(self, Injectable::Provider { .. } | Injectable::Component { .. })
    }

    pub fn origin(&self) -> Origin {
        match self {
            Injectable::Callable { callable, .. } => Origin::Declaration(callable.id().clone()),
            Injectable::Collection { ty, .. } => Origin::Collection(ty.classifier().clone()),
            Injectable::Provider { ty, .. } => Origin::Provider(ty.classifier().clone()),
            Injectable::Witness { ty, .. } => Origin::Witness(ty.classifier().clone()),
            Injectable::Component { ty, .. } => Origin::Component(ty.classifier().clone()),
        }
    }

    pub fn usage_key(&self) -> UsageKey {
        UsageKey {
            origin: self.origin(),
            type_arguments: match self {
                Injectable::Callable { callable, .. } => callable.type_arguments().clone(),
                _ => Substitution::new(),
            },
            ty: self.ty().without_instance_key(),
        }
    }

    /// The requests this injectable needs satisfied, in parameter order.
    pub fn dependencies(&self) -> Vec<InjectableRequest> {
        match self {
            Injectable::Callable { callable, .. } => InjectableRequest::parameters_of(callable),
            Injectable::Collection { ty, elements, .. } => elements
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    InjectableRequest::new(
                        framework_id("collection", ty),
                        format!("element{i}"),
                        ParamIndex::Value(i),
                        element.clone(),
                    )
                })
                .collect(),
            Injectable::Provider { ty, .. } => ty
                .function_return()
                .map(|result| {
                    InjectableRequest::new(
                        framework_id("provider", ty),
                        "result",
                        ParamIndex::Value(0),
                        result.clone(),
                    )
                })
                .into_iter()
                .collect(),
            Injectable::Witness { ty, .. } => {
                let Some(witnessed) = ty.arguments().first() else {
                    return Vec::new();
                };
                witnessed_parameters(witnessed)
                    .into_iter()
                    .enumerate()
                    .map(|(i, param)| {
                        let nested = TypeRef::new(ty.classifier().clone(), vec![TypeRef::of(param.clone())]);
                        InjectableRequest::new(
                            framework_id("witness", ty),
                            param.key(),
                            ParamIndex::Value(i),
                            nested,
                        )
                    })
                    .collect()
            }
            Injectable::Component { ty, members, .. } => members
                .iter()
                .enumerate()
                .map(|(i, member)| {
                    InjectableRequest::new(
                        framework_id("component", ty),
                        member.name.clone(),
                        ParamIndex::Value(i),
                        member.ty.clone(),
                    )
                })
                .collect(),
        }
    }

    pub fn dependency_count(&self) -> usize {
        match self {
            Injectable::Callable { callable, .. } => callable.parameter_types().len(),
            Injectable::Collection { elements, .. } => elements.len(),
            Injectable::Provider { .. } => 1,
            Injectable::Witness { ty, .. } => ty
                .arguments()
                .first()
                .map_or(0, |w| witnessed_parameters(w).len()),
            Injectable::Component { members, .. } => members.len(),
        }
    }
}

/// Type parameters of a witnessed type that need their own witness.
/// Reified parameters carry one already.
fn witnessed_parameters(witnessed: &TypeRef) -> Vec<ClassifierRef> {
    witnessed
        .type_parameters()
        .into_iter()
        .filter(|param| !param.flags().is_reified)
        .collect()
}

fn framework_id(kind: &str, ty: &TypeRef) -> DeclId {
    DeclId::synthetic(kind, ty.without_instance_key())
}

impl fmt::Display for Injectable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injectable::Callable { callable, .. } => write!(f, "{}", callable),
            Injectable::Collection { ty, elements, .. } => {
                write!(f, "collection {} of {} elements", ty, elements.len())
            }
            Injectable::Provider { ty, .. } => write!(f, "provider {}", ty),
            Injectable::Witness { ty, .. } => write!(f, "witness {}", ty),
            Injectable::Component { ty, .. } => write!(f, "component {}", ty),
        }
    }
}
