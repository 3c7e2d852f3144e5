//! The scope graph: one resolution session.
//!
//! Scopes and injectables live in arenas owned by [`ScopeGraph`] and refer
//! to each other by id. A scope is built in two phases: [`ScopeGraph::add_scope`]
//! records the host's raw inputs, then the expansion fixpoint (see
//! `expand.rs`) runs over the already sealed ancestors. After that the local
//! injectable list never changes; only memo tables grow.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use summon_common::{CallContext, DeclId, ModelError, ResolverConfig};
use summon_types::{build_context, CallableRef, ClassifierRef, Declaration, TypeRef};

use crate::host::Host;
use crate::injectable::{Injectable, InjectableId};
use crate::result::{Failure, ResolutionResult, ResolvedValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Raw inputs for one lexical position.
#[derive(Clone, Debug)]
pub struct ScopeSpec {
    pub name: String,
    pub parent: Option<ScopeId>,
    /// Declaration whose body this scope is, if any.
    pub owner: Option<DeclId>,
    /// Declarations visible at this position and not already visible in `parent`.
    pub declarations: Vec<Declaration>,
    /// Type parameters introduced here. They stay symbolic during matching.
    pub type_parameters: Vec<ClassifierRef>,
    pub call_context: CallContext,
}

impl ScopeSpec {
    pub fn root(name: impl Into<String>) -> Self {
        ScopeSpec {
            name: name.into(),
            parent: None,
            owner: None,
            declarations: Vec::new(),
            type_parameters: Vec::new(),
            call_context: CallContext::Default,
        }
    }

    pub fn child(name: impl Into<String>, parent: ScopeId) -> Self {
        ScopeSpec {
            parent: Some(parent),
            ..ScopeSpec::root(name)
        }
    }

    pub fn with_declarations(mut self, declarations: Vec<Declaration>) -> Self {
        self.declarations = declarations;
        self
    }

    pub fn with_type_parameters(mut self, type_parameters: Vec<ClassifierRef>) -> Self {
        self.type_parameters = type_parameters;
        self
    }

    pub fn with_call_context(mut self, call_context: CallContext) -> Self {
        self.call_context = call_context;
        self
    }

    pub fn owned_by(mut self, owner: impl Into<DeclId>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

type LookupKey = (TypeRef, Vec<ClassifierRef>);

#[derive(Default)]
pub(crate) struct ScopeMemo {
    candidates: FxHashMap<LookupKey, Rc<[InjectableId]>>,
    elements: FxHashMap<LookupKey, Rc<[TypeRef]>>,
    pub(crate) framework: FxHashMap<TypeRef, Option<InjectableId>>,
    pub(crate) child_scopes: FxHashMap<InjectableId, ScopeId>,
    pub(crate) results_by_type: FxHashMap<TypeRef, ResolutionResult>,
    pub(crate) results_by_candidate: FxHashMap<InjectableId, Result<Rc<ResolvedValue>, Failure>>,
}

pub struct Scope {
    id: ScopeId,
    name: String,
    parent: Option<ScopeId>,
    owner: Option<DeclId>,
    call_context: CallContext,
    nesting: usize,
    is_type_scope: bool,
    /// Own and inherited static type parameters.
    static_type_parameters: Vec<ClassifierRef>,
    pub(crate) injectables: Vec<CallableRef>,
    pub(crate) spreading: Vec<CallableRef>,
    pub(crate) memo: ScopeMemo,
}

impl Scope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn owner(&self) -> Option<&DeclId> {
        self.owner.as_ref()
    }

    pub fn call_context(&self) -> CallContext {
        self.call_context
    }

    /// Distance from the root of this scope's tree.
    pub fn nesting(&self) -> usize {
        self.nesting
    }

    pub fn is_type_scope(&self) -> bool {
        self.is_type_scope
    }

    pub fn static_type_parameters(&self) -> &[ClassifierRef] {
        &self.static_type_parameters
    }

    /// Injectables added at this scope, after expansion.
    pub fn injectables(&self) -> &[CallableRef] {
        &self.injectables
    }

    /// Spreading rules declared at this scope that are still generic.
    pub fn spreading_rules(&self) -> &[CallableRef] {
        &self.spreading
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("injectables", &self.injectables.len())
            .field("spreading", &self.spreading.len())
            .finish()
    }
}

/// One resolution session: scope and injectable arenas, type scopes and
/// the instance-key counter.
pub struct ScopeGraph<'h> {
    pub(crate) host: &'h dyn Host,
    pub(crate) config: ResolverConfig,
    scopes: Vec<Scope>,
    injectables: Vec<Injectable>,
    type_scopes: FxHashMap<Vec<ClassifierRef>, Option<ScopeId>>,
    next_instance_key: u32,
}

impl<'h> ScopeGraph<'h> {
    pub fn new(host: &'h dyn Host, config: ResolverConfig) -> Self {
        ScopeGraph {
            host,
            config,
            scopes: Vec::new(),
            injectables: Vec::new(),
            type_scopes: FxHashMap::default(),
            next_instance_key: 0,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Build a scope from the host's inputs and expand it.
    pub fn add_scope(&mut self, spec: ScopeSpec) -> Result<ScopeId, ModelError> {
        if let Some(parent) = spec.parent {
            if parent.index() >= self.scopes.len() {
                return Err(ModelError::UnknownScope(parent.0));
            }
        }
        for param in &spec.type_parameters {
            if !param.is_type_parameter() {
                return Err(ModelError::NotATypeParameter(param.key().to_string()));
            }
        }
        for declaration in &spec.declarations {
            declaration.validate()?;
        }

        let id = self.insert_scope(
            spec.name,
            spec.parent,
            spec.owner,
            spec.type_parameters,
            spec.call_context,
            false,
        );
        self.expand(id, spec.declarations);
        Ok(id)
    }

    /// Phase one of construction. `parent` must already exist.
    pub(crate) fn insert_scope(
        &mut self,
        name: String,
        parent: Option<ScopeId>,
        owner: Option<DeclId>,
        type_parameters: Vec<ClassifierRef>,
        call_context: CallContext,
        is_type_scope: bool,
    ) -> ScopeId {
        let (nesting, mut statics) = match parent {
            Some(p) => {
                let parent = self.scope(p);
                (parent.nesting + 1, parent.static_type_parameters.clone())
            }
            None => (0, Vec::new()),
        };
        for param in type_parameters {
            if !statics.contains(&param) {
                statics.push(param);
            }
        }

        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            name,
            parent,
            owner,
            call_context,
            nesting,
            is_type_scope,
            static_type_parameters: statics,
            injectables: Vec::new(),
            spreading: Vec::new(),
            memo: ScopeMemo::default(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn injectable(&self, id: InjectableId) -> &Injectable {
        &self.injectables[id.0 as usize]
    }

    pub(crate) fn push_injectable(&mut self, injectable: Injectable) -> InjectableId {
        let id = InjectableId(self.injectables.len() as u32);
        self.injectables.push(injectable);
        id
    }

    /// Next value of the session's monotonic instance-key counter.
    pub(crate) fn fresh_instance_key(&mut self) -> u32 {
        let key = self.next_instance_key;
        self.next_instance_key += 1;
        key
    }

    /// Scopes from `id` up to the root, `id` first.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(Some(self.scope(id)), move |s| s.parent.map(|p| self.scope(p)))
    }

    // ── Candidate lookup ────────────────────────────────────────────────

    /// Injectables of `scope` and its ancestors that can produce `ty`,
    /// specialized to it. Ancestor candidates come first.
    pub fn injectables_for_type(
        &mut self,
        scope: ScopeId,
        ty: &TypeRef,
        static_type_parameters: &[ClassifierRef],
    ) -> Rc<[InjectableId]> {
        let key = (ty.clone(), static_type_parameters.to_vec());
        if let Some(hit) = self.scope(scope).memo.candidates.get(&key) {
            return hit.clone();
        }

        let mut found = match self.scope(scope).parent {
            Some(parent) => self.injectables_for_type(parent, ty, static_type_parameters).to_vec(),
            None => Vec::new(),
        };
        let local = self.scope(scope).injectables.clone();
        for callable in local {
            // A keyed request asks for one specific injectable.
            if ty.instance_key().is_some() && callable.ty().instance_key() != ty.instance_key() {
                continue;
            }
            if let Ok(map) = build_context(callable.ty(), static_type_parameters, ty) {
                found.push(self.push_injectable(Injectable::Callable {
                    callable: callable.substitute(&map),
                    owner_scope: scope,
                }));
            }
        }

        let found: Rc<[InjectableId]> = found.into();
        self.scope_mut(scope).memo.candidates.insert(key, found.clone());
        found
    }

    /// Types of every injectable of `scope` and its ancestors assignable to
    /// `element`, or to a collection of it. Duplicates are dropped.
    pub(crate) fn elements_for_type(
        &mut self,
        scope: ScopeId,
        element: &TypeRef,
        static_type_parameters: &[ClassifierRef],
    ) -> Rc<[TypeRef]> {
        let key = (element.clone(), static_type_parameters.to_vec());
        if let Some(hit) = self.scope(scope).memo.elements.get(&key) {
            return hit.clone();
        }

        let mut found = match self.scope(scope).parent {
            Some(parent) => self.elements_for_type(parent, element, static_type_parameters).to_vec(),
            None => Vec::new(),
        };
        for callable in &self.scope(scope).injectables {
            let ty = callable.ty();
            let matched = build_context(ty, static_type_parameters, element)
                .ok()
                .or_else(|| {
                    let view = collection_view(ty)?;
                    build_context(&view.arguments()[0], static_type_parameters, element).ok()
                });
            if let Some(map) = matched {
                let entry = ty.substitute(&map);
                if !found.contains(&entry) {
                    found.push(entry);
                }
            }
        }

        let found: Rc<[TypeRef]> = found.into();
        self.scope_mut(scope).memo.elements.insert(key, found.clone());
        found
    }

    // ── Derived scopes ──────────────────────────────────────────────────

    /// The implicit scope of injectables contributed by the modules that
    /// declare the classifiers of `ty`. Built once per classifier set.
    pub(crate) fn type_scope(&mut self, ty: &TypeRef) -> Option<ScopeId> {
        let classifiers: Vec<ClassifierRef> = ty
            .covering_classifiers()
            .into_iter()
            .filter(|c| !c.is_type_parameter())
            .collect();
        if let Some(hit) = self.type_scopes.get(&classifiers) {
            return *hit;
        }

        let mut declarations = Vec::new();
        for classifier in &classifiers {
            for declaration in self.host.type_scope_declarations(classifier) {
                match declaration.validate() {
                    Ok(()) => declarations.push(declaration),
                    Err(err) => tracing::warn!(classifier = %classifier, %err, "skipping type scope declaration"),
                }
            }
        }
        let scope = if declarations.is_empty() {
            None
        } else {
            let name = format!("type scope of {}", ty.without_instance_key());
            let id = self.insert_scope(name, None, None, Vec::new(), CallContext::Default, true);
            self.expand(id, declarations);
            Some(id)
        };
        self.type_scopes.insert(classifiers, scope);
        scope
    }

    /// The child scope the dependencies of `candidate` resolve in, when
    /// resolved from `scope`. Created on first use.
    pub(crate) fn dependency_scope(&mut self, scope: ScopeId, candidate: InjectableId) -> Option<ScopeId> {
        if !self.injectable(candidate).has_dependency_scope() {
            return None;
        }
        if let Some(child) = self.scope(scope).memo.child_scopes.get(&candidate) {
            return Some(*child);
        }

        let child = match self.injectable(candidate).clone() {
            Injectable::Provider { ty, .. } => {
                let owner = DeclId::synthetic("provider", ty.without_instance_key());
                let module = self.host.current_module();
                let declarations = ty
                    .function_parameters()
                    .iter()
                    .enumerate()
                    .map(|(i, param)| {
                        Declaration::new(DeclId::synthetic(owner.as_str(), format!("p{i}")), param.clone())
                            .in_module(module)
                    })
                    .collect();
                let child = self.insert_scope(
                    format!("provider {}", ty),
                    Some(scope),
                    Some(owner),
                    Vec::new(),
                    ty.classifier().call_context(),
                    false,
                );
                self.expand(child, declarations);
                child
            }
            Injectable::Component { ty, .. } => {
                let owner = DeclId::synthetic("component", ty.without_instance_key());
                let child = self.insert_scope(
                    format!("component {}", ty),
                    Some(scope),
                    Some(owner),
                    Vec::new(),
                    CallContext::Default,
                    false,
                );
                self.expand(child, Vec::new());
                child
            }
            _ => return None,
        };
        self.scope_mut(scope).memo.child_scopes.insert(candidate, child);
        Some(child)
    }
}

/// `ty` viewed as a single-argument collection, through its supertypes.
pub(crate) fn collection_view(ty: &TypeRef) -> Option<TypeRef> {
    let is_collection = |t: &TypeRef| t.classifier().flags().is_collection && t.arguments().len() == 1;
    if is_collection(ty) {
        return Some(ty.clone());
    }
    let mut pending = ty.supertypes();
    let mut visited = vec![ty.classifier().clone()];
    while let Some(current) = pending.pop() {
        if is_collection(&current) {
            return Some(current);
        }
        if !visited.contains(current.classifier()) {
            visited.push(current.classifier().clone());
            pending.extend(current.supertypes());
        }
    }
    None
}
