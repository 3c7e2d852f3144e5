//! Producer declarations and callable references.
//!
//! A [`Declaration`] is what the host reports for a visible producer: its
//! produced type, parameters and own type parameters. A [`CallableRef`] is a
//! (possibly specialized) use of a declaration. Substituting a callable
//! yields a new value; declarations are shared and never change.

use std::fmt;
use std::rc::Rc;

use summon_common::{CallContext, DeclId, ModelError, ModuleId};

use crate::subst::Substitution;
use crate::ty::{ClassifierRef, TypeRef};

/// Position of a parameter in a declaration's parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamIndex {
    /// The instance a member is called on.
    Receiver,
    Value(usize),
}

impl fmt::Display for ParamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamIndex::Receiver => write!(f, "receiver"),
            ParamIndex::Value(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub index: ParamIndex,
    pub ty: TypeRef,
    /// A declared default makes the parameter optional.
    pub has_default: bool,
    pub is_inline: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, index: usize, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            index: ParamIndex::Value(index),
            ty,
            has_default: false,
            is_inline: false,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }
}

/// A producer declaration as seen by the host.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub ty: TypeRef,
    pub parameters: Vec<Parameter>,
    pub type_parameters: Vec<ClassifierRef>,
    pub call_context: CallContext,
    pub module: ModuleId,
    /// Import path through which the declaration became visible, if any.
    pub import_path: Option<String>,
    /// Index into `type_parameters` of the spread parameter. Its upper bound
    /// is the tag pattern matched against every candidate type.
    pub spread_parameter: Option<usize>,
}

impl Declaration {
    pub fn new(id: impl Into<DeclId>, ty: TypeRef) -> Self {
        let id = id.into();
        Declaration {
            name: id.as_str().rsplit('.').next().unwrap_or_default().to_string(),
            id,
            ty,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            call_context: CallContext::Default,
            module: ModuleId(0),
            import_path: None,
            spread_parameter: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
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

    pub fn in_module(mut self, module: ModuleId) -> Self {
        self.module = module;
        self
    }

    pub fn imported_via(mut self, path: impl Into<String>) -> Self {
        self.import_path = Some(path.into());
        self
    }

    pub fn spreading(mut self, index: usize) -> Self {
        self.spread_parameter = Some(index);
        self
    }

    /// Check the declaration against the invariants the resolver relies on.
    pub fn validate(&self) -> Result<(), ModelError> {
        for param in &self.type_parameters {
            if !param.is_type_parameter() {
                return Err(ModelError::NotATypeParameter(param.key().to_string()));
            }
        }
        if let Some(index) = self.spread_parameter {
            if index >= self.type_parameters.len() {
                return Err(ModelError::SpreadParameterOutOfRange {
                    declaration: self.id.to_string(),
                    index,
                    count: self.type_parameters.len(),
                });
            }
        }
        Ok(())
    }

    /// The spread type parameter and the tag pattern it is bounded by.
    pub fn spread_constraint(&self) -> Option<(&ClassifierRef, &TypeRef)> {
        let param = self.type_parameters.get(self.spread_parameter?)?;
        let bound = param.supertypes().first()?;
        Some((param, bound))
    }
}

/// A use of a declaration, specialized by a substitution.
#[derive(Clone, Debug)]
pub struct CallableRef {
    declaration: Rc<Declaration>,
    ty: TypeRef,
    parameter_types: Vec<(ParamIndex, TypeRef)>,
    type_arguments: Substitution,
    /// Number of derivation steps (lifting, nested scopes, spreading) that
    /// produced this callable from a directly visible declaration.
    chain_length: usize,
    /// The callable produces a zero-argument function whose result is the
    /// injected value.
    lifted: bool,
}

impl CallableRef {
    pub fn new(declaration: Rc<Declaration>) -> Self {
        let parameter_types = declaration
            .parameters
            .iter()
            .map(|p| (p.index, p.ty.clone()))
            .collect();
        CallableRef {
            ty: declaration.ty.clone(),
            declaration,
            parameter_types,
            type_arguments: Substitution::new(),
            chain_length: 0,
            lifted: false,
        }
    }

    pub fn declaration(&self) -> &Rc<Declaration> {
        &self.declaration
    }

    pub fn id(&self) -> &DeclId {
        &self.declaration.id
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn parameter_types(&self) -> &[(ParamIndex, TypeRef)] {
        &self.parameter_types
    }

    pub fn parameter_type(&self, index: ParamIndex) -> Option<&TypeRef> {
        self.parameter_types
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, ty)| ty)
    }

    pub fn type_arguments(&self) -> &Substitution {
        &self.type_arguments
    }

    pub fn chain_length(&self) -> usize {
        self.chain_length
    }

    pub fn is_lifted(&self) -> bool {
        self.lifted
    }

    pub fn call_context(&self) -> CallContext {
        self.declaration.call_context
    }

    pub fn import_path(&self) -> Option<&str> {
        self.declaration.import_path.as_deref()
    }

    /// Own type parameters not bound by the current substitution.
    pub fn unbound_type_parameters(&self) -> Vec<ClassifierRef> {
        self.declaration
            .type_parameters
            .iter()
            .filter(|p| !self.type_arguments.contains(p))
            .cloned()
            .collect()
    }

    /// Specialize every type of this callable.
    pub fn substitute(&self, map: &Substitution) -> CallableRef {
        if map.is_empty() {
            return self.clone();
        }
        CallableRef {
            declaration: self.declaration.clone(),
            ty: self.ty.substitute(map),
            parameter_types: self
                .parameter_types
                .iter()
                .map(|(i, ty)| (*i, ty.substitute(map)))
                .collect(),
            type_arguments: self
                .type_arguments
                .compose(map)
                .restrict(&self.declaration.type_parameters),
            chain_length: self.chain_length,
            lifted: self.lifted,
        }
    }

    pub fn with_type(&self, ty: TypeRef) -> CallableRef {
        CallableRef { ty, ..self.clone() }
    }

    /// A callable derived from this one by one more expansion step.
    pub fn derived(&self) -> CallableRef {
        CallableRef {
            chain_length: self.chain_length + 1,
            ..self.clone()
        }
    }

    /// This callable as contributed by `parent`, one expansion step further.
    pub fn derived_from(&self, parent: &CallableRef) -> CallableRef {
        CallableRef {
            chain_length: parent.chain_length + 1,
            ..self.clone()
        }
    }

    /// The result of this zero-argument function producer, as an injectable.
    pub fn lift(&self, result: TypeRef) -> CallableRef {
        CallableRef {
            ty: result,
            chain_length: self.chain_length + 1,
            lifted: true,
            ..self.clone()
        }
    }

    /// Attach a receiver parameter (members of nested declaration scopes).
    pub fn with_receiver(&self, receiver: TypeRef) -> CallableRef {
        let mut parameter_types = vec![(ParamIndex::Receiver, receiver)];
        parameter_types.extend(
            self.parameter_types
                .iter()
                .filter(|(i, _)| *i != ParamIndex::Receiver)
                .cloned(),
        );
        CallableRef {
            parameter_types,
            ..self.clone()
        }
    }
}

impl fmt::Display for CallableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.declaration.id, self.ty)
    }
}
