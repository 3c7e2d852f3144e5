//! One-sided unification.
//!
//! [`build_context`] answers "can this producer's type be specialized so that
//! it is assignable to the requested type", and if so returns the
//! substitution that does it.
//!
//! Type parameters on either side are variables unless they are static
//! (visible from the enclosing scope, where they stay symbolic). Bindings
//! are tracked in an `ena` union-find table; a variable bound twice must
//! receive structurally unifiable values, otherwise the context is
//! inconsistent.

use std::fmt;

use ena::unify::{EqUnifyValue, InPlaceUnificationTable, UnifyKey};
use rustc_hash::FxHashMap;

use crate::subst::Substitution;
use crate::subtype::{is_subtype_of, subtype_view};
use crate::ty::{ClassifierRef, TypeRef};

/// Why a candidate type cannot be specialized to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextError {
    ClassifierMismatch { candidate: TypeRef, requested: TypeRef },
    NullabilityMismatch { candidate: TypeRef, requested: TypeRef },
    MissingTag { tag: ClassifierRef, requested: TypeRef },
    ConflictingBinding { parameter: ClassifierRef, first: TypeRef, second: TypeRef },
    RecursiveBinding { parameter: ClassifierRef, ty: TypeRef },
    BoundViolation { parameter: ClassifierRef, argument: TypeRef, bound: TypeRef },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::ClassifierMismatch { candidate, requested } => {
                write!(f, "`{}` is not assignable to `{}`", candidate, requested)
            }
            ContextError::NullabilityMismatch { candidate, requested } => {
                write!(f, "nullability of `{}` does not fit `{}`", candidate, requested)
            }
            ContextError::MissingTag { tag, requested } => {
                write!(f, "tag `@{}` of `{}` is missing", tag, requested)
            }
            ContextError::ConflictingBinding { parameter, first, second } => {
                write!(f, "`{}` bound to both `{}` and `{}`", parameter, first, second)
            }
            ContextError::RecursiveBinding { parameter, ty } => {
                write!(f, "`{}` occurs in its own binding `{}`", parameter, ty)
            }
            ContextError::BoundViolation { parameter, argument, bound } => {
                write!(f, "`{}` := `{}` violates bound `{}`", parameter, argument, bound)
            }
        }
    }
}

/// A bindable type parameter, an index into the unification table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct ParamVar(u32);

impl UnifyKey for ParamVar {
    type Value = Option<TypeRef>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        ParamVar(u)
    }

    fn tag() -> &'static str {
        "ParamVar"
    }
}

impl EqUnifyValue for TypeRef {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Variance {
    /// The candidate must be assignable to the request.
    Covariant,
    /// Both sides must denote the same type (argument positions).
    Invariant,
}

/// Match `candidate` against `requested`.
///
/// Returns the substitution under which `candidate` is assignable to
/// `requested`. Parameters listed in `static_type_parameters` are never
/// bound. Instance keys are ignored.
pub fn build_context(
    candidate: &TypeRef,
    static_type_parameters: &[ClassifierRef],
    requested: &TypeRef,
) -> Result<Substitution, ContextError> {
    let mut unifier = Unifier::new(static_type_parameters);
    unifier.register(candidate);
    unifier.register(requested);
    let result = unifier
        .unify(candidate, requested, Variance::Covariant)
        .and_then(|()| unifier.finish());
    if let Err(err) = &result {
        tracing::trace!(%candidate, %requested, %err, "no type context");
    }
    result
}

struct Unifier<'a> {
    table: InPlaceUnificationTable<ParamVar>,
    vars: FxHashMap<ClassifierRef, ParamVar>,
    /// Classifier of each variable, indexed by `ParamVar.0`.
    params: Vec<ClassifierRef>,
    statics: &'a [ClassifierRef],
}

impl<'a> Unifier<'a> {
    fn new(statics: &'a [ClassifierRef]) -> Self {
        Unifier {
            table: InPlaceUnificationTable::new(),
            vars: FxHashMap::default(),
            params: Vec::new(),
            statics,
        }
    }

    fn register(&mut self, ty: &TypeRef) {
        for param in ty.type_parameters() {
            if self.statics.contains(&param) || self.vars.contains_key(&param) {
                continue;
            }
            let var = self.table.new_key(None);
            self.vars.insert(param.clone(), var);
            self.params.push(param);
        }
    }

    fn var_of(&self, ty: &TypeRef) -> Option<ParamVar> {
        if ty.is_star_projection() || !ty.is_type_parameter() {
            return None;
        }
        self.vars.get(ty.classifier()).copied()
    }

    fn param(&self, var: ParamVar) -> ClassifierRef {
        self.params[var.0 as usize].clone()
    }

    // ── Structural walk ─────────────────────────────────────────────────

    fn unify(&mut self, c: &TypeRef, r: &TypeRef, variance: Variance) -> Result<(), ContextError> {
        if c.is_star_projection() || r.is_star_projection() {
            return Ok(());
        }
        match (self.var_of(c), self.var_of(r)) {
            (Some(cv), Some(rv))
                if c.tags().is_empty()
                    && r.tags().is_empty()
                    && c.is_nullable() == r.is_nullable() =>
            {
                self.unify_vars(cv, rv)
            }
            (_, Some(rv)) => self.bind_requested(c, r, rv, variance),
            (Some(cv), None) => self.bind_candidate(c, r, cv),
            (None, None) => self.unify_concrete(c, r, variance),
        }
    }

    /// A variable on the requested side takes the candidate's position,
    /// minus the tags it requires itself.
    fn bind_requested(
        &mut self,
        c: &TypeRef,
        r: &TypeRef,
        rv: ParamVar,
        variance: Variance,
    ) -> Result<(), ContextError> {
        let mut matched = Vec::new();
        for rt in r.tags() {
            match c.tag(rt.classifier()) {
                Some(ct) => {
                    self.unify(ct, rt, Variance::Invariant)?;
                    matched.push(rt.classifier().clone());
                }
                None => {
                    return Err(ContextError::MissingTag {
                        tag: rt.classifier().clone(),
                        requested: r.clone(),
                    })
                }
            }
        }
        let mut value = c.without_tags(&matched).without_instance_key();
        if r.is_nullable() {
            if variance == Variance::Invariant && !c.is_nullable() {
                return Err(ContextError::NullabilityMismatch {
                    candidate: c.clone(),
                    requested: r.clone(),
                });
            }
            value = value.with_nullability(false);
        }
        self.bind(rv, value)
    }

    /// A variable on the candidate side takes the requested position, minus
    /// the tags the candidate already carries. Every candidate tag must be
    /// requested.
    fn bind_candidate(
        &mut self,
        c: &TypeRef,
        r: &TypeRef,
        cv: ParamVar,
    ) -> Result<(), ContextError> {
        if c.is_nullable() && !r.is_nullable() {
            return Err(ContextError::NullabilityMismatch {
                candidate: c.clone(),
                requested: r.clone(),
            });
        }
        let mut matched = Vec::new();
        for ct in c.tags() {
            match r.tag(ct.classifier()) {
                Some(rt) => {
                    self.unify(ct, rt, Variance::Invariant)?;
                    matched.push(ct.classifier().clone());
                }
                None => {
                    return Err(ContextError::MissingTag {
                        tag: ct.classifier().clone(),
                        requested: r.clone(),
                    })
                }
            }
        }
        let mut value = r.without_tags(&matched).without_instance_key();
        if c.is_nullable() {
            value = value.with_nullability(false);
        }
        self.bind(cv, value)
    }

    fn unify_concrete(&mut self, c: &TypeRef, r: &TypeRef, variance: Variance) -> Result<(), ContextError> {
        let nullability_ok = match variance {
            Variance::Covariant => !c.is_nullable() || r.is_nullable(),
            Variance::Invariant => c.is_nullable() == r.is_nullable(),
        };
        if !nullability_ok {
            return Err(ContextError::NullabilityMismatch {
                candidate: c.clone(),
                requested: r.clone(),
            });
        }

        // Tags unify by tag classifier, independent of their position.
        for rt in r.tags() {
            match c.tag(rt.classifier()) {
                Some(ct) => self.unify(ct, rt, Variance::Invariant)?,
                None => {
                    return Err(ContextError::MissingTag {
                        tag: rt.classifier().clone(),
                        requested: r.clone(),
                    })
                }
            }
        }
        if variance == Variance::Covariant && r.classifier().flags().is_top {
            return Ok(());
        }

        // Unlike plain subtyping, a candidate's extra tags keep it from
        // matching: `@Tag Foo` is not offered for `Foo`.
        if let Some(extra) = c.tags().iter().find(|ct| r.tag(ct.classifier()).is_none()) {
            return Err(ContextError::MissingTag {
                tag: extra.classifier().clone(),
                requested: r.clone(),
            });
        }

        let mismatch = || ContextError::ClassifierMismatch {
            candidate: c.clone(),
            requested: r.clone(),
        };
        let view = if c.classifier() == r.classifier() {
            c.clone()
        } else if variance == Variance::Covariant {
            subtype_view(c, r.classifier()).ok_or_else(mismatch)?
        } else {
            return Err(mismatch());
        };
        if view.arguments().len() != r.arguments().len() {
            return Err(mismatch());
        }
        for (a, b) in view.arguments().iter().zip(r.arguments()) {
            self.unify(a, b, Variance::Invariant)?;
        }
        Ok(())
    }

    // ── Bindings ────────────────────────────────────────────────────────

    fn unify_vars(&mut self, a: ParamVar, b: ParamVar) -> Result<(), ContextError> {
        if self.table.find(a) == self.table.find(b) {
            return Ok(());
        }
        match (self.table.probe_value(a), self.table.probe_value(b)) {
            (Some(x), Some(y)) => self.unify(&x, &y, Variance::Invariant),
            (Some(x), None) if self.occurs(b, &x) => Err(ContextError::RecursiveBinding {
                parameter: self.param(b),
                ty: x,
            }),
            (None, Some(y)) if self.occurs(a, &y) => Err(ContextError::RecursiveBinding {
                parameter: self.param(a),
                ty: y,
            }),
            _ => self
                .table
                .unify_var_var(a, b)
                .map_err(|(first, second)| ContextError::ConflictingBinding {
                    parameter: self.param(a),
                    first,
                    second,
                }),
        }
    }

    fn bind(&mut self, var: ParamVar, value: TypeRef) -> Result<(), ContextError> {
        if let Some(other) = self.var_of(&value) {
            if value.tags().is_empty() && !value.is_nullable() {
                return self.unify_vars(var, other);
            }
        }
        if self.occurs(var, &value) {
            return Err(ContextError::RecursiveBinding {
                parameter: self.param(var),
                ty: value,
            });
        }
        match self.table.probe_value(var) {
            Some(existing) => self.unify(&existing, &value, Variance::Invariant),
            None => self
                .table
                .unify_var_value(var, Some(value))
                .map_err(|(first, second)| ContextError::ConflictingBinding {
                    parameter: self.param(var),
                    first,
                    second,
                }),
        }
    }

    /// Whether `var` occurs in `ty`, following existing bindings.
    fn occurs(&mut self, var: ParamVar, ty: &TypeRef) -> bool {
        let root = self.table.find(var);
        for param in ty.type_parameters() {
            let Some(&other) = self.vars.get(&param) else {
                continue;
            };
            if self.table.find(other) == root {
                return true;
            }
            if let Some(inner) = self.table.probe_value(other) {
                if self.occurs(var, &inner) {
                    return true;
                }
            }
        }
        false
    }

    // ── Result ──────────────────────────────────────────────────────────

    fn finish(&mut self) -> Result<Substitution, ContextError> {
        let mut map = Substitution::new();
        for index in 0..self.params.len() {
            let var = ParamVar(index as u32);
            match self.table.probe_value(var) {
                Some(value) => map.insert(self.param(var), value),
                None => {
                    let root = self.table.find(var);
                    if root != var {
                        map.insert(self.param(var), TypeRef::of(self.param(root)));
                    }
                }
            }
        }

        // Bound values may mention other bound variables; close over them.
        for _ in 0..=self.params.len() {
            let next = Substitution::from_pairs(
                map.iter().map(|(k, v)| (k.clone(), v.substitute(&map))),
            );
            if next == map {
                break;
            }
            map = next;
        }

        self.check_bounds(&map)?;
        Ok(map)
    }

    fn check_bounds(&self, map: &Substitution) -> Result<(), ContextError> {
        let unresolved = |ty: &TypeRef| {
            ty.type_parameters()
                .iter()
                .any(|p| self.vars.contains_key(p) && !map.contains(p))
        };
        for (param, argument) in map.sorted() {
            if unresolved(argument) {
                continue;
            }
            for bound in param.supertypes() {
                let bound = bound.substitute(map);
                if unresolved(&bound) {
                    continue;
                }
                if !is_subtype_of(argument, &bound) {
                    return Err(ContextError::BoundViolation {
                        parameter: param.clone(),
                        argument: argument.clone(),
                        bound,
                    });
                }
            }
        }
        Ok(())
    }
}
