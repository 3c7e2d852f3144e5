//! Phase two of scope construction: the expansion fixpoint.
//!
//! Starting from the host's declarations, a scope collects:
//! - the declarations themselves, each with a fresh instance key
//! - the results of tag-lifted zero-argument producers
//! - the members of injectables whose type is itself a declaration scope
//! - the outputs of spreading rules, replayed until nothing new appears
//!
//! Ancestors are sealed: rules inherited from them are replayed against this
//! scope's candidates, but every output lands in this scope.

use std::rc::Rc;

use rustc_hash::FxHashSet;
use summon_common::DeclId;
use summon_types::{build_context, CallableRef, ClassifierRef, Declaration, Substitution, TypeRef};

use crate::scope::{ScopeGraph, ScopeId};

/// Identity of a collected callable: declaration, substitution, produced
/// type without instance key, and whether it is a lifted result.
type SeenKey = (DeclId, Substitution, TypeRef, bool);

/// A spreading rule applied to one candidate type.
type SpreadKey = (DeclId, Substitution, TypeRef);

#[derive(Default)]
struct Expansion {
    injectables: Vec<CallableRef>,
    spreading: Vec<CallableRef>,
    seen: FxHashSet<SeenKey>,
    processed: FxHashSet<SpreadKey>,
}

impl<'h> ScopeGraph<'h> {
    pub(crate) fn expand(&mut self, id: ScopeId, declarations: Vec<Declaration>) {
        let mut expansion = Expansion::default();
        for declaration in declarations {
            self.collect(&mut expansion, CallableRef::new(Rc::new(declaration)));
        }

        let statics = self.scope(id).static_type_parameters().to_vec();
        let mut inherited_rules = Vec::new();
        let mut inherited_candidates = Vec::new();
        for ancestor in self.ancestors(id).skip(1) {
            inherited_rules.extend(ancestor.spreading_rules().iter().cloned());
            inherited_candidates.extend(ancestor.injectables().iter().cloned());
        }

        let mut rounds = 0;
        loop {
            rounds += 1;
            let local = expansion.injectables.clone();
            let mut pairs: Vec<(&CallableRef, &CallableRef)> = Vec::new();
            for rule in &expansion.spreading {
                for candidate in inherited_candidates.iter().chain(&local) {
                    pairs.push((rule, candidate));
                }
            }
            for rule in &inherited_rules {
                for candidate in &local {
                    pairs.push((rule, candidate));
                }
            }

            let mut produced = Vec::new();
            for (rule, candidate) in pairs {
                let key = (rule.id().clone(), rule.type_arguments().clone(), candidate.ty().clone());
                if !expansion.processed.insert(key) {
                    continue;
                }
                if let Some(derived) = spread(rule, candidate, &statics) {
                    tracing::trace!(scope = %id, rule = %rule.id(), candidate = %candidate.ty(), "spread");
                    produced.push(derived);
                }
            }
            if produced.is_empty() {
                break;
            }
            for callable in produced {
                self.collect(&mut expansion, callable);
            }
        }

        tracing::debug!(
            scope = %id,
            owner = ?self.scope(id).owner(),
            injectables = expansion.injectables.len(),
            spreading = expansion.spreading.len(),
            rounds,
            "scope built"
        );
        let scope = self.scope_mut(id);
        scope.injectables = expansion.injectables;
        scope.spreading = expansion.spreading;
    }

    fn collect(&mut self, expansion: &mut Expansion, callable: CallableRef) {
        if callable.chain_length() > self.config.max_expansion_depth {
            tracing::trace!(callable = %callable, "expansion depth exceeded");
            return;
        }
        let seen = (
            callable.id().clone(),
            callable.type_arguments().clone(),
            callable.ty().without_instance_key(),
            callable.is_lifted(),
        );
        if !expansion.seen.insert(seen) {
            return;
        }

        if let Some((param, _)) = callable.declaration().spread_constraint() {
            if !callable.type_arguments().contains(param) {
                expansion.spreading.push(callable);
                return;
            }
        }

        let key = self.fresh_instance_key();
        let callable = callable.with_type(callable.ty().with_instance_key(Some(key)));
        expansion.injectables.push(callable.clone());

        if let Some(result) = lifted_result(callable.ty()) {
            tracing::trace!(callable = %callable, result = %result, "lifted producer");
            self.collect(expansion, callable.lift(result));
        }

        let ty = callable.ty();
        if ty.is_nullable() || ty.is_type_parameter() {
            return;
        }
        let members = self.host.members_of(ty.classifier());
        if members.is_empty() {
            return;
        }
        let arguments = Substitution::from_pairs(
            ty.classifier()
                .type_parameters()
                .iter()
                .cloned()
                .zip(ty.arguments().iter().cloned()),
        );
        for member in members {
            if let Err(err) = member.validate() {
                tracing::warn!(module = %ty, %err, "skipping nested declaration");
                continue;
            }
            let member = CallableRef::new(Rc::new(member))
                .substitute(&arguments)
                .with_receiver(ty.clone())
                .derived_from(&callable);
            tracing::trace!(module = %ty, member = %member, "nested declaration");
            self.collect(expansion, member);
        }
    }
}

/// The result type of a zero-argument function carrying a result-lifting tag.
fn lifted_result(ty: &TypeRef) -> Option<TypeRef> {
    if !ty.is_function() || !ty.function_parameters().is_empty() {
        return None;
    }
    if !ty.tags().iter().any(|t| t.classifier().flags().lifts_result) {
        return None;
    }
    ty.function_return().cloned()
}

/// Apply a spreading rule to one candidate. The output is one derivation
/// step further than the longer of the two chains.
fn spread(rule: &CallableRef, candidate: &CallableRef, statics: &[ClassifierRef]) -> Option<CallableRef> {
    let (param, bound) = rule.declaration().spread_constraint()?;
    let pattern = bound.substitute(rule.type_arguments());
    let mut map = build_context(candidate.ty(), statics, &pattern).ok()?;
    map.insert(param.clone(), candidate.ty().clone());
    let derived = rule.substitute(&map);
    Some(if rule.chain_length() > candidate.chain_length() {
        derived.derived()
    } else {
        derived.derived_from(candidate)
    })
}
