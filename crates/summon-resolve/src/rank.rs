//! Candidate ranking.
//!
//! Candidates are ordered by, in turn:
//! 1. user scope before type scope
//! 2. closer owner scope (deeper nesting) first
//! 3. local module before imported
//! 4. more specific produced type, then more specific declared type
//! 5. fewer dependencies
//! 6. call context matching a non-default requesting scope
//! 7. shorter derivation chain
//!
//! Resolved values tied on all of these are further compared through their
//! dependencies. A tie after that is an ambiguity.

use std::cmp::Ordering;

use summon_common::CallContext;
use summon_types::{is_subtype_of, supertype_distance, TypeRef};

use crate::injectable::{Injectable, InjectableId};
use crate::result::{ResolvedValue, Success};
use crate::scope::{ScopeGraph, ScopeId};

/// Order two candidates for `requested` resolved in `scope`. `Less` means
/// `a` is preferred.
pub fn compare_candidates(
    graph: &ScopeGraph<'_>,
    scope: ScopeId,
    requested: &TypeRef,
    a: InjectableId,
    b: InjectableId,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (ia, ib) = (graph.injectable(a), graph.injectable(b));
    let (sa, sb) = (graph.scope(ia.owner_scope()), graph.scope(ib.owner_scope()));
    let context = graph.scope(scope).call_context();

    sa.is_type_scope()
        .cmp(&sb.is_type_scope())
        .then_with(|| sb.nesting().cmp(&sa.nesting()))
        .then_with(|| is_local(graph, ib).cmp(&is_local(graph, ia)))
        .then_with(|| compare_types(ia.ty(), ib.ty(), requested))
        .then_with(|| compare_types(ia.declared_type(), ib.declared_type(), requested))
        .then_with(|| ia.dependency_count().cmp(&ib.dependency_count()))
        .then_with(|| {
            if context == CallContext::Default {
                return Ordering::Equal;
            }
            (ib.call_context() == context).cmp(&(ia.call_context() == context))
        })
        .then_with(|| ia.chain_length().cmp(&ib.chain_length()))
}

fn is_local(graph: &ScopeGraph<'_>, injectable: &Injectable) -> bool {
    injectable.import_path().is_none()
        && injectable
            .module()
            .map_or(true, |module| module == graph.host.current_module())
}

/// Specificity of two produced types. `Less` means `a` is more specific.
///
/// Non-null beats nullable and concrete beats a type parameter. Otherwise a
/// strict subtype wins; unrelated classifiers compare by their distance to
/// the requested classifier, the deeper one winning.
pub fn compare_types(a: &TypeRef, b: &TypeRef, requested: &TypeRef) -> Ordering {
    let (a, b) = (a.without_instance_key(), b.without_instance_key());
    if a == b {
        return Ordering::Equal;
    }
    let prefer = |x: bool, y: bool| match (x, y) {
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        _ => None,
    };
    if let Some(order) = prefer(!a.is_star_projection(), !b.is_star_projection())
        .or_else(|| prefer(!a.is_nullable(), !b.is_nullable()))
        .or_else(|| prefer(!a.is_type_parameter(), !b.is_type_parameter()))
        .or_else(|| prefer(is_subtype_of(&a, &b), is_subtype_of(&b, &a)))
    {
        return order;
    }

    if a.classifier() != b.classifier() {
        return match (
            supertype_distance(&a, requested.classifier()),
            supertype_distance(&b, requested.classifier()),
        ) {
            (Some(da), Some(db)) => db.cmp(&da),
            _ => Ordering::Equal,
        };
    }
    for (i, (x, y)) in a.arguments().iter().zip(b.arguments()).enumerate() {
        let requested = requested.arguments().get(i).unwrap_or(x);
        let order = compare_types(x, y, requested);
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

/// Order two resolved values. Equal candidates are compared through the
/// resolutions of their dependencies: one side wins only if it is better in
/// at least one dependency and worse in none.
pub fn compare_results(
    graph: &ScopeGraph<'_>,
    a: &ResolvedValue,
    b: &ResolvedValue,
    requested: &TypeRef,
) -> Ordering {
    let order = compare_candidates(graph, a.scope, requested, a.candidate, b.candidate);
    if order != Ordering::Equal {
        return order;
    }

    let (mut a_better, mut b_better) = (false, false);
    for (request, sa) in &a.dependencies {
        let Some(sb) = b.dependency(request.parameter_index) else {
            continue;
        };
        match compare_successes(graph, sa, sb, &request.ty) {
            Ordering::Less => a_better = true,
            Ordering::Greater => b_better = true,
            Ordering::Equal => {}
        }
    }
    match (a_better, b_better) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_successes(graph: &ScopeGraph<'_>, a: &Success, b: &Success, requested: &TypeRef) -> Ordering {
    match (a, b) {
        (Success::Value(x), Success::Value(y)) => compare_results(graph, x, y, requested),
        (Success::Value(_), Success::DefaultValue) => Ordering::Less,
        (Success::DefaultValue, Success::Value(_)) => Ordering::Greater,
        (Success::DefaultValue, Success::DefaultValue) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use summon_types::ClassifierRef;

    use super::*;

    fn class(key: &str) -> TypeRef {
        TypeRef::of(ClassifierRef::class(key))
    }

    #[test]
    fn subtype_is_more_specific() {
        let animal = ClassifierRef::class("Animal");
        let dog = ClassifierRef::builder("Dog")
            .supertypes(vec![TypeRef::of(animal.clone())])
            .build();
        let requested = TypeRef::of(animal.clone());
        assert_eq!(
            compare_types(&TypeRef::of(dog.clone()), &requested, &requested),
            Ordering::Less
        );
        assert_eq!(
            compare_types(&requested, &TypeRef::of(dog), &requested),
            Ordering::Greater
        );
    }

    #[test]
    fn non_null_beats_nullable() {
        let foo = class("Foo");
        assert_eq!(compare_types(&foo, &foo.nullable(), &foo.nullable()), Ordering::Less);
    }

    #[test]
    fn deeper_unrelated_type_is_more_specific() {
        let animal = ClassifierRef::class("Animal");
        let cat = ClassifierRef::builder("Cat")
            .supertypes(vec![TypeRef::of(animal.clone())])
            .build();
        let dog = ClassifierRef::builder("Dog")
            .supertypes(vec![TypeRef::of(animal.clone())])
            .build();
        let puppy = ClassifierRef::builder("Puppy")
            .supertypes(vec![TypeRef::of(dog)])
            .build();
        let requested = TypeRef::of(animal);
        assert_eq!(
            compare_types(&TypeRef::of(puppy), &TypeRef::of(cat), &requested),
            Ordering::Less
        );
    }

    #[test]
    fn instance_keys_do_not_rank() {
        let foo = class("Foo");
        assert_eq!(
            compare_types(&foo.with_instance_key(Some(1)), &foo.with_instance_key(Some(2)), &foo),
            Ordering::Equal
        );
    }
}
