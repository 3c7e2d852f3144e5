//! Subtype tests and supertype projection.
//!
//! - Nullable is never a subtype of non-nullable.
//! - Every tag required by the supertype must be present on the subtype and
//!   be assignable itself. Extra tags on the subtype are ignored.
//! - A top-type target is satisfied by anything once its tags are met.
//! - Equal classifiers compare arguments for mutual assignability.
//! - Differing classifiers project the subtype through its supertype closure.
//! - Star projections are universal sub- and supertypes.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::ty::{ClassifierRef, TypeRef};

/// Whether `a` can be used where `b` is expected.
pub fn is_subtype_of(a: &TypeRef, b: &TypeRef) -> bool {
    if a.is_star_projection() || b.is_star_projection() {
        return true;
    }
    if a.is_nullable() && !b.is_nullable() {
        return false;
    }
    for required in b.tags() {
        match a.tag(required.classifier()) {
            Some(present) if is_subtype_of(present, required) => {}
            _ => return false,
        }
    }
    if b.classifier().flags().is_top {
        return true;
    }
    if a.classifier() == b.classifier() {
        return arguments_match(a.arguments(), b.arguments());
    }
    match subtype_view(a, b.classifier()) {
        Some(view) => arguments_match(view.arguments(), b.arguments()),
        None => false,
    }
}

fn arguments_match(a: &[TypeRef], b: &[TypeRef]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| is_subtype_of(x, y) && is_subtype_of(y, x))
}

/// Project `ty` onto `classifier` through its supertype closure.
///
/// Returns `ty` itself when the classifiers already match. The search is
/// breadth-first, so the nearest supertype wins.
pub fn subtype_view(ty: &TypeRef, classifier: &ClassifierRef) -> Option<TypeRef> {
    supertype_path(ty, classifier).map(|(view, _)| view)
}

/// Number of supertype steps from `ty` to `classifier`, if reachable.
pub fn supertype_distance(ty: &TypeRef, classifier: &ClassifierRef) -> Option<usize> {
    supertype_path(ty, classifier).map(|(_, distance)| distance)
}

fn supertype_path(ty: &TypeRef, classifier: &ClassifierRef) -> Option<(TypeRef, usize)> {
    if ty.classifier() == classifier {
        return Some((ty.clone(), 0));
    }
    let mut visited: FxHashSet<ClassifierRef> = FxHashSet::default();
    visited.insert(ty.classifier().clone());
    let mut queue: VecDeque<(TypeRef, usize)> = VecDeque::new();
    queue.push_back((ty.clone(), 0));

    while let Some((current, distance)) = queue.pop_front() {
        for sup in current.supertypes() {
            if sup.classifier() == classifier {
                return Some((sup, distance + 1));
            }
            if visited.insert(sup.classifier().clone()) {
                queue.push_back((sup, distance + 1));
            }
        }
    }
    None
}
