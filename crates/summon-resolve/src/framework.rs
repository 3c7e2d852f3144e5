//! Framework injectables, synthesized for requests no user injectable
//! satisfies.
//!
//! - function types become providers
//! - collection types aggregate every assignable element
//! - witness types ask for a nested witness per free type parameter
//! - component types depend on each of their members

use summon_types::{Substitution, TypeRef};

use crate::injectable::{Injectable, InjectableId};
use crate::scope::{ScopeGraph, ScopeId};

impl<'h> ScopeGraph<'h> {
    /// The framework injectable for `ty` requested in `scope`, if any kind applies.
    pub(crate) fn framework_injectable(&mut self, scope: ScopeId, ty: &TypeRef) -> Option<InjectableId> {
        // A keyed request names one specific user injectable.
        if ty.instance_key().is_some() || ty.is_star_projection() {
            return None;
        }
        if let Some(hit) = self.scope(scope).memo.framework.get(ty) {
            return *hit;
        }

        let injectable = self.synthesize(scope, ty);
        let id = injectable.map(|injectable| {
            tracing::trace!(scope = %scope, injectable = %injectable, "framework injectable");
            self.push_injectable(injectable)
        });
        self.scope_mut(scope).memo.framework.insert(ty.clone(), id);
        id
    }

    fn synthesize(&mut self, scope: ScopeId, ty: &TypeRef) -> Option<Injectable> {
        let classifier = ty.classifier();
        let flags = classifier.flags();

        if ty.is_function() {
            return Some(Injectable::Provider {
                ty: ty.clone(),
                owner_scope: scope,
            });
        }

        if flags.is_collection && ty.arguments().len() == 1 {
            let statics = self.scope(scope).static_type_parameters().to_vec();
            let elements = self.elements_for_type(scope, &ty.arguments()[0], &statics);
            if elements.is_empty() {
                return None;
            }
            return Some(Injectable::Collection {
                ty: ty.clone(),
                elements: elements.to_vec(),
                owner_scope: scope,
            });
        }

        if flags.is_witness && ty.arguments().len() == 1 {
            // A bare type parameter is witnessed only when reified.
            let witnessed = &ty.arguments()[0];
            if witnessed.is_type_parameter() && !witnessed.classifier().flags().is_reified {
                return None;
            }
            return Some(Injectable::Witness {
                ty: ty.clone(),
                owner_scope: scope,
            });
        }

        if flags.is_component {
            let arguments = Substitution::from_pairs(
                classifier
                    .type_parameters()
                    .iter()
                    .cloned()
                    .zip(ty.arguments().iter().cloned()),
            );
            let members = self
                .host
                .component_members(classifier)
                .into_iter()
                .map(|mut member| {
                    member.ty = member.ty.substitute(&arguments);
                    member
                })
                .collect();
            return Some(Injectable::Component {
                ty: ty.clone(),
                members,
                owner_scope: scope,
            });
        }

        None
    }
}
