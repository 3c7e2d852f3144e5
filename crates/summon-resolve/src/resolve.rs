//! Ranked, recursive resolution.
//!
//! A [`Resolver`] walks requests depth first. It keeps the chain of
//! (request, candidate) pairs currently being resolved to detect divergence,
//! and memoizes per scope both by requested type and by candidate. Results
//! computed while a divergence was detected below them depend on the chain
//! and are not memoized.

use std::cmp::Ordering;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use summon_types::ClassifierRef;

use crate::injectable::{Injectable, InjectableId, InjectableRequest};
use crate::rank::{compare_candidates, compare_results};
use crate::result::{Failure, InjectionResult, ResolutionResult, ResolvedValue, Success};
use crate::scope::{ScopeGraph, ScopeId};

pub struct Resolver<'g, 'h> {
    graph: &'g mut ScopeGraph<'h>,
    /// Candidates currently being resolved, outermost first.
    chain: Vec<InjectableId>,
    /// Number of divergences detected so far.
    divergences: u64,
}

impl<'g, 'h> Resolver<'g, 'h> {
    pub fn new(graph: &'g mut ScopeGraph<'h>) -> Self {
        Resolver {
            graph,
            chain: Vec::new(),
            divergences: 0,
        }
    }

    /// Resolve every request of one call site in `scope`.
    pub fn resolve_requests(&mut self, scope: ScopeId, requests: &[InjectableRequest]) -> InjectionResult {
        let mut results = Vec::with_capacity(requests.len());
        let mut worst: Option<(InjectableRequest, Failure)> = None;
        for request in requests {
            match self.resolve_request(scope, request) {
                ResolutionResult::Success(success) => results.push((request.clone(), success)),
                ResolutionResult::Failure(failure) if request.is_required => {
                    if worst.as_ref().map_or(true, |(_, w)| failure.outranks(w)) {
                        worst = Some((request.clone(), failure));
                    }
                }
                ResolutionResult::Failure(_) => results.push((request.clone(), Success::DefaultValue)),
            }
        }

        match worst {
            Some((request, failure)) => {
                tracing::debug!(scope = %scope, request = %request, rank = failure.rank(), "injection failed");
                InjectionResult::Error { scope, request, failure }
            }
            None => {
                tracing::debug!(scope = %scope, requests = requests.len(), "injection resolved");
                InjectionResult::Success { scope, results }
            }
        }
    }

    pub fn resolve_request(&mut self, scope: ScopeId, request: &InjectableRequest) -> ResolutionResult {
        if let Some(hit) = self.graph.scope(scope).memo.results_by_type.get(&request.ty) {
            return match hit {
                ResolutionResult::Failure(failure) => ResolutionResult::Failure(failure.for_request(request)),
                success => success.clone(),
            };
        }
        let epoch = self.divergences;
        let result = self.compute_request(scope, request);
        if self.divergences == epoch {
            self.graph
                .scope_mut(scope)
                .memo
                .results_by_type
                .insert(request.ty.clone(), result.clone());
        }
        result
    }

    fn compute_request(&mut self, scope: ScopeId, request: &InjectableRequest) -> ResolutionResult {
        let statics = self.graph.scope(scope).static_type_parameters().to_vec();

        let candidates = self.graph.injectables_for_type(scope, &request.ty, &statics);
        let user_failure = match self.resolve_some(scope, request, &candidates) {
            Some(Ok(value)) => return ResolutionResult::Success(Success::Value(value)),
            other => other.and_then(Result::err),
        };

        let type_scope = if self.graph.config.type_scopes {
            self.graph.type_scope(&request.ty)
        } else {
            None
        };
        let type_failure = match type_scope {
            Some(type_scope) => {
                let candidates = self.graph.injectables_for_type(type_scope, &request.ty, &statics);
                match self.resolve_some(scope, request, &candidates) {
                    Some(Ok(value)) => return ResolutionResult::Success(Success::Value(value)),
                    other => other.and_then(Result::err),
                }
            }
            None => None,
        };

        // A divergent type scope result never hides a user failure.
        let failure = match (user_failure, type_failure) {
            (Some(user), Some(typed)) => Some(if typed.outranks(&user) && !typed.is_divergent() {
                typed
            } else {
                user
            }),
            (user, typed) => user.or(typed),
        };
        if let Some(failure) = failure {
            return ResolutionResult::Failure(failure);
        }

        if self.graph.config.framework_injectables {
            if let Some(candidate) = self.graph.framework_injectable(scope, &request.ty) {
                return self.resolve_candidate(scope, request, candidate).into();
            }
        }
        ResolutionResult::Failure(Failure::NoCandidates {
            scope,
            request: request.clone(),
        })
    }

    fn resolve_some(
        &mut self,
        scope: ScopeId,
        request: &InjectableRequest,
        candidates: &[InjectableId],
    ) -> Option<Result<Rc<ResolvedValue>, Failure>> {
        if candidates.is_empty() {
            None
        } else {
            Some(self.resolve_candidates(scope, request, candidates))
        }
    }

    fn resolve_candidates(
        &mut self,
        scope: ScopeId,
        request: &InjectableRequest,
        candidates: &[InjectableId],
    ) -> Result<Rc<ResolvedValue>, Failure> {
        if let [only] = candidates {
            return self.resolve_candidate(scope, request, *only);
        }

        let mut sorted = candidates.to_vec();
        {
            let graph = &*self.graph;
            sorted.sort_by(|a, b| compare_candidates(graph, scope, &request.ty, *a, *b));
            let mut usages = FxHashSet::default();
            sorted.retain(|id| usages.insert(graph.injectable(*id).usage_key()));
        }

        let mut best: Vec<Rc<ResolvedValue>> = Vec::new();
        let mut failure: Option<Failure> = None;
        for candidate in sorted {
            if let Some(leader) = best.first() {
                let order = compare_candidates(self.graph, scope, &request.ty, candidate, leader.candidate);
                if order == Ordering::Greater {
                    break;
                }
            }
            match self.resolve_candidate(scope, request, candidate) {
                Ok(value) => {
                    let order = best
                        .first()
                        .map(|leader| compare_results(self.graph, &value, leader, &request.ty));
                    match order {
                        None | Some(Ordering::Less) => best = vec![value],
                        Some(Ordering::Equal) => best.push(value),
                        Some(Ordering::Greater) => {}
                    }
                }
                Err(err) => {
                    if failure.as_ref().map_or(true, |f| err.outranks(f)) {
                        failure = Some(err);
                    }
                }
            }
        }

        if best.len() > 1 {
            tracing::debug!(scope = %scope, ty = %request.ty, candidates = best.len(), "ambiguous candidates");
            return Err(Failure::CandidateAmbiguity {
                request: request.clone(),
                candidates: best,
            });
        }
        match best.pop() {
            Some(value) => Ok(value),
            None => Err(failure.unwrap_or_else(|| Failure::NoCandidates {
                scope,
                request: request.clone(),
            })),
        }
    }

    fn resolve_candidate(
        &mut self,
        scope: ScopeId,
        request: &InjectableRequest,
        candidate: InjectableId,
    ) -> Result<Rc<ResolvedValue>, Failure> {
        if let Some(hit) = self.graph.scope(scope).memo.results_by_candidate.get(&candidate) {
            return hit.clone();
        }
        let epoch = self.divergences;
        let result = self.compute_candidate(scope, request, candidate);
        tracing::trace!(
            scope = %scope,
            candidate = %self.graph.injectable(candidate),
            ty = %request.ty,
            ok = result.is_ok(),
            "candidate resolved"
        );
        if self.divergences == epoch {
            self.graph
                .scope_mut(scope)
                .memo
                .results_by_candidate
                .insert(candidate, result.clone());
        }
        result
    }

    fn compute_candidate(
        &mut self,
        scope: ScopeId,
        request: &InjectableRequest,
        candidate: InjectableId,
    ) -> Result<Rc<ResolvedValue>, Failure> {
        let injectable = self.graph.injectable(candidate).clone();

        let scope_context = self.graph.scope(scope).call_context();
        let candidate_context = injectable.call_context();
        if !self.graph.host.can_call(scope_context, candidate_context) {
            return Err(Failure::CallContextMismatch {
                candidate,
                scope_context,
                candidate_context,
            });
        }

        if let Some((parameter, argument)) = self.reified_mismatch(scope, &injectable) {
            return Err(Failure::ReifiedArgumentMismatch {
                candidate,
                parameter,
                argument,
            });
        }

        if self.diverges(&injectable) {
            self.divergences += 1;
            tracing::debug!(scope = %scope, candidate = %injectable, "divergent injectable");
            return Err(Failure::DivergentInjectable {
                candidate,
                request: request.clone(),
            });
        }

        let dependencies = injectable.dependencies();
        let dependency_scope = if dependencies.is_empty() {
            None
        } else {
            self.graph.dependency_scope(scope, candidate)
        };

        self.chain.push(candidate);
        let mut resolved = Vec::with_capacity(dependencies.len());
        let mut failure = None;
        for dependency in dependencies {
            match self.resolve_request(dependency_scope.unwrap_or(scope), &dependency) {
                ResolutionResult::Success(success) => resolved.push((dependency, success)),
                ResolutionResult::Failure(inner) if dependency.is_required => {
                    failure = Some(Failure::DependencyFailure {
                        candidate,
                        request: dependency,
                        inner: Box::new(inner),
                    });
                    break;
                }
                ResolutionResult::Failure(_) => resolved.push((dependency, Success::DefaultValue)),
            }
        }
        self.chain.pop();

        match failure {
            Some(failure) => Err(failure),
            None => Ok(Rc::new(ResolvedValue {
                candidate,
                scope,
                dependencies: resolved,
            })),
        }
    }

    /// An earlier candidate in the chain with the same origin and covering
    /// classifiers whose type is no larger than this one's.
    fn diverges(&self, injectable: &Injectable) -> bool {
        let origin = injectable.origin();
        let size = injectable.ty().size();
        let covering = injectable.ty().covering_classifiers();
        self.chain.iter().rev().any(|previous| {
            let previous = self.graph.injectable(*previous);
            previous.origin() == origin
                && previous.ty().size() <= size
                && previous.ty().covering_classifiers() == covering
        })
    }

    /// A reified type parameter bound to a type that mentions a non-reified
    /// static type parameter of the scope.
    fn reified_mismatch(&self, scope: ScopeId, injectable: &Injectable) -> Option<(ClassifierRef, ClassifierRef)> {
        let callable = injectable.callable()?;
        let statics = self.graph.scope(scope).static_type_parameters();
        for parameter in &callable.declaration().type_parameters {
            if !parameter.flags().is_reified {
                continue;
            }
            let Some(argument) = callable.type_arguments().get(parameter) else {
                continue;
            };
            if let Some(erased) = argument
                .type_parameters()
                .into_iter()
                .find(|p| statics.contains(p) && !p.flags().is_reified)
            {
                return Some((parameter.clone(), erased));
            }
        }
        None
    }
}

impl<'h> ScopeGraph<'h> {
    /// Resolve the requests of one call site in `scope`.
    pub fn resolve_requests(&mut self, scope: ScopeId, requests: &[InjectableRequest]) -> InjectionResult {
        Resolver::new(self).resolve_requests(scope, requests)
    }

    pub fn resolve_request(&mut self, scope: ScopeId, request: &InjectableRequest) -> ResolutionResult {
        Resolver::new(self).resolve_request(scope, request)
    }
}
