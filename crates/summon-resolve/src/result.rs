//! Resolution outcomes.
//!
//! Every request ends in exactly one [`Success`] or one [`Failure`]. Failures
//! are plain values carrying the ids needed to report them; formatting
//! messages is the host's job.

use std::rc::Rc;

use summon_common::CallContext;
use summon_types::{ClassifierRef, ParamIndex};

use crate::injectable::{InjectableId, InjectableRequest};
use crate::scope::ScopeId;

/// A candidate together with the resolution of each of its dependencies.
#[derive(Clone, Debug)]
pub struct ResolvedValue {
    pub candidate: InjectableId,
    /// Scope the candidate was resolved in.
    pub scope: ScopeId,
    pub dependencies: Vec<(InjectableRequest, Success)>,
}

impl ResolvedValue {
    pub fn dependency(&self, index: ParamIndex) -> Option<&Success> {
        self.dependencies
            .iter()
            .find(|(request, _)| request.parameter_index == index)
            .map(|(_, success)| success)
    }
}

#[derive(Clone, Debug)]
pub enum Success {
    Value(Rc<ResolvedValue>),
    /// An optional request without a usable candidate: the declared default applies.
    DefaultValue,
}

impl Success {
    pub fn value(&self) -> Option<&Rc<ResolvedValue>> {
        match self {
            Success::Value(value) => Some(value),
            Success::DefaultValue => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Failure {
    NoCandidates {
        scope: ScopeId,
        request: InjectableRequest,
    },
    /// Several candidates resolved equally well.
    CandidateAmbiguity {
        request: InjectableRequest,
        candidates: Vec<Rc<ResolvedValue>>,
    },
    CallContextMismatch {
        candidate: InjectableId,
        scope_context: CallContext,
        candidate_context: CallContext,
    },
    DivergentInjectable {
        candidate: InjectableId,
        request: InjectableRequest,
    },
    /// A reified type parameter would receive a type mentioning a
    /// non-reified type parameter of the enclosing scope.
    ReifiedArgumentMismatch {
        candidate: InjectableId,
        parameter: ClassifierRef,
        argument: ClassifierRef,
    },
    DependencyFailure {
        candidate: InjectableId,
        request: InjectableRequest,
        inner: Box<Failure>,
    },
}

impl Failure {
    /// Lower ranks are reported in preference to higher ones.
    pub fn rank(&self) -> u8 {
        match self {
            Failure::CandidateAmbiguity { .. } => 0,
            Failure::CallContextMismatch { .. } | Failure::ReifiedArgumentMismatch { .. } => 1,
            Failure::DivergentInjectable { .. } => 2,
            Failure::DependencyFailure { inner, .. } => inner.rank(),
            Failure::NoCandidates { .. } => 3,
        }
    }

    /// The innermost failure of a dependency chain.
    pub fn root_cause(&self) -> &Failure {
        let mut current = self;
        while let Failure::DependencyFailure { inner, .. } = current {
            current = inner;
        }
        current
    }

    pub fn is_divergent(&self) -> bool {
        matches!(self.root_cause(), Failure::DivergentInjectable { .. })
    }

    /// The same failure reported against `request`. Dependency failures keep
    /// the request of the dependency that failed.
    pub(crate) fn for_request(&self, request: &InjectableRequest) -> Failure {
        let mut failure = self.clone();
        match &mut failure {
            Failure::NoCandidates { request: r, .. }
            | Failure::CandidateAmbiguity { request: r, .. }
            | Failure::DivergentInjectable { request: r, .. } => *r = request.clone(),
            Failure::CallContextMismatch { .. }
            | Failure::ReifiedArgumentMismatch { .. }
            | Failure::DependencyFailure { .. } => {}
        }
        failure
    }

    /// Whether `self` should be reported instead of `other`. Ties keep `other`.
    pub(crate) fn outranks(&self, other: &Failure) -> bool {
        self.rank() < other.rank()
    }
}

#[derive(Clone, Debug)]
pub enum ResolutionResult {
    Success(Success),
    Failure(Failure),
}

impl ResolutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionResult::Success(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ResolutionResult::Failure(failure) => Some(failure),
            ResolutionResult::Success(_) => None,
        }
    }
}

impl From<Result<Rc<ResolvedValue>, Failure>> for ResolutionResult {
    fn from(result: Result<Rc<ResolvedValue>, Failure>) -> Self {
        match result {
            Ok(value) => ResolutionResult::Success(Success::Value(value)),
            Err(failure) => ResolutionResult::Failure(failure),
        }
    }
}

/// Outcome of resolving all requests of one call site.
#[derive(Clone, Debug)]
pub enum InjectionResult {
    Success {
        scope: ScopeId,
        results: Vec<(InjectableRequest, Success)>,
    },
    /// The most significant failure among the required requests.
    Error {
        scope: ScopeId,
        request: InjectableRequest,
        failure: Failure,
    },
}

impl InjectionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InjectionResult::Success { .. })
    }

    pub fn success_value(&self, index: ParamIndex) -> Option<&Success> {
        match self {
            InjectionResult::Success { results, .. } => results
                .iter()
                .find(|(request, _)| request.parameter_index == index)
                .map(|(_, success)| success),
            InjectionResult::Error { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            InjectionResult::Error { failure, .. } => Some(failure),
            InjectionResult::Success { .. } => None,
        }
    }
}
