//! Shared fixtures for the resolver integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt::Write;

use summon_common::ModuleId;
use summon_resolve::{
    ComponentMember, Failure, Host, InjectableRequest, ResolutionResult, ScopeGraph, ScopeId, Success,
};
use summon_types::{ClassifierFlags, ClassifierRef, Declaration, ParamIndex, Parameter, TypeRef};

// ── Host ───────────────────────────────────────────────────────────────

/// A host backed by plain maps keyed by classifier key.
#[derive(Default)]
pub struct TestHost {
    pub members: HashMap<String, Vec<Declaration>>,
    pub type_scopes: HashMap<String, Vec<Declaration>>,
    pub components: HashMap<String, Vec<ComponentMember>>,
}

impl Host for TestHost {
    fn current_module(&self) -> ModuleId {
        ModuleId(0)
    }

    fn members_of(&self, classifier: &ClassifierRef) -> Vec<Declaration> {
        self.members.get(classifier.key()).cloned().unwrap_or_default()
    }

    fn type_scope_declarations(&self, classifier: &ClassifierRef) -> Vec<Declaration> {
        self.type_scopes.get(classifier.key()).cloned().unwrap_or_default()
    }

    fn component_members(&self, classifier: &ClassifierRef) -> Vec<ComponentMember> {
        self.components.get(classifier.key()).cloned().unwrap_or_default()
    }
}

// ── Classifiers ────────────────────────────────────────────────────────

pub fn class(key: &str) -> TypeRef {
    TypeRef::of(ClassifierRef::class(key))
}

pub fn param(key: &str) -> ClassifierRef {
    ClassifierRef::type_parameter(key, vec![])
}

pub fn generic(key: &str, arity: usize) -> ClassifierRef {
    let params = (0..arity)
        .map(|i| ClassifierRef::type_parameter(format!("{key}.P{i}"), vec![]))
        .collect();
    ClassifierRef::builder(key).type_parameters(params).build()
}

fn flagged(key: &str, arity: usize, flags: ClassifierFlags) -> ClassifierRef {
    let params = (0..arity)
        .map(|i| ClassifierRef::type_parameter(format!("{key}.P{i}"), vec![]))
        .collect();
    ClassifierRef::builder(key).type_parameters(params).flags(flags).build()
}

pub fn function(arity: usize) -> ClassifierRef {
    flagged(
        &format!("Function{arity}"),
        arity + 1,
        ClassifierFlags { is_function: true, ..Default::default() },
    )
}

pub fn fn0(result: TypeRef) -> TypeRef {
    TypeRef::new(function(0), vec![result])
}

pub fn fn1(parameter: TypeRef, result: TypeRef) -> TypeRef {
    TypeRef::new(function(1), vec![parameter, result])
}

pub fn collection(key: &str) -> ClassifierRef {
    flagged(key, 1, ClassifierFlags { is_collection: true, ..Default::default() })
}

pub fn list_of(element: TypeRef) -> TypeRef {
    TypeRef::new(collection("List"), vec![element])
}

pub fn witness_of(ty: TypeRef) -> TypeRef {
    let witness = flagged("Witness", 1, ClassifierFlags { is_witness: true, ..Default::default() });
    TypeRef::new(witness, vec![ty])
}

pub fn trigger() -> ClassifierRef {
    ClassifierRef::tag("Trigger")
}

pub fn tagged(ty: TypeRef, tag: &ClassifierRef) -> TypeRef {
    ty.tagged(TypeRef::of(tag.clone()))
}

// ── Declarations ───────────────────────────────────────────────────────

pub fn decl(id: &str, ty: TypeRef) -> Declaration {
    Declaration::new(id, ty)
}

pub fn decl_with(id: &str, ty: TypeRef, parameters: &[(&str, TypeRef)]) -> Declaration {
    let parameters = parameters
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| Parameter::new(*name, i, ty.clone()))
        .collect();
    Declaration::new(id, ty).with_parameters(parameters)
}

/// `fun <@Spread T : @Trigger S, S> triggerImpl(instance: T): S`
pub fn trigger_rule() -> Declaration {
    let s = param("triggerImpl.S");
    let t = ClassifierRef::type_parameter("triggerImpl.T", vec![tagged(TypeRef::of(s.clone()), &trigger())]);
    Declaration::new("app.triggerImpl", TypeRef::of(s.clone()))
        .with_type_parameters(vec![t.clone(), s])
        .with_parameters(vec![Parameter::new("instance", 0, TypeRef::of(t))])
        .spreading(0)
}

// ── Resolution ─────────────────────────────────────────────────────────

pub fn request(ty: TypeRef) -> InjectableRequest {
    InjectableRequest::new("test.call", "value", ParamIndex::Value(0), ty)
}

pub fn resolve(graph: &mut ScopeGraph<'_>, scope: ScopeId, ty: TypeRef) -> ResolutionResult {
    graph.resolve_request(scope, &request(ty))
}

/// Resolve `ty` and report what was chosen.
pub fn resolve_chosen(graph: &mut ScopeGraph<'_>, scope: ScopeId, ty: TypeRef) -> String {
    let result = resolve(graph, scope, ty);
    chosen(graph, &result)
}

/// Declaration id of the chosen candidate, or the failure kind.
pub fn chosen(graph: &ScopeGraph<'_>, result: &ResolutionResult) -> String {
    match result {
        ResolutionResult::Success(Success::Value(value)) => match graph.injectable(value.candidate).callable() {
            Some(callable) => callable.id().to_string(),
            None => graph.injectable(value.candidate).to_string(),
        },
        ResolutionResult::Success(Success::DefaultValue) => "<default>".to_string(),
        ResolutionResult::Failure(failure) => failure_kind(failure).to_string(),
    }
}

pub fn failure_kind(failure: &Failure) -> &'static str {
    match failure {
        Failure::NoCandidates { .. } => "NoCandidates",
        Failure::CandidateAmbiguity { .. } => "CandidateAmbiguity",
        Failure::CallContextMismatch { .. } => "CallContextMismatch",
        Failure::DivergentInjectable { .. } => "DivergentInjectable",
        Failure::ReifiedArgumentMismatch { .. } => "ReifiedArgumentMismatch",
        Failure::DependencyFailure { .. } => "DependencyFailure",
    }
}

/// The resolution tree, one injectable per line.
pub fn render(graph: &ScopeGraph<'_>, result: &ResolutionResult) -> String {
    let mut out = String::new();
    match result {
        ResolutionResult::Success(success) => render_success(graph, success, 0, &mut out),
        ResolutionResult::Failure(failure) => {
            let _ = write!(out, "{}", failure_kind(failure));
        }
    }
    out.trim_end().to_string()
}

fn render_success(graph: &ScopeGraph<'_>, success: &Success, depth: usize, out: &mut String) {
    match success {
        Success::DefaultValue => {
            let _ = writeln!(out, "<default>");
        }
        Success::Value(value) => {
            let _ = writeln!(out, "{}", graph.injectable(value.candidate));
            for (request, dependency) in &value.dependencies {
                let _ = write!(out, "{}{} = ", "  ".repeat(depth + 1), request.parameter_name);
                render_success(graph, dependency, depth + 1, out);
            }
        }
    }
}
