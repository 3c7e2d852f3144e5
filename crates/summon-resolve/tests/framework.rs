//! Framework injectables, type scopes and divergence.

mod common;

use common::*;
use summon_common::{CallContext, ResolverConfig};
use summon_resolve::{ComponentMember, Failure, ResolutionResult, ScopeGraph, ScopeSpec};
use summon_types::{ClassifierFlags, ClassifierRef, TypeRef};

// ── Helpers ────────────────────────────────────────────────────────────

fn failure(result: &ResolutionResult) -> &Failure {
    match result {
        ResolutionResult::Failure(failure) => failure,
        other => panic!("expected a failure, got {:?}", other),
    }
}

// ── Providers ──────────────────────────────────────────────────────────

#[test]
fn test_function_request_becomes_provider() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl("app.foo", class("Foo"))]))
        .unwrap();

    let result = resolve(&mut graph, root, fn0(class("Foo")));
    insta::assert_snapshot!(render(&graph, &result), @r"
    provider () -> Foo
      result = app.foo: Foo#0
    ");
}

#[test]
fn test_provider_parameters_are_injectable() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl_with(
            "app.foo",
            class("Foo"),
            &[("bar", class("Bar"))],
        )]))
        .unwrap();

    // Bar is only available inside the provider.
    assert_eq!(resolve_chosen(&mut graph, root, class("Foo")), "DependencyFailure");
    let result = resolve(&mut graph, root, fn1(class("Bar"), class("Foo")));
    insta::assert_snapshot!(render(&graph, &result), @r"
    provider (Bar) -> Foo
      result = app.foo: Foo#0
        bar = provider#(Bar) -> Foo#p0: Bar#1
    ");
}

#[test]
fn test_provider_runs_in_its_function_call_context() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let suspend_function = ClassifierRef::builder("SuspendFunction0")
        .type_parameters(vec![param("SuspendFunction0.R")])
        .flags(ClassifierFlags { is_function: true, ..Default::default() })
        .call_context(CallContext::Suspend)
        .build();
    let root = graph
        .add_scope(
            ScopeSpec::root("root")
                .with_declarations(vec![decl("app.load", class("Foo")).with_call_context(CallContext::Suspend)]),
        )
        .unwrap();

    assert_eq!(resolve_chosen(&mut graph, root, class("Foo")), "CallContextMismatch");
    let result = resolve(&mut graph, root, TypeRef::new(suspend_function, vec![class("Foo")]));
    insta::assert_snapshot!(render(&graph, &result), @r"
    provider () -> Foo
      result = app.load: Foo#0
    ");
}

#[test]
fn test_disabled_framework_injectables() {
    let host = TestHost::default();
    let config = ResolverConfig { framework_injectables: false, ..ResolverConfig::default() };
    let mut graph = ScopeGraph::new(&host, config);
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl("app.foo", class("Foo"))]))
        .unwrap();

    assert_eq!(resolve_chosen(&mut graph, root, fn0(class("Foo"))), "NoCandidates");
    assert_eq!(resolve_chosen(&mut graph, root, list_of(class("Foo"))), "NoCandidates");
}

// ── Witnesses ──────────────────────────────────────────────────────────

#[test]
fn test_concrete_witness_needs_nothing() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph.add_scope(ScopeSpec::root("root")).unwrap();

    let result = resolve(&mut graph, root, witness_of(class("Int")));
    insta::assert_snapshot!(render(&graph, &result), @"witness Witness<Int>");
}

#[test]
fn test_generic_witness_asks_for_parameter_witness() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let boxed = generic("Box", 1);
    let t = param("fn.T");
    let with_evidence = graph
        .add_scope(
            ScopeSpec::root("with evidence")
                .with_type_parameters(vec![t.clone()])
                .with_declarations(vec![decl("fn.evidence", witness_of(TypeRef::of(t.clone())))]),
        )
        .unwrap();
    let without_evidence = graph
        .add_scope(ScopeSpec::root("without evidence").with_type_parameters(vec![t.clone()]))
        .unwrap();
    let requested = witness_of(TypeRef::new(boxed, vec![TypeRef::of(t)]));

    let result = resolve(&mut graph, with_evidence, requested.clone());
    insta::assert_snapshot!(render(&graph, &result), @r"
    witness Witness<Box<fn.T>>
      fn.T = fn.evidence: Witness<fn.T>#0
    ");

    let result = resolve(&mut graph, without_evidence, requested);
    let failure = failure(&result);
    assert!(matches!(failure, Failure::DependencyFailure { .. }));
    assert!(matches!(failure.root_cause(), Failure::NoCandidates { .. }));
}

#[test]
fn test_reified_parameter_is_its_own_witness() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let t = ClassifierRef::builder("inline.T")
        .flags(ClassifierFlags { is_type_parameter: true, is_reified: true, ..Default::default() })
        .build();
    let root = graph
        .add_scope(ScopeSpec::root("root").with_type_parameters(vec![t.clone()]))
        .unwrap();

    let result = resolve(&mut graph, root, witness_of(TypeRef::of(t)));
    insta::assert_snapshot!(render(&graph, &result), @"witness Witness<inline.T>");
}

// ── Components ─────────────────────────────────────────────────────────

#[test]
fn test_component_depends_on_each_member() {
    let services = ClassifierRef::builder("Services")
        .flags(ClassifierFlags { is_component: true, ..Default::default() })
        .build();
    let mut host = TestHost::default();
    host.components.insert(
        "Services".into(),
        vec![
            ComponentMember::new("foo", class("Foo")),
            ComponentMember::new("bar", class("Bar")),
        ],
    );
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![
            decl("app.foo", class("Foo")),
            decl("app.bar", class("Bar")),
        ]))
        .unwrap();

    let result = resolve(&mut graph, root, TypeRef::of(services));
    insta::assert_snapshot!(render(&graph, &result), @r"
    component Services
      foo = app.foo: Foo#0
      bar = app.bar: Bar#1
    ");
}

#[test]
fn test_generic_component_members_are_specialized() {
    let repository = ClassifierRef::builder("Repository")
        .type_parameters(vec![param("Repository.T")])
        .flags(ClassifierFlags { is_component: true, ..Default::default() })
        .build();
    let mut host = TestHost::default();
    host.components.insert(
        "Repository".into(),
        vec![ComponentMember::new("source", TypeRef::of(param("Repository.T")))],
    );
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl("app.users", class("Users"))]))
        .unwrap();

    let result = resolve(&mut graph, root, TypeRef::new(repository, vec![class("Users")]));
    insta::assert_snapshot!(render(&graph, &result), @r"
    component Repository<Users>
      source = app.users: Users#0
    ");
}

// ── Type scopes ────────────────────────────────────────────────────────

fn companion_host() -> TestHost {
    let mut host = TestHost::default();
    host.type_scopes
        .insert("Foo".into(), vec![decl("Foo.Companion.default", class("Foo"))]);
    host
}

#[test]
fn test_type_scope_supplies_missing_candidate() {
    let host = companion_host();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph.add_scope(ScopeSpec::root("root")).unwrap();

    assert_eq!(resolve_chosen(&mut graph, root, class("Foo")), "Foo.Companion.default");
}

#[test]
fn test_user_candidate_shadows_type_scope() {
    let host = companion_host();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl("app.foo", class("Foo"))]))
        .unwrap();

    assert_eq!(resolve_chosen(&mut graph, root, class("Foo")), "app.foo");
}

#[test]
fn test_type_scope_recovers_failed_user_candidate() {
    let host = companion_host();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl_with(
            "app.foo",
            class("Foo"),
            &[("bar", class("Bar"))],
        )]))
        .unwrap();

    assert_eq!(resolve_chosen(&mut graph, root, class("Foo")), "Foo.Companion.default");
}

#[test]
fn test_divergent_type_scope_keeps_user_failure() {
    let mut host = TestHost::default();
    host.type_scopes.insert(
        "Foo".into(),
        vec![decl_with("Foo.Companion.viaQux", class("Foo"), &[("qux", class("Qux"))])],
    );
    host.type_scopes.insert(
        "Qux".into(),
        vec![decl_with("Qux.Companion.loop", class("Qux"), &[("qux", class("Qux"))])],
    );
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![decl_with(
            "app.foo",
            class("Foo"),
            &[("bar", class("Bar"))],
        )]))
        .unwrap();

    // The type scope alone fails by diverging.
    assert!(failure(&resolve(&mut graph, root, class("Qux"))).is_divergent());

    let result = resolve(&mut graph, root, class("Foo"));
    let failure = failure(&result);
    let Failure::DependencyFailure { request, .. } = failure else {
        panic!("expected a dependency failure, got {:?}", failure);
    };
    assert_eq!(request.parameter_name, "bar");
    assert!(!failure.is_divergent());
    assert!(matches!(failure.root_cause(), Failure::NoCandidates { .. }));
}

#[test]
fn test_disabled_type_scopes() {
    let host = companion_host();
    let config = ResolverConfig { type_scopes: false, ..ResolverConfig::default() };
    let mut graph = ScopeGraph::new(&host, config);
    let root = graph.add_scope(ScopeSpec::root("root")).unwrap();

    assert_eq!(resolve_chosen(&mut graph, root, class("Foo")), "NoCandidates");
}

// ── Divergence ─────────────────────────────────────────────────────────

#[test]
fn test_growing_recursion_diverges() {
    let wrapper = generic("Wrapper", 1);
    let wrap = |ty: TypeRef| TypeRef::new(wrapper.clone(), vec![ty]);
    let t = param("grow.T");
    // fun <T> grow(dep: Wrapper<Wrapper<T>>): Wrapper<T>
    let grow = decl_with(
        "app.grow",
        wrap(TypeRef::of(t.clone())),
        &[("dep", wrap(wrap(TypeRef::of(t.clone()))))],
    )
    .with_type_parameters(vec![t]);

    for start in [class("Int"), class("String"), wrap(class("Int"))] {
        let host = TestHost::default();
        let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
        let root = graph
            .add_scope(ScopeSpec::root("root").with_declarations(vec![grow.clone()]))
            .unwrap();

        let result = resolve(&mut graph, root, wrap(start.clone()));
        let failure = failure(&result);
        assert!(failure.root_cause().is_divergent(), "{} did not diverge", start);
        assert_eq!(failure.rank(), 2);
    }
}

#[test]
fn test_exact_cycle_diverges() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![
            decl_with("app.a", class("A"), &[("b", class("B"))]),
            decl_with("app.b", class("B"), &[("a", class("A"))]),
        ]))
        .unwrap();

    let result = resolve(&mut graph, root, class("A"));
    assert!(failure(&result).root_cause().is_divergent());
}

#[test]
fn test_shrinking_recursion_terminates() {
    let host = TestHost::default();
    let mut graph = ScopeGraph::new(&host, ResolverConfig::default());
    let wrapper = generic("Wrapper", 1);
    let wrap = |ty: TypeRef| TypeRef::new(wrapper.clone(), vec![ty]);
    let t = param("unwrap.T");
    let root = graph
        .add_scope(ScopeSpec::root("root").with_declarations(vec![
            decl("app.int", class("Int")),
            // fun <T> unwrap(dep: T): Wrapper<T>
            decl_with("app.unwrap", wrap(TypeRef::of(t.clone())), &[("dep", TypeRef::of(t.clone()))])
                .with_type_parameters(vec![t]),
        ]))
        .unwrap();

    let result = resolve(&mut graph, root, wrap(wrap(class("Int"))));
    insta::assert_snapshot!(render(&graph, &result), @r"
    app.unwrap: Wrapper<Wrapper<Int>>#1
      dep = app.unwrap: Wrapper<Int>#1
        dep = app.int: Int#0
    ");
}
