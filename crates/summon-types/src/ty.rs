//! Type representation.
//!
//! A [`ClassifierRef`] is a nominal declaration (class, interface, type
//! parameter, tag). A [`TypeRef`] applies a classifier to type arguments and
//! adds nullability, tags and an optional instance key.
//!
//! Both are immutable and cheap to clone. Classifier identity is the identity
//! key alone; the rest of a classifier's data never takes part in equality.

use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use summon_common::{CallContext, ModelError};

use crate::subst::Substitution;

/// Boolean properties of a classifier, supplied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierFlags {
    pub is_type_parameter: bool,
    /// Type parameter whose runtime type is available to the callee.
    pub is_reified: bool,
    /// A singleton object declaration.
    pub is_singleton: bool,
    pub is_alias: bool,
    /// A type-level tag ("qualifier").
    pub is_tag: bool,
    /// A type parameter whose bound is a tag pattern matched by spreading.
    pub is_spread_constraint: bool,
    /// The top type. Satisfied by anything without required tags.
    pub is_top: bool,
    /// Function type. The last type argument is the return type.
    pub is_function: bool,
    /// Tag that lifts the result of a zero-argument producer into the scope.
    pub lifts_result: bool,
    /// The "many" collection type; requests for it aggregate every element.
    pub is_collection: bool,
    /// Synthesized evidence of a generic type argument.
    pub is_witness: bool,
    /// An aggregate whose members are all resolved as dependencies.
    pub is_component: bool,
}

#[derive(Debug)]
struct ClassifierData {
    key: Rc<str>,
    type_parameters: Vec<ClassifierRef>,
    /// Direct supertypes expressed over `type_parameters`. For type
    /// parameters these are the upper bounds.
    supertypes: OnceCell<Vec<TypeRef>>,
    flags: ClassifierFlags,
    call_context: CallContext,
}

/// A nominal declaration: equality and hashing use the identity key only.
#[derive(Clone)]
pub struct ClassifierRef(Rc<ClassifierData>);

impl ClassifierRef {
    pub fn builder(key: impl AsRef<str>) -> ClassifierBuilder {
        ClassifierBuilder {
            key: Rc::from(key.as_ref()),
            type_parameters: Vec::new(),
            supertypes: None,
            flags: ClassifierFlags::default(),
            call_context: CallContext::Default,
        }
    }

    /// A plain class without type parameters or supertypes.
    pub fn class(key: impl AsRef<str>) -> ClassifierRef {
        Self::builder(key).build()
    }

    /// A type parameter with the given upper bounds.
    pub fn type_parameter(key: impl AsRef<str>, upper_bounds: Vec<TypeRef>) -> ClassifierRef {
        Self::builder(key)
            .flags(ClassifierFlags { is_type_parameter: true, ..Default::default() })
            .supertypes(upper_bounds)
            .build()
    }

    /// A tag classifier.
    pub fn tag(key: impl AsRef<str>) -> ClassifierRef {
        Self::builder(key)
            .flags(ClassifierFlags { is_tag: true, ..Default::default() })
            .build()
    }

    pub fn key(&self) -> &str {
        &self.0.key
    }

    pub fn type_parameters(&self) -> &[ClassifierRef] {
        &self.0.type_parameters
    }

    pub fn flags(&self) -> ClassifierFlags {
        self.0.flags
    }

    pub fn call_context(&self) -> CallContext {
        self.0.call_context
    }

    pub fn is_type_parameter(&self) -> bool {
        self.0.flags.is_type_parameter
    }

    /// Direct supertypes over this classifier's own type parameters.
    ///
    /// Empty until installed; classifiers whose supertypes mention
    /// themselves are built first and completed with [`set_supertypes`].
    ///
    /// [`set_supertypes`]: ClassifierRef::set_supertypes
    pub fn supertypes(&self) -> &[TypeRef] {
        self.0.supertypes.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Install the direct supertypes. Returns `false` if they were already set.
    pub fn set_supertypes(&self, supertypes: Vec<TypeRef>) -> bool {
        self.0.supertypes.set(supertypes).is_ok()
    }
}

impl PartialEq for ClassifierRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.key == other.0.key
    }
}

impl Eq for ClassifierRef {}

impl Hash for ClassifierRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key.hash(state);
    }
}

impl PartialOrd for ClassifierRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassifierRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.key.cmp(&other.0.key)
    }
}

impl fmt::Debug for ClassifierRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Classifier({})", self.0.key)
    }
}

impl fmt::Display for ClassifierRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.key)
    }
}

pub struct ClassifierBuilder {
    key: Rc<str>,
    type_parameters: Vec<ClassifierRef>,
    supertypes: Option<Vec<TypeRef>>,
    flags: ClassifierFlags,
    call_context: CallContext,
}

impl ClassifierBuilder {
    pub fn type_parameters(mut self, params: Vec<ClassifierRef>) -> Self {
        self.type_parameters = params;
        self
    }

    pub fn supertypes(mut self, supertypes: Vec<TypeRef>) -> Self {
        self.supertypes = Some(supertypes);
        self
    }

    pub fn flags(mut self, flags: ClassifierFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn call_context(mut self, call_context: CallContext) -> Self {
        self.call_context = call_context;
        self
    }

    pub fn build(self) -> ClassifierRef {
        let supertypes = OnceCell::new();
        if let Some(s) = self.supertypes {
            let _ = supertypes.set(s);
        }
        ClassifierRef(Rc::new(ClassifierData {
            key: self.key,
            type_parameters: self.type_parameters,
            supertypes,
            flags: self.flags,
            call_context: self.call_context,
        }))
    }
}

#[derive(PartialEq, Eq, Hash)]
struct TypeData {
    classifier: ClassifierRef,
    arguments: Vec<TypeRef>,
    is_nullable: bool,
    /// Sorted by tag classifier key, at most one tag per classifier.
    tags: Vec<TypeRef>,
    instance_key: Option<u32>,
    is_star_projection: bool,
}

/// An applied type.
///
/// Equality is exact and includes the instance key; nominal comparisons
/// (subtyping, unification) ignore the instance key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeRef(Rc<TypeData>);

const STAR_KEY: &str = "*";

impl TypeRef {
    /// Apply `classifier` to `arguments`.
    ///
    /// The argument count must match the classifier's parameter count; use
    /// [`TypeRef::try_new`] for unvalidated input.
    pub fn new(classifier: ClassifierRef, arguments: Vec<TypeRef>) -> TypeRef {
        debug_assert_eq!(
            classifier.type_parameters().len(),
            arguments.len(),
            "argument count mismatch for `{}`",
            classifier
        );
        TypeRef(Rc::new(TypeData {
            classifier,
            arguments,
            is_nullable: false,
            tags: Vec::new(),
            instance_key: None,
            is_star_projection: false,
        }))
    }

    pub fn try_new(classifier: ClassifierRef, arguments: Vec<TypeRef>) -> Result<TypeRef, ModelError> {
        let expected = classifier.type_parameters().len();
        if expected != arguments.len() {
            return Err(ModelError::ArgumentCountMismatch {
                classifier: classifier.key().to_string(),
                expected,
                found: arguments.len(),
            });
        }
        Ok(TypeRef::new(classifier, arguments))
    }

    /// A type without arguments.
    pub fn of(classifier: ClassifierRef) -> TypeRef {
        TypeRef::new(classifier, Vec::new())
    }

    /// The star projection `*`, a universal sub- and supertype.
    pub fn star() -> TypeRef {
        TypeRef(Rc::new(TypeData {
            classifier: ClassifierRef::class(STAR_KEY),
            arguments: Vec::new(),
            is_nullable: false,
            tags: Vec::new(),
            instance_key: None,
            is_star_projection: true,
        }))
    }

    fn rebuild(&self, f: impl FnOnce(&mut TypeData)) -> TypeRef {
        let mut data = TypeData {
            classifier: self.0.classifier.clone(),
            arguments: self.0.arguments.clone(),
            is_nullable: self.0.is_nullable,
            tags: self.0.tags.clone(),
            instance_key: self.0.instance_key,
            is_star_projection: self.0.is_star_projection,
        };
        f(&mut data);
        TypeRef(Rc::new(data))
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn classifier(&self) -> &ClassifierRef {
        &self.0.classifier
    }

    pub fn arguments(&self) -> &[TypeRef] {
        &self.0.arguments
    }

    pub fn is_nullable(&self) -> bool {
        self.0.is_nullable
    }

    pub fn tags(&self) -> &[TypeRef] {
        &self.0.tags
    }

    pub fn instance_key(&self) -> Option<u32> {
        self.0.instance_key
    }

    pub fn is_star_projection(&self) -> bool {
        self.0.is_star_projection
    }

    pub fn is_type_parameter(&self) -> bool {
        self.0.classifier.is_type_parameter()
    }

    pub fn tag(&self, classifier: &ClassifierRef) -> Option<&TypeRef> {
        self.0.tags.iter().find(|t| t.classifier() == classifier)
    }

    // ── Derived copies ──────────────────────────────────────────────────

    pub fn with_nullability(&self, is_nullable: bool) -> TypeRef {
        if self.0.is_nullable == is_nullable {
            return self.clone();
        }
        self.rebuild(|d| d.is_nullable = is_nullable)
    }

    pub fn nullable(&self) -> TypeRef {
        self.with_nullability(true)
    }

    /// Replace the tags. The list is canonicalized: one tag per tag
    /// classifier (first occurrence wins), sorted by classifier key.
    pub fn with_tags(&self, tags: Vec<TypeRef>) -> TypeRef {
        let tags = canonical_tags(tags);
        self.rebuild(|d| d.tags = tags)
    }

    /// Add a tag, replacing any tag with the same classifier.
    pub fn tagged(&self, tag: TypeRef) -> TypeRef {
        let mut tags = vec![tag];
        tags.extend(self.0.tags.iter().cloned());
        self.with_tags(tags)
    }

    /// Drop every tag whose classifier is in `classifiers`.
    pub fn without_tags(&self, classifiers: &[ClassifierRef]) -> TypeRef {
        if classifiers.is_empty() {
            return self.clone();
        }
        let tags = self
            .0
            .tags
            .iter()
            .filter(|t| !classifiers.contains(t.classifier()))
            .cloned()
            .collect();
        self.rebuild(|d| d.tags = tags)
    }

    pub fn with_instance_key(&self, instance_key: Option<u32>) -> TypeRef {
        if self.0.instance_key == instance_key {
            return self.clone();
        }
        self.rebuild(|d| d.instance_key = instance_key)
    }

    pub fn without_instance_key(&self) -> TypeRef {
        self.with_instance_key(None)
    }

    pub fn with_arguments(&self, arguments: Vec<TypeRef>) -> TypeRef {
        debug_assert_eq!(self.0.arguments.len(), arguments.len());
        self.rebuild(|d| d.arguments = arguments)
    }

    // ── Structure ───────────────────────────────────────────────────────

    /// Direct supertypes: the classifier's supertypes with its parameters
    /// replaced by this type's arguments. Tags propagate downward (this
    /// type's tags plus the supertype's own) and nullability is kept.
    pub fn supertypes(&self) -> Vec<TypeRef> {
        let declared = self.classifier().supertypes();
        if declared.is_empty() {
            return Vec::new();
        }
        let map = Substitution::from_pairs(
            self.classifier()
                .type_parameters()
                .iter()
                .cloned()
                .zip(self.arguments().iter().cloned()),
        );
        declared
            .iter()
            .map(|s| {
                let s = s.substitute(&map);
                let mut tags = self.0.tags.clone();
                tags.extend(s.tags().iter().cloned());
                s.with_tags(tags)
                    .with_nullability(self.is_nullable() || s.is_nullable())
            })
            .collect()
    }

    /// Monotonic size metric: one per node, including arguments and tags.
    pub fn size(&self) -> usize {
        1 + self.0.arguments.iter().map(TypeRef::size).sum::<usize>()
            + self.0.tags.iter().map(TypeRef::size).sum::<usize>()
    }

    /// Every classifier mentioned anywhere in this type, sorted and unique.
    pub fn covering_classifiers(&self) -> Vec<ClassifierRef> {
        let mut out = Vec::new();
        self.collect_classifiers(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_classifiers(&self, out: &mut Vec<ClassifierRef>) {
        if self.is_star_projection() {
            return;
        }
        out.push(self.classifier().clone());
        for a in self.arguments() {
            a.collect_classifiers(out);
        }
        for t in self.tags() {
            t.collect_classifiers(out);
        }
    }

    /// Type parameters occurring in this type, in first-occurrence order.
    pub fn type_parameters(&self) -> Vec<ClassifierRef> {
        let mut out = Vec::new();
        self.collect_type_parameters(&mut out);
        out
    }

    fn collect_type_parameters(&self, out: &mut Vec<ClassifierRef>) {
        if self.is_star_projection() {
            return;
        }
        if self.is_type_parameter() && !out.contains(self.classifier()) {
            out.push(self.classifier().clone());
        }
        for a in self.arguments() {
            a.collect_type_parameters(out);
        }
        for t in self.tags() {
            t.collect_type_parameters(out);
        }
    }

    // ── Function types ──────────────────────────────────────────────────

    pub fn is_function(&self) -> bool {
        self.classifier().flags().is_function
    }

    /// Parameter types of a function type.
    pub fn function_parameters(&self) -> &[TypeRef] {
        match self.arguments().split_last() {
            Some((_, params)) if self.is_function() => params,
            _ => &[],
        }
    }

    /// Return type of a function type.
    pub fn function_return(&self) -> Option<&TypeRef> {
        if self.is_function() {
            self.arguments().last()
        } else {
            None
        }
    }
}

fn canonical_tags(tags: Vec<TypeRef>) -> Vec<TypeRef> {
    let mut out: Vec<TypeRef> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.iter().any(|t| t.classifier() == tag.classifier()) {
            out.push(tag);
        }
    }
    out.sort_by(|a, b| a.classifier().cmp(b.classifier()));
    out
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_star_projection() {
            return write!(f, "*");
        }
        for tag in self.tags() {
            write!(f, "@{} ", tag)?;
        }
        let nullable_fn = self.is_nullable() && self.is_function();
        if nullable_fn {
            write!(f, "(")?;
        }
        if self.is_function() {
            write!(f, "(")?;
            for (i, p) in self.function_parameters().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ") -> ")?;
            if let Some(ret) = self.function_return() {
                write!(f, "{}", ret)?;
            }
        } else {
            write!(f, "{}", self.classifier())?;
            if !self.arguments().is_empty() {
                write!(f, "<")?;
                for (i, a) in self.arguments().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ">")?;
            }
        }
        if nullable_fn {
            write!(f, ")")?;
        }
        if self.is_nullable() {
            write!(f, "?")?;
        }
        if let Some(key) = self.instance_key() {
            write!(f, "#{}", key)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> ClassifierRef {
        let t = ClassifierRef::type_parameter("List.T", vec![]);
        ClassifierRef::builder("List").type_parameters(vec![t]).build()
    }

    #[test]
    fn classifier_equality_uses_key_only() {
        let a = ClassifierRef::class("Foo");
        let b = ClassifierRef::builder("Foo")
            .flags(ClassifierFlags { is_singleton: true, ..Default::default() })
            .build();
        assert_eq!(a, b);
        assert_ne!(a, ClassifierRef::class("Bar"));
    }

    #[test]
    fn try_new_rejects_wrong_argument_count() {
        let err = TypeRef::try_new(list(), vec![]).unwrap_err();
        assert_eq!(
            err,
            ModelError::ArgumentCountMismatch {
                classifier: "List".into(),
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn tags_are_canonical() {
        let foo = TypeRef::of(ClassifierRef::class("Foo"));
        let b = TypeRef::of(ClassifierRef::tag("B"));
        let a = TypeRef::of(ClassifierRef::tag("A"));
        let tagged = foo.with_tags(vec![b.clone(), a.clone(), b.clone()]);
        assert_eq!(tagged.tags(), &[a, b]);
        insta::assert_snapshot!(tagged.to_string(), @"@A @B Foo");
    }

    #[test]
    fn instance_key_is_part_of_exact_equality() {
        let foo = TypeRef::of(ClassifierRef::class("Foo"));
        let keyed = foo.with_instance_key(Some(3));
        assert_ne!(foo, keyed);
        assert_eq!(foo, keyed.without_instance_key());
    }

    #[test]
    fn supertypes_substitute_arguments_and_propagate_tags() {
        let t = ClassifierRef::type_parameter("ArrayList.T", vec![]);
        let list = list();
        let array_list = ClassifierRef::builder("ArrayList")
            .type_parameters(vec![t.clone()])
            .supertypes(vec![TypeRef::new(list.clone(), vec![TypeRef::of(t)])])
            .build();
        let string = TypeRef::of(ClassifierRef::class("String"));
        let named = TypeRef::of(ClassifierRef::tag("Named"));
        let ty = TypeRef::new(array_list, vec![string.clone()]).tagged(named.clone());

        let supers = ty.supertypes();
        assert_eq!(supers.len(), 1);
        assert_eq!(supers[0].classifier(), &list);
        assert_eq!(supers[0].arguments(), &[string]);
        assert_eq!(supers[0].tags(), &[named]);
    }

    #[test]
    fn size_counts_arguments_and_tags() {
        let int = TypeRef::of(ClassifierRef::class("Int"));
        let ty = TypeRef::new(list(), vec![TypeRef::new(list(), vec![int])]);
        assert_eq!(ty.size(), 3);
        let tagged = ty.tagged(TypeRef::of(ClassifierRef::tag("Tag")));
        assert_eq!(tagged.size(), 4);
    }

    #[test]
    fn covering_classifiers_are_unique() {
        let int = TypeRef::of(ClassifierRef::class("Int"));
        let ty = TypeRef::new(list(), vec![TypeRef::new(list(), vec![int])]);
        let keys: Vec<String> = ty.covering_classifiers().iter().map(|c| c.key().to_string()).collect();
        assert_eq!(keys, vec!["Int", "List"]);
    }

    #[test]
    fn display_function_types() {
        let t = ClassifierRef::type_parameter("Function1.P", vec![]);
        let r = ClassifierRef::type_parameter("Function1.R", vec![]);
        let function1 = ClassifierRef::builder("Function1")
            .type_parameters(vec![t, r])
            .flags(ClassifierFlags { is_function: true, ..Default::default() })
            .build();
        let int = TypeRef::of(ClassifierRef::class("Int"));
        let string = TypeRef::of(ClassifierRef::class("String"));
        let fun = TypeRef::new(function1, vec![int, string]);
        insta::assert_snapshot!(fun.to_string(), @"(Int) -> String");
        insta::assert_snapshot!(fun.nullable().to_string(), @"((Int) -> String)?");
    }
}
