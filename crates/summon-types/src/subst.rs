//! Substitution maps.
//!
//! A [`Substitution`] binds type-parameter classifiers to types. Applying it
//! never mutates; it returns new values.
//!
//! Merge law, applied at every substituted position `P` bound to `V`:
//!
//! - nullability is `P.nullable || V.nullable`
//! - tags are `P`'s tags (themselves substituted) followed by `V`'s tags,
//!   one per tag classifier with `P` winning, sorted by classifier key
//! - the instance key is `P`'s if present, otherwise `V`'s

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;

use crate::ty::{ClassifierRef, TypeRef};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Substitution(FxHashMap<ClassifierRef, TypeRef>);

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (ClassifierRef, TypeRef)>) -> Self {
        Substitution(pairs.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, classifier: &ClassifierRef) -> Option<&TypeRef> {
        self.0.get(classifier)
    }

    pub fn insert(&mut self, classifier: ClassifierRef, ty: TypeRef) {
        self.0.insert(classifier, ty);
    }

    pub fn contains(&self, classifier: &ClassifierRef) -> bool {
        self.0.contains_key(classifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassifierRef, &TypeRef)> {
        self.0.iter()
    }

    /// Entries sorted by classifier key, for deterministic hashing and output.
    pub fn sorted(&self) -> Vec<(&ClassifierRef, &TypeRef)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Apply `other` to every value of this map, then add `other`'s bindings
    /// for classifiers this map does not bind yet.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut out: FxHashMap<ClassifierRef, TypeRef> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.substitute(other)))
            .collect();
        for (k, v) in &other.0 {
            out.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Substitution(out)
    }

    /// Keep only the bindings for `classifiers`.
    pub fn restrict(&self, classifiers: &[ClassifierRef]) -> Substitution {
        Substitution(
            self.0
                .iter()
                .filter(|(k, _)| classifiers.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl Hash for Substitution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (k, v) in self.sorted() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.sorted().into_iter().map(|(k, v)| (k.key().to_string(), v)))
            .finish()
    }
}

impl TypeRef {
    /// Replace every bound classifier, following the merge law above.
    pub fn substitute(&self, map: &Substitution) -> TypeRef {
        if map.is_empty() || self.is_star_projection() {
            return self.clone();
        }

        let tags: Vec<TypeRef> = self.tags().iter().map(|t| t.substitute(map)).collect();

        if let Some(value) = map.get(self.classifier()) {
            let mut merged_tags = tags;
            merged_tags.extend(value.tags().iter().cloned());
            return value
                .with_tags(merged_tags)
                .with_nullability(self.is_nullable() || value.is_nullable())
                .with_instance_key(self.instance_key().or(value.instance_key()));
        }

        let arguments: Vec<TypeRef> = self.arguments().iter().map(|a| a.substitute(map)).collect();
        if arguments.as_slice() == self.arguments() && tags.as_slice() == self.tags() {
            return self.clone();
        }
        self.with_arguments(arguments).with_tags(tags)
    }
}
