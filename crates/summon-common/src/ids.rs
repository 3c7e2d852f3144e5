//! Stable identities shared across the resolver crates.

use std::fmt;
use std::rc::Rc;

/// A compilation module. Only used to rank local candidates above imported ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// Identity key of a declaration, chosen by the host.
///
/// Two declarations with the same key are the same declaration. Synthetic
/// declarations created by the resolver derive their key from an owner via
/// [`DeclId::synthetic`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(Rc<str>);

impl DeclId {
    pub fn new(key: impl AsRef<str>) -> Self {
        DeclId(Rc::from(key.as_ref()))
    }

    /// A key for a declaration synthesized underneath `owner`, e.g. the
    /// parameters of a provider lambda.
    pub fn synthetic(owner: &str, suffix: impl fmt::Display) -> Self {
        DeclId(Rc::from(format!("{owner}#{suffix}").as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeclId {
    fn from(key: &str) -> Self {
        DeclId::new(key)
    }
}
