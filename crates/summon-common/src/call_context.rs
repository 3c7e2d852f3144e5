//! Call-context classification.
//!
//! Declarations and scopes are classified by the kind of call site they may
//! be used from. A scope can only use a candidate whose call context it is
//! allowed to call (see `Host::can_call` in `summon-resolve`).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallContext {
    /// Plain synchronous code. Callable from every context.
    #[default]
    Default,
    /// Only callable from other composable code.
    Composable,
    /// Only callable from suspending code.
    Suspend,
}

impl CallContext {
    /// The default compatibility rule: a `Default` callee can be called from
    /// anywhere, any other callee only from its own context.
    pub fn can_call(self, callee: CallContext) -> bool {
        callee == CallContext::Default || self == callee
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallContext::Default => write!(f, "default"),
            CallContext::Composable => write!(f, "composable"),
            CallContext::Suspend => write!(f, "suspend"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_callee_is_callable_everywhere() {
        for caller in [CallContext::Default, CallContext::Composable, CallContext::Suspend] {
            assert!(caller.can_call(CallContext::Default));
        }
    }

    #[test]
    fn non_default_callee_needs_same_context() {
        assert!(CallContext::Suspend.can_call(CallContext::Suspend));
        assert!(!CallContext::Default.can_call(CallContext::Suspend));
        assert!(!CallContext::Composable.can_call(CallContext::Suspend));
    }
}
