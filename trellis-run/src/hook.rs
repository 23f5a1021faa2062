//! Run hooks and the symbol table resolving them.

use std::collections::BTreeMap;

use crate::{context::HostContext, invocation::ResolvedInvocation};

/// Error produced by a run hook. The dispatcher wraps it without
/// interpreting it.
pub type RunError = Box<dyn std::error::Error + Send + Sync>;

/// Implementation behind a leaf's hook symbol.
pub trait RunHook: Send + Sync {
    fn run(&self, ctx: &mut HostContext, invocation: &ResolvedInvocation) -> Result<(), RunError>;
}

impl<F> RunHook for F
where
    F: Fn(&mut HostContext, &ResolvedInvocation) -> Result<(), RunError> + Send + Sync,
{
    fn run(&self, ctx: &mut HostContext, invocation: &ResolvedInvocation) -> Result<(), RunError> {
        self(ctx, invocation)
    }
}

/// Host-registered hook symbols, with an optional fallback for symbols the
/// host did not name individually.
#[derive(Default)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Box<dyn RunHook>>,
    fallback: Option<Box<dyn RunHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: impl Into<String>, hook: impl RunHook + 'static) {
        self.hooks.insert(symbol.into(), Box::new(hook));
    }

    /// Hook used when a symbol has no dedicated registration.
    pub fn set_fallback(&mut self, hook: impl RunHook + 'static) {
        self.fallback = Some(Box::new(hook));
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.hooks.contains_key(symbol)
    }

    pub fn resolve(&self, symbol: &str) -> Option<&dyn RunHook> {
        self.hooks
            .get(symbol)
            .map(Box::as_ref)
            .or(self.fallback.as_deref())
    }
}
