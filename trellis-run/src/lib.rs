//! Command-line dispatch over a loaded command tree.
//!
//! The host hands [`Dispatcher`] a [`trellis_tree::Registry`], a
//! [`HookRegistry`] mapping hook symbols to implementations, and the
//! tool version. [`Dispatcher::dispatch`] then resolves one command
//! line: it walks the path, resolves the release track, applies the
//! deprecation gate, binds arguments, and invokes the leaf's run hook
//! with a [`ResolvedInvocation`] and the host's [`HostContext`].

mod context;
mod dispatch;
mod error;
mod hook;
mod invocation;

pub use context::{HostContext, SharedBuf};
pub use dispatch::{Dispatcher, Outcome};
pub use error::{DispatchError, Result};
pub use hook::{HookRegistry, RunError, RunHook};
pub use invocation::{GlobalFlags, ResolvedInvocation};
