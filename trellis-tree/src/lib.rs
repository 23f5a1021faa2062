//! The trellis command tree: overlay, deferred loading, binding, registry.
//!
//! # Architecture
//!
//! ```text
//! definition roots → walk (trellis-manifest) → TreeBuilder (overlay)
//!                  → CommandTree (arena, per-track LazyDef variants)
//!                  → Registry (read-only façade) → dispatcher (trellis-run)
//! ```
//!
//! The tree is immutable once built. Definition bodies load lazily behind
//! per-node one-shot latches, so an invocation only pays the decode cost
//! of the one leaf (and flag-contributing ancestors) it touches.

mod binder;
mod builder;
mod error;
mod help;
mod loader;
mod node;
mod registry;

pub use binder::{BindError, BoundArgs, BoundPositional, EffectiveFlags, FlagValue, bind};
pub use builder::TreeBuilder;
pub use error::{Result, TreeError};
pub use loader::{ForceError, LazyDef};
pub use node::{CommandNode, CommandTree, NodeId, NodeKind, Variant};
pub use registry::Registry;
