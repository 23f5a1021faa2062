//! Definition files and the path walker for the trellis command tree.
//!
//! A definition root is a directory: subdirectories are groups (explicit
//! when they carry a `group.toml`), TOML files are leaf commands. This
//! crate owns the on-disk format, its two-pass parser (cheap `[command]`
//! header, deferred flag/positional decode), and every diagnostic raised
//! for a defective definition.

mod def;
mod error;
mod validate;
mod walk;

pub use def::{
    Arity, DefBody, DefKind, DefMeta, FlagKind, FlagSpec, PositionalSpec, SuppressKind,
    Suppression, parse_body, parse_meta,
};
pub use error::{Error, Result, SourceContext};
pub use walk::{Descriptor, DescriptorKind, GROUP_FILE, Walk, walk};
