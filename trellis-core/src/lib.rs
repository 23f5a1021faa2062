//! Core types shared across the trellis workspace.
//!
//! Everything here is plain data: the tool version, release tracks and
//! track sets, and deprecation records together with the pure policy
//! function that decides how a deprecated command behaves at a given
//! version. Tree construction and dispatch live in the sibling crates.

mod deprecation;
mod track;
mod version;

pub use deprecation::{DeprecationAction, DeprecationRecord, DeprecationState};
pub use track::{ReleaseTrack, TrackSet};
pub use version::{VERSION_ENV, Version};
