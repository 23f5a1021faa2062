//! Read-only façade over a built command tree.
//!
//! Hosts (shells, completers, help generators) query the registry; all
//! queries are read-only, so a published registry is safe for concurrent
//! readers. A process-wide instance can be installed once; tests build
//! local registries instead of rebuilding the global one.

use std::sync::OnceLock;

use trellis_core::{DeprecationRecord, ReleaseTrack, Version};
use trellis_manifest::PositionalSpec;

use crate::{
    binder::{self, EffectiveFlags},
    error::{Result, TreeError},
    help,
    node::{CommandTree, NodeId},
};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

#[derive(Debug)]
pub struct Registry {
    tree: CommandTree,
}

impl Registry {
    pub fn new(tree: CommandTree) -> Self {
        Self { tree }
    }

    /// Install this registry as the process-wide instance.
    ///
    /// The first installation wins; a later call returns the already
    /// installed registry and drops its argument.
    pub fn install(self) -> &'static Registry {
        GLOBAL.get_or_init(|| self)
    }

    pub fn global() -> Option<&'static Registry> {
        GLOBAL.get()
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Look up a node by command path.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Result<NodeId> {
        self.tree.resolve(path).ok_or_else(|| TreeError::NotFound {
            path: path
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(" "),
        })
    }

    /// Names of a group's children visible under a track, declaration
    /// order, hidden children excluded.
    pub fn child_names(&self, id: NodeId, track: ReleaseTrack) -> Vec<&str> {
        self.tree
            .node(id)
            .children()
            .iter()
            .map(|child| self.tree.node(*child))
            .filter(|node| node.tracks().contains(track) && !node.is_hidden(track))
            .map(|node| node.name())
            .collect()
    }

    /// The effective flag set of a node under a track (forces definitions
    /// along the path).
    pub fn effective_flags(&self, id: NodeId, track: ReleaseTrack) -> Result<EffectiveFlags> {
        binder::effective_flags(&self.tree, id, track)
    }

    /// The positional specs of a leaf under a track (forces the leaf).
    pub fn positionals(&self, id: NodeId, track: ReleaseTrack) -> Result<Vec<PositionalSpec>> {
        binder::positionals(&self.tree, id, track)
    }

    pub fn deprecation(&self, id: NodeId, track: ReleaseTrack) -> Option<&DeprecationRecord> {
        self.tree.node(id).deprecation(track)
    }

    /// Leaves visible under a track, hidden leaves excluded.
    pub fn leaves_under(&self, track: ReleaseTrack) -> Vec<NodeId> {
        self.tree.leaves_under(track)
    }

    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        self.tree.path_of(id)
    }

    /// Render help for a node, deprecation decorations included.
    pub fn render_help(&self, id: NodeId, track: ReleaseTrack, current: &Version) -> Result<String> {
        help::render(self, id, track, current)
    }
}
