//! The command tree: arena-owned nodes with per-track definition variants.

use trellis_core::{DeprecationRecord, ReleaseTrack, TrackSet};
use trellis_manifest::DefMeta;

use crate::loader::LazyDef;

/// Index of a node inside its owning [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Leaf,
}

/// One track's definition of a node.
///
/// An overlaid node carries one variant per track that redefines it; the
/// GA variant is the fallback for tracks without their own.
#[derive(Debug)]
pub struct Variant {
    pub track: ReleaseTrack,
    pub def: LazyDef,
}

/// A node in the command tree. Children are owned by the tree arena;
/// the parent link is a plain index.
#[derive(Debug)]
pub struct CommandNode {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) tracks: TrackSet,
    pub(crate) variants: Vec<Variant>,
}

impl CommandNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Tracks this node is visible under.
    pub fn tracks(&self) -> TrackSet {
        self.tracks
    }

    /// The definition governing this node under the given track: the
    /// track's own variant if one exists, else the GA variant.
    pub fn variant_for(&self, track: ReleaseTrack) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.track == track)
            .or_else(|| self.variants.iter().find(|v| v.track == ReleaseTrack::Ga))
    }

    pub fn meta_for(&self, track: ReleaseTrack) -> Option<&DefMeta> {
        self.variant_for(track).map(|v| v.def.meta())
    }

    pub fn deprecation(&self, track: ReleaseTrack) -> Option<&DeprecationRecord> {
        self.meta_for(track).and_then(|m| m.deprecation.as_ref())
    }

    pub fn description(&self, track: ReleaseTrack) -> Option<&str> {
        self.meta_for(track).and_then(|m| m.description.as_deref())
    }

    /// Hidden nodes stay dispatchable but are excluded from help and
    /// child listings.
    pub fn is_hidden(&self, track: ReleaseTrack) -> bool {
        self.meta_for(track).is_some_and(|m| m.hidden)
    }
}

/// The fully overlaid, immutable command tree.
#[derive(Debug)]
pub struct CommandTree {
    pub(crate) nodes: Vec<CommandNode>,
    pub(crate) root: NodeId,
}

impl CommandTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    /// Find the child of `parent` with the given name.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|id| self.node(*id).name == name)
    }

    /// Resolve a command path from the root.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let mut current = self.root;
        for segment in path {
            current = self.child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Command path segments from the root to `id` (root excluded).
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                segments.push(node.name.clone());
            }
            current = node.parent;
        }
        segments.reverse();
        segments
    }

    /// Node ids from the root down to `id`, inclusive.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            ids.push(node_id);
            current = self.node(node_id).parent;
        }
        ids.reverse();
        ids
    }

    /// All node ids in depth-first order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Leaves visible under a track, hidden leaves excluded.
    pub fn leaves_under(&self, track: ReleaseTrack) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(self.root, track, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, track: ReleaseTrack, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if !node.tracks.contains(track) && node.parent.is_some() {
            return;
        }
        if node.is_hidden(track) {
            return;
        }
        if node.is_leaf() {
            out.push(id);
            return;
        }
        for child in &node.children {
            self.collect_leaves(*child, track, out);
        }
    }
}
