//! Release-track overlay: fuses a GA definition root and zero or more
//! alternate roots into one immutable tree.
//!
//! Rules, applied in declared order:
//! - a node only the GA root defines is visible only under GA;
//! - an alternate root defining the same path adds its track to the node
//!   and contributes a per-track variant whose flags and hook replace the
//!   GA definition under that track;
//! - an alternate-only node exists only under its track, and every group
//!   along its path gains that track as well;
//! - redefining an already-overlaid `(path, track)` pair is a defect.

use std::path::{Path, PathBuf};

use trellis_core::ReleaseTrack;
use trellis_manifest::{DefKind, Descriptor, DescriptorKind, Error, Result, walk};

use crate::{
    loader::LazyDef,
    node::{CommandNode, CommandTree, NodeId, NodeKind},
};

/// Builds a [`CommandTree`] from definition roots.
#[derive(Debug)]
pub struct TreeBuilder {
    roots: Vec<(ReleaseTrack, PathBuf)>,
}

impl TreeBuilder {
    /// Start from the GA definition root.
    pub fn new(ga_root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![(ReleaseTrack::Ga, ga_root.into())],
        }
    }

    /// Overlay an alternate root tagged with a track. Order matters where
    /// alternate roots define overlapping paths.
    pub fn overlay(mut self, track: ReleaseTrack, root: impl Into<PathBuf>) -> Self {
        self.roots.push((track, root.into()));
        self
    }

    /// Walk every root and fuse the overlaid tree.
    ///
    /// All static defects (unknown tracks, hook mismatches, malformed
    /// deprecation records, kind conflicts, duplicate variants) are
    /// rejected here; flag-spec defects wait for the first force.
    pub fn build(self) -> Result<CommandTree> {
        let mut tree = CommandTree {
            nodes: vec![CommandNode {
                name: String::new(),
                kind: NodeKind::Group,
                parent: None,
                children: Vec::new(),
                tracks: trellis_core::TrackSet::empty(),
                variants: Vec::new(),
            }],
            root: NodeId(0),
        };

        for (track, root) in &self.roots {
            apply_root(&mut tree, *track, root)?;
        }

        Ok(tree)
    }
}

fn apply_root(tree: &mut CommandTree, track: ReleaseTrack, root: &Path) -> Result<()> {
    let walked = walk(root)?;

    if let Some(def_path) = &walked.root_def {
        let lazy = LazyDef::from_file(def_path, DefKind::Group)?;
        if excluded(&lazy, track) {
            return Ok(());
        }
        attach_variant(tree, tree.root, track, lazy, &[])?;
    }
    tree.nodes[tree.root.0].tracks.insert(track);

    // Subtrees opted out of this track are skipped wholesale.
    let mut skip_prefix: Option<Vec<String>> = None;

    for desc in &walked.entries {
        if let Some(prefix) = &skip_prefix {
            if desc.rel.starts_with(prefix.as_slice()) {
                continue;
            }
            skip_prefix = None;
        }

        match &desc.kind {
            DescriptorKind::Group { def } => {
                let lazy = def
                    .as_ref()
                    .map(|p| LazyDef::from_file(p, DefKind::Group))
                    .transpose()?;
                if lazy.as_ref().is_some_and(|l| excluded(l, track)) {
                    skip_prefix = Some(desc.rel.clone());
                    continue;
                }
                let id = ensure_node(tree, desc, NodeKind::Group)?;
                if let Some(lazy) = lazy {
                    attach_variant(tree, id, track, lazy, &desc.rel)?;
                }
                mark_tracks(tree, id, track);
            }
            DescriptorKind::Leaf => {
                let lazy = LazyDef::from_file(&desc.path, DefKind::Leaf)?;
                if excluded(&lazy, track) {
                    continue;
                }
                let id = ensure_node(tree, desc, NodeKind::Leaf)?;
                attach_variant(tree, id, track, lazy, &desc.rel)?;
                mark_tracks(tree, id, track);
            }
        }
    }

    Ok(())
}

/// Declared-track filter: a definition listing `tracks` opts out of roots
/// tagged with any other track.
fn excluded(lazy: &LazyDef, track: ReleaseTrack) -> bool {
    lazy.meta().tracks.is_some_and(|set| !set.contains(track))
}

fn ensure_node(tree: &mut CommandTree, desc: &Descriptor, kind: NodeKind) -> Result<NodeId> {
    let mut current = tree.root;
    for segment in &desc.rel[..desc.rel.len() - 1] {
        current = tree.child(current, segment).ok_or_else(|| {
            // A parent skipped by its track filter leaves a dangling child;
            // the walker's pre-order makes any other miss a kind conflict.
            Box::new(Error::KindConflict {
                command: desc.rel.join(" "),
                file: desc.path.clone(),
            })
        })?;
        if tree.node(current).is_leaf() {
            return Err(Box::new(Error::KindConflict {
                command: desc.rel.join(" "),
                file: desc.path.clone(),
            }));
        }
    }

    let name = desc.name();
    if let Some(existing) = tree.child(current, name) {
        if tree.node(existing).kind != kind {
            return Err(Box::new(Error::KindConflict {
                command: desc.rel.join(" "),
                file: desc.path.clone(),
            }));
        }
        return Ok(existing);
    }

    let id = NodeId(tree.nodes.len());
    tree.nodes.push(CommandNode {
        name: name.to_string(),
        kind,
        parent: Some(current),
        children: Vec::new(),
        tracks: trellis_core::TrackSet::empty(),
        variants: Vec::new(),
    });
    tree.nodes[current.0].children.push(id);
    Ok(id)
}

fn attach_variant(
    tree: &mut CommandTree,
    id: NodeId,
    track: ReleaseTrack,
    lazy: LazyDef,
    rel: &[String],
) -> Result<()> {
    let node = &mut tree.nodes[id.0];
    if node.variants.iter().any(|v| v.track == track) {
        return Err(Box::new(Error::DuplicateVariant {
            command: rel.join(" "),
            track: track.as_str().to_string(),
            file: lazy.path().to_path_buf(),
        }));
    }
    node.variants.push(crate::node::Variant { track, def: lazy });
    Ok(())
}

/// Add the track to the node and every ancestor, keeping the invariant
/// that a node's track set is a subset of its parent's.
fn mark_tracks(tree: &mut CommandTree, id: NodeId, track: ReleaseTrack) {
    let mut current = Some(id);
    while let Some(node_id) = current {
        tree.nodes[node_id.0].tracks.insert(track);
        current = tree.nodes[node_id.0].parent;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use trellis_core::TrackSet;

    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn leaf(hook: &str) -> String {
        format!("[command]\nhook = \"{hook}\"\n")
    }

    #[test]
    fn test_ga_only_tree() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "compute/list.toml", &leaf("compute.list"));
        write(dir.path(), "compute/create.toml", &leaf("compute.create"));

        let tree = TreeBuilder::new(dir.path()).build().unwrap();
        let compute = tree.resolve(&["compute"]).unwrap();
        assert_eq!(tree.node(compute).kind(), NodeKind::Group);
        assert_eq!(tree.node(compute).tracks(), TrackSet::of(ReleaseTrack::Ga));

        let list = tree.resolve(&["compute", "list"]).unwrap();
        assert!(tree.node(list).is_leaf());
        assert_eq!(tree.path_of(list), vec!["compute", "list"]);
    }

    #[test]
    fn test_alternate_only_node() {
        let ga = tempfile::tempdir().unwrap();
        let alpha = tempfile::tempdir().unwrap();
        write(ga.path(), "svc/list.toml", &leaf("svc.list"));
        write(alpha.path(), "svc/new.toml", &leaf("svc.new"));

        let tree = TreeBuilder::new(ga.path())
            .overlay(ReleaseTrack::Alpha, alpha.path())
            .build()
            .unwrap();

        let new = tree.resolve(&["svc", "new"]).unwrap();
        assert_eq!(tree.node(new).tracks(), TrackSet::of(ReleaseTrack::Alpha));

        // The group gained the alpha track; the GA sibling did not.
        let svc = tree.resolve(&["svc"]).unwrap();
        assert!(tree.node(svc).tracks().contains(ReleaseTrack::Alpha));
        assert!(tree.node(svc).tracks().contains(ReleaseTrack::Ga));
        let list = tree.resolve(&["svc", "list"]).unwrap();
        assert!(!tree.node(list).tracks().contains(ReleaseTrack::Alpha));
    }

    #[test]
    fn test_overlay_replaces_per_track() {
        let ga = tempfile::tempdir().unwrap();
        let beta = tempfile::tempdir().unwrap();
        write(ga.path(), "deploy.toml", &leaf("deploy.v1"));
        write(beta.path(), "deploy.toml", &leaf("deploy.v2"));

        let tree = TreeBuilder::new(ga.path())
            .overlay(ReleaseTrack::Beta, beta.path())
            .build()
            .unwrap();

        let deploy = tree.resolve(&["deploy"]).unwrap();
        let node = tree.node(deploy);
        assert!(node.tracks().contains(ReleaseTrack::Beta));
        assert_eq!(
            node.meta_for(ReleaseTrack::Ga).unwrap().hook.as_deref(),
            Some("deploy.v1")
        );
        assert_eq!(
            node.meta_for(ReleaseTrack::Beta).unwrap().hook.as_deref(),
            Some("deploy.v2")
        );
        // Alpha falls back to the GA variant and is not visible.
        assert_eq!(
            node.meta_for(ReleaseTrack::Alpha).unwrap().hook.as_deref(),
            Some("deploy.v1")
        );
        assert!(!node.tracks().contains(ReleaseTrack::Alpha));
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let ga = tempfile::tempdir().unwrap();
        let alpha1 = tempfile::tempdir().unwrap();
        let alpha2 = tempfile::tempdir().unwrap();
        write(ga.path(), "top.toml", &leaf("top"));
        write(alpha1.path(), "dup.toml", &leaf("dup.one"));
        write(alpha2.path(), "dup.toml", &leaf("dup.two"));

        let err = TreeBuilder::new(ga.path())
            .overlay(ReleaseTrack::Alpha, alpha1.path())
            .overlay(ReleaseTrack::Alpha, alpha2.path())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_kind_conflict_rejected() {
        let ga = tempfile::tempdir().unwrap();
        let beta = tempfile::tempdir().unwrap();
        write(ga.path(), "thing.toml", &leaf("thing"));
        write(beta.path(), "thing/sub.toml", &leaf("thing.sub"));

        let err = TreeBuilder::new(ga.path())
            .overlay(ReleaseTrack::Beta, beta.path())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("group and a leaf"));
    }

    #[test]
    fn test_declared_tracks_filter() {
        let ga = tempfile::tempdir().unwrap();
        write(
            ga.path(),
            "everywhere.toml",
            "[command]\nhook = \"x\"\ntracks = [\"ga\"]\n",
        );
        write(
            ga.path(),
            "beta-only.toml",
            "[command]\nhook = \"y\"\ntracks = [\"beta\"]\n",
        );

        let tree = TreeBuilder::new(ga.path()).build().unwrap();
        assert!(tree.resolve(&["everywhere"]).is_some());
        // Opted out of the GA root entirely.
        assert!(tree.resolve(&["beta-only"]).is_none());
    }

    #[test]
    fn test_group_filter_skips_subtree() {
        let ga = tempfile::tempdir().unwrap();
        write(
            ga.path(),
            "lab/group.toml",
            "[command]\ntracks = [\"alpha\"]\n",
        );
        write(ga.path(), "lab/poke.toml", &leaf("lab.poke"));
        write(ga.path(), "stable.toml", &leaf("stable"));

        let tree = TreeBuilder::new(ga.path()).build().unwrap();
        assert!(tree.resolve(&["lab"]).is_none());
        assert!(tree.resolve(&["lab", "poke"]).is_none());
        assert!(tree.resolve(&["stable"]).is_some());
    }

    #[test]
    fn test_disjoint_overlays_commute() {
        let ga = tempfile::tempdir().unwrap();
        let alpha = tempfile::tempdir().unwrap();
        let beta = tempfile::tempdir().unwrap();
        write(ga.path(), "base.toml", &leaf("base"));
        write(alpha.path(), "a/only.toml", &leaf("a.only"));
        write(beta.path(), "b/only.toml", &leaf("b.only"));

        let forward = TreeBuilder::new(ga.path())
            .overlay(ReleaseTrack::Alpha, alpha.path())
            .overlay(ReleaseTrack::Beta, beta.path())
            .build()
            .unwrap();
        let reverse = TreeBuilder::new(ga.path())
            .overlay(ReleaseTrack::Beta, beta.path())
            .overlay(ReleaseTrack::Alpha, alpha.path())
            .build()
            .unwrap();

        for path in [["a", "only"], ["b", "only"]] {
            let f = forward.resolve(&path).unwrap();
            let r = reverse.resolve(&path).unwrap();
            assert_eq!(forward.node(f).tracks(), reverse.node(r).tracks());
            assert_eq!(forward.path_of(f), reverse.path_of(r));
        }
    }

    #[test]
    fn test_missing_root_rejected() {
        let err = TreeBuilder::new("/nonexistent/root").build().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
