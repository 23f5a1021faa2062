//! Path walker: maps a directory layout onto candidate command nodes.
//!
//! The walker only looks at file names and kinds; it never reads file
//! contents. Loading is the definition loader's job.

use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    validate,
};

/// Marker file turning a directory into an explicit group.
pub const GROUP_FILE: &str = "group.toml";

/// Structural kind of a walked entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKind {
    /// A subdirectory; `def` is its `group.toml` when the group is explicit.
    Group { def: Option<PathBuf> },
    /// A definition file.
    Leaf,
}

/// One candidate node, in depth-first pre-order.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// File-system path: the directory for groups, the file for leaves.
    pub path: PathBuf,
    /// Command path segments relative to the root.
    pub rel: Vec<String>,
    pub kind: DescriptorKind,
}

impl Descriptor {
    pub fn name(&self) -> &str {
        self.rel.last().map(String::as_str).unwrap_or_default()
    }
}

/// Result of walking one definition root.
#[derive(Debug)]
pub struct Walk {
    /// The root's own `group.toml`, if present.
    pub root_def: Option<PathBuf>,
    pub entries: Vec<Descriptor>,
}

/// Walk a definition root, yielding descriptors in depth-first order.
///
/// Entries are name-sorted within each directory. Hidden files, names
/// starting with an underscore, and non-TOML files are skipped.
pub fn walk(root: &Path) -> Result<Walk> {
    if !root.is_dir() {
        return Err(Box::new(Error::MissingRoot {
            path: root.to_path_buf(),
        }));
    }

    let group_file = root.join(GROUP_FILE);
    let root_def = group_file.is_file().then_some(group_file);

    let mut entries = Vec::new();
    walk_dir(root, &mut Vec::new(), &mut entries)?;
    Ok(Walk { root_def, entries })
}

fn walk_dir(dir: &Path, rel: &mut Vec<String>, out: &mut Vec<Descriptor>) -> Result<()> {
    let reader = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut children: Vec<(String, PathBuf, bool)> = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') || file_name.starts_with('_') || file_name == GROUP_FILE {
            continue;
        }
        let is_dir = entry
            .file_type()
            .map_err(|e| Error::io(&path, e))?
            .is_dir();
        if !is_dir && path.extension().is_none_or(|ext| ext != "toml") {
            continue;
        }
        children.push((file_name, path, is_dir));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));

    for (file_name, path, is_dir) in children {
        let name = if is_dir {
            file_name
        } else {
            match path.file_stem() {
                Some(stem) => stem.to_string_lossy().into_owned(),
                None => continue,
            }
        };

        if let Some(reason) = validate::validate_name(&name) {
            return Err(Box::new(Error::InvalidFileName {
                path,
                name,
                reason: reason.to_string(),
            }));
        }

        rel.push(name);
        if is_dir {
            let group_file = path.join(GROUP_FILE);
            let def = group_file.is_file().then_some(group_file);
            out.push(Descriptor {
                path: path.clone(),
                rel: rel.clone(),
                kind: DescriptorKind::Group { def },
            });
            walk_dir(&path, rel, out)?;
        } else {
            out.push(Descriptor {
                path,
                rel: rel.clone(),
                kind: DescriptorKind::Leaf,
            });
        }
        rel.pop();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(path: &Path) {
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_missing_root() {
        let err = walk(Path::new("/nonexistent/definitions")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_walk_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir(root.join("compute")).unwrap();
        touch(&root.join("compute").join("list.toml"));
        touch(&root.join("compute").join("create.toml"));
        fs::create_dir(root.join("iam")).unwrap();
        touch(&root.join("iam").join(GROUP_FILE));
        touch(&root.join("iam").join("roles.toml"));
        touch(&root.join("version.toml"));

        let walk = walk(root).unwrap();
        assert!(walk.root_def.is_none());

        let rels: Vec<String> = walk.entries.iter().map(|d| d.rel.join(" ")).collect();
        assert_eq!(
            rels,
            vec![
                "compute",
                "compute create",
                "compute list",
                "iam",
                "iam roles",
                "version",
            ]
        );

        // compute is implicit, iam explicit.
        assert_eq!(walk.entries[0].kind, DescriptorKind::Group { def: None });
        assert!(matches!(
            &walk.entries[3].kind,
            DescriptorKind::Group { def: Some(_) }
        ));
        assert_eq!(walk.entries[5].kind, DescriptorKind::Leaf);
    }

    #[test]
    fn test_hidden_and_underscore_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        touch(&root.join(".hidden.toml"));
        touch(&root.join("_draft.toml"));
        touch(&root.join("notes.txt"));
        touch(&root.join("real.toml"));

        let walk = walk(root).unwrap();
        assert_eq!(walk.entries.len(), 1);
        assert_eq!(walk.entries[0].name(), "real");
    }

    #[test]
    fn test_root_group_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(GROUP_FILE));
        let walk = walk(dir.path()).unwrap();
        assert!(walk.root_def.is_some());
        assert!(walk.entries.is_empty());
    }

    #[test]
    fn test_bad_file_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("9lives.toml"));
        let err = walk(dir.path()).unwrap_err();
        assert!(err.to_string().contains("9lives"));
    }
}
