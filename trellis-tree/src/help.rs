//! Help rendering for nodes in the command tree.

use trellis_core::{ReleaseTrack, Version};
use trellis_manifest::{Arity, FlagKind, FlagSpec, PositionalSpec};

use crate::{error::Result, node::NodeId, registry::Registry};

/// Render help text for a node under a track.
///
/// Deprecated and removed nodes are decorated in the NAME line; group
/// listings decorate deprecated children the same way.
pub fn render(
    registry: &Registry,
    id: NodeId,
    track: ReleaseTrack,
    current: &Version,
) -> Result<String> {
    let tree = registry.tree();
    let node = tree.node(id);
    let path = tree.path_of(id).join(" ");
    let mut out = String::new();

    out.push_str("NAME\n");
    out.push_str(&format!(
        "    {} -{}{}\n",
        if path.is_empty() { "(root)" } else { &path },
        decoration(registry, id, track, current),
        match node.description(track) {
            Some(desc) => format!(" {}", desc),
            None => String::new(),
        }
    ));

    if node.is_leaf() {
        let eff = registry.effective_flags(id, track)?;
        let positionals = registry.positionals(id, track)?;

        out.push_str("\nSYNOPSIS\n    ");
        out.push_str(&path);
        for flag in eff.visible() {
            out.push(' ');
            out.push_str(&flag_synopsis(flag));
        }
        for positional in &positionals {
            out.push(' ');
            out.push_str(&positional_synopsis(positional));
        }
        out.push('\n');

        if eff.visible().next().is_some() {
            out.push_str("\nFLAGS\n");
            for flag in eff.visible() {
                out.push_str(&format!("    {}\n", flag_usage(flag)));
                if let Some(help) = &flag.help {
                    out.push_str(&format!("        {}\n", help));
                }
            }
        }

        if !positionals.is_empty() {
            out.push_str("\nPOSITIONAL ARGUMENTS\n");
            for positional in &positionals {
                out.push_str(&format!("    {}\n", positional_synopsis(positional)));
                if let Some(help) = &positional.help {
                    out.push_str(&format!("        {}\n", help));
                }
            }
        }
    } else {
        out.push_str("\nCOMMANDS\n");
        for name in registry.child_names(id, track) {
            let child = tree.child(id, name).expect("listed child exists");
            out.push_str(&format!(
                "    {}{}{}\n",
                name,
                decoration(registry, child, track, current),
                match tree.node(child).description(track) {
                    Some(desc) => format!(" - {}", desc),
                    None => String::new(),
                }
            ));
        }
    }

    Ok(out)
}

fn decoration(registry: &Registry, id: NodeId, track: ReleaseTrack, current: &Version) -> String {
    match registry.deprecation(id, track) {
        Some(record) => format!(" {}", record.decoration(current)),
        None => String::new(),
    }
}

fn flag_synopsis(flag: &FlagSpec) -> String {
    let usage = flag_usage(flag);
    if flag.required {
        usage
    } else {
        format!("[{}]", usage)
    }
}

/// Canonical usage form, e.g. `--name=NAME` or `--async`.
fn flag_usage(flag: &FlagSpec) -> String {
    match flag.kind {
        FlagKind::Bool => format!("--{}", flag.name),
        FlagKind::Choice => format!("--{}={}", flag.name, flag.choices.join("|")),
        _ => format!(
            "--{}={}",
            flag.name,
            flag.name.replace('-', "_").to_uppercase()
        ),
    }
}

fn positional_synopsis(positional: &PositionalSpec) -> String {
    let name = positional.name.replace('-', "_").to_uppercase();
    match positional.arity {
        Arity::One => name,
        Arity::Optional => format!("[{}]", name),
        Arity::Variadic => format!("[{} ...]", name),
    }
}
