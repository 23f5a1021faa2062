//! The resolved invocation handed to a run hook.

use trellis_core::ReleaseTrack;
use trellis_tree::{BoundArgs, BoundPositional, FlagValue};

/// Built-in flags the dispatcher claims when the leaf does not declare
/// them itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalFlags {
    pub help: bool,
    pub quiet: bool,
    pub verbosity: Option<String>,
    pub format: Option<String>,
    pub track: Option<ReleaseTrack>,
}

/// Everything a hook needs: the command path, the track it resolved
/// under, and the bound arguments.
#[derive(Debug)]
pub struct ResolvedInvocation {
    pub path: Vec<String>,
    pub track: ReleaseTrack,
    pub args: BoundArgs,
    pub globals: GlobalFlags,
}

impl ResolvedInvocation {
    /// The command path joined for display, e.g. `foo bar`.
    pub fn display_path(&self) -> String {
        self.path.join(" ")
    }

    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.args.flags.get(name)
    }

    pub fn positional(&self, name: &str) -> Option<&BoundPositional> {
        self.args.positionals.iter().find(|p| p.name == name)
    }
}
