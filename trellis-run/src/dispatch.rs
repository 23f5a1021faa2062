//! Token walk, track resolution, deprecation gate, and hook invocation.

use std::fmt;

use trellis_core::{DeprecationAction, ReleaseTrack, Version};
use trellis_tree::{NodeId, Registry, bind};

use crate::{
    context::HostContext,
    error::{DispatchError, Result},
    hook::HookRegistry,
    invocation::{GlobalFlags, ResolvedInvocation},
};

/// How a successful dispatch ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The run hook completed.
    Done,
    /// Help text was rendered instead of invoking the hook.
    Help,
}

/// Resolves command lines against a [`Registry`] and invokes run hooks.
///
/// Construction validates every hook symbol the tree names, so a missing
/// registration surfaces before any command line is accepted.
pub struct Dispatcher<'r> {
    registry: &'r Registry,
    hooks: HookRegistry,
    version: Version,
}

impl fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl<'r> Dispatcher<'r> {
    /// Build a dispatcher for `version`, honoring a `TRELLIS_VERSION`
    /// override from the environment.
    pub fn new(registry: &'r Registry, hooks: HookRegistry, version: Version) -> Result<Self> {
        let version = match Version::from_env() {
            Some(Ok(v)) => v,
            Some(Err(message)) => return Err(DispatchError::Config(message.into())),
            None => version,
        };
        let dispatcher = Self {
            registry,
            hooks,
            version,
        };
        dispatcher.validate_hooks()?;
        Ok(dispatcher)
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Check every leaf's hook symbol against the registry. A fallback
    /// hook covers all symbols.
    fn validate_hooks(&self) -> Result<()> {
        if self.hooks.has_fallback() {
            return Ok(());
        }
        let tree = self.registry.tree();
        for id in tree.ids() {
            let node = tree.node(id);
            if !node.is_leaf() {
                continue;
            }
            for track in ReleaseTrack::ALL {
                if !node.tracks().contains(track) {
                    continue;
                }
                let Some(meta) = node.meta_for(track) else {
                    continue;
                };
                if let Some(symbol) = &meta.hook
                    && !self.hooks.contains(symbol)
                {
                    return Err(DispatchError::UnknownHook {
                        path: self.registry.path_of(id).join(" "),
                        symbol: symbol.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve and run one command line.
    ///
    /// Dispatch is a pure function of the tree and the tokens; calling it
    /// twice with the same input resolves identically.
    pub fn dispatch(&self, ctx: &mut HostContext, argv: &[String]) -> Result<Outcome> {
        let mut walk = self.walk(argv)?;

        // `--help` and `--track` are claimed wherever they appear, even
        // after the leaf. Tokens behind `--` stay verbatim.
        let mut held = Vec::with_capacity(walk.held.len());
        let mut trailing = false;
        for token in std::mem::take(&mut walk.held) {
            trailing |= token == "--";
            if !trailing && (token == "--help" || token == "-h") {
                walk.help = true;
            } else if !trailing && let Some(v) = token.strip_prefix("--track=") {
                walk.track_flag = Some(parse_track(v)?);
            } else {
                held.push(token);
            }
        }

        let track = walk.resolved_track()?;
        let tree = self.registry.tree();
        let node = tree.node(walk.node);

        if !node.tracks().contains(track) {
            let available: Vec<&str> = node.tracks().iter().map(|t| t.as_str()).collect();
            return Err(DispatchError::usage(format!(
                "`{}` is not available on the {} track (available on: {})",
                self.display_path(walk.node),
                track,
                available.join(", ")
            )));
        }

        if !node.is_leaf() {
            return self.finish_group(ctx, &walk, track);
        }

        let mut globals = GlobalFlags {
            help: walk.help,
            track: walk.track_flag.or(walk.track_prefix),
            ..GlobalFlags::default()
        };

        if globals.help {
            let text = self.registry.render_help(walk.node, track, &self.version)?;
            let _ = write!(ctx.out(), "{}", text);
            return Ok(Outcome::Help);
        }

        self.deprecation_gate(ctx, walk.node, track)?;

        let eff = self.registry.effective_flags(walk.node, track)?;
        let specs = self.registry.positionals(walk.node, track)?;

        // Built-ins the leaf does not declare itself are claimed here.
        let mut trailing = false;
        held.retain(|token| {
            trailing |= token == "--";
            if trailing {
                return true;
            }
            if token == "--quiet" && !eff.contains("quiet") {
                globals.quiet = true;
                return false;
            }
            if let Some(v) = token.strip_prefix("--verbosity=")
                && !eff.contains("verbosity")
            {
                globals.verbosity = Some(v.to_string());
                return false;
            }
            if let Some(v) = token.strip_prefix("--format=")
                && !eff.contains("format")
            {
                globals.format = Some(v.to_string());
                return false;
            }
            true
        });

        if !globals.quiet {
            for lint in eff.lints() {
                ctx.warn(lint);
            }
        }

        let path = self.registry.path_of(walk.node);
        let args = bind(&eff, &specs, &held).map_err(|err| DispatchError::Usage {
            message: format!("{}: {}", path.join(" "), err),
        })?;

        if ctx.is_cancelled() {
            return Err(DispatchError::Cancelled {
                path: path.join(" "),
            });
        }

        let meta = node
            .meta_for(track)
            .ok_or_else(|| DispatchError::NotFound {
                path: path.join(" "),
            })?;
        let symbol = meta.hook.as_deref().unwrap_or_default();
        let hook = self
            .hooks
            .resolve(symbol)
            .ok_or_else(|| DispatchError::UnknownHook {
                path: path.join(" "),
                symbol: symbol.to_string(),
            })?;

        let invocation = ResolvedInvocation {
            path: path.clone(),
            track,
            args,
            globals,
        };
        hook.run(ctx, &invocation)
            .map_err(|source| DispatchError::Run {
                path: path.join(" "),
                source,
            })?;
        Ok(Outcome::Done)
    }

    /// A group at the end of the path either renders its help or fails
    /// with its visible children.
    fn finish_group(&self, ctx: &mut HostContext, walk: &WalkState, track: ReleaseTrack) -> Result<Outcome> {
        if walk.help {
            let text = self.registry.render_help(walk.node, track, &self.version)?;
            let _ = write!(ctx.out(), "{}", text);
            return Ok(Outcome::Help);
        }
        let children = self.registry.child_names(walk.node, track);
        let path = self.display_path(walk.node);
        let mut message = if path.is_empty() {
            "a command is required".to_string()
        } else {
            format!("`{}` requires a subcommand", path)
        };
        if !children.is_empty() {
            message.push_str(&format!(". Available commands: {}", children.join(", ")));
        }
        Err(DispatchError::usage(message))
    }

    /// Walk the ancestry applying each node's deprecation record. A
    /// removed node anywhere on the path stops the dispatch.
    fn deprecation_gate(&self, ctx: &mut HostContext, leaf: NodeId, track: ReleaseTrack) -> Result<()> {
        let tree = self.registry.tree();
        for id in tree.ancestry(leaf) {
            if id == tree.root() {
                continue;
            }
            let Some(record) = tree.node(id).deprecation(track) else {
                continue;
            };
            match record.action(&self.version) {
                DeprecationAction::Pass => {}
                DeprecationAction::Warn { message } => ctx.warn(&message),
                DeprecationAction::Fail { replacement } => {
                    return Err(DispatchError::Removed {
                        path: self.display_path(id),
                        replacement,
                    });
                }
            }
        }
        Ok(())
    }

    /// Consume path tokens left to right, holding flag tokens aside for
    /// the binder. Flags that take values must use the `=` form before
    /// the leaf is reached.
    fn walk(&self, argv: &[String]) -> Result<WalkState> {
        let tree = self.registry.tree();
        let mut state = WalkState::new(tree.root());
        let mut i = 0;
        while i < argv.len() {
            let token = &argv[i];
            if token == "--" || tree.node(state.node).is_leaf() {
                state.held.extend(argv[i..].iter().cloned());
                break;
            }
            if token.starts_with('-') {
                if token == "--help" || token == "-h" {
                    state.help = true;
                } else if let Some(v) = token.strip_prefix("--track=") {
                    state.track_flag = Some(parse_track(v)?);
                } else {
                    state.held.push(token.clone());
                }
                i += 1;
                continue;
            }
            if let Some(child) = tree.child(state.node, token) {
                state.node = child;
                i += 1;
                continue;
            }
            if state.node == tree.root()
                && state.track_prefix.is_none()
                && let Ok(track) = token.parse::<ReleaseTrack>()
                && track.prefix().is_some()
            {
                state.track_prefix = Some(track);
                i += 1;
                continue;
            }
            return Err(self.dead_end(state.node, token));
        }
        Ok(state)
    }

    fn dead_end(&self, node: NodeId, token: &str) -> DispatchError {
        let path = self.display_path(node);
        let mut message = if path.is_empty() {
            format!("unknown command '{}'", token)
        } else {
            format!("unknown command '{}' for '{}'", token, path)
        };
        // Suggestions cover all declared tracks; visibility is checked
        // only once the path resolves.
        let tree = self.registry.tree();
        let names: Vec<&str> = tree
            .node(node)
            .children()
            .iter()
            .map(|id| tree.node(*id).name())
            .collect();
        if let Some(best) = closest(token, &names) {
            message.push_str(&format!(". Did you mean '{}'?", best));
        }
        if !names.is_empty() {
            message.push_str(&format!(" Available commands: {}", names.join(", ")));
        }
        DispatchError::usage(message)
    }

    fn display_path(&self, id: NodeId) -> String {
        self.registry.path_of(id).join(" ")
    }
}

struct WalkState {
    node: NodeId,
    held: Vec<String>,
    help: bool,
    track_flag: Option<ReleaseTrack>,
    track_prefix: Option<ReleaseTrack>,
}

impl WalkState {
    fn new(root: NodeId) -> Self {
        Self {
            node: root,
            held: Vec::new(),
            help: false,
            track_flag: None,
            track_prefix: None,
        }
    }

    /// Fold the two selectors into one track; disagreeing selectors are
    /// a usage error.
    fn resolved_track(&self) -> Result<ReleaseTrack> {
        match (self.track_prefix, self.track_flag) {
            (Some(a), Some(b)) if a != b => Err(DispatchError::usage(format!(
                "conflicting release tracks: '{}' and '--track={}'",
                a, b
            ))),
            (_, Some(t)) | (Some(t), None) => Ok(t),
            (None, None) => Ok(ReleaseTrack::Ga),
        }
    }
}

fn parse_track(value: &str) -> Result<ReleaseTrack> {
    value
        .parse()
        .map_err(|_| DispatchError::usage(format!("invalid release track '{}'", value)))
}

/// Closest name by edit distance, within a small bound.
fn closest<'a>(token: &str, names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .map(|name| (edit_distance(token, name), *name))
        .filter(|(d, _)| *d <= 2)
        .min_by_key(|(d, _)| *d)
        .map(|(_, name)| name)
}

/// Edit distance counting an adjacent transposition as one edit, so a
/// swapped pair of letters still lands on the intended name.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        d[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            d[i][j] = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d[i][j] = d[i][j].min(d[i - 2][j - 2] + 1);
            }
        }
    }
    d[a.len()][b.len()]
}
