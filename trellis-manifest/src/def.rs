//! The command definition file format.
//!
//! One TOML file per leaf command; a directory with a `group.toml` is an
//! explicit group. Parsing is split in two passes: [`parse_meta`] reads the
//! cheap `[command]` header (kind, hook symbol, tracks, deprecation), and
//! [`parse_body`] performs the full typed decode of flag and positional
//! specs. The split is what makes per-node deferred loading possible.

use std::str::FromStr;

use serde::Deserialize;
use toml::Spanned;
use trellis_core::{DeprecationRecord, DeprecationState, ReleaseTrack, TrackSet, Version};

use crate::{
    error::{Result, SourceContext},
    validate,
};

/// Structural kind of a definition, decided by file-system layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Group,
    Leaf,
}

/// The eagerly-available part of a definition: everything the tree builder
/// and the deprecation gate need without forcing the heavy decode.
#[derive(Debug, Clone)]
pub struct DefMeta {
    pub kind: DefKind,
    pub description: Option<String>,
    /// Symbolic run-hook name, resolved against the host registry.
    pub hook: Option<String>,
    /// Declared track filter; `None` means visible wherever the root is.
    pub tracks: Option<TrackSet>,
    pub hidden: bool,
    pub deprecation: Option<DeprecationRecord>,
}

/// The deferred part of a definition: flag and positional specs.
#[derive(Debug, Clone)]
pub struct DefBody {
    pub flags: Vec<FlagSpec>,
    pub positionals: Vec<PositionalSpec>,
    /// Inherited flags this definition explicitly hides or removes.
    pub suppressions: Vec<Suppression>,
}

/// Value kind of a flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    #[default]
    Bool,
    Value,
    Repeated,
    Map,
    Choice,
}

impl FlagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagKind::Bool => "bool",
            FlagKind::Value => "value",
            FlagKind::Repeated => "repeated",
            FlagKind::Map => "map",
            FlagKind::Choice => "choice",
        }
    }

    /// Whether occurrences of this flag carry a value token.
    pub fn takes_value(&self) -> bool {
        !matches!(self, FlagKind::Bool)
    }
}

/// Arity of a positional argument.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    #[default]
    One,
    Optional,
    Variadic,
}

/// A validated named option.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    pub name: String,
    pub kind: FlagKind,
    pub short: Option<char>,
    pub choices: Vec<String>,
    pub default: Option<String>,
    pub required: bool,
    /// Inheritable by descendant commands.
    pub inherit: bool,
    /// Hidden from help but still parseable.
    pub hidden: bool,
    pub help: Option<String>,
}

/// A validated ordered argument.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSpec {
    pub name: String,
    pub arity: Arity,
    pub help: Option<String>,
}

/// How an inherited flag is suppressed by a descendant or overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressKind {
    /// Out of help, still accepted.
    Hidden,
    /// Dropped from the effective set entirely.
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suppression {
    pub flag: String,
    pub kind: SuppressKind,
}

// ---------------------------------------------------------------------------
// Raw serde documents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MetaDoc {
    #[serde(default)]
    command: MetaSection,
}

#[derive(Debug, Default, Deserialize)]
struct MetaSection {
    description: Option<String>,
    hook: Option<Spanned<String>>,
    tracks: Option<Vec<Spanned<String>>>,
    #[serde(default)]
    hidden: bool,
    deprecation: Option<DeprecationSection>,
}

#[derive(Debug, Deserialize)]
struct DeprecationSection {
    state: Spanned<String>,
    removed_in: Option<Spanned<String>>,
    replacement: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BodyDoc {
    #[serde(default)]
    flags: Vec<FlagEntry>,
    #[serde(default)]
    args: Vec<PositionalEntry>,
}

#[derive(Debug, Deserialize)]
struct FlagEntry {
    name: Spanned<String>,
    #[serde(default)]
    kind: FlagKind,
    short: Option<Spanned<char>>,
    #[serde(default)]
    choices: Vec<String>,
    default: Option<toml::Value>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    inherit: bool,
    #[serde(default)]
    hidden: bool,
    help: Option<String>,
    /// Marks this entry as a suppression of an inherited flag.
    suppress: Option<Spanned<SuppressKind>>,
}

#[derive(Debug, Deserialize)]
struct PositionalEntry {
    name: Spanned<String>,
    #[serde(default)]
    arity: Arity,
    help: Option<String>,
}

// ---------------------------------------------------------------------------
// Meta pass
// ---------------------------------------------------------------------------

/// Parse the `[command]` header of a definition.
///
/// `kind` comes from the file-system layout; the header is validated
/// against it (a leaf must name a hook, a group must not).
pub fn parse_meta(src: &str, filename: &str, kind: DefKind) -> Result<DefMeta> {
    let ctx = SourceContext::new(src, filename);
    let doc: MetaDoc = toml::from_str(src).map_err(|e| ctx.parse_error(e))?;
    let section = doc.command;

    let hook = match (&section.hook, kind) {
        (Some(hook), DefKind::Leaf) => Some(hook.get_ref().clone()),
        (None, DefKind::Leaf) => {
            return Err(Box::new(crate::Error::HookMissing {
                path: filename.into(),
            }));
        }
        (Some(hook), DefKind::Group) => {
            return Err(Box::new(crate::Error::HookForbidden {
                src: ctx.named_source(),
                span: hook.span().into(),
            }));
        }
        (None, DefKind::Group) => None,
    };

    let tracks = match &section.tracks {
        None => None,
        Some(list) if list.is_empty() => {
            return Err(ctx.validation_error("tracks list cannot be empty"));
        }
        Some(list) => {
            let mut set = TrackSet::empty();
            for entry in list {
                let track = ReleaseTrack::from_str(entry.get_ref())
                    .map_err(|_| ctx.unknown_track(entry.get_ref(), entry.span()))?;
                set.insert(track);
            }
            Some(set)
        }
    };

    let deprecation = section
        .deprecation
        .as_ref()
        .map(|dep| parse_deprecation(&ctx, dep))
        .transpose()?;

    Ok(DefMeta {
        kind,
        description: section.description,
        hook,
        tracks,
        hidden: section.hidden,
        deprecation,
    })
}

fn parse_deprecation(ctx: &SourceContext, dep: &DeprecationSection) -> Result<DeprecationRecord> {
    let state = match dep.state.get_ref().as_str() {
        "warn" => DeprecationState::Warn,
        "removed" => DeprecationState::Removed,
        other => {
            return Err(ctx.validation_error_at(
                format!("unknown deprecation state '{}', expected 'warn' or 'removed'", other),
                dep.state.span(),
            ));
        }
    };
    let removed_in = dep
        .removed_in
        .as_ref()
        .map(|v| {
            Version::from_str(v.get_ref()).map_err(|_| ctx.malformed_version(v.get_ref(), v.span()))
        })
        .transpose()?;
    Ok(DeprecationRecord {
        state,
        removed_in,
        replacement: dep.replacement.clone(),
        reason: dep.reason.clone(),
    })
}

// ---------------------------------------------------------------------------
// Body pass
// ---------------------------------------------------------------------------

/// Full typed decode of flag and positional specs.
///
/// This is the deferred half of loading a definition; the loader memoizes
/// its result behind a one-shot latch.
pub fn parse_body(src: &str, filename: &str) -> Result<DefBody> {
    let ctx = SourceContext::new(src, filename);
    let doc: BodyDoc = toml::from_str(src).map_err(|e| ctx.parse_error(e))?;

    let mut flags = Vec::new();
    let mut suppressions = Vec::new();
    let mut seen_shorts: Vec<(char, Spanned<String>, Spanned<char>)> = Vec::new();

    for entry in &doc.flags {
        let name = entry.name.get_ref();
        if let Some(reason) = validate::validate_name(name) {
            return Err(ctx.invalid_name(name, "flag", reason, Some(entry.name.span().into())));
        }
        if flags.iter().any(|f: &FlagSpec| &f.name == name)
            || suppressions.iter().any(|s: &Suppression| &s.flag == name)
        {
            return Err(ctx.duplicate_name(name, "flag", entry.name.span()));
        }

        if let Some(suppress) = &entry.suppress {
            suppressions.push(Suppression {
                flag: name.clone(),
                kind: *suppress.get_ref(),
            });
            continue;
        }

        if let Some(short) = &entry.short {
            let c = *short.get_ref();
            if let Some((_, first_flag, first_short)) =
                seen_shorts.iter().find(|(seen, _, _)| *seen == c)
            {
                return Err(Box::new(crate::Error::DuplicateShortFlag {
                    src: ctx.named_source(),
                    first_span: first_short.span().into(),
                    second_span: short.span().into(),
                    short: c,
                    first_flag: first_flag.get_ref().clone(),
                    second_flag: name.clone(),
                }));
            }
            seen_shorts.push((c, entry.name.clone(), short.clone()));
        }

        flags.push(validate_flag(&ctx, entry)?);
    }

    let mut positionals = Vec::new();
    for (index, entry) in doc.args.iter().enumerate() {
        let name = entry.name.get_ref();
        if let Some(reason) = validate::validate_name(name) {
            return Err(ctx.invalid_name(name, "argument", reason, Some(entry.name.span().into())));
        }
        if positionals.iter().any(|p: &PositionalSpec| &p.name == name) {
            return Err(ctx.duplicate_name(name, "argument", entry.name.span()));
        }
        if entry.arity == Arity::Variadic && index != doc.args.len() - 1 {
            return Err(ctx.validation_error_at(
                format!("variadic argument '{}' must be last", name),
                entry.name.span(),
            ));
        }
        positionals.push(PositionalSpec {
            name: name.clone(),
            arity: entry.arity,
            help: entry.help.clone(),
        });
    }

    Ok(DefBody {
        flags,
        positionals,
        suppressions,
    })
}

fn validate_flag(ctx: &SourceContext, entry: &FlagEntry) -> Result<FlagSpec> {
    let name = entry.name.get_ref().clone();
    let span = entry.name.span();

    match entry.kind {
        FlagKind::Choice if entry.choices.is_empty() => {
            return Err(ctx.validation_error_at(
                format!("choice flag '{}' must list at least one alternative", name),
                span,
            ));
        }
        FlagKind::Choice => {}
        _ if !entry.choices.is_empty() => {
            return Err(ctx.validation_error_at(
                format!("flag '{}' lists choices but is not kind = \"choice\"", name),
                span,
            ));
        }
        _ => {}
    }

    let default = entry
        .default
        .as_ref()
        .map(|value| default_to_string(value).ok_or_else(|| {
            ctx.validation_error_at(
                format!("flag '{}' has an unsupported default value", name),
                span.clone(),
            )
        }))
        .transpose()?;

    if entry.required && default.is_some() {
        return Err(ctx.validation_error_at(
            format!("required flag '{}' cannot have a default", name),
            span,
        ));
    }

    if entry.kind == FlagKind::Choice
        && let Some(default) = &default
        && !entry.choices.iter().any(|c| c.eq_ignore_ascii_case(default))
    {
        return Err(ctx.validation_error_at(
            format!("default '{}' is not one of the choices for flag '{}'", default, name),
            span,
        ));
    }

    Ok(FlagSpec {
        name,
        kind: entry.kind,
        short: entry.short.as_ref().map(|s| *s.get_ref()),
        choices: entry.choices.clone(),
        default,
        required: entry.required,
        inherit: entry.inherit,
        hidden: entry.hidden,
        help: entry.help.clone(),
    })
}

fn default_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(src: &str, kind: DefKind) -> Result<DefMeta> {
        parse_meta(src, "test.toml", kind)
    }

    fn body(src: &str) -> Result<DefBody> {
        parse_body(src, "test.toml")
    }

    // ========================================================================
    // Meta pass
    // ========================================================================

    #[test]
    fn test_leaf_meta() {
        let meta = meta(
            r#"
            [command]
            description = "Create a widget"
            hook = "widgets.create"
            tracks = ["ga", "beta"]
            "#,
            DefKind::Leaf,
        )
        .unwrap();

        assert_eq!(meta.hook.as_deref(), Some("widgets.create"));
        let tracks = meta.tracks.unwrap();
        assert!(tracks.contains(ReleaseTrack::Ga));
        assert!(tracks.contains(ReleaseTrack::Beta));
        assert!(!tracks.contains(ReleaseTrack::Alpha));
        assert!(!meta.hidden);
    }

    #[test]
    fn test_leaf_without_hook_rejected() {
        let err = meta("[command]\ndescription = \"x\"\n", DefKind::Leaf).unwrap_err();
        assert!(err.to_string().contains("no run hook"));
    }

    #[test]
    fn test_group_with_hook_rejected() {
        let err = meta("[command]\nhook = \"x\"\n", DefKind::Group).unwrap_err();
        assert!(err.to_string().contains("run hook"));
    }

    #[test]
    fn test_unknown_track_rejected() {
        let err = meta(
            "[command]\nhook = \"x\"\ntracks = [\"canary\"]\n",
            DefKind::Leaf,
        )
        .unwrap_err();
        assert!(err.to_string().contains("canary"));
    }

    #[test]
    fn test_empty_tracks_rejected() {
        let err = meta("[command]\nhook = \"x\"\ntracks = []\n", DefKind::Leaf).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_deprecation_meta() {
        let meta = meta(
            r#"
            [command]
            hook = "old.run"

            [command.deprecation]
            state = "warn"
            removed_in = "2.0.0"
            replacement = "new cmd"
            "#,
            DefKind::Leaf,
        )
        .unwrap();

        let dep = meta.deprecation.unwrap();
        assert_eq!(dep.state, DeprecationState::Warn);
        assert_eq!(dep.removed_in, Some(Version::new(2, 0, 0)));
        assert_eq!(dep.replacement.as_deref(), Some("new cmd"));
    }

    #[test]
    fn test_malformed_removal_version_rejected() {
        let err = meta(
            "[command]\nhook = \"x\"\n[command.deprecation]\nstate = \"warn\"\nremoved_in = \"soon\"\n",
            DefKind::Leaf,
        )
        .unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_unknown_deprecation_state_rejected() {
        let err = meta(
            "[command]\nhook = \"x\"\n[command.deprecation]\nstate = \"gone\"\n",
            DefKind::Leaf,
        )
        .unwrap_err();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_group_meta_may_be_empty() {
        let meta = meta("", DefKind::Group).unwrap();
        assert_eq!(meta.kind, DefKind::Group);
        assert!(meta.hook.is_none());
        assert!(meta.tracks.is_none());
    }

    // ========================================================================
    // Body pass
    // ========================================================================

    #[test]
    fn test_flags_in_declared_order() {
        let body = body(
            r#"
            [[flags]]
            name = "zone"
            kind = "value"

            [[flags]]
            name = "async"
            "#,
        )
        .unwrap();

        let names: Vec<&str> = body.flags.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["zone", "async"]);
        assert_eq!(body.flags[0].kind, FlagKind::Value);
        assert_eq!(body.flags[1].kind, FlagKind::Bool);
    }

    #[test]
    fn test_flag_attributes() {
        let body = body(
            r#"
            [[flags]]
            name = "project"
            kind = "value"
            short = "p"
            inherit = true
            required = false
            help = "Project id"
            default = "demo"
            "#,
        )
        .unwrap();

        let flag = &body.flags[0];
        assert_eq!(flag.short, Some('p'));
        assert!(flag.inherit);
        assert_eq!(flag.default.as_deref(), Some("demo"));
        assert_eq!(flag.help.as_deref(), Some("Project id"));
    }

    #[test]
    fn test_choice_flag_needs_choices() {
        let err = body("[[flags]]\nname = \"format\"\nkind = \"choice\"\n").unwrap_err();
        assert!(err.to_string().contains("at least one alternative"));
    }

    #[test]
    fn test_choices_only_for_choice_kind() {
        let err = body(
            "[[flags]]\nname = \"format\"\nkind = \"value\"\nchoices = [\"json\"]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not kind"));
    }

    #[test]
    fn test_required_with_default_rejected() {
        let err = body(
            "[[flags]]\nname = \"name\"\nkind = \"value\"\nrequired = true\ndefault = \"x\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot have a default"));
    }

    #[test]
    fn test_choice_default_must_be_a_choice() {
        let err = body(
            "[[flags]]\nname = \"format\"\nkind = \"choice\"\nchoices = [\"json\", \"yaml\"]\ndefault = \"xml\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not one of the choices"));
    }

    #[test]
    fn test_duplicate_flag_rejected() {
        let err = body(
            "[[flags]]\nname = \"zone\"\n\n[[flags]]\nname = \"zone\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_duplicate_short_rejected() {
        let err = body(
            "[[flags]]\nname = \"zone\"\nshort = \"z\"\n\n[[flags]]\nname = \"zip\"\nshort = \"z\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("-z"));
    }

    #[test]
    fn test_suppression_entry() {
        let body = body("[[flags]]\nname = \"project\"\nsuppress = \"removed\"\n").unwrap();
        assert!(body.flags.is_empty());
        assert_eq!(
            body.suppressions,
            vec![Suppression {
                flag: "project".to_string(),
                kind: SuppressKind::Removed
            }]
        );
    }

    #[test]
    fn test_variadic_must_be_last() {
        let err = body(
            "[[args]]\nname = \"files\"\narity = \"variadic\"\n\n[[args]]\nname = \"dest\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be last"));
    }

    #[test]
    fn test_positionals_in_order() {
        let body = body(
            "[[args]]\nname = \"source\"\n\n[[args]]\nname = \"dest\"\narity = \"optional\"\n",
        )
        .unwrap();
        assert_eq!(body.positionals.len(), 2);
        assert_eq!(body.positionals[0].arity, Arity::One);
        assert_eq!(body.positionals[1].arity, Arity::Optional);
    }

    #[test]
    fn test_invalid_flag_name_rejected() {
        let err = body("[[flags]]\nname = \"9lives\"\n").unwrap_err();
        assert!(err.to_string().contains("9lives"));
    }
}
