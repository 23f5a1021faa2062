//! Argument binding: effective flag sets and token parsing.
//!
//! The effective flag set of a leaf is the union of inheritable flags
//! declared by ancestors visible under the selected track plus the leaf's
//! own flags, leaf declarations winning on long-name collision.
//! Positionals come from the leaf alone.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thiserror::Error;
use trellis_core::ReleaseTrack;
use trellis_manifest::{Arity, FlagKind, FlagSpec, PositionalSpec, SuppressKind};

use crate::{
    error::Result,
    node::{CommandTree, NodeId},
};

/// The flags in scope for a leaf, in ancestor-then-leaf declaration order.
#[derive(Debug, Default, Clone)]
pub struct EffectiveFlags {
    flags: IndexMap<String, FlagSpec>,
    /// Tree-shape warnings surfaced while composing the set, e.g. an
    /// inherited flag redeclared with a different value kind.
    lints: Vec<String>,
}

impl EffectiveFlags {
    pub fn get(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.get(name)
    }

    pub fn by_short(&self, short: char) -> Option<&FlagSpec> {
        self.flags.values().find(|f| f.short == Some(short))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.values()
    }

    /// Flags shown in help: hidden and suppressed-hidden flags excluded.
    pub fn visible(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.values().filter(|f| !f.hidden)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn lints(&self) -> &[String] {
        &self.lints
    }
}

/// Compose the effective flag set for a leaf under a track.
///
/// Forces the leaf's variant and each ancestor variant along the path;
/// this is the only place deferred definitions are pulled in during a
/// dispatch.
pub fn effective_flags(tree: &CommandTree, leaf: NodeId, track: ReleaseTrack) -> Result<EffectiveFlags> {
    let mut eff = EffectiveFlags::default();
    let path = tree.ancestry(leaf);

    for id in &path {
        let node = tree.node(*id);
        let Some(variant) = node.variant_for(track) else {
            continue;
        };
        let body = variant.def.force()?;
        let is_leaf = *id == leaf;

        for suppression in &body.suppressions {
            match eff.flags.get_mut(&suppression.flag) {
                Some(spec) => match suppression.kind {
                    SuppressKind::Hidden => spec.hidden = true,
                    SuppressKind::Removed => {
                        eff.flags.shift_remove(&suppression.flag);
                    }
                },
                None => eff.lints.push(format!(
                    "'{}' suppresses '--{}', which is not inherited here",
                    tree.path_of(*id).join(" "),
                    suppression.flag
                )),
            }
        }

        for spec in &body.flags {
            if !is_leaf && !spec.inherit {
                continue;
            }
            if let Some(existing) = eff.flags.get(&spec.name)
                && existing.kind != spec.kind
            {
                eff.lints.push(format!(
                    "'{}' redeclares inherited flag '--{}' with kind '{}' (was '{}')",
                    tree.path_of(*id).join(" "),
                    spec.name,
                    spec.kind.as_str(),
                    existing.kind.as_str()
                ));
            }
            eff.flags.insert(spec.name.clone(), spec.clone());
        }
    }

    Ok(eff)
}

/// Positional specs for a leaf under a track (forces the leaf variant).
pub fn positionals(tree: &CommandTree, leaf: NodeId, track: ReleaseTrack) -> Result<Vec<PositionalSpec>> {
    match tree.node(leaf).variant_for(track) {
        Some(variant) => Ok(variant.def.force()?.positionals.clone()),
        None => Ok(Vec::new()),
    }
}

/// A parsed flag value, shaped by the flag's declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    Value(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl FlagValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Value(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A positional bound to its tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPositional {
    pub name: String,
    pub values: Vec<String>,
}

/// The product of token parsing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BoundArgs {
    pub flags: BTreeMap<String, FlagValue>,
    pub positionals: Vec<BoundPositional>,
}

/// Invalid user input while parsing tokens against a flag set.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("unknown flag '{token}'")]
    UnknownFlag { token: String },

    #[error("flag '--{name}' requires a value")]
    MissingValue { name: String },

    #[error("invalid boolean '{value}' for flag '--{name}'")]
    BadBool { name: String, value: String },

    #[error("invalid value '{value}' for flag '--{name}': expected one of: {}", .choices.join(", "))]
    BadChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("invalid entry '{entry}' for flag '--{name}': expected KEY=VALUE")]
    BadMapEntry { name: String, entry: String },

    #[error("missing required flag '--{name}'")]
    MissingRequired { name: String },

    #[error("missing required argument '{name}'")]
    MissingPositional { name: String },

    #[error("unexpected argument '{token}'")]
    ExtraPositional { token: String },
}

/// Parse tokens against an effective flag set and positional specs.
///
/// Flag parsing is position-independent; `--` terminates it and feeds the
/// rest to the variadic positional if one exists.
pub fn bind(
    eff: &EffectiveFlags,
    positionals: &[PositionalSpec],
    tokens: &[String],
) -> std::result::Result<BoundArgs, BindError> {
    let mut occurrences: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut pos_tokens: Vec<String> = Vec::new();
    let mut trailing: Vec<String> = Vec::new();

    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        if token == "--" {
            trailing.extend(iter.cloned());
            break;
        }
        if let Some(body) = token.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((n, v)) => (n, Some(v.to_string())),
                None => (body, None),
            };
            let occurrence = resolve_long(eff, token, name, inline, &mut iter)?;
            occurrences.entry(occurrence.0).or_default().push(occurrence.1);
        } else if let Some(short) = parse_short(token) {
            let Some(spec) = eff.by_short(short) else {
                return Err(BindError::UnknownFlag {
                    token: token.clone(),
                });
            };
            let value = if spec.kind.takes_value() {
                next_value(&mut iter).ok_or_else(|| BindError::MissingValue {
                    name: spec.name.clone(),
                })?
            } else {
                "true".to_string()
            };
            occurrences.entry(spec.name.clone()).or_default().push(value);
        } else {
            pos_tokens.push(token.clone());
        }
    }

    let mut args = BoundArgs::default();
    for (name, values) in occurrences {
        let spec = eff.get(&name).expect("occurrence resolved against set");
        args.flags.insert(name, finalize(spec, &values)?);
    }

    // Defaults, implicit booleans, and required-ness.
    for spec in eff.iter() {
        if args.flags.contains_key(&spec.name) {
            continue;
        }
        if spec.required {
            return Err(BindError::MissingRequired {
                name: spec.name.clone(),
            });
        }
        if let Some(default) = &spec.default {
            args.flags
                .insert(spec.name.clone(), finalize(spec, std::slice::from_ref(default))?);
        } else if spec.kind == FlagKind::Bool {
            args.flags.insert(spec.name.clone(), FlagValue::Bool(false));
        }
    }

    bind_positionals(positionals, pos_tokens, trailing, &mut args)?;
    Ok(args)
}

fn resolve_long(
    eff: &EffectiveFlags,
    token: &str,
    name: &str,
    inline: Option<String>,
    iter: &mut std::iter::Peekable<std::slice::Iter<'_, String>>,
) -> std::result::Result<(String, String), BindError> {
    if let Some(spec) = eff.get(name) {
        if spec.kind == FlagKind::Bool {
            let value = match inline.as_deref() {
                None | Some("true") => "true",
                Some("false") => "false",
                Some(other) => {
                    return Err(BindError::BadBool {
                        name: name.to_string(),
                        value: other.to_string(),
                    });
                }
            };
            return Ok((spec.name.clone(), value.to_string()));
        }
        let value = match inline {
            Some(v) => v,
            None => next_value(iter).ok_or_else(|| BindError::MissingValue {
                name: name.to_string(),
            })?,
        };
        return Ok((spec.name.clone(), value));
    }

    // `--no-foo` negates a boolean `--foo`.
    if let Some(positive) = name.strip_prefix("no-")
        && let Some(spec) = eff.get(positive)
        && spec.kind == FlagKind::Bool
    {
        if let Some(value) = inline {
            return Err(BindError::BadBool {
                name: positive.to_string(),
                value,
            });
        }
        return Ok((spec.name.clone(), "false".to_string()));
    }

    Err(BindError::UnknownFlag {
        token: token.to_string(),
    })
}

fn parse_short(token: &str) -> Option<char> {
    let mut chars = token.strip_prefix('-')?.chars();
    let c = chars.next()?;
    (chars.next().is_none() && c.is_ascii_alphabetic()).then_some(c)
}

fn next_value(iter: &mut std::iter::Peekable<std::slice::Iter<'_, String>>) -> Option<String> {
    match iter.peek() {
        Some(next) if !next.starts_with("--") => iter.next().cloned(),
        _ => None,
    }
}

fn finalize(spec: &FlagSpec, values: &[String]) -> std::result::Result<FlagValue, BindError> {
    match spec.kind {
        FlagKind::Bool => {
            let last = values.last().expect("at least one occurrence");
            Ok(FlagValue::Bool(last == "true"))
        }
        FlagKind::Value => Ok(FlagValue::Value(
            values.last().expect("at least one occurrence").clone(),
        )),
        FlagKind::Choice => {
            let value = values.last().expect("at least one occurrence");
            let matched = spec
                .choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(value))
                .ok_or_else(|| BindError::BadChoice {
                    name: spec.name.clone(),
                    value: value.clone(),
                    choices: spec.choices.clone(),
                })?;
            Ok(FlagValue::Value(matched.clone()))
        }
        FlagKind::Repeated => {
            let items = values
                .iter()
                .flat_map(|v| v.split(','))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Ok(FlagValue::List(items))
        }
        FlagKind::Map => {
            let mut map = BTreeMap::new();
            for value in values {
                for entry in value.split(',').filter(|s| !s.is_empty()) {
                    let (k, v) = entry.split_once('=').ok_or_else(|| BindError::BadMapEntry {
                        name: spec.name.clone(),
                        entry: entry.to_string(),
                    })?;
                    map.insert(k.to_string(), v.to_string());
                }
            }
            Ok(FlagValue::Map(map))
        }
    }
}

fn bind_positionals(
    specs: &[PositionalSpec],
    tokens: Vec<String>,
    trailing: Vec<String>,
    args: &mut BoundArgs,
) -> std::result::Result<(), BindError> {
    let mut queue = tokens.into_iter();
    let mut trailing = Some(trailing);

    for spec in specs {
        match spec.arity {
            Arity::One => {
                let value = queue.next().ok_or_else(|| BindError::MissingPositional {
                    name: spec.name.clone(),
                })?;
                args.positionals.push(BoundPositional {
                    name: spec.name.clone(),
                    values: vec![value],
                });
            }
            Arity::Optional => {
                if let Some(value) = queue.next() {
                    args.positionals.push(BoundPositional {
                        name: spec.name.clone(),
                        values: vec![value],
                    });
                }
            }
            Arity::Variadic => {
                let mut values: Vec<String> = queue.by_ref().collect();
                values.extend(trailing.take().unwrap_or_default());
                args.positionals.push(BoundPositional {
                    name: spec.name.clone(),
                    values,
                });
            }
        }
    }

    if let Some(token) = queue.next() {
        return Err(BindError::ExtraPositional { token });
    }
    if let Some(rest) = trailing
        && let Some(token) = rest.into_iter().next()
    {
        return Err(BindError::ExtraPositional { token });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use trellis_manifest::parse_body;

    use super::*;

    fn eff_from(src: &str) -> EffectiveFlags {
        let body = parse_body(src, "test.toml").unwrap();
        let mut eff = EffectiveFlags::default();
        for spec in body.flags {
            eff.flags.insert(spec.name.clone(), spec);
        }
        eff
    }

    fn pos_from(src: &str) -> Vec<PositionalSpec> {
        parse_body(src, "test.toml").unwrap().positionals
    }

    fn tokens(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    const FLAGS: &str = r#"
        [[flags]]
        name = "name"
        kind = "value"
        required = true
        short = "n"

        [[flags]]
        name = "async"

        [[flags]]
        name = "labels"
        kind = "map"

        [[flags]]
        name = "zones"
        kind = "repeated"

        [[flags]]
        name = "format"
        kind = "choice"
        choices = ["table", "json", "yaml"]
        default = "table"
    "#;

    #[test]
    fn test_value_and_bool() {
        let eff = eff_from(FLAGS);
        let args = bind(&eff, &[], &tokens(&["--name=x", "--async"])).unwrap();
        assert_eq!(args.flags["name"], FlagValue::Value("x".into()));
        assert_eq!(args.flags["async"], FlagValue::Bool(true));
        // Choice default applied, unset bool defaults to false.
        assert_eq!(args.flags["format"], FlagValue::Value("table".into()));
    }

    #[test]
    fn test_separate_value_and_short() {
        let eff = eff_from(FLAGS);
        let args = bind(&eff, &[], &tokens(&["--name", "x"])).unwrap();
        assert_eq!(args.flags["name"], FlagValue::Value("x".into()));
        let args = bind(&eff, &[], &tokens(&["-n", "y"])).unwrap();
        assert_eq!(args.flags["name"], FlagValue::Value("y".into()));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let eff = eff_from(FLAGS);
        let args = bind(&eff, &[], &tokens(&["--name=a", "--name=b"])).unwrap();
        assert_eq!(args.flags["name"], FlagValue::Value("b".into()));
    }

    #[test]
    fn test_no_prefix_negates_bool() {
        let eff = eff_from(FLAGS);
        let args = bind(&eff, &[], &tokens(&["--name=x", "--async", "--no-async"])).unwrap();
        assert_eq!(args.flags["async"], FlagValue::Bool(false));
    }

    #[test]
    fn test_repeated_accumulates_and_splits() {
        let eff = eff_from(FLAGS);
        let args = bind(
            &eff,
            &[],
            &tokens(&["--name=x", "--zones=a,b", "--zones=c"]),
        )
        .unwrap();
        assert_eq!(
            args.flags["zones"],
            FlagValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_map_later_key_wins() {
        let eff = eff_from(FLAGS);
        let args = bind(
            &eff,
            &[],
            &tokens(&["--name=x", "--labels=env=dev,team=core", "--labels=env=prod"]),
        )
        .unwrap();
        let FlagValue::Map(map) = &args.flags["labels"] else {
            panic!("expected map");
        };
        assert_eq!(map["env"], "prod");
        assert_eq!(map["team"], "core");
    }

    #[test]
    fn test_bad_map_entry() {
        let eff = eff_from(FLAGS);
        let err = bind(&eff, &[], &tokens(&["--name=x", "--labels=oops"])).unwrap_err();
        assert!(matches!(err, BindError::BadMapEntry { .. }));
    }

    #[test]
    fn test_choice_case_insensitive_and_rejection() {
        let eff = eff_from(FLAGS);
        let args = bind(&eff, &[], &tokens(&["--name=x", "--format=JSON"])).unwrap();
        assert_eq!(args.flags["format"], FlagValue::Value("json".into()));

        let err = bind(&eff, &[], &tokens(&["--name=x", "--format=bogus"])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("table"));
        assert!(message.contains("json"));
        assert!(message.contains("yaml"));
    }

    #[test]
    fn test_missing_required() {
        let eff = eff_from(FLAGS);
        let err = bind(&eff, &[], &tokens(&["--async"])).unwrap_err();
        assert!(matches!(err, BindError::MissingRequired { name } if name == "name"));
    }

    #[test]
    fn test_unknown_flag() {
        let eff = eff_from(FLAGS);
        let err = bind(&eff, &[], &tokens(&["--name=x", "--bogus"])).unwrap_err();
        assert!(matches!(err, BindError::UnknownFlag { token } if token == "--bogus"));
    }

    #[test]
    fn test_positional_arities() {
        let specs = pos_from(
            r#"
            [[args]]
            name = "source"

            [[args]]
            name = "dest"
            arity = "optional"
            "#,
        );
        let eff = EffectiveFlags::default();

        let args = bind(&eff, &specs, &tokens(&["a", "b"])).unwrap();
        assert_eq!(args.positionals.len(), 2);
        assert_eq!(args.positionals[0].values, vec!["a"]);

        let args = bind(&eff, &specs, &tokens(&["a"])).unwrap();
        assert_eq!(args.positionals.len(), 1);

        let err = bind(&eff, &specs, &tokens(&[])).unwrap_err();
        assert!(matches!(err, BindError::MissingPositional { name } if name == "source"));

        let err = bind(&eff, &specs, &tokens(&["a", "b", "c"])).unwrap_err();
        assert!(matches!(err, BindError::ExtraPositional { token } if token == "c"));
    }

    #[test]
    fn test_double_dash_feeds_variadic() {
        let specs = pos_from(
            r#"
            [[args]]
            name = "cmd"
            arity = "variadic"
            "#,
        );
        let eff = eff_from("[[flags]]\nname = \"quiet\"\n");

        let args = bind(&eff, &specs, &tokens(&["--quiet", "--", "--not-a-flag", "x"])).unwrap();
        assert_eq!(args.flags["quiet"], FlagValue::Bool(true));
        assert_eq!(args.positionals[0].values, vec!["--not-a-flag", "x"]);
    }

    #[test]
    fn test_trailing_without_variadic_rejected() {
        let eff = EffectiveFlags::default();
        let err = bind(&eff, &[], &tokens(&["--", "x"])).unwrap_err();
        assert!(matches!(err, BindError::ExtraPositional { token } if token == "x"));
    }
}
