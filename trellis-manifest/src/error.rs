use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for definition-file operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting.
///
/// Encapsulates the definition source and filename so error factories do
/// not need both threaded through every call.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Create a NamedSource for miette error reporting.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    /// Create a parse error from a toml error.
    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            src: self.named_source(),
            span,
            source,
        })
    }

    /// Create a validation error without a span.
    pub fn validation_error(&self, message: impl Into<String>) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span: None,
            message: message.into(),
        })
    }

    /// Create a validation error with a span.
    pub fn validation_error_at(
        &self,
        message: impl Into<String>,
        span: impl Into<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span: Some(span.into()),
            message: message.into(),
        })
    }

    pub fn unknown_track(&self, track: impl Into<String>, span: impl Into<SourceSpan>) -> Box<Error> {
        Box::new(Error::UnknownTrack {
            src: self.named_source(),
            span: span.into(),
            track: track.into(),
        })
    }

    pub fn malformed_version(
        &self,
        value: impl Into<String>,
        span: impl Into<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::MalformedVersion {
            src: self.named_source(),
            span: span.into(),
            value: value.into(),
        })
    }

    pub fn duplicate_name(
        &self,
        name: impl Into<String>,
        context: impl Into<String>,
        span: impl Into<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::DuplicateName {
            src: self.named_source(),
            span: span.into(),
            name: name.into(),
            context: context.into(),
        })
    }

    pub fn invalid_name(
        &self,
        name: impl Into<String>,
        context: impl Into<String>,
        reason: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::InvalidName {
            src: self.named_source(),
            span,
            name: name.into(),
            context: context.into(),
            reason: reason.into(),
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("definition root '{path}' does not exist or is not a directory")]
    #[diagnostic(help("pass the directory that holds your command definitions"))]
    MissingRoot { path: PathBuf },

    #[error("failed to parse command definition")]
    #[diagnostic(code(trellis::parse_error))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(trellis::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("unknown release track '{track}'")]
    #[diagnostic(
        code(trellis::unknown_track),
        help("valid tracks are: ga, beta, alpha")
    )]
    UnknownTrack {
        #[source_code]
        src: NamedSource<String>,
        #[label("unknown track")]
        span: SourceSpan,
        track: String,
    },

    #[error("malformed version '{value}'")]
    #[diagnostic(code(trellis::malformed_version), help("expected 'X.Y.Z'"))]
    MalformedVersion {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a version")]
        span: SourceSpan,
        value: String,
    },

    #[error("leaf definition '{path}' declares no run hook")]
    #[diagnostic(
        code(trellis::hook_missing),
        help("add `hook = \"<symbol>\"` to the [command] table")
    )]
    HookMissing { path: PathBuf },

    #[error("group definition declares a run hook")]
    #[diagnostic(
        code(trellis::hook_forbidden),
        help("only leaf commands may declare a hook; groups exist to contain children")
    )]
    HookForbidden {
        #[source_code]
        src: NamedSource<String>,
        #[label("hook declared here")]
        span: SourceSpan,
    },

    #[error("duplicate short flag '-{short}'")]
    #[diagnostic(
        code(trellis::duplicate_flag),
        help("choose a different short flag for '{second_flag}'")
    )]
    DuplicateShortFlag {
        #[source_code]
        src: NamedSource<String>,
        #[label("first used here by '{first_flag}'")]
        first_span: SourceSpan,
        #[label("conflicts with first usage")]
        second_span: SourceSpan,
        short: char,
        first_flag: String,
        second_flag: String,
    },

    #[error("duplicate {context} '{name}'")]
    #[diagnostic(code(trellis::duplicate_name))]
    DuplicateName {
        #[source_code]
        src: NamedSource<String>,
        #[label("already declared")]
        span: SourceSpan,
        name: String,
        context: String,
    },

    #[error("invalid {context} name '{name}'")]
    #[diagnostic(help(
        "{reason}. Use letters, numbers, underscores, and single dashes, starting with a letter."
    ))]
    InvalidName {
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid name")]
        span: Option<SourceSpan>,
        name: String,
        context: String,
        reason: String,
    },

    #[error("invalid command name '{name}' at '{path}'")]
    #[diagnostic(help("{reason}"))]
    InvalidFileName {
        path: PathBuf,
        name: String,
        reason: String,
    },

    #[error("'{command}' is defined more than once for track '{track}'")]
    #[diagnostic(
        code(trellis::duplicate_variant),
        help("an already-overlaid node cannot be redefined; later roots may only add siblings or deeper descendants")
    )]
    DuplicateVariant {
        command: String,
        track: String,
        file: PathBuf,
    },

    #[error("'{command}' is defined as both a group and a leaf")]
    #[diagnostic(code(trellis::kind_conflict))]
    KindConflict { command: String, file: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Box<Self> {
        Box::new(Error::Io {
            path: path.into(),
            source,
        })
    }
}
