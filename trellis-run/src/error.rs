//! Dispatch error taxonomy and exit codes.

use thiserror::Error;

use crate::hook::RunError;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A definition file failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A leaf names a hook symbol the host never registered.
    #[error("`{path}` names unregistered hook `{symbol}`")]
    UnknownHook { path: String, symbol: String },

    /// The command line does not match the resolved command's surface.
    #[error("{message}")]
    Usage { message: String },

    /// No command exists at the requested path.
    #[error("unknown command: {path}")]
    NotFound { path: String },

    /// The command's removal version has been reached.
    #[error("`{path}` has been removed{}", replacement_note(.replacement.as_deref()))]
    Removed {
        path: String,
        replacement: Option<String>,
    },

    /// The host signalled cancellation before the hook ran.
    #[error("`{path}` was cancelled")]
    Cancelled { path: String },

    /// The run hook itself failed.
    #[error("`{path}` failed")]
    Run {
        path: String,
        #[source]
        source: RunError,
    },
}

fn replacement_note(replacement: Option<&str>) -> String {
    match replacement {
        Some(r) => format!(". Use `{}` instead", r),
        None => String::new(),
    }
}

impl DispatchError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::UnknownHook { .. } | Self::Cancelled { .. } | Self::Run { .. } => 1,
            Self::Usage { .. } | Self::NotFound { .. } => 2,
            Self::Removed { .. } => 3,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

impl From<trellis_tree::TreeError> for DispatchError {
    fn from(err: trellis_tree::TreeError) -> Self {
        match err {
            trellis_tree::TreeError::NotFound { path } => Self::NotFound { path },
            other => Self::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DispatchError::usage("bad flag").exit_code(), 2);
        assert_eq!(
            DispatchError::NotFound {
                path: "foo baz".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            DispatchError::Removed {
                path: "foo old".into(),
                replacement: None
            }
            .exit_code(),
            3
        );
        assert_eq!(
            DispatchError::Cancelled {
                path: "foo bar".into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_removed_message_cites_replacement() {
        let err = DispatchError::Removed {
            path: "foo old".into(),
            replacement: Some("foo new".into()),
        };
        assert_eq!(err.to_string(), "`foo old` has been removed. Use `foo new` instead");
    }
}
