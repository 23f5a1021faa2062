//! Deferred definition loading.
//!
//! A [`LazyDef`] is created at tree-build time from one definition file:
//! the `[command]` header is parsed eagerly (the overlay and the
//! deprecation gate need it), while the flag and positional specs wait
//! behind a one-shot latch. Forcing is idempotent and thread-safe: under
//! concurrent forces exactly one thread performs the decode and every
//! caller observes the same result.

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use thiserror::Error;
use trellis_manifest::{DefBody, DefKind, DefMeta, parse_body, parse_meta};

/// A defect found while forcing a definition.
///
/// The rich span diagnostic is rendered to a string when first observed so
/// the latch can hand the same error to every waiter.
#[derive(Debug, Clone, Error)]
#[error("invalid definition '{path}': {message}")]
pub struct ForceError {
    pub path: PathBuf,
    pub message: String,
}

/// A definition with its heavy half deferred.
#[derive(Debug)]
pub struct LazyDef {
    path: PathBuf,
    src: String,
    meta: DefMeta,
    body: OnceLock<std::result::Result<DefBody, ForceError>>,
}

impl LazyDef {
    /// Read a definition file and parse its header.
    ///
    /// The file is read exactly once; forcing later decodes the stored
    /// source instead of touching the file system again.
    pub fn from_file(path: &Path, kind: DefKind) -> trellis_manifest::Result<Self> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| trellis_manifest::Error::io(path, e))?;
        let meta = parse_meta(&src, &path.display().to_string(), kind)?;
        Ok(Self {
            path: path.to_path_buf(),
            src,
            meta,
            body: OnceLock::new(),
        })
    }

    /// Build a definition from an in-memory source (tests, synthetic hosts).
    pub fn from_source(
        name: impl Into<PathBuf>,
        src: impl Into<String>,
        kind: DefKind,
    ) -> trellis_manifest::Result<Self> {
        let path = name.into();
        let src = src.into();
        let meta = parse_meta(&src, &path.display().to_string(), kind)?;
        Ok(Self {
            path,
            src,
            meta,
            body: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &DefMeta {
        &self.meta
    }

    /// Whether the heavy decode has already run.
    pub fn is_forced(&self) -> bool {
        self.body.get().is_some()
    }

    /// Force the deferred decode, memoizing the outcome.
    ///
    /// Defective definitions are memoized too: every force of a bad
    /// definition reports the same error.
    pub fn force(&self) -> std::result::Result<&DefBody, ForceError> {
        let result = self.body.get_or_init(|| {
            parse_body(&self.src, &self.path.display().to_string()).map_err(|e| ForceError {
                path: self.path.clone(),
                message: render(&e),
            })
        });
        match result {
            Ok(body) => Ok(body),
            Err(e) => Err(e.clone()),
        }
    }
}

fn render(error: &trellis_manifest::Error) -> String {
    use std::error::Error as _;
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
