//! The host-supplied context handed to run hooks.
//!
//! The core forwards this object without inspecting it, with one
//! exception: deprecation warnings and binder lints go to the diagnostic
//! channel.

use std::{
    any::Any,
    collections::BTreeMap,
    io::Write,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

/// Shared in-memory sink for capturing channel output in tests and
/// inspector hosts.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("buffer lock")).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Opaque host context: channels, properties, credentials, logging, and a
/// cancellation flag.
pub struct HostContext {
    diag: Box<dyn Write + Send>,
    output: Box<dyn Write + Send>,
    properties: BTreeMap<String, String>,
    credentials: Option<Box<dyn Any + Send>>,
    log: Option<Box<dyn FnMut(&str) + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HostContext {
    /// Context wired to the process stderr/stdout.
    pub fn new() -> Self {
        Self {
            diag: Box::new(std::io::stderr()),
            output: Box::new(std::io::stdout()),
            properties: BTreeMap::new(),
            credentials: None,
            log: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context writing both channels to capturable buffers.
    pub fn capture() -> (Self, SharedBuf, SharedBuf) {
        let diag = SharedBuf::new();
        let output = SharedBuf::new();
        let ctx = Self::new()
            .with_diag(Box::new(diag.clone()))
            .with_output(Box::new(output.clone()));
        (ctx, diag, output)
    }

    pub fn with_diag(mut self, diag: Box<dyn Write + Send>) -> Self {
        self.diag = diag;
        self
    }

    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Box<dyn Any + Send>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_log(mut self, log: Box<dyn FnMut(&str) + Send>) -> Self {
        self.log = Some(log);
        self
    }

    /// Diagnostic channel (warnings, errors).
    pub fn diag(&mut self) -> &mut dyn Write {
        self.diag.as_mut()
    }

    /// Standard output channel.
    pub fn out(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn credentials(&self) -> Option<&(dyn Any + Send)> {
        self.credentials.as_deref()
    }

    /// Forward a line to the structured-logging sink, if any.
    pub fn log(&mut self, line: &str) {
        if let Some(log) = &mut self.log {
            log(line);
        }
    }

    /// Emit one warning line to the diagnostic channel.
    pub fn warn(&mut self, message: &str) {
        let _ = writeln!(self.diag, "WARNING: {}", message);
    }

    /// Handle the host can signal cancellation through.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
