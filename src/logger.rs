//! Diagnostic logging.
//!
//! The reference crates never pull in `log`/`tracing` — they print plain,
//! gated diagnostics straight to stderr. This crate follows suit: a
//! `Logger` newtype around the `debug` option whose `log` method takes a
//! closure so building the message costs nothing when disabled.

pub struct Logger {
    debug: bool,
}

impl Logger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn log<F: FnOnce() -> String>(&self, message: F) {
        if self.debug {
            eprintln!("[furia] {}", message());
        }
    }
}
