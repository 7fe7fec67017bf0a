//! Error types for bridge operations.
//!
//! Only caller errors and collaborator failures are errors. Script
//! exceptions are not: they are diagnosed and turned into the operation's
//! failure value.

use crate::handle::{ProxyHandle, RawHandle};
use crate::managed::ManagedRef;
use ferry_diagnostics::ScriptException;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("handle is zero but the operation requires a live proxy")]
    NullHandle,

    #[error("handle {0:#x} does not refer to a live proxy")]
    StaleHandle(RawHandle),

    #[error("managed object {0} is already bound to proxy {1}")]
    AlreadyBound(ManagedRef, ProxyHandle),

    #[error("managed object {0} did not convert to a script object")]
    NotAnObject(ManagedRef),

    #[error("value conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Failure inside the value-marshaling layer.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("value nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("value has more than {0} elements")]
    TooLarge(usize),

    #[error("script exception while converting: {0}")]
    Script(ScriptException),
}
