//! Error types for the scripting bridge

use rhai::{EvalAltResult, ParseError};
use thiserror::Error;

/// Errors surfaced by the bridge components.
///
/// Import and path-resolution failures are normally reported through the
/// [`ScriptLogger`](crate::logging::ScriptLogger) sink instead of being
/// returned to scripts; this type is what host-side callers see.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script '{script}' failed to compile: {message}")]
    Compile { script: String, message: String },

    #[error("script '{script}' failed: {message}")]
    Runtime { script: String, message: String },

    #[error("module '{module}' failed to import: {message}")]
    Import { module: String, message: String },

    #[error("{type_name}.{member}: {message}")]
    HostCall {
        type_name: String,
        member: String,
        message: String,
    },

    #[error("unknown host type '{name}'")]
    UnknownType { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    /// Compile error with the rhai position rendered `script:line:col - msg`.
    pub fn compile(script: &str, err: ParseError) -> Self {
        let position = err.position();
        Self::Compile {
            script: script.to_string(),
            message: format!(
                "{}:{} - {}",
                position.line().unwrap_or(0),
                position.position().unwrap_or(0),
                err
            ),
        }
    }

    /// Runtime error with the rhai position rendered `script:line:col - msg`.
    pub fn runtime(script: &str, err: Box<EvalAltResult>) -> Self {
        let position = err.position();
        Self::Runtime {
            script: script.to_string(),
            message: format!(
                "{}:{} - {}",
                position.line().unwrap_or(0),
                position.position().unwrap_or(0),
                err
            ),
        }
    }

    /// Import failure for a named module.
    pub fn import(module: &str, message: impl Into<String>) -> Self {
        Self::Import {
            module: module.to_string(),
            message: message.into(),
        }
    }

    /// Failure inside a host object member invocation.
    pub fn host_call(type_name: &str, member: &str, message: impl Into<String>) -> Self {
        Self::HostCall {
            type_name: type_name.to_string(),
            member: member.to_string(),
            message: message.into(),
        }
    }
}
