//! Error types shared by the reactive engine and the reconciler.

use thiserror::Error;

/// Errors produced by the Sprig runtime.
#[derive(Debug, Error)]
pub enum SprigError {
    /// A write was attempted on a tracked object that has been frozen.
    #[error("cannot assign to key `{key}`: target object is frozen")]
    FrozenTarget { key: String },

    /// Two siblings in one child list share a key.
    #[error("duplicate key `{key}` among siblings of the same child list")]
    DuplicateKey { key: String },

    /// A computed value read itself before it ever produced a value.
    #[error("computed value read itself during its first evaluation")]
    ComputedCycle,

    /// The scheduler kept re-queueing jobs past the configured drain limit.
    #[error("scheduler still had pending jobs after {passes} flush passes")]
    SchedulerOverflow { passes: usize },

    /// A component's render function failed.
    #[error("render of component `{component}` failed: {message}")]
    Render { component: String, message: String },

    /// A node was expected to be realized in the host but has no handle.
    #[error("node has no host handle; was it mounted?")]
    MissingHandle,

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl SprigError {
    /// Build a render failure for the given component.
    pub fn render(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SprigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_key() {
        let err = SprigError::DuplicateKey { key: "row-3".into() };
        assert!(err.to_string().contains("row-3"));

        let err = SprigError::FrozenTarget { key: "title".into() };
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn config_errors_convert() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: SprigError = parse.into();
        assert!(matches!(err, SprigError::InvalidConfig(_)));
    }
}
