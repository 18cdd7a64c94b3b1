//! Error types for target sources.

use std::fmt;

/// Target source errors
///
/// Covers the three phases a target source goes through: configuration
/// (attaching to a factory, swapping), resolution (`get_target` /
/// `release_target`) and use after disposal. Failures of individual destroy
/// hooks during disposal never surface here; they are logged and swallowed.
///
/// # Examples
///
/// ```rust
/// use ferrous_targets::{DiError, ComponentRegistry, PrototypeTargetSource, TargetSpec};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let mut registry = ComponentRegistry::new();
/// registry.add_singleton("clock", Clock);
///
/// // Per-call semantics over a singleton-scoped component are refused
/// let result = PrototypeTargetSource::<Clock>::attach(TargetSpec::named("clock"), Arc::new(registry));
/// match result {
///     Err(DiError::SingletonScope(name)) => assert_eq!(name, "clock"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// No target name was configured before attaching to a factory
    MissingTargetName,
    /// A per-call strategy was requested for a singleton-scoped component
    SingletonScope(String),
    /// The component's type does not match the target source's type
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The factory has no component registered under this name
    NotFound(String),
    /// Attempt to swap a hot-swappable source to an absent target
    InvalidSwap,
    /// A configuration value failed validation
    InvalidConfig(String),
    /// The factory failed to create an instance
    CreationFailed { name: String, message: String },
    /// The pool is at its maximum size and the engine gave up waiting
    PoolExhausted { max_size: usize },
    /// The pool has been closed
    PoolClosed,
    /// An instance was released to a pool that never lent it
    ForeignInstance,
    /// The target source was used after disposal
    Disposed(&'static str),
}

impl DiError {
    /// Returns true for errors raised while wiring, before any target is resolved.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DiError::MissingTargetName
                | DiError::SingletonScope(_)
                | DiError::TypeMismatch { .. }
                | DiError::NotFound(_)
                | DiError::InvalidSwap
                | DiError::InvalidConfig(_)
        )
    }

    pub(crate) fn creation_failed(name: &str, message: impl fmt::Display) -> Self {
        DiError::CreationFailed {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::MissingTargetName => write!(f, "Property 'target_name' is required"),
            DiError::SingletonScope(name) => write!(
                f,
                "Cannot use per-call target source against singleton component '{}': \
                 instances would not be independent",
                name
            ),
            DiError::TypeMismatch { name, expected, found } => write!(
                f,
                "Type mismatch for '{}': expected {}, found {}",
                name, expected, found
            ),
            DiError::NotFound(name) => write!(f, "Component not found: {}", name),
            DiError::InvalidSwap => write!(f, "Cannot swap to an absent target"),
            DiError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            DiError::CreationFailed { name, message } => {
                write!(f, "Failed to create '{}': {}", name, message)
            }
            DiError::PoolExhausted { max_size } => {
                write!(f, "Pool exhausted: all {} instances are in use", max_size)
            }
            DiError::PoolClosed => write!(f, "Pool is closed"),
            DiError::ForeignInstance => {
                write!(f, "Released instance was not borrowed from this pool")
            }
            DiError::Disposed(kind) => write!(f, "{} has been disposed", kind),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for target source operations
pub type DiResult<T> = Result<T, DiError>;

/// Boxed error returned by user-supplied hooks (destroy hooks, fallible factories).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
