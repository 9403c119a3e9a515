use std::fmt;

use crate::native::NativeError;

/// Result alias used throughout wndpump.
pub type PumpResult<T> = Result<T, PumpError>;

/// Everything that can go wrong while creating or pumping a window.
///
/// Native failures keep the subsystem diagnostic unmodified. Nothing is
/// retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpError {
    /// Window class registration failed.
    Registration(NativeError),
    /// Window creation failed.
    Creation(NativeError),
    /// The blocking retrieval call failed (not a clean queue closure).
    Retrieval(NativeError),
    /// Posting into a window queue failed.
    Post(NativeError),
    /// A pump is already running for this window.
    AlreadyRunning,
    /// The thread that owns the window is gone.
    AffinityLost,
    /// The configuration could not be loaded or parsed.
    Config(String),
}

impl fmt::Display for PumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration(e) => write!(f, "window class registration failed: {e}"),
            Self::Creation(e) => write!(f, "window creation failed: {e}"),
            Self::Retrieval(e) => write!(f, "message retrieval failed: {e}"),
            Self::Post(e) => write!(f, "posting message failed: {e}"),
            Self::AlreadyRunning => write!(f, "a message pump is already running for this window"),
            Self::AffinityLost => write!(f, "the window's owning thread has exited"),
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for PumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Registration(e) | Self::Creation(e) | Self::Retrieval(e) | Self::Post(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}
