//! Error taxonomy for the native bridge

use thiserror::Error;

/// Message reported by every entry point when the native module is not linked into the host app
#[cfg(target_os = "ios")]
pub const LINKING_ERROR: &str = "The package 'bevy_inbrowser' doesn't seem to be linked. Make sure: \n\n\
    - Run 'pod install' in the ios directory\n\
    - You rebuilt the app after installing the package\n\
    - You are not using a prebuilt container app\n";

/// Message reported by every entry point when the native module is not linked into the host app
#[cfg(not(target_os = "ios"))]
pub const LINKING_ERROR: &str = "The package 'bevy_inbrowser' doesn't seem to be linked. Make sure: \n\n\
    - You rebuilt the app after installing the package\n\
    - You are not using a prebuilt container app\n";

/// Errors surfaced to the application layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InBrowserError {
    /// The native module is absent at runtime
    #[error("{}", LINKING_ERROR)]
    NotLinked,

    /// The native host refused to present the overlay browser
    #[error("native host rejected open request ({code}): {message}")]
    OpenRejected {
        /// Host-defined rejection code, e.g. `NO_ACTIVITY`
        code: String,
        /// Human readable reason from the host
        message: String,
    },

    /// The native host dropped the request without reporting a terminal result
    #[error("native host went away before the browser reported a result")]
    HostGone,

    /// An overlay browser is already open through this bridge
    #[error("an in-app browser is already open")]
    BrowserBusy,
}

impl InBrowserError {
    /// Shorthand for [`InBrowserError::OpenRejected`]
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenRejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, InBrowserError>;
