//! Embedded web view and in-app browser support for Bevy Engine
//!
//! This crate exposes two native capabilities of iOS and Android hosts to Rust:
//! a web view embedded in the app's own UI, and an overlay browser presented on
//! top of it. The rendering itself lives in the native host; this crate only
//! forwards properties and commands to it and relays its events back.
//!
//! # Architecture
//!
//! - **NativeHost**: the boundary with Swift/Objective-C or Java
//! - **Bridge**: the linked (or unlinked) native module, shared by everything else
//! - **WebView**: adapter forwarding the URL and events of one native view
//! - **InAppBrowser**: opens the overlay and resolves once with how it was closed
//! - **InBrowserPlugin**: pumps native view events into a Bevy app

#![warn(missing_docs)]

mod browser;
mod command;
mod emitter;
mod error;
mod events;
mod handle;
mod host;
mod platform;
mod plugin;
mod view;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

pub use browser::*;
pub use command::*;
pub use emitter::*;
pub use error::*;
pub use events::*;
pub use handle::*;
pub use host::{Bridge, NativeHost};
pub use platform::*;
pub use plugin::*;
pub use view::*;

#[cfg(target_os = "ios")]
pub use ios::*;

#[cfg(target_os = "android")]
pub use android::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        browser::{BrowserOptions, BrowserResult, BrowserResultType, InAppBrowser, open_in_app_browser},
        error::{InBrowserError, Result},
        events::{ErrorEvent, LoadEvent, NavigationEvent, WebViewEvent},
        handle::ViewTag,
        host::{Bridge, NativeHost},
        plugin::{InBrowser, InBrowserPlugin, WebViewMessage, WebViews},
        view::{WebView, WebViewProps, WebViewRef},
    };
}
