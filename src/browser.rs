//! Overlay (in-app) browser client
//!
//! # Example
//!
//! ```no_run
//! use bevy_inbrowser::{Bridge, BrowserOptions, open_in_app_browser};
//!
//! # async fn run() -> bevy_inbrowser::Result<()> {
//! let bridge = Bridge::global();
//! let result = open_in_app_browser(
//!     &bridge,
//!     "https://example.com",
//!     BrowserOptions::default().on_url_change(|url| log::info!("now at {url}")),
//! )
//! .await?;
//! log::info!("browser closed via {}", result.kind);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt, select_biased};
use log::{debug, warn};

use crate::{Bridge, EventEmitter, NativeHost, Result, URL_CHANGE_EVENT};

/// How the overlay browser was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserResultType {
    /// The user pressed the close button
    Close,
    /// The user backed out with a system gesture or back action
    Dismiss,
}

impl BrowserResultType {
    /// Native string form
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserResultType::Close => "close",
            BrowserResultType::Dismiss => "dismiss",
        }
    }

    /// Parses the native string form
    ///
    /// Only `"close"` means close; anything else, or nothing, is a dismissal.
    pub fn from_native(kind: Option<&str>) -> Self {
        match kind {
            Some("close") => BrowserResultType::Close,
            _ => BrowserResultType::Dismiss,
        }
    }
}

impl fmt::Display for BrowserResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one overlay session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrowserResult {
    /// How the overlay was closed
    pub kind: BrowserResultType,
}

impl BrowserResult {
    /// Closed with the close button
    pub fn close() -> Self {
        Self {
            kind: BrowserResultType::Close,
        }
    }

    /// Dismissed by gesture or back action
    pub fn dismiss() -> Self {
        Self {
            kind: BrowserResultType::Dismiss,
        }
    }

    /// Builds a result from the native `type` field
    pub fn from_native(kind: Option<&str>) -> Self {
        Self {
            kind: BrowserResultType::from_native(kind),
        }
    }
}

/// Options record passed to the native open call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeBrowserOptions {
    /// Show or hide the close button
    pub show_close_button: bool,
}

impl Default for NativeBrowserOptions {
    fn default() -> Self {
        Self {
            show_close_button: true,
        }
    }
}

/// Options for opening the overlay browser
pub struct BrowserOptions {
    /// Show or hide the close button (default: true)
    ///
    /// iOS changes the dismiss button style; Android shows or hides the close
    /// button overlay.
    pub show_close_button: bool,
    on_url_change: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            show_close_button: true,
            on_url_change: None,
        }
    }
}

impl BrowserOptions {
    /// Sets close button visibility
    pub fn show_close_button(mut self, show: bool) -> Self {
        self.show_close_button = show;
        self
    }

    /// Called with each intermediate URL while the overlay is open
    ///
    /// The native host reports URLs from its own thread; the callback runs on
    /// the task awaiting [`InAppBrowser::open`], in navigation order, and never
    /// after that call has returned.
    pub fn on_url_change(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_url_change = Some(Box::new(callback));
        self
    }

    /// Splits the options into the native record and the out-of-band callback
    fn into_parts(self) -> (NativeBrowserOptions, Option<Box<dyn Fn(&str) + Send + Sync>>) {
        (
            NativeBrowserOptions {
                show_close_button: self.show_close_button,
            },
            self.on_url_change,
        )
    }
}

impl fmt::Debug for BrowserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserOptions")
            .field("show_close_button", &self.show_close_button)
            .field("on_url_change", &self.on_url_change.is_some())
            .finish()
    }
}

/// Client for the native overlay browser
#[derive(Debug, Clone)]
pub struct InAppBrowser {
    bridge: Bridge,
}

impl InAppBrowser {
    /// Creates a client; fails immediately if the native module is missing
    pub fn new(bridge: &Bridge) -> Result<Self> {
        bridge.ensure_linked()?;
        Ok(Self {
            bridge: bridge.clone(),
        })
    }

    /// Presents `url` and waits until the overlay closes
    ///
    /// Fails with [`crate::InBrowserError::BrowserBusy`] while another overlay opened
    /// through the same bridge is still showing. The URL-change listener, if
    /// any, is registered before the native call and released before this
    /// returns, on success and on failure alike.
    pub async fn open(&self, url: &str, options: BrowserOptions) -> Result<BrowserResult> {
        let host = self.bridge.host()?;
        let _session = self.bridge.begin_browser_session()?;
        open_with(host, self.bridge.emitter(), url, options).await
    }
}

async fn open_with(
    host: &dyn NativeHost,
    emitter: &EventEmitter,
    url: &str,
    options: BrowserOptions,
) -> Result<BrowserResult> {
    let (native_options, on_url_change) = options.into_parts();

    debug!("opening in-app browser at {url}");
    let outcome = match on_url_change {
        None => host.open_browser(url, native_options).await,
        Some(callback) => {
            let (sender, mut urls) = mpsc::unbounded::<String>();
            let mut subscription = emitter.add_listener(URL_CHANGE_EVENT, move |event| {
                let _ = sender.unbounded_send(event.url.clone());
            });

            let mut closed = host.open_browser(url, native_options).fuse();
            let outcome = loop {
                select_biased! {
                    url = urls.next() => {
                        if let Some(url) = url {
                            callback(&url);
                        }
                    }
                    outcome = closed => break outcome,
                }
            };

            subscription.remove();
            while let Ok(Some(url)) = urls.try_next() {
                callback(&url);
            }
            outcome
        }
    };

    match &outcome {
        Ok(result) => debug!("in-app browser closed: {}", result.kind),
        Err(err) => warn!("in-app browser failed to open {url}: {err}"),
    }
    outcome
}

/// Opens `url` in the overlay browser
///
/// Shorthand for [`InAppBrowser::new`] followed by [`InAppBrowser::open`].
pub async fn open_in_app_browser(
    bridge: &Bridge,
    url: &str,
    options: BrowserOptions,
) -> Result<BrowserResult> {
    InAppBrowser::new(bridge)?.open(url, options).await
}
