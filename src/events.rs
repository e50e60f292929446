//! Event payloads delivered by the native host

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::ViewTag;

/// Emitted when a load starts or the URL changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    /// The URL navigated to
    pub url: String,
}

impl NavigationEvent {
    /// Creates a navigation event for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Emitted when a load completes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadEvent {
    /// The loaded URL
    pub url: String,
    /// Document title, if the host reported one
    pub title: Option<String>,
    /// Whether back navigation was possible when the load finished
    pub can_go_back: Option<bool>,
    /// Whether forward navigation was possible when the load finished
    pub can_go_forward: Option<bool>,
}

/// Emitted when a load fails
///
/// `code` is the platform's own error code and is not comparable across platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// The URL that failed to load
    pub url: String,
    /// Native error code
    pub code: i32,
    /// Native error description
    pub description: String,
}

/// One event emitted by a native web view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebViewEvent {
    /// `onLoadStart`
    LoadStart(NavigationEvent),
    /// `onLoadEnd`
    LoadEnd(LoadEvent),
    /// `onLoadError`
    LoadError(ErrorEvent),
    /// `onUrlChange`
    UrlChange(NavigationEvent),
}

impl WebViewEvent {
    /// Native event name
    pub fn name(&self) -> &'static str {
        match self {
            WebViewEvent::LoadStart(_) => "onLoadStart",
            WebViewEvent::LoadEnd(_) => "onLoadEnd",
            WebViewEvent::LoadError(_) => "onLoadError",
            WebViewEvent::UrlChange(_) => "onUrlChange",
        }
    }

    /// URL the event refers to
    pub fn url(&self) -> &str {
        match self {
            WebViewEvent::LoadStart(event) | WebViewEvent::UrlChange(event) => &event.url,
            WebViewEvent::LoadEnd(event) => &event.url,
            WebViewEvent::LoadError(event) => &event.url,
        }
    }
}

/// Queue carrying view events from native threads to the application thread
///
/// Native callbacks may arrive on any thread; the application drains the queue
/// from its own thread, which keeps handler invocation single-threaded.
#[derive(Clone)]
pub struct ViewEventChannel {
    sender: Sender<(ViewTag, WebViewEvent)>,
    receiver: Receiver<(ViewTag, WebViewEvent)>,
}

impl Default for ViewEventChannel {
    fn default() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }
}

impl ViewEventChannel {
    /// Creates an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event for the view with `tag`
    pub fn send(&self, tag: ViewTag, event: WebViewEvent) {
        let _ = self.sender.send((tag, event));
    }

    /// Takes the next pending event (non-blocking)
    pub fn receive(&self) -> Option<(ViewTag, WebViewEvent)> {
        self.receiver.try_recv().ok()
    }

    /// Takes every pending event in arrival order
    pub fn drain(&self) -> Vec<(ViewTag, WebViewEvent)> {
        self.receiver.try_iter().collect()
    }

    /// Get a clone of the sender for use in FFI
    pub fn get_sender(&self) -> Sender<(ViewTag, WebViewEvent)> {
        self.sender.clone()
    }
}
