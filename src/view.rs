//! Embedded web view adapter
//!
//! A [`WebView`] stands in for one native web view: it forwards the `url`
//! property to the host, relays native events to the application's handlers
//! and hands out [`WebViewRef`] objects for imperative navigation.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::{
    Bridge, ErrorEvent, LoadEvent, NavigationEvent, Result, ViewSlot, ViewTag, WebViewCommand,
    WebViewEvent,
};

/// Application callback for one event kind
pub type EventHandler<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Declarative inputs of a web view
#[derive(Default)]
pub struct WebViewProps {
    /// Target URL; changing it triggers a native navigation
    pub url: String,
    on_load_start: Option<EventHandler<NavigationEvent>>,
    on_load_end: Option<EventHandler<LoadEvent>>,
    on_load_error: Option<EventHandler<ErrorEvent>>,
    on_url_change: Option<EventHandler<NavigationEvent>>,
}

impl WebViewProps {
    /// Props pointing at `url`, with no handlers
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Called when a load starts
    pub fn on_load_start(mut self, handler: impl Fn(&NavigationEvent) + Send + Sync + 'static) -> Self {
        self.on_load_start = Some(Box::new(handler));
        self
    }

    /// Called when a load finishes
    pub fn on_load_end(mut self, handler: impl Fn(&LoadEvent) + Send + Sync + 'static) -> Self {
        self.on_load_end = Some(Box::new(handler));
        self
    }

    /// Called when a load fails
    pub fn on_load_error(mut self, handler: impl Fn(&ErrorEvent) + Send + Sync + 'static) -> Self {
        self.on_load_error = Some(Box::new(handler));
        self
    }

    /// Called when the URL changes
    pub fn on_url_change(mut self, handler: impl Fn(&NavigationEvent) + Send + Sync + 'static) -> Self {
        self.on_url_change = Some(Box::new(handler));
        self
    }
}

impl fmt::Debug for WebViewProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebViewProps")
            .field("url", &self.url)
            .field("on_load_start", &self.on_load_start.is_some())
            .field("on_load_end", &self.on_load_end.is_some())
            .field("on_load_error", &self.on_load_error.is_some())
            .field("on_url_change", &self.on_url_change.is_some())
            .finish()
    }
}

/// Adapter around one native web view
pub struct WebView {
    bridge: Bridge,
    props: WebViewProps,
    slot: ViewSlot,
    forwarded_url: Option<String>,
}

impl WebView {
    /// Creates the adapter
    ///
    /// Fails with [`crate::InBrowserError::NotLinked`] when the bridge has no host.
    pub fn new(bridge: &Bridge, props: WebViewProps) -> Result<Self> {
        bridge.ensure_linked()?;
        Ok(Self {
            bridge: bridge.clone(),
            props,
            slot: ViewSlot::new(),
            forwarded_url: None,
        })
    }

    /// Current target URL
    pub fn url(&self) -> &str {
        &self.props.url
    }

    /// Tag of the mounted native view
    pub fn tag(&self) -> Option<ViewTag> {
        self.slot.resolve().tag()
    }

    /// Handle for imperative navigation
    ///
    /// The handle may be taken at any time; it acts on whichever native view
    /// is mounted when it is used.
    pub fn handle(&self) -> WebViewRef {
        WebViewRef {
            bridge: self.bridge.clone(),
            slot: self.slot.clone(),
        }
    }

    /// Binds the adapter to the native view with `tag` and forwards the URL
    pub fn mount(&mut self, tag: ViewTag) {
        if let Some(previous) = self.slot.mount(tag) {
            debug!("web view remounted from {previous} to {tag}");
        }
        self.forwarded_url = None;
        self.forward_url();
    }

    /// Releases the native view; safe to call repeatedly
    pub fn unmount(&mut self) -> Option<ViewTag> {
        self.forwarded_url = None;
        self.slot.unmount()
    }

    /// Changes the target URL
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.props.url = url.into();
        self.forward_url();
    }

    /// Replaces every prop at once, as a re-render would
    pub fn set_props(&mut self, props: WebViewProps) {
        self.props = props;
        self.forward_url();
    }

    fn forward_url(&mut self) {
        let Some(tag) = self.tag() else {
            return;
        };
        if self.props.url.is_empty() || self.forwarded_url.as_deref() == Some(self.props.url.as_str()) {
            return;
        }
        let Ok(host) = self.bridge.host() else {
            return;
        };

        host.set_view_url(tag, &self.props.url);
        self.forwarded_url = Some(self.props.url.clone());
    }

    /// Relays a native event to the matching handler
    pub fn handle_event(&self, event: &WebViewEvent) {
        match event {
            WebViewEvent::LoadStart(e) => call(&self.props.on_load_start, e),
            WebViewEvent::LoadEnd(e) => call(&self.props.on_load_end, e),
            WebViewEvent::LoadError(e) => call(&self.props.on_load_error, e),
            WebViewEvent::UrlChange(e) => call(&self.props.on_url_change, e),
        }
    }
}

fn call<E>(handler: &Option<EventHandler<E>>, event: &E) {
    if let Some(handler) = handler {
        handler(event);
    }
}

impl Drop for WebView {
    fn drop(&mut self) {
        self.slot.unmount();
    }
}

impl fmt::Debug for WebView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebView")
            .field("props", &self.props)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Imperative operations on a web view
///
/// Every method is a silent no-op while the view is not mounted.
#[derive(Clone, Debug)]
pub struct WebViewRef {
    bridge: Bridge,
    slot: ViewSlot,
}

impl WebViewRef {
    /// Go back to the previous page
    pub fn go_back(&self) {
        self.send(WebViewCommand::GoBack);
    }

    /// Go forward to the next page
    pub fn go_forward(&self) {
        self.send(WebViewCommand::GoForward);
    }

    /// Reload the current page
    pub fn reload(&self) {
        self.send(WebViewCommand::Reload);
    }

    /// Stop loading the current page
    pub fn stop_loading(&self) {
        self.send(WebViewCommand::StopLoading);
    }

    /// Whether a native view is currently mounted
    pub fn is_mounted(&self) -> bool {
        self.slot.resolve().is_live()
    }

    fn send(&self, command: WebViewCommand) {
        self.bridge.dispatch(self.slot.resolve(), command);
    }
}

/// Mounted web views, keyed by native tag
#[derive(Default)]
pub struct WebViewRegistry {
    views: HashMap<ViewTag, WebView>,
}

impl WebViewRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `view` under `tag`
    ///
    /// A view previously mounted under the same tag is unmounted and returned.
    pub fn mount(&mut self, tag: ViewTag, mut view: WebView) -> Option<WebView> {
        view.mount(tag);
        let mut previous = self.views.insert(tag, view)?;
        previous.unmount();
        Some(previous)
    }

    /// Unmounts and returns the view under `tag`
    pub fn unmount(&mut self, tag: ViewTag) -> Option<WebView> {
        let mut view = self.views.remove(&tag)?;
        view.unmount();
        debug!("web view {tag} unmounted");
        Some(view)
    }

    /// Unmounts every view. Used during shutdown.
    pub fn unmount_all(&mut self) {
        let tags: Vec<_> = self.views.keys().copied().collect();
        for tag in tags {
            self.unmount(tag);
        }
    }

    /// View mounted under `tag`
    pub fn get(&self, tag: ViewTag) -> Option<&WebView> {
        self.views.get(&tag)
    }

    /// Mutable view mounted under `tag`
    pub fn get_mut(&mut self, tag: ViewTag) -> Option<&mut WebView> {
        self.views.get_mut(&tag)
    }

    /// Tags of all mounted views
    pub fn tags(&self) -> Vec<ViewTag> {
        self.views.keys().copied().collect()
    }

    /// How many views are mounted
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether no view is mounted
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Delivers one event; returns `false` if no view has that tag
    pub fn route(&self, tag: ViewTag, event: &WebViewEvent) -> bool {
        match self.views.get(&tag) {
            Some(view) => {
                view.handle_event(event);
                true
            }
            None => {
                debug!("{} for unknown web view {tag} dropped", event.name());
                false
            }
        }
    }

    /// Drains the bridge's pending view events and routes them
    ///
    /// Returns every drained event, routed or not, in arrival order.
    pub fn pump(&self, bridge: &Bridge) -> Vec<(ViewTag, WebViewEvent)> {
        let events = bridge.view_events().drain();
        for (tag, event) in &events {
            self.route(*tag, event);
        }
        events
    }
}

impl fmt::Debug for WebViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebViewRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
