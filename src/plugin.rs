//! Bevy plugin wiring the bridge into an app

use std::ops::{Deref, DerefMut};

use bevy::{
    app::{App, Plugin, PreUpdate},
    ecs::{
        message::{Message, MessageWriter},
        resource::Resource,
        system::Res,
    },
};
use log::error;

use crate::{Bridge, InBrowserError, ViewTag, WebViewEvent, WebViewRegistry};

/// Plugin that exposes the native web view and overlay browser to Bevy
///
/// # Example
///
/// ```no_run
/// use bevy::app::App;
/// use bevy_inbrowser::InBrowserPlugin;
///
/// fn main() {
///     App::new().add_plugins(InBrowserPlugin::default()).run();
/// }
/// ```
#[derive(Default)]
pub struct InBrowserPlugin {
    bridge: Option<Bridge>,
}

impl InBrowserPlugin {
    /// Uses `bridge` instead of the process-wide one
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge: Some(bridge),
        }
    }
}

impl Plugin for InBrowserPlugin {
    fn name(&self) -> &str {
        "bevy_inbrowser::InBrowserPlugin"
    }

    fn build(&self, app: &mut App) {
        let bridge = self.bridge.clone().unwrap_or_else(Bridge::global);
        if !bridge.is_linked() {
            error!("{}", InBrowserError::NotLinked);
        }

        app.insert_resource(InBrowser(bridge))
            .init_resource::<WebViews>()
            .add_message::<WebViewMessage>()
            .add_systems(PreUpdate, pump_web_view_events);
    }
}

/// The bridge the app talks to the native host through
#[derive(Resource, Clone, Debug)]
pub struct InBrowser(pub Bridge);

impl Deref for InBrowser {
    type Target = Bridge;

    fn deref(&self) -> &Bridge {
        &self.0
    }
}

/// Web views mounted in this app
#[derive(Resource, Default, Debug)]
pub struct WebViews(pub WebViewRegistry);

impl Deref for WebViews {
    type Target = WebViewRegistry;

    fn deref(&self) -> &WebViewRegistry {
        &self.0
    }
}

impl DerefMut for WebViews {
    fn deref_mut(&mut self) -> &mut WebViewRegistry {
        &mut self.0
    }
}

/// A native web view event, mirrored for systems that prefer messages over handlers
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct WebViewMessage {
    /// Tag of the view that emitted the event
    pub tag: ViewTag,
    /// The event
    pub event: WebViewEvent,
}

/// Drains native view events, runs the mounted views' handlers and mirrors each event as a message
fn pump_web_view_events(
    bridge: Res<InBrowser>,
    views: Res<WebViews>,
    mut writer: MessageWriter<WebViewMessage>,
) {
    for (tag, event) in views.pump(&bridge) {
        writer.write(WebViewMessage { tag, event });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bevy::ecs::message::Messages;

    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::{NavigationEvent, WebView, WebViewProps};

    #[test]
    fn pump_runs_handlers_and_writes_messages() {
        let bridge = RecordingHost::android().into_bridge();
        let mut app = App::new();
        app.add_plugins(InBrowserPlugin::new(bridge.clone()));

        let urls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&urls);
        let props = WebViewProps::new("https://example.com")
            .on_load_start(move |e| sink.lock().unwrap().push(e.url.clone()));
        app.world_mut()
            .resource_mut::<WebViews>()
            .mount(ViewTag(1), WebView::new(&bridge, props).unwrap());

        let event = WebViewEvent::LoadStart(NavigationEvent::new("https://example.com"));
        bridge.view_events().send(ViewTag(1), event.clone());
        app.update();

        let messages: Vec<_> = app
            .world_mut()
            .resource_mut::<Messages<WebViewMessage>>()
            .drain()
            .collect();
        assert_eq!(messages, vec![WebViewMessage { tag: ViewTag(1), event }]);
        assert_eq!(*urls.lock().unwrap(), ["https://example.com"]);
    }

    #[test]
    fn events_for_unmounted_views_still_become_messages() {
        let bridge = RecordingHost::android().into_bridge();
        let mut app = App::new();
        app.add_plugins(InBrowserPlugin::new(bridge.clone()));

        bridge
            .view_events()
            .send(ViewTag(8), WebViewEvent::UrlChange(NavigationEvent::new("x")));
        app.update();

        let count = app
            .world_mut()
            .resource_mut::<Messages<WebViewMessage>>()
            .drain()
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn unlinked_plugin_still_builds() {
        let mut app = App::new();
        app.add_plugins(InBrowserPlugin::new(Bridge::unlinked()));
        app.update();

        assert!(!app.world().resource::<InBrowser>().is_linked());
    }
}
