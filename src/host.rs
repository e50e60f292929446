//! Boundary with the native host
//!
//! Everything platform-specific sits behind [`NativeHost`]. The rest of the
//! crate talks to a [`Bridge`], which is either linked to a host or reports
//! [`InBrowserError::NotLinked`] from every entry point.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures_lite::future::Boxed;
use log::{error, info, trace};

use crate::{
    BrowserResult, CommandDispatcher, CommandHandle, CommandRegistry, EventEmitter, HostPlatform,
    InBrowserError, NativeBrowserOptions, Result, ViewEventChannel, ViewTag, WebViewCommand,
};

/// Primitives the native host provides
///
/// Implementations forward to Swift/Objective-C or Java. Every method must be
/// callable from any thread; hosts hop to their UI thread themselves.
pub trait NativeHost: Send + Sync {
    /// Which command-addressing family the host belongs to
    fn platform(&self) -> HostPlatform;

    /// Command registry of a view manager, for the name-lookup family
    fn view_commands(&self, _view_type: &str) -> Option<CommandRegistry> {
        None
    }

    /// Invokes a command on a mounted view; unknown tags must be ignored
    fn dispatch_view_command(&self, tag: ViewTag, command: i32);

    /// Forwards the `url` property of a mounted view
    fn set_view_url(&self, tag: ViewTag, url: &str);

    /// Presents the overlay browser and resolves once it closes
    ///
    /// Intermediate URLs are emitted on the bridge's [`EventEmitter`] under
    /// [`crate::URL_CHANGE_EVENT`], before the returned future resolves.
    fn open_browser(&self, url: &str, options: NativeBrowserOptions) -> Boxed<Result<BrowserResult>>;
}

struct BridgeInner {
    host: Option<Arc<dyn NativeHost>>,
    dispatcher: CommandDispatcher,
    emitter: EventEmitter,
    view_events: ViewEventChannel,
    browser_open: AtomicBool,
}

/// Handle to the native module, shared by every adapter and client
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

static GLOBAL_BRIDGE: OnceLock<Bridge> = OnceLock::new();
static UNLINKED_BRIDGE: OnceLock<Bridge> = OnceLock::new();

impl Bridge {
    /// Links a host with a fresh event emitter
    pub fn link(host: impl NativeHost + 'static) -> Self {
        Self::link_with(host, EventEmitter::new())
    }

    /// Links a host that emits URL changes on `emitter`
    pub fn link_with(host: impl NativeHost + 'static, emitter: EventEmitter) -> Self {
        Self::link_shared(Arc::new(host), emitter)
    }

    /// Links an already shared host
    pub fn link_shared(host: Arc<dyn NativeHost>, emitter: EventEmitter) -> Self {
        let dispatcher = CommandDispatcher::resolve(host.as_ref());
        info!("native module linked ({:?})", host.platform());
        Self {
            inner: Arc::new(BridgeInner {
                host: Some(host),
                dispatcher,
                emitter,
                view_events: ViewEventChannel::new(),
                browser_open: AtomicBool::new(false),
            }),
        }
    }

    /// A bridge with no native module behind it
    pub fn unlinked() -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                host: None,
                dispatcher: CommandDispatcher::NameLookup(None),
                emitter: EventEmitter::new(),
                view_events: ViewEventChannel::new(),
                browser_open: AtomicBool::new(false),
            }),
        }
    }

    /// Makes `bridge` the process-wide bridge used by FFI entry points
    ///
    /// Returns `false` if a bridge was already installed.
    pub fn install(bridge: Bridge) -> bool {
        GLOBAL_BRIDGE.set(bridge).is_ok()
    }

    /// The process-wide bridge, or an unlinked one if none was installed
    pub fn global() -> Bridge {
        if let Some(bridge) = GLOBAL_BRIDGE.get() {
            return bridge.clone();
        }
        UNLINKED_BRIDGE
            .get_or_init(|| {
                error!("{}", InBrowserError::NotLinked);
                Bridge::unlinked()
            })
            .clone()
    }

    /// Whether a native host is present
    pub fn is_linked(&self) -> bool {
        self.inner.host.is_some()
    }

    /// The linked host
    pub fn host(&self) -> Result<&dyn NativeHost> {
        self.inner.host.as_deref().ok_or(InBrowserError::NotLinked)
    }

    /// Fails with [`InBrowserError::NotLinked`] when no host is present
    pub fn ensure_linked(&self) -> Result<()> {
        self.host().map(|_| ())
    }

    /// Dispatch style resolved at link time
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.inner.dispatcher
    }

    /// Module-level event channel
    pub fn emitter(&self) -> &EventEmitter {
        &self.inner.emitter
    }

    /// Queue of view events waiting for the application thread
    pub fn view_events(&self) -> &ViewEventChannel {
        &self.inner.view_events
    }

    /// Claims the overlay browser for one open call
    ///
    /// Only one overlay session runs per bridge at a time; the claim is
    /// released when the returned guard drops.
    pub(crate) fn begin_browser_session(&self) -> Result<BrowserSession<'_>> {
        self.inner
            .browser_open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| InBrowserError::BrowserBusy)?;
        Ok(BrowserSession {
            open: &self.inner.browser_open,
        })
    }

    /// Issues a view command; a no-op for invalid handles or without a host
    pub fn dispatch(&self, handle: CommandHandle, command: WebViewCommand) {
        match self.host() {
            Ok(host) => self.inner.dispatcher.dispatch(host, handle, command),
            Err(_) => trace!("{} dropped: native module not linked", command.name()),
        }
    }
}

/// Claim on a bridge's overlay browser, released on drop
#[derive(Debug)]
pub(crate) struct BrowserSession<'a> {
    open: &'a AtomicBool,
}

impl Drop for BrowserSession<'_> {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("linked", &self.is_linked())
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording host used by the module tests

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::{NavigationEvent, URL_CHANGE_EVENT};

    /// Scripted behaviour of one `open_browser` call
    pub struct BrowserScript {
        pub urls: Vec<String>,
        pub outcome: Result<BrowserResult>,
    }

    #[derive(Default)]
    struct Record {
        dispatched: Vec<(ViewTag, i32)>,
        urls_set: Vec<(ViewTag, String)>,
        opened: Vec<(String, NativeBrowserOptions)>,
        registry_lookups: usize,
        scripts: VecDeque<BrowserScript>,
    }

    pub struct RecordingHost {
        platform: HostPlatform,
        registry: Option<CommandRegistry>,
        emitter: EventEmitter,
        record: Arc<Mutex<Record>>,
    }

    impl RecordingHost {
        pub fn android() -> Self {
            Self::new(HostPlatform::Android, None)
        }

        pub fn ios(registry: Option<CommandRegistry>) -> Self {
            Self::new(HostPlatform::Ios, registry)
        }

        fn new(platform: HostPlatform, registry: Option<CommandRegistry>) -> Self {
            Self {
                platform,
                registry,
                emitter: EventEmitter::new(),
                record: Arc::default(),
            }
        }

        /// Emitter the host reports overlay URL changes on
        pub fn emitter(&self) -> EventEmitter {
            self.emitter.clone()
        }

        /// A second view of the same recording, for use after the host moved into a bridge
        pub fn observer(&self) -> RecordingHost {
            RecordingHost {
                platform: self.platform,
                registry: self.registry.clone(),
                emitter: self.emitter.clone(),
                record: Arc::clone(&self.record),
            }
        }

        /// Links this host into a bridge sharing its emitter
        pub fn into_bridge(self) -> Bridge {
            let emitter = self.emitter.clone();
            Bridge::link_with(self, emitter)
        }

        pub fn script(&self, urls: &[&str], outcome: Result<BrowserResult>) {
            self.record.lock().unwrap().scripts.push_back(BrowserScript {
                urls: urls.iter().map(|url| url.to_string()).collect(),
                outcome,
            });
        }

        pub fn dispatched(&self) -> Vec<(ViewTag, i32)> {
            self.record.lock().unwrap().dispatched.clone()
        }

        pub fn urls_set(&self) -> Vec<(ViewTag, String)> {
            self.record.lock().unwrap().urls_set.clone()
        }

        pub fn opened(&self) -> Vec<(String, NativeBrowserOptions)> {
            self.record.lock().unwrap().opened.clone()
        }

        pub fn registry_lookups(&self) -> usize {
            self.record.lock().unwrap().registry_lookups
        }
    }

    impl NativeHost for RecordingHost {
        fn platform(&self) -> HostPlatform {
            self.platform
        }

        fn view_commands(&self, _view_type: &str) -> Option<CommandRegistry> {
            self.record.lock().unwrap().registry_lookups += 1;
            self.registry.clone()
        }

        fn dispatch_view_command(&self, tag: ViewTag, command: i32) {
            self.record.lock().unwrap().dispatched.push((tag, command));
        }

        fn set_view_url(&self, tag: ViewTag, url: &str) {
            self.record
                .lock()
                .unwrap()
                .urls_set
                .push((tag, url.to_string()));
        }

        fn open_browser(
            &self,
            url: &str,
            options: NativeBrowserOptions,
        ) -> Boxed<Result<BrowserResult>> {
            let script = {
                let mut record = self.record.lock().unwrap();
                record.opened.push((url.to_string(), options));
                record.scripts.pop_front()
            };
            let emitter = self.emitter.clone();

            Box::pin(async move {
                let Some(script) = script else {
                    return Ok(BrowserResult::dismiss());
                };
                for url in script.urls {
                    emitter.emit(URL_CHANGE_EVENT, &NavigationEvent::new(url));
                }
                script.outcome
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingHost;
    use super::*;

    #[test]
    fn unlinked_bridge_reports_linking_error() {
        let bridge = Bridge::unlinked();
        assert!(!bridge.is_linked());
        assert_eq!(bridge.ensure_linked(), Err(InBrowserError::NotLinked));
    }

    #[test]
    fn unlinked_dispatch_is_silent() {
        Bridge::unlinked().dispatch(CommandHandle::Live(ViewTag(1)), WebViewCommand::Reload);
    }

    #[test]
    fn linked_bridge_resolves_dispatcher_from_platform() {
        let bridge = Bridge::link(RecordingHost::android());
        assert!(bridge.is_linked());
        assert_eq!(bridge.dispatcher(), &CommandDispatcher::NumericId);

        let bridge = Bridge::link(RecordingHost::ios(Some(CommandRegistry::standard())));
        assert_eq!(
            bridge.dispatcher(),
            &CommandDispatcher::NameLookup(Some(CommandRegistry::standard()))
        );
    }

    #[test]
    fn bridge_dispatch_reaches_host() {
        let host = RecordingHost::android();
        let observer = host.observer();
        let bridge = host.into_bridge();

        bridge.dispatch(CommandHandle::Live(ViewTag(5)), WebViewCommand::GoForward);
        assert_eq!(observer.dispatched(), vec![(ViewTag(5), 2)]);
    }

    #[test]
    fn browser_session_is_exclusive_until_dropped() {
        let bridge = RecordingHost::android().into_bridge();

        let session = bridge.begin_browser_session().unwrap();
        assert_eq!(
            bridge.begin_browser_session().unwrap_err(),
            InBrowserError::BrowserBusy
        );

        drop(session);
        assert!(bridge.begin_browser_session().is_ok());
    }
}
