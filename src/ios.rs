//! iOS native host
//!
//! The host app implements the `inbrowser_ios_*` functions declared below in
//! Swift (`@_cdecl`) on top of WKWebView and SFSafariViewController, and calls
//! the exported `inbrowser_ios_emit_*` functions to report events back.

#![allow(unsafe_op_in_unsafe_fn)]
#![allow(unsafe_attr_outside_unsafe)]
#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char};
use std::sync::Mutex;

use block2::{Block, RcBlock};
use futures::channel::oneshot;
use futures_lite::future::Boxed;
use log::{debug, error, warn};

use crate::{
    Bridge, BrowserResult, CommandRegistry, ErrorEvent, HostPlatform, InBrowserError, LoadEvent,
    NativeBrowserOptions, NativeHost, NavigationEvent, Result, URL_CHANGE_EVENT, ViewTag,
    WebViewCommand, WebViewEvent,
};

/// Completion status: the browser closed, `value` holds the result type
const OPEN_RESOLVED: u8 = 0;
/// Completion status: the open call was rejected, `value` holds the code
const OPEN_REJECTED: u8 = 1;

unsafe extern "C" {
    fn inbrowser_ios_dispatch_command(tag: i32, command: i32);
    fn inbrowser_ios_command_id(view_type: *const c_char, name: *const c_char) -> i32;
    fn inbrowser_ios_set_url(tag: i32, url: *const c_char);
    fn inbrowser_ios_open(
        url: *const c_char,
        show_close_button: bool,
        completion: &Block<dyn Fn(u8, *const c_char, *const c_char)>,
    );
}

/// Copies a C string coming from the host; null becomes `None`
unsafe fn host_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// [`NativeHost`] backed by the Swift host functions
#[derive(Debug, Default)]
pub struct IosHost;

impl NativeHost for IosHost {
    fn platform(&self) -> HostPlatform {
        HostPlatform::Ios
    }

    fn view_commands(&self, view_type: &str) -> Option<CommandRegistry> {
        let view_type = CString::new(view_type).ok()?;
        let mut registry = CommandRegistry::new();

        for command in WebViewCommand::ALL {
            let Ok(name) = CString::new(command.name()) else {
                continue;
            };
            let id = unsafe { inbrowser_ios_command_id(view_type.as_ptr(), name.as_ptr()) };
            if id >= 0 {
                registry.insert(command.name(), id);
            }
        }

        (!registry.is_empty()).then_some(registry)
    }

    fn dispatch_view_command(&self, tag: ViewTag, command: i32) {
        unsafe { inbrowser_ios_dispatch_command(tag.raw(), command) };
    }

    fn set_view_url(&self, tag: ViewTag, url: &str) {
        match CString::new(url) {
            Ok(url) => unsafe { inbrowser_ios_set_url(tag.raw(), url.as_ptr()) },
            Err(_) => warn!("url for {tag} contains a NUL byte, not forwarded"),
        }
    }

    fn open_browser(&self, url: &str, options: NativeBrowserOptions) -> Boxed<Result<BrowserResult>> {
        let Ok(url) = CString::new(url) else {
            return Box::pin(async {
                Err(InBrowserError::rejected("INVALID_URL", "url contains a NUL byte"))
            });
        };

        let (sender, receiver) = oneshot::channel();
        let sender = Mutex::new(Some(sender));
        let completion: RcBlock<dyn Fn(u8, *const c_char, *const c_char)> = RcBlock::new(
            move |status: u8, value: *const c_char, message: *const c_char| {
                let outcome = unsafe {
                    match status {
                        OPEN_RESOLVED => Ok(BrowserResult::from_native(host_string(value).as_deref())),
                        OPEN_REJECTED => Err(InBrowserError::rejected(
                            host_string(value).unwrap_or_else(|| "E_UNKNOWN".to_string()),
                            host_string(message).unwrap_or_default(),
                        )),
                        other => Err(InBrowserError::rejected(
                            "E_STATUS",
                            format!("unknown completion status {other}"),
                        )),
                    }
                };
                let sender = match sender.lock() {
                    Ok(mut slot) => slot.take(),
                    Err(poisoned) => poisoned.into_inner().take(),
                };
                match sender {
                    Some(sender) => {
                        let _ = sender.send(outcome);
                    }
                    None => warn!("in-app browser completion called more than once"),
                }
            },
        );

        unsafe { inbrowser_ios_open(url.as_ptr(), options.show_close_button, &completion) };

        Box::pin(async move { receiver.await.unwrap_or(Err(InBrowserError::HostGone)) })
    }
}

/// Links the iOS host into the process-wide bridge
///
/// Returns `false` if a bridge was already installed.
#[unsafe(no_mangle)]
pub extern "C" fn inbrowser_ios_link() -> bool {
    let installed = Bridge::install(Bridge::link(IosHost));
    if !installed {
        debug!("native module already linked");
    }
    installed
}

fn queue_view_event(tag: i32, event: WebViewEvent) {
    let bridge = Bridge::global();
    if !bridge.is_linked() {
        error!("{} for #{tag} dropped: {}", event.name(), InBrowserError::NotLinked);
        return;
    }
    bridge.view_events().send(ViewTag(tag), event);
}

/// Reports a load start for the view with `tag`
///
/// # Safety
///
/// - `url` must be null or a valid NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inbrowser_ios_emit_load_start(tag: i32, url: *const c_char) {
    let url = host_string(url).unwrap_or_default();
    queue_view_event(tag, WebViewEvent::LoadStart(NavigationEvent::new(url)));
}

/// Reports a finished load for the view with `tag`
///
/// # Safety
///
/// - `url` and `title` must be null or valid NUL-terminated strings
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inbrowser_ios_emit_load_end(
    tag: i32,
    url: *const c_char,
    title: *const c_char,
    can_go_back: bool,
    can_go_forward: bool,
) {
    let event = LoadEvent {
        url: host_string(url).unwrap_or_default(),
        title: host_string(title),
        can_go_back: Some(can_go_back),
        can_go_forward: Some(can_go_forward),
    };
    queue_view_event(tag, WebViewEvent::LoadEnd(event));
}

/// Reports a failed load for the view with `tag`
///
/// # Safety
///
/// - `url` and `description` must be null or valid NUL-terminated strings
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inbrowser_ios_emit_load_error(
    tag: i32,
    url: *const c_char,
    code: i32,
    description: *const c_char,
) {
    let event = ErrorEvent {
        url: host_string(url).unwrap_or_default(),
        code,
        description: host_string(description).unwrap_or_default(),
    };
    queue_view_event(tag, WebViewEvent::LoadError(event));
}

/// Reports a URL change for the view with `tag`
///
/// # Safety
///
/// - `url` must be null or a valid NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inbrowser_ios_emit_url_change(tag: i32, url: *const c_char) {
    let url = host_string(url).unwrap_or_default();
    queue_view_event(tag, WebViewEvent::UrlChange(NavigationEvent::new(url)));
}

/// Reports a URL change inside the overlay browser
///
/// Must be called before the open completion for the same session.
///
/// # Safety
///
/// - `url` must be null or a valid NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inbrowser_ios_emit_browser_url_change(url: *const c_char) {
    let Some(url) = host_string(url) else {
        return;
    };
    Bridge::global()
        .emitter()
        .emit(URL_CHANGE_EVENT, &NavigationEvent::new(url));
}
