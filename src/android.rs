//! Android native host with JNI entry points
//!
//! The Java side owns a host object with `dispatchCommand(int, int)`,
//! `setUrl(int, String)` and `open(String, boolean, long)`, hands it over once
//! through `InBrowserNative.nativeLink`, and reports events back through the
//! `InBrowserNative.nativeOn*` methods.
use crate::{
    Bridge, BrowserResult, ErrorEvent, HostPlatform, InBrowserError, LoadEvent,
    NativeBrowserOptions, NativeHost, NavigationEvent, Result, URL_CHANGE_EVENT, ViewTag,
    WebViewEvent,
};
use futures::channel::oneshot;
use futures_lite::future::Boxed;
use jni::{
    JNIEnv, JavaVM,
    objects::{GlobalRef, JClass, JObject, JString, JValue},
    sys::{JNI_FALSE, JNI_TRUE, jboolean, jint, jlong},
};
use log::{debug, error, warn};
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, OnceLock,
        atomic::{AtomicI64, Ordering},
    },
};

type PendingOpen = oneshot::Sender<Result<BrowserResult>>;

/// Overlay sessions waiting for the Java side to report a result, keyed by request id
static PENDING_OPENS: OnceLock<Mutex<HashMap<jlong, PendingOpen>>> = OnceLock::new();

static NEXT_REQUEST: AtomicI64 = AtomicI64::new(1);

fn pending_opens() -> MutexGuard<'static, HashMap<jlong, PendingOpen>> {
    let pending = PENDING_OPENS.get_or_init(|| Mutex::new(HashMap::new()));
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Resolves a pending overlay session; unknown or already settled ids are ignored
fn settle(request: jlong, outcome: Result<BrowserResult>) {
    match pending_opens().remove(&request) {
        Some(sender) => {
            let _ = sender.send(outcome);
        }
        None => warn!("in-app browser request {request} already settled"),
    }
}

/// [`NativeHost`] backed by the Java host object
pub struct AndroidHost {
    vm: JavaVM,
    host: GlobalRef,
}

impl AndroidHost {
    /// Wraps the Java host object
    pub fn new(env: &mut JNIEnv, host: &JObject) -> jni::errors::Result<Self> {
        Ok(Self {
            vm: env.get_java_vm()?,
            host: env.new_global_ref(host)?,
        })
    }

    fn with_env<T>(
        &self,
        what: &str,
        call: impl FnOnce(&mut JNIEnv, &JObject) -> jni::errors::Result<T>,
    ) -> std::result::Result<T, String> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| format!("attach for {what} failed: {e}"))?;

        call(&mut *env, self.host.as_obj()).map_err(|e| {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_describe();
                let _ = env.exception_clear();
            }
            format!("{what} failed: {e}")
        })
    }
}

impl NativeHost for AndroidHost {
    fn platform(&self) -> HostPlatform {
        HostPlatform::Android
    }

    fn dispatch_view_command(&self, tag: ViewTag, command: i32) {
        let result = self.with_env("dispatchCommand", |env, host| {
            env.call_method(
                host,
                "dispatchCommand",
                "(II)V",
                &[JValue::Int(tag.raw()), JValue::Int(command)],
            )
            .map(|_| ())
        });
        if let Err(e) = result {
            error!("{e}");
        }
    }

    fn set_view_url(&self, tag: ViewTag, url: &str) {
        let result = self.with_env("setUrl", |env, host| {
            let url = JObject::from(env.new_string(url)?);
            env.call_method(
                host,
                "setUrl",
                "(ILjava/lang/String;)V",
                &[JValue::Int(tag.raw()), JValue::Object(&url)],
            )
            .map(|_| ())
        });
        if let Err(e) = result {
            error!("{e}");
        }
    }

    fn open_browser(&self, url: &str, options: NativeBrowserOptions) -> Boxed<Result<BrowserResult>> {
        let request = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        pending_opens().insert(request, sender);

        let show_close_button = if options.show_close_button {
            JNI_TRUE
        } else {
            JNI_FALSE
        };
        let result = self.with_env("open", |env, host| {
            let url = JObject::from(env.new_string(url)?);
            env.call_method(
                host,
                "open",
                "(Ljava/lang/String;ZJ)V",
                &[
                    JValue::Object(&url),
                    JValue::Bool(show_close_button),
                    JValue::Long(request),
                ],
            )
            .map(|_| ())
        });

        if let Err(e) = result {
            error!("{e}");
            pending_opens().remove(&request);
            return Box::pin(async move { Err(InBrowserError::rejected("E_JNI", e)) });
        }

        debug!("in-app browser request {request} started");
        Box::pin(async move { receiver.await.unwrap_or(Err(InBrowserError::HostGone)) })
    }
}

fn java_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match env.get_string(value) {
        Ok(value) => Some(value.into()),
        Err(e) => {
            error!("Failed to read Java string: {:?}", e);
            None
        }
    }
}

fn queue_view_event(tag: jint, event: WebViewEvent) {
    let bridge = Bridge::global();
    if !bridge.is_linked() {
        error!("{} for #{tag} dropped: {}", event.name(), InBrowserError::NotLinked);
        return;
    }
    bridge.view_events().send(ViewTag(tag), event);
}

// ============================================================================
// JNI Entry Points
// ============================================================================

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeLink(
    mut env: JNIEnv,
    _class: JClass,
    host: JObject,
) -> jboolean {
    let host = match AndroidHost::new(&mut env, &host) {
        Ok(host) => host,
        Err(e) => {
            error!("Failed to link native host: {:?}", e);
            return JNI_FALSE;
        }
    };

    if Bridge::install(Bridge::link(host)) {
        JNI_TRUE
    } else {
        debug!("native module already linked");
        JNI_FALSE
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnBrowserClosed(
    mut env: JNIEnv,
    _class: JClass,
    request: jlong,
    kind: JString,
) {
    let kind = java_string(&mut env, &kind);
    settle(request, Ok(BrowserResult::from_native(kind.as_deref())));
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnBrowserFailed(
    mut env: JNIEnv,
    _class: JClass,
    request: jlong,
    code: JString,
    message: JString,
) {
    let code = java_string(&mut env, &code).unwrap_or_else(|| "E_UNKNOWN".to_string());
    let message = java_string(&mut env, &message).unwrap_or_default();
    settle(request, Err(InBrowserError::rejected(code, message)));
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnBrowserUrlChange(
    mut env: JNIEnv,
    _class: JClass,
    url: JString,
) {
    if let Some(url) = java_string(&mut env, &url) {
        Bridge::global()
            .emitter()
            .emit(URL_CHANGE_EVENT, &NavigationEvent::new(url));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnLoadStart(
    mut env: JNIEnv,
    _class: JClass,
    tag: jint,
    url: JString,
) {
    let url = java_string(&mut env, &url).unwrap_or_default();
    queue_view_event(tag, WebViewEvent::LoadStart(NavigationEvent::new(url)));
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnLoadEnd(
    mut env: JNIEnv,
    _class: JClass,
    tag: jint,
    url: JString,
    title: JString,
    can_go_back: jboolean,
    can_go_forward: jboolean,
) {
    let event = LoadEvent {
        url: java_string(&mut env, &url).unwrap_or_default(),
        title: java_string(&mut env, &title),
        can_go_back: Some(can_go_back != JNI_FALSE),
        can_go_forward: Some(can_go_forward != JNI_FALSE),
    };
    queue_view_event(tag, WebViewEvent::LoadEnd(event));
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnLoadError(
    mut env: JNIEnv,
    _class: JClass,
    tag: jint,
    url: JString,
    code: jint,
    description: JString,
) {
    let event = ErrorEvent {
        url: java_string(&mut env, &url).unwrap_or_default(),
        code,
        description: java_string(&mut env, &description).unwrap_or_default(),
    };
    queue_view_event(tag, WebViewEvent::LoadError(event));
}

#[unsafe(no_mangle)]
pub extern "C" fn Java_com_inbrowser_InBrowserNative_nativeOnUrlChange(
    mut env: JNIEnv,
    _class: JClass,
    tag: jint,
    url: JString,
) {
    let url = java_string(&mut env, &url).unwrap_or_default();
    queue_view_event(tag, WebViewEvent::UrlChange(NavigationEvent::new(url)));
}
