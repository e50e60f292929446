//! Imperative web view commands and their platform-specific dispatch

use std::collections::HashMap;

use log::{debug, trace};

use crate::{CommandHandle, HostPlatform, NativeHost};

/// Name under which the native web view manager is registered
pub const WEB_VIEW_TYPE: &str = "InBrowserWebView";

/// One of the four imperative operations a web view supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum WebViewCommand {
    /// Navigate back in history
    GoBack = 1,
    /// Navigate forward in history
    GoForward = 2,
    /// Reload the current page
    Reload = 3,
    /// Stop the current load
    StopLoading = 4,
}

impl WebViewCommand {
    /// All commands, in id order
    pub const ALL: [WebViewCommand; 4] = [
        WebViewCommand::GoBack,
        WebViewCommand::GoForward,
        WebViewCommand::Reload,
        WebViewCommand::StopLoading,
    ];

    /// Stable numeric id used by the numeric-command family
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Command name as exported by the view manager
    pub const fn name(self) -> &'static str {
        match self {
            WebViewCommand::GoBack => "goBack",
            WebViewCommand::GoForward => "goForward",
            WebViewCommand::Reload => "reload",
            WebViewCommand::StopLoading => "stopLoading",
        }
    }

    /// Create a command from its numeric id
    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.id() == id)
    }
}

/// Command names a view manager exposes, mapped to the host's own ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRegistry {
    commands: HashMap<String, i32>,
}

impl CommandRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four standard commands under their standard ids
    pub fn standard() -> Self {
        WebViewCommand::ALL
            .into_iter()
            .map(|command| (command.name(), command.id()))
            .collect()
    }

    /// Adds or replaces an entry
    pub fn insert(&mut self, name: impl Into<String>, id: i32) {
        self.commands.insert(name.into(), id);
    }

    /// Looks a command name up
    pub fn get(&self, name: &str) -> Option<i32> {
        self.commands.get(name).copied()
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i32)> for CommandRegistry {
    fn from_iter<I: IntoIterator<Item = (S, i32)>>(iter: I) -> Self {
        Self {
            commands: iter
                .into_iter()
                .map(|(name, id)| (name.into(), id))
                .collect(),
        }
    }
}

/// How commands are addressed, resolved once per bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandDispatcher {
    /// Commands are sent by their fixed id
    NumericId,
    /// Commands are looked up by name; `None` means the host exposed no registry
    NameLookup(Option<CommandRegistry>),
}

impl CommandDispatcher {
    /// Resolves the dispatch style for a host
    ///
    /// For the name-lookup family the registry is fetched here, once.
    pub fn resolve(host: &dyn NativeHost) -> Self {
        match host.platform() {
            HostPlatform::Android => CommandDispatcher::NumericId,
            HostPlatform::Ios => {
                let registry = host.view_commands(WEB_VIEW_TYPE);
                if registry.is_none() {
                    debug!("{WEB_VIEW_TYPE} exposes no command registry, commands will be dropped");
                }
                CommandDispatcher::NameLookup(registry)
            }
        }
    }

    /// The host-side id a command is sent under, if any
    pub fn address(&self, command: WebViewCommand) -> Option<i32> {
        match self {
            CommandDispatcher::NumericId => Some(command.id()),
            CommandDispatcher::NameLookup(registry) => registry
                .as_ref()
                .and_then(|registry| registry.get(command.name())),
        }
    }

    /// Issues a command against a view
    ///
    /// Invalid handles and unknown command names are silently dropped.
    pub fn dispatch(&self, host: &dyn NativeHost, handle: CommandHandle, command: WebViewCommand) {
        let Some(tag) = handle.tag() else {
            trace!("{} dropped: view not mounted", command.name());
            return;
        };

        match self.address(command) {
            Some(id) => host.dispatch_view_command(tag, id),
            None => trace!("{} dropped: not in {WEB_VIEW_TYPE} registry", command.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViewTag;
    use crate::host::testing::RecordingHost;

    #[test]
    fn command_ids_are_stable() {
        assert_eq!(WebViewCommand::GoBack.id(), 1);
        assert_eq!(WebViewCommand::GoForward.id(), 2);
        assert_eq!(WebViewCommand::Reload.id(), 3);
        assert_eq!(WebViewCommand::StopLoading.id(), 4);
        assert_eq!(WebViewCommand::from_id(3), Some(WebViewCommand::Reload));
        assert_eq!(WebViewCommand::from_id(5), None);
    }

    #[test]
    fn numeric_family_uses_fixed_ids() {
        let host = RecordingHost::android();
        let dispatcher = CommandDispatcher::resolve(&host);
        assert_eq!(dispatcher, CommandDispatcher::NumericId);

        dispatcher.dispatch(&host, CommandHandle::Live(ViewTag(9)), WebViewCommand::StopLoading);
        assert_eq!(host.dispatched(), vec![(ViewTag(9), 4)]);
    }

    #[test]
    fn name_family_uses_host_registry_ids() {
        let registry: CommandRegistry = [("goBack", 40), ("reload", 42)].into_iter().collect();
        let host = RecordingHost::ios(Some(registry));
        let dispatcher = CommandDispatcher::resolve(&host);

        dispatcher.dispatch(&host, CommandHandle::Live(ViewTag(2)), WebViewCommand::Reload);
        dispatcher.dispatch(&host, CommandHandle::Live(ViewTag(2)), WebViewCommand::GoForward);
        assert_eq!(host.dispatched(), vec![(ViewTag(2), 42)]);
    }

    #[test]
    fn registry_is_fetched_once() {
        let host = RecordingHost::ios(Some(CommandRegistry::standard()));
        let dispatcher = CommandDispatcher::resolve(&host);

        for command in WebViewCommand::ALL {
            dispatcher.dispatch(&host, CommandHandle::Live(ViewTag(1)), command);
        }
        assert_eq!(host.registry_lookups(), 1);
        assert_eq!(host.dispatched().len(), 4);
    }

    #[test]
    fn missing_registry_drops_everything() {
        let host = RecordingHost::ios(None);
        let dispatcher = CommandDispatcher::resolve(&host);

        for command in WebViewCommand::ALL {
            dispatcher.dispatch(&host, CommandHandle::Live(ViewTag(1)), command);
        }
        assert!(host.dispatched().is_empty());
    }

    #[test]
    fn invalid_handle_is_a_no_op_for_every_command() {
        for host in [RecordingHost::android(), RecordingHost::ios(Some(CommandRegistry::standard()))] {
            let dispatcher = CommandDispatcher::resolve(&host);
            for command in WebViewCommand::ALL {
                dispatcher.dispatch(&host, CommandHandle::Invalid, command);
            }
            assert!(host.dispatched().is_empty());
        }
    }
}
