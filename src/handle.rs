//! Native view handles
//!
//! A mounted native web view is identified by the tag the host assigned to it.
//! Adapters never hold the raw tag directly: they hold a [`ViewSlot`], which is
//! filled on mount and emptied on unmount, and resolve it into a
//! [`CommandHandle`] at the moment a command is issued.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Tag the native host assigned to a view instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewTag(pub i32);

impl ViewTag {
    /// Raw tag value as the host knows it
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ViewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability token for one native view
///
/// Operations against [`CommandHandle::Invalid`] are defined no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandHandle {
    /// The view is mounted under this tag
    Live(ViewTag),
    /// Not yet mounted, or already unmounted
    Invalid,
}

impl CommandHandle {
    /// The tag, if the handle is live
    pub fn tag(self) -> Option<ViewTag> {
        match self {
            CommandHandle::Live(tag) => Some(tag),
            CommandHandle::Invalid => None,
        }
    }

    /// Whether the handle refers to a mounted view
    pub fn is_live(self) -> bool {
        matches!(self, CommandHandle::Live(_))
    }
}

/// Shared slot holding the tag of a mounted view
///
/// Clones observe the same slot, so a handle object given out before mount
/// starts working once the view mounts and stops working after unmount.
#[derive(Clone, Default)]
pub struct ViewSlot {
    tag: Arc<Mutex<Option<ViewTag>>>,
}

impl ViewSlot {
    /// Creates an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the tag of the freshly mounted view
    ///
    /// Returns the previous tag if the slot was already filled.
    pub fn mount(&self, tag: ViewTag) -> Option<ViewTag> {
        match self.tag.lock() {
            Ok(mut slot) => slot.replace(tag),
            Err(poisoned) => poisoned.into_inner().replace(tag),
        }
    }

    /// Invalidates the slot
    ///
    /// Returns the tag that was cleared. Calling this twice is harmless: the
    /// second call returns `None`.
    pub fn unmount(&self) -> Option<ViewTag> {
        match self.tag.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Resolves the slot into a handle at this instant
    pub fn resolve(&self) -> CommandHandle {
        let tag = match self.tag.lock() {
            Ok(slot) => *slot,
            Err(poisoned) => *poisoned.into_inner(),
        };
        tag.map_or(CommandHandle::Invalid, CommandHandle::Live)
    }
}

impl fmt::Debug for ViewSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSlot")
            .field("handle", &self.resolve())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_invalid_until_mounted() {
        let slot = ViewSlot::new();
        assert_eq!(slot.resolve(), CommandHandle::Invalid);

        slot.mount(ViewTag(7));
        assert_eq!(slot.resolve(), CommandHandle::Live(ViewTag(7)));
    }

    #[test]
    fn clones_share_the_slot() {
        let slot = ViewSlot::new();
        let observer = slot.clone();

        slot.mount(ViewTag(3));
        assert!(observer.resolve().is_live());

        slot.unmount();
        assert_eq!(observer.resolve().tag(), None);
    }

    #[test]
    fn double_unmount_is_a_no_op() {
        let slot = ViewSlot::new();
        slot.mount(ViewTag(1));

        assert_eq!(slot.unmount(), Some(ViewTag(1)));
        assert_eq!(slot.unmount(), None);
        assert_eq!(slot.resolve(), CommandHandle::Invalid);
    }
}
