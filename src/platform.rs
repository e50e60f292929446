//! Host platform families

/// The native host platform family
///
/// The two families expose view commands through different mechanisms:
/// Android addresses commands by a stable integer id, iOS by looking the
/// command name up in the view manager's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    /// Numeric command ids
    Android,
    /// Command names resolved through the view manager registry
    Ios,
}

impl HostPlatform {
    /// The platform this crate was compiled for
    ///
    /// Anything that is not Android uses name lookup.
    pub const fn current() -> Self {
        if cfg!(target_os = "android") {
            HostPlatform::Android
        } else {
            HostPlatform::Ios
        }
    }

    /// Whether commands are addressed by their fixed numeric id
    pub const fn uses_numeric_commands(self) -> bool {
        matches!(self, HostPlatform::Android)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_android_uses_numeric_commands() {
        assert!(HostPlatform::Android.uses_numeric_commands());
        assert!(!HostPlatform::Ios.uses_numeric_commands());
    }

    #[test]
    fn current_matches_target() {
        let expected = if cfg!(target_os = "android") {
            HostPlatform::Android
        } else {
            HostPlatform::Ios
        };
        assert_eq!(HostPlatform::current(), expected);
    }
}
