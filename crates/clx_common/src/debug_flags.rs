//! Debug flags
//!
//! Manual-testing switches read once from the environment at startup and
//! passed explicitly to whoever needs them, never looked up ambiently at
//! decision time.

use std::env;

/// Debug switches for manual testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugFlags {
    /// Treat the running binary as updatable regardless of the published
    /// version or the rollout partition.
    pub force_self_update: bool,
}

impl DebugFlags {
    /// Load flags from the environment.
    pub fn load() -> Self {
        Self {
            force_self_update: env_enabled("CLX_FORCE_SELF_UPDATE"),
        }
    }
}

fn env_enabled(name: &str) -> bool {
    env::var(name).map_or(false, |v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_flag_from_env() {
        env::remove_var("CLX_FORCE_SELF_UPDATE");
        assert!(!DebugFlags::load().force_self_update);

        env::set_var("CLX_FORCE_SELF_UPDATE", "1");
        assert!(DebugFlags::load().force_self_update);

        env::set_var("CLX_FORCE_SELF_UPDATE", "true");
        assert!(DebugFlags::load().force_self_update);

        env::set_var("CLX_FORCE_SELF_UPDATE", "0");
        assert!(!DebugFlags::load().force_self_update);

        env::remove_var("CLX_FORCE_SELF_UPDATE");
    }
}
