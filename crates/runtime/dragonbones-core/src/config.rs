//! Runtime configuration for dragonbones-core.

use serde::{Deserialize, Serialize};

/// Sizing hints and defaults shared by factories and armatures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Initial capacity of each armature's animation-state arena.
    pub state_pool_capacity: usize,
    /// Initial capacity of each armature's event free list.
    pub event_pool_capacity: usize,
    /// Events buffered per armature tick before further events are dropped.
    pub max_events_per_tick: usize,
    /// Cache frame rate applied to newly built armatures. 0 disables cache frames.
    pub default_cache_frame_rate: f32,
    /// Search every registered data set when the named one lacks an armature.
    pub auto_search: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            state_pool_capacity: 8,
            event_pool_capacity: 16,
            max_events_per_tick: 1024,
            default_cache_frame_rate: 0.0,
            auto_search: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: RuntimeConfig =
            serde_json::from_str(r#"{ "default_cache_frame_rate": 24.0 }"#).unwrap();
        assert_eq!(cfg.default_cache_frame_rate, 24.0);
        assert_eq!(cfg.max_events_per_tick, 1024);
        assert!(!cfg.auto_search);
    }
}
