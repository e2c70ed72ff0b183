//! Blend-state machine: play requests, cross-fades, layers, groups, additive
//! states and blend nodes.

mod blend;
mod config;
mod player;
mod state;

pub use blend::{BlendKind, BlendState};
pub use config::{AnimationConfig, AnimationFadeOutMode};
pub use player::{Animation, AnimationMut};
pub use state::AnimationState;

use crate::pool::Handle;

/// Handle of a live [`AnimationState`]; goes stale once the state returns to the pool.
pub type StateId = Handle<AnimationState>;
