//! DragonBones skeletal animation runtime (engine-agnostic)
//!
//! Layers, bottom-up:
//! - `model` / `parser`: immutable asset data decoded from DragonBones JSON and atlas files
//! - `armature`: live bones, slots and constraints resolved every tick
//! - `animation`: the blend-state machine driving an armature's pose
//! - `clock` / `factory`: host-facing time source and armature builder
//!
//! Rendering is pushed out through [`RenderProxy`]; nothing here draws.

pub mod animation;
pub mod armature;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod model;
pub mod parser;
pub mod pool;
pub mod tween;

// Re-exports for hosts
pub use animation::{
    Animation, AnimationConfig, AnimationFadeOutMode, AnimationMut, AnimationState, BlendKind,
    StateId,
};
pub use armature::{Armature, Bone, Constraint, DisplayFrame, DisplayRef, NullProxy, RenderProxy, Slot};
pub use clock::{Animatable, ClockId, SharedAnimatable, WorldClock};
pub use config::RuntimeConfig;
pub use error::ParseError;
pub use event::{EventDispatcher, EventHub, EventKind, EventObject, Listener, ListenerId};
pub use factory::{DisplayBackend, Factory, NullBackend};
pub use parser::{DataParser, JsonDataParser};
pub use dragonbones_geom::{ColorTransform, Matrix, Point, Rectangle, Transform};
