use serde::{Deserialize, Serialize};

/// Custom payload attached to bones, slots, armatures and events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub ints: Vec<i32>,
    #[serde(default)]
    pub floats: Vec<f32>,
    #[serde(default)]
    pub strings: Vec<String>,
}

impl UserData {
    pub fn is_empty(&self) -> bool {
        self.ints.is_empty() && self.floats.is_empty() && self.strings.is_empty()
    }

    #[inline]
    pub fn get_int(&self, index: usize) -> i32 {
        self.ints.get(index).copied().unwrap_or(0)
    }

    #[inline]
    pub fn get_float(&self, index: usize) -> f32 {
        self.floats.get(index).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn get_string(&self, index: usize) -> &str {
        self.strings.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Fade in an animation on the target armature.
    Play,
    /// Raise a frame event.
    Frame,
    /// Raise a sound event.
    Sound,
}

/// A scripted action attached to a keyframe or to an armature's defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    pub kind: ActionKind,
    pub name: String,
    pub bone: Option<String>,
    pub slot: Option<String>,
    pub data: Option<UserData>,
}

impl ActionData {
    pub fn play(name: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Play,
            name: name.into(),
            bone: None,
            slot: None,
            data: None,
        }
    }
}
