use std::rc::Rc;

use hashbrown::HashMap;

use crate::model::armature::ArmatureData;
use crate::model::user_data::UserData;

/// Root of one parsed asset: a named collection of armatures.
#[derive(Debug, Default)]
pub struct DragonBonesData {
    pub name: String,
    pub version: String,
    pub compatible_version: String,
    pub frame_rate: f32,
    /// Allow the factory to search this data when no data name is given.
    pub auto_search: bool,
    pub user_data: Option<UserData>,
    armature_names: Vec<String>,
    armatures: HashMap<String, Rc<ArmatureData>>,
}

impl DragonBonesData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame_rate: 24.0,
            ..Self::default()
        }
    }

    /// First registration wins.
    pub fn add_armature(&mut self, mut armature: ArmatureData) {
        if self.armatures.contains_key(&armature.name) {
            log::warn!("Same armature: {}", armature.name);
            return;
        }
        armature.parent_name = self.name.clone();
        self.armature_names.push(armature.name.clone());
        self.armatures
            .insert(armature.name.clone(), Rc::new(armature));
    }

    pub fn get_armature(&self, name: &str) -> Option<&Rc<ArmatureData>> {
        self.armatures.get(name)
    }

    pub fn armature_names(&self) -> &[String] {
        &self.armature_names
    }
}
