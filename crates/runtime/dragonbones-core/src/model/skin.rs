use std::rc::Rc;

use hashbrown::HashMap;

use crate::model::display::DisplayData;

/// Named set of per-slot display lists. `None` entries keep a display index empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinData {
    pub name: String,
    displays: HashMap<String, Vec<Option<Rc<DisplayData>>>>,
}

impl SkinData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            displays: HashMap::new(),
        }
    }

    pub fn add_display(&mut self, slot_name: &str, display: Option<DisplayData>) {
        self.displays
            .entry_ref(slot_name)
            .or_default()
            .push(display.map(Rc::new));
    }

    pub fn get_display(&self, slot_name: &str, display_name: &str) -> Option<&Rc<DisplayData>> {
        self.displays
            .get(slot_name)?
            .iter()
            .flatten()
            .find(|d| d.name == display_name)
    }

    pub fn get_displays(&self, slot_name: &str) -> Option<&[Option<Rc<DisplayData>>]> {
        self.displays.get(slot_name).map(Vec::as_slice)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.displays.keys().map(String::as_str)
    }
}
