//! Per-target weight bookkeeping shared by every state that drives the target.
//!
//! States contribute in list order (highest layer first). Within a layer
//! weights add up; a lower layer only gets what the higher layers left over.

use hashbrown::HashMap;

/// What a blend state accumulates into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlendKind {
    BoneTransform,
    SlotColor,
    SlotZIndex,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlendState {
    pub kind: BlendKind,
    /// Bone or slot index.
    pub target: usize,
    /// Contributions received this tick. 1 means the first one, which overwrites.
    pub dirty: u32,
    pub layer: i32,
    pub left_weight: f32,
    pub layer_weight: f32,
    pub blend_weight: f32,
}

impl BlendState {
    pub fn new(kind: BlendKind, target: usize) -> Self {
        Self {
            kind,
            target,
            dirty: 0,
            layer: 0,
            left_weight: 1.0,
            layer_weight: 0.0,
            blend_weight: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.dirty = 0;
        self.layer = 0;
        self.left_weight = 1.0;
        self.layer_weight = 0.0;
        self.blend_weight = 0.0;
    }

    /// Register a contribution of `weight` from a state on `layer`. Returns false
    /// when higher layers already consumed the whole weight.
    pub fn update(&mut self, weight: f32, layer: i32) -> bool {
        if self.dirty > 0 {
            if self.left_weight > 0.0 {
                if self.layer != layer {
                    if self.layer_weight >= self.left_weight {
                        self.dirty += 1;
                        self.layer = layer;
                        self.left_weight = 0.0;
                        self.blend_weight = 0.0;
                        return false;
                    }
                    self.layer = layer;
                    self.left_weight -= self.layer_weight;
                    self.layer_weight = 0.0;
                }
                let weight = weight * self.left_weight;
                self.dirty += 1;
                self.blend_weight = weight;
                self.layer_weight += self.blend_weight;
                return true;
            }
            return false;
        }

        self.dirty += 1;
        self.layer = layer;
        self.left_weight = 1.0;
        self.blend_weight = weight;
        self.layer_weight = weight;
        true
    }
}

/// Blend states of one armature, keyed by kind and target name.
#[derive(Debug, Default)]
pub(crate) struct BlendTable {
    states: Vec<BlendState>,
    index: HashMap<BlendKind, HashMap<String, usize>>,
}

impl BlendTable {
    /// Index of the blend state for `(kind, name)`, created on first use.
    pub fn slot_for(&mut self, kind: BlendKind, name: &str, target: usize) -> usize {
        let by_name = self.index.entry(kind).or_default();
        if let Some(&i) = by_name.get(name) {
            return i;
        }
        let i = self.states.len();
        self.states.push(BlendState::new(kind, target));
        by_name.insert(name.to_string(), i);
        i
    }

    pub fn get(&self, kind: BlendKind, name: &str) -> Option<&BlendState> {
        let i = *self.index.get(&kind)?.get(name)?;
        self.states.get(i)
    }

    #[inline]
    pub fn state_mut(&mut self, index: usize) -> &mut BlendState {
        &mut self.states[index]
    }

    pub fn reset_all(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// it should add weights of one layer together
    #[test]
    fn same_layer_weights_add() {
        let mut b = BlendState::new(BlendKind::BoneTransform, 0);
        assert!(b.update(0.3, 0));
        assert_eq!(b.blend_weight, 0.3);
        assert!(b.update(0.7, 0));
        assert_eq!(b.blend_weight, 0.7);
        assert_eq!(b.dirty, 2);
        assert!((b.layer_weight - 1.0).abs() < 1e-6);
    }

    /// it should give lower layers only the leftover weight
    #[test]
    fn lower_layer_gets_leftover() {
        let mut b = BlendState::new(BlendKind::BoneTransform, 0);
        assert!(b.update(0.75, 2));
        assert!(b.update(1.0, 0));
        assert!((b.blend_weight - 0.25).abs() < 1e-6);
    }

    /// it should reject lower layers once a higher layer is saturated
    #[test]
    fn saturated_layer_blocks_lower() {
        let mut b = BlendState::new(BlendKind::SlotColor, 1);
        assert!(b.update(1.0, 1));
        assert!(!b.update(1.0, 0));
        assert!(!b.update(1.0, 0));
        b.reset();
        assert_eq!(b.dirty, 0);
        assert!(b.update(1.0, 0));
    }

    /// it should hand out one blend state per kind and name
    #[test]
    fn table_dedupes_by_kind_and_name() {
        let mut table = BlendTable::default();
        let a = table.slot_for(BlendKind::BoneTransform, "arm", 1);
        let b = table.slot_for(BlendKind::BoneTransform, "arm", 1);
        let c = table.slot_for(BlendKind::SlotColor, "arm", 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        table.state_mut(a).update(1.0, 0);
        assert_eq!(table.get(BlendKind::BoneTransform, "arm").unwrap().dirty, 1);
        table.reset_all();
        assert_eq!(table.get(BlendKind::BoneTransform, "arm").unwrap().dirty, 0);
        assert!(table.get(BlendKind::SlotZIndex, "arm").is_none());
    }
}
