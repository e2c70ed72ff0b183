/// Inverse kinematics: rotate `root` (and `bone` for two-bone chains) so `bone` points at `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct IkConstraintData {
    pub name: String,
    pub order: usize,
    pub target: usize,
    /// End effector.
    pub bone: usize,
    /// Chain root. Equals `bone` for single-bone chains.
    pub root: usize,
    pub bend_positive: bool,
    pub scale_enabled: bool,
    pub weight: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionMode {
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpacingMode {
    Length,
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RotateMode {
    Tangent,
    Chain,
    ChainScale,
}

/// Lay `bones` along the path display hosted by the `target` slot.
#[derive(Clone, Debug, PartialEq)]
pub struct PathConstraintData {
    pub name: String,
    pub order: usize,
    pub target: usize,
    /// Bone carrying the target slot; sorted before the chain.
    pub target_bone: usize,
    pub path_display: String,
    pub bones: Vec<usize>,
    pub root: usize,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub position: f32,
    pub spacing: f32,
    pub rotate_offset: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintData {
    Ik(IkConstraintData),
    Path(PathConstraintData),
}

impl ConstraintData {
    pub fn name(&self) -> &str {
        match self {
            ConstraintData::Ik(c) => &c.name,
            ConstraintData::Path(c) => &c.name,
        }
    }

    pub fn order(&self) -> usize {
        match self {
            ConstraintData::Ik(c) => c.order,
            ConstraintData::Path(c) => c.order,
        }
    }

    /// Bone whose update triggers this constraint.
    pub fn root(&self) -> usize {
        match self {
            ConstraintData::Ik(c) => c.root,
            ConstraintData::Path(c) => c.root,
        }
    }

    /// Bone that must be posed before the root is processed.
    pub fn target_bone(&self) -> usize {
        match self {
            ConstraintData::Ik(c) => c.target,
            ConstraintData::Path(c) => c.target_bone,
        }
    }

    /// Rewrite bone indices after a reorder. `map[old] == new`.
    pub(crate) fn remap_bones(&mut self, map: &[usize]) {
        match self {
            ConstraintData::Ik(c) => {
                c.target = map[c.target];
                c.bone = map[c.bone];
                c.root = map[c.root];
            }
            ConstraintData::Path(c) => {
                c.target_bone = map[c.target_bone];
                c.root = map[c.root];
                for b in &mut c.bones {
                    *b = map[*b];
                }
            }
        }
    }
}
