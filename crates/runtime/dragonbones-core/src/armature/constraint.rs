//! Pose constraints applied after the bone pass: one- and two-bone IK and
//! path following.

use std::f32::consts::PI;

use dragonbones_geom::{normalize_radian, Matrix, Point, Transform};

use super::bone::Bone;
use crate::model::{
    ConstraintData, DisplayKind, IkConstraintData, PathConstraintData, PositionMode, RotateMode,
    SpacingMode,
};

#[derive(Clone, Debug)]
pub struct IkConstraint {
    pub(crate) name: String,
    pub(crate) target: usize,
    pub(crate) bone: usize,
    pub(crate) root: usize,
    pub bend_positive: bool,
    pub scale_enabled: bool,
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub struct PathConstraint {
    pub(crate) name: String,
    pub(crate) target_bone: usize,
    pub(crate) bones: Vec<usize>,
    /// Path control points in the target bone's space.
    vertices: Vec<f32>,
    closed: bool,
    pub(crate) position_mode: PositionMode,
    pub(crate) spacing_mode: SpacingMode,
    pub(crate) rotate_mode: RotateMode,
    pub position: f32,
    pub spacing: f32,
    pub rotate_offset: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    polyline: Vec<Point>,
    lengths: Vec<f32>,
}

#[derive(Clone, Debug)]
pub enum Constraint {
    Ik(IkConstraint),
    Path(PathConstraint),
}

impl Constraint {
    /// Build the runtime constraint. Path constraints need the path display of their target slot.
    pub(crate) fn from_data(data: &ConstraintData, path_display: Option<&DisplayKind>) -> Option<Self> {
        match data {
            ConstraintData::Ik(ik) => Some(Constraint::Ik(IkConstraint::new(ik))),
            ConstraintData::Path(path) => match path_display {
                Some(DisplayKind::Path { vertices, closed, .. }) => {
                    Some(Constraint::Path(PathConstraint::new(path, vertices.clone(), *closed)))
                }
                _ => {
                    log::warn!("path constraint {} has no path display", path.name);
                    None
                }
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Constraint::Ik(c) => &c.name,
            Constraint::Path(c) => &c.name,
        }
    }

    /// Bones whose global pose this constraint writes.
    pub(crate) fn driven_bones(&self) -> Vec<usize> {
        match self {
            Constraint::Ik(c) if c.root == c.bone => vec![c.bone],
            Constraint::Ik(c) => vec![c.root, c.bone],
            Constraint::Path(c) => c.bones.clone(),
        }
    }

    pub(crate) fn apply(&mut self, bones: &mut [Bone]) {
        match self {
            Constraint::Ik(c) => c.apply(bones),
            Constraint::Path(c) => c.apply(bones),
        }
    }
}

impl IkConstraint {
    pub(crate) fn new(data: &IkConstraintData) -> Self {
        Self {
            name: data.name.clone(),
            target: data.target,
            bone: data.bone,
            root: data.root,
            bend_positive: data.bend_positive,
            scale_enabled: data.scale_enabled,
            weight: data.weight,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, bones: &mut [Bone]) {
        if self.weight <= 0.0 {
            return;
        }
        let target = Point::new(bones[self.target].global.x, bones[self.target].global.y);
        if self.root == self.bone {
            let bone = &mut bones[self.bone];
            rotate_toward(&mut bone.global, &target, self.weight);
            bone.global.to_matrix(&mut bone.global_matrix);
            bone.children_dirty = true;
        } else {
            self.apply_two_bone(bones, target);
        }
    }

    fn apply_two_bone(&self, bones: &mut [Bone], target: Point) {
        let root_flipped = bones[self.root]
            .parent
            .is_some_and(|p| bones[p].global_matrix.determinant() < 0.0);
        let bone_length = bones[self.bone].length;
        let mut parent_global = bones[self.root].global;
        let mut global = bones[self.bone].global;
        let matrix = bones[self.bone].global_matrix;

        let x = matrix.a * bone_length;
        let y = matrix.b * bone_length;
        let l_ll = x * x + y * y;
        let l_l = l_ll.sqrt();
        let mut dx = global.x - parent_global.x;
        let mut dy = global.y - parent_global.y;
        let l_pp = dx * dx + dy * dy;
        let l_p = l_pp.sqrt();
        let raw_radian = global.rotation;
        let raw_parent_radian = parent_global.rotation;
        let raw_radian_a = dy.atan2(dx);

        dx = target.x - parent_global.x;
        dy = target.y - parent_global.y;
        let l_tt = dx * dx + dy * dy;
        let l_t = l_tt.sqrt();

        let radian_a = if l_l + l_p <= l_t || l_t + l_l <= l_p || l_t + l_p <= l_l {
            let mut r = dy.atan2(dx);
            if l_l + l_p > l_t && l_p < l_l {
                r += PI;
            }
            r
        } else {
            let h = (l_pp - l_ll + l_tt) / (2.0 * l_tt);
            let r = (l_pp - h * h * l_tt).max(0.0).sqrt() / l_t;
            let hx = parent_global.x + dx * h;
            let hy = parent_global.y + dy * h;
            let rx = -dy * r;
            let ry = dx * r;
            if root_flipped != self.bend_positive {
                global.x = hx - rx;
                global.y = hy - ry;
            } else {
                global.x = hx + rx;
                global.y = hy + ry;
            }
            (global.y - parent_global.y).atan2(global.x - parent_global.x)
        };

        let dr = normalize_radian(radian_a - raw_radian_a);
        parent_global.rotation = raw_parent_radian + dr * self.weight;
        {
            let root = &mut bones[self.root];
            root.global = parent_global;
            parent_global.to_matrix(&mut root.global_matrix);
            root.children_dirty = true;
        }

        let current_a = raw_radian_a + dr * self.weight;
        global.x = parent_global.x + current_a.cos() * l_p;
        global.y = parent_global.y + current_a.sin() * l_p;

        let mut radian_b = (target.y - global.y).atan2(target.x - global.x);
        if global.scale_y < 0.0 {
            radian_b += PI;
        }
        global.rotation = parent_global.rotation + raw_radian - raw_parent_radian
            + normalize_radian(radian_b - dr - raw_radian) * self.weight;

        let bone = &mut bones[self.bone];
        bone.global = global;
        global.to_matrix(&mut bone.global_matrix);
        bone.children_dirty = true;
    }
}

fn rotate_toward(global: &mut Transform, target: &Point, weight: f32) {
    let mut rad = (target.y - global.y).atan2(target.x - global.x);
    if global.scale_x < 0.0 {
        rad += PI;
    }
    global.rotation += normalize_radian(rad - global.rotation) * weight;
}

const CURVE_STEPS: usize = 10;

impl PathConstraint {
    pub(crate) fn new(data: &PathConstraintData, vertices: Vec<f32>, closed: bool) -> Self {
        Self {
            name: data.name.clone(),
            target_bone: data.target_bone,
            bones: data.bones.clone(),
            vertices,
            closed,
            position_mode: data.position_mode,
            spacing_mode: data.spacing_mode,
            rotate_mode: data.rotate_mode,
            position: data.position,
            spacing: data.spacing,
            rotate_offset: data.rotate_offset,
            rotate_mix: data.rotate_mix,
            translate_mix: data.translate_mix,
            polyline: Vec::new(),
            lengths: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flatten the bezier path into armature space with cumulative lengths.
    fn rebuild_polyline(&mut self, matrix: &Matrix) {
        self.polyline.clear();
        self.lengths.clear();
        let points: Vec<Point> = self
            .vertices
            .chunks_exact(2)
            .map(|p| matrix.transform_point(p[0], p[1]))
            .collect();
        if points.is_empty() {
            return;
        }
        self.polyline.push(points[0]);
        let mut i = 0;
        while i + 3 < points.len() {
            let (p0, c1, c2, p3) = (points[i], points[i + 1], points[i + 2], points[i + 3]);
            for step in 1..=CURVE_STEPS {
                let t = step as f32 / CURVE_STEPS as f32;
                let u = 1.0 - t;
                let a = u * u * u;
                let b = 3.0 * u * u * t;
                let c = 3.0 * u * t * t;
                let d = t * t * t;
                self.polyline.push(Point::new(
                    a * p0.x + b * c1.x + c * c2.x + d * p3.x,
                    a * p0.y + b * c1.y + c * c2.y + d * p3.y,
                ));
            }
            i += 3;
        }
        self.lengths.push(0.0);
        for w in self.polyline.windows(2) {
            let last = self.lengths.last().copied().unwrap_or(0.0);
            self.lengths.push(last + w[0].distance(&w[1]));
        }
    }

    fn total_length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point and tangent angle at `distance` along the polyline. Needs at least two points.
    fn point_at(&self, distance: f32) -> (Point, f32) {
        let total = self.total_length();
        let d = if self.closed && total > 0.0 {
            distance.rem_euclid(total)
        } else {
            distance.clamp(0.0, total)
        };
        let seg = self
            .lengths
            .partition_point(|&l| l < d)
            .clamp(1, self.polyline.len() - 1);
        let (a, b) = (self.polyline[seg - 1], self.polyline[seg]);
        let span = self.lengths[seg] - self.lengths[seg - 1];
        let t = if span > 0.0 { (d - self.lengths[seg - 1]) / span } else { 0.0 };
        let point = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        (point, (b.y - a.y).atan2(b.x - a.x))
    }

    fn apply(&mut self, bones: &mut [Bone]) {
        let matrix = bones[self.target_bone].global_matrix;
        self.rebuild_polyline(&matrix);
        if self.polyline.len() < 2 {
            return;
        }
        let total = self.total_length();
        let mut distance = match self.position_mode {
            PositionMode::Fixed => self.position,
            PositionMode::Percent => self.position * total,
        };

        for i in 0..self.bones.len() {
            let index = self.bones[i];
            let (point, tangent) = self.point_at(distance);
            let length = bones[index].length;
            let step = match self.spacing_mode {
                SpacingMode::Length => length + self.spacing,
                SpacingMode::Fixed => self.spacing,
                SpacingMode::Percent => self.spacing * total,
            };
            let next = self.point_at(distance + step).0;

            let bone = &mut bones[index];
            let g = &mut bone.global;
            g.x += (point.x - g.x) * self.translate_mix;
            g.y += (point.y - g.y) * self.translate_mix;

            let angle = match self.rotate_mode {
                RotateMode::Tangent => tangent,
                RotateMode::Chain | RotateMode::ChainScale => (next.y - g.y).atan2(next.x - g.x),
            } + self.rotate_offset;
            g.rotation += normalize_radian(angle - g.rotation) * self.rotate_mix;
            if self.rotate_mode == RotateMode::ChainScale && length > 0.0 {
                let reach = point.distance(&next);
                g.scale_x *= 1.0 + (reach / length - 1.0) * self.rotate_mix;
            }
            g.to_matrix(&mut bone.global_matrix);
            bone.children_dirty = true;
            distance += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoneData;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn mk_bone(index: usize, parent: Option<usize>, x: f32, y: f32, length: f32) -> Bone {
        let mut data = BoneData::new(format!("b{index}"));
        data.parent = parent;
        data.transform.x = x;
        data.transform.y = y;
        data.length = length;
        let mut bone = Bone::new(index, &data);
        bone.compute_global(None, false, false);
        bone
    }

    fn mk_ik(target: usize, bone: usize, root: usize, weight: f32) -> IkConstraint {
        IkConstraint::new(&IkConstraintData {
            name: "ik".into(),
            order: 0,
            target,
            bone,
            root,
            bend_positive: true,
            scale_enabled: false,
            weight,
        })
    }

    /// it should point a single bone at its target
    #[test]
    fn single_bone_faces_target() {
        let mut bones = vec![mk_bone(0, None, 0.0, 0.0, 10.0), mk_bone(1, None, 0.0, 10.0, 0.0)];
        mk_ik(1, 0, 0, 1.0).apply(&mut bones);
        approx(bones[0].global.rotation, std::f32::consts::FRAC_PI_2, 1e-5);
        assert!(bones[0].children_dirty);
    }

    /// it should rotate only part of the way at half weight
    #[test]
    fn weight_scales_rotation() {
        let mut bones = vec![mk_bone(0, None, 0.0, 0.0, 10.0), mk_bone(1, None, 0.0, 10.0, 0.0)];
        mk_ik(1, 0, 0, 0.5).apply(&mut bones);
        approx(bones[0].global.rotation, std::f32::consts::FRAC_PI_4, 1e-5);
    }

    /// it should reach a target inside the two-bone span
    #[test]
    fn two_bone_chain_reaches_target() {
        // root at origin, child 10 units along x, both 10 long
        let mut bones = vec![
            mk_bone(0, None, 0.0, 0.0, 10.0),
            mk_bone(1, Some(0), 10.0, 0.0, 10.0),
            mk_bone(2, None, 12.0, 8.0, 0.0),
        ];
        mk_ik(2, 1, 0, 1.0).apply(&mut bones);
        let child = &bones[1];
        let tip_x = child.global.x + child.global.rotation.cos() * 10.0;
        let tip_y = child.global.y + child.global.rotation.sin() * 10.0;
        approx(tip_x, 12.0, 1e-2);
        approx(tip_y, 8.0, 1e-2);
    }
}
