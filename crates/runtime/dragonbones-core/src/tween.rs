//! Keyframe easing and sampling.
//!
//! Frames carry their own tween kind, applied over the segment that starts at
//! that frame. The segment after the last frame wraps to the first frame so
//! looping timelines blend seamlessly.
//!
//! - `ease(tween, t)`: eased progress in [0,1] for one segment.
//! - `find_frame(frames, time)`: index of the frame active at `time` (seconds).
//! - `sample(frames, time, wrap)`: interpolated value at `time`.

use std::f32::consts::PI;

use dragonbones_geom::ColorTransform;

/// Segment easing. Quadratic kinds carry a blend factor between linear and the full curve.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Tween {
    /// Hold the frame value until the next frame.
    #[default]
    None,
    Line,
    /// Piecewise cubic bezier: `[c1x, c1y, c2x, c2y, (px, py, c1x, c1y, c2x, c2y)*]`
    /// between the implicit anchors (0,0) and (1,1).
    Curve(Vec<f32>),
    QuadIn(f32),
    QuadOut(f32),
    QuadInOut(f32),
}

impl Tween {
    #[inline]
    pub fn is_tweened(&self) -> bool {
        !matches!(self, Tween::None)
    }
}

/// A keyframe positioned in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame<T> {
    pub position: f32,
    pub duration: f32,
    pub tween: Tween,
    pub value: T,
}

impl<T> Frame<T> {
    pub fn new(position: f32, duration: f32, tween: Tween, value: T) -> Self {
        Self {
            position,
            duration,
            tween,
            value,
        }
    }
}

/// Values that can be blended between two keyframes.
pub trait Lerp: Clone {
    fn lerp(&self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, to: &Self, t: f32) -> Self {
        lerp_f32(*self, *to, t)
    }
}

impl Lerp for [f32; 2] {
    #[inline]
    fn lerp(&self, to: &Self, t: f32) -> Self {
        [lerp_f32(self[0], to[0], t), lerp_f32(self[1], to[1], t)]
    }
}

impl Lerp for ColorTransform {
    #[inline]
    fn lerp(&self, to: &Self, t: f32) -> Self {
        ColorTransform::lerp(self, to, t)
    }
}

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Eased y of one bezier segment from (x0,y0) to (x3,y3), found by inverting x with a binary search.
fn bezier_segment(x: f32, p0: [f32; 2], c1: [f32; 2], c2: [f32; 2], p3: [f32; 2]) -> f32 {
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let span = (p3[0] - p0[0]).max(f32::EPSILON);
    let mut mid = ((x - p0[0]) / span).clamp(0.0, 1.0);
    for _ in 0..24 {
        let bx = cubic_bezier(p0[0], c1[0], c2[0], p3[0], mid);
        if (bx - x).abs() < 1e-6 {
            break;
        }
        if bx < x {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(p0[1], c1[1], c2[1], p3[1], mid)
}

fn curve_value(t: f32, curve: &[f32]) -> f32 {
    if curve.len() < 4 {
        return t;
    }
    let mut p0 = [0.0f32, 0.0];
    let mut offset = 0;
    loop {
        let c1 = [curve[offset], curve[offset + 1]];
        let c2 = [curve[offset + 2], curve[offset + 3]];
        let next = offset + 4;
        let p3 = if next + 1 < curve.len() {
            [curve[next], curve[next + 1]]
        } else {
            [1.0, 1.0]
        };
        let has_more = next + 5 < curve.len();
        if t <= p3[0] || !has_more {
            return bezier_segment(t, p0, c1, c2, p3);
        }
        p0 = p3;
        offset = next + 2;
    }
}

/// Eased progress of `t` in [0,1].
pub fn ease(tween: &Tween, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let (value, easing) = match tween {
        Tween::None => return 0.0,
        Tween::Line => return t,
        Tween::Curve(curve) => return curve_value(t, curve),
        Tween::QuadIn(e) => (t * t, *e),
        Tween::QuadOut(e) => (1.0 - (1.0 - t) * (1.0 - t), *e),
        Tween::QuadInOut(e) => (0.5 * (1.0 - (t * PI).cos()), *e),
    };
    (value - t) * easing + t
}

/// Index of the frame whose segment contains `time`. Times before the first frame map to it.
pub fn find_frame<T>(frames: &[Frame<T>], time: f32) -> Option<usize> {
    if frames.is_empty() {
        return None;
    }
    let idx = frames.partition_point(|f| f.position <= time);
    Some(idx.saturating_sub(1))
}

/// Tween progress inside frame `index` at `time`, 0 for held frames.
pub fn segment_progress<T>(frames: &[Frame<T>], index: usize, time: f32) -> f32 {
    let frame = &frames[index];
    if !frame.tween.is_tweened() || frame.duration <= 0.0 || frames.len() < 2 {
        return 0.0;
    }
    ease(&frame.tween, (time - frame.position) / frame.duration)
}

/// Interpolated value at `time`. With `wrap`, the last frame tweens toward the first;
/// otherwise it holds.
pub fn sample<T: Lerp>(frames: &[Frame<T>], time: f32, wrap: bool) -> Option<T> {
    let index = find_frame(frames, time)?;
    let frame = &frames[index];
    if index + 1 == frames.len() && !wrap {
        return Some(frame.value.clone());
    }
    let progress = segment_progress(frames, index, time);
    if progress == 0.0 {
        return Some(frame.value.clone());
    }
    let next = &frames[(index + 1) % frames.len()];
    Some(frame.value.lerp(&next.value, progress))
}

/// Held value at `time` (step semantics).
pub fn sample_step<T: Clone>(frames: &[Frame<T>], time: f32) -> Option<T> {
    find_frame(frames, time).map(|i| frames[i].value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn frames(values: &[(f32, f32, f32)], tween: Tween) -> Vec<Frame<f32>> {
        values
            .iter()
            .map(|(pos, dur, v)| Frame::new(*pos, *dur, tween.clone(), *v))
            .collect()
    }

    #[test]
    fn linear_sampling_between_frames() {
        let f = frames(&[(0.0, 0.5, 0.0), (0.5, 0.5, 10.0)], Tween::Line);
        approx(sample(&f, 0.25, true).unwrap(), 5.0, 1e-5);
        approx(sample(&f, 0.5, true).unwrap(), 10.0, 1e-5);
    }

    #[test]
    fn last_frame_wraps_to_first() {
        let f = frames(&[(0.0, 0.5, 0.0), (0.5, 0.5, 10.0)], Tween::Line);
        approx(sample(&f, 0.75, true).unwrap(), 5.0, 1e-5);
        approx(sample(&f, 0.75, false).unwrap(), 10.0, 1e-5);
    }

    #[test]
    fn held_frames_step() {
        let f = frames(&[(0.0, 0.5, 1.0), (0.5, 0.5, 2.0)], Tween::None);
        approx(sample(&f, 0.49, true).unwrap(), 1.0, 0.0);
        approx(sample(&f, 0.5, true).unwrap(), 2.0, 0.0);
    }

    #[test]
    fn quad_easing_bends_toward_curve() {
        approx(ease(&Tween::QuadIn(1.0), 0.5), 0.25, 1e-6);
        approx(ease(&Tween::QuadOut(1.0), 0.5), 0.75, 1e-6);
        approx(ease(&Tween::QuadInOut(1.0), 0.5), 0.5, 1e-6);
        approx(ease(&Tween::QuadIn(0.0), 0.3), 0.3, 1e-6);
    }

    #[test]
    fn linear_curve_matches_line() {
        let curve = Tween::Curve(vec![0.25, 0.25, 0.75, 0.75]);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            approx(ease(&curve, t), t, 1e-3);
        }
    }

    #[test]
    fn ease_in_curve_lags_linear() {
        let curve = Tween::Curve(vec![0.42, 0.0, 1.0, 1.0]);
        assert!(ease(&curve, 0.3) < 0.3);
        approx(ease(&curve, 1.0), 1.0, 1e-4);
    }

    #[test]
    fn find_frame_before_first_clamps() {
        let f = frames(&[(0.1, 0.5, 1.0), (0.6, 0.5, 2.0)], Tween::None);
        assert_eq!(find_frame(&f, 0.0), Some(0));
        assert_eq!(find_frame(&f, 0.7), Some(1));
        assert_eq!(find_frame::<f32>(&[], 0.7), None);
    }
}
