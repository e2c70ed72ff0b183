//! Memoized global poses sampled at a fixed frame rate.
//!
//! A record is [`CACHE_RECORD_LEN`] floats: matrix `a, b, c, d, tx, ty` followed by
//! the decomposed `rotation, skew, scale_x, scale_y`. Per-bone and per-slot index
//! tables map a cache frame to the record offset, `-1` meaning "not sampled yet".
//!
//! The cache is the one mutable part of the otherwise immutable model. It is
//! filled lazily by whichever armature plays the animation first and shared by
//! every armature built from the same data.

use std::cell::RefCell;

use dragonbones_geom::{Matrix, Transform};

pub const CACHE_RECORD_LEN: usize = 10;

#[derive(Debug, Default)]
struct CacheState {
    frame_rate: f32,
    sampled: Vec<bool>,
    bone_records: Vec<Vec<i32>>,
    slot_records: Vec<Vec<i32>>,
    values: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct FrameCache {
    state: RefCell<CacheState>,
}

impl Clone for FrameCache {
    fn clone(&self) -> Self {
        // Clones start cold; the memo is tied to the data instance that filled it.
        Self::default()
    }
}

impl PartialEq for FrameCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl FrameCache {
    /// Allocate tables for `ceil(frame_rate * duration) + 1` frames. No-op once enabled.
    pub fn enable(&self, frame_rate: f32, duration: f32, bone_count: usize, slot_count: usize) {
        let mut s = self.state.borrow_mut();
        if s.frame_rate > 0.0 || frame_rate <= 0.0 {
            return;
        }
        let frames = (frame_rate * duration).ceil() as usize + 1;
        s.frame_rate = frame_rate;
        s.sampled = vec![false; frames];
        s.bone_records = vec![vec![-1; frames]; bone_count];
        s.slot_records = vec![vec![-1; frames]; slot_count];
        s.values.clear();
    }

    #[inline]
    pub fn frame_rate(&self) -> f32 {
        self.state.borrow().frame_rate
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.state.borrow().sampled.len()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.frame_rate() > 0.0
    }

    pub fn is_sampled(&self, frame: usize) -> bool {
        self.state.borrow().sampled.get(frame).copied().unwrap_or(false)
    }

    pub fn mark_sampled(&self, frame: usize) {
        if let Some(flag) = self.state.borrow_mut().sampled.get_mut(frame) {
            *flag = true;
        }
    }

    pub fn bone_record(&self, bone: usize, frame: usize) -> i32 {
        let s = self.state.borrow();
        s.bone_records
            .get(bone)
            .and_then(|r| r.get(frame))
            .copied()
            .unwrap_or(-1)
    }

    pub fn slot_record(&self, slot: usize, frame: usize) -> i32 {
        let s = self.state.borrow();
        s.slot_records
            .get(slot)
            .and_then(|r| r.get(frame))
            .copied()
            .unwrap_or(-1)
    }

    /// Store a bone pose for `frame` and return its record offset.
    pub fn store_bone(&self, bone: usize, frame: usize, matrix: &Matrix, global: &Transform) -> i32 {
        let mut s = self.state.borrow_mut();
        let offset = push_record(&mut s.values, matrix, global);
        if let Some(slot) = s.bone_records.get_mut(bone).and_then(|r| r.get_mut(frame)) {
            *slot = offset;
        }
        offset
    }

    pub fn store_slot(&self, slot: usize, frame: usize, matrix: &Matrix, global: &Transform) -> i32 {
        let mut s = self.state.borrow_mut();
        let offset = push_record(&mut s.values, matrix, global);
        if let Some(entry) = s.slot_records.get_mut(slot).and_then(|r| r.get_mut(frame)) {
            *entry = offset;
        }
        offset
    }

    /// Point `frame` of `bone` at an existing record (pose unchanged since it was stored).
    pub fn link_bone(&self, bone: usize, frame: usize, offset: i32) {
        if let Some(entry) = self
            .state
            .borrow_mut()
            .bone_records
            .get_mut(bone)
            .and_then(|r| r.get_mut(frame))
        {
            *entry = offset;
        }
    }

    pub fn link_slot(&self, slot: usize, frame: usize, offset: i32) {
        if let Some(entry) = self
            .state
            .borrow_mut()
            .slot_records
            .get_mut(slot)
            .and_then(|r| r.get_mut(frame))
        {
            *entry = offset;
        }
    }

    /// Copy the record at `offset` out. Returns false when the offset is invalid.
    pub fn read(&self, offset: i32, matrix: &mut Matrix, global: &mut Transform) -> bool {
        let s = self.state.borrow();
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        let Some(r) = s.values.get(start..start + CACHE_RECORD_LEN) else {
            return false;
        };
        matrix.a = r[0];
        matrix.b = r[1];
        matrix.c = r[2];
        matrix.d = r[3];
        matrix.tx = r[4];
        matrix.ty = r[5];
        global.rotation = r[6];
        global.skew = r[7];
        global.scale_x = r[8];
        global.scale_y = r[9];
        global.x = matrix.tx;
        global.y = matrix.ty;
        true
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.state.borrow().values.len() / CACHE_RECORD_LEN
    }
}

fn push_record(values: &mut Vec<f32>, matrix: &Matrix, global: &Transform) -> i32 {
    let offset = values.len() as i32;
    values.extend_from_slice(&[
        matrix.a,
        matrix.b,
        matrix.c,
        matrix.d,
        matrix.tx,
        matrix.ty,
        global.rotation,
        global.skew,
        global.scale_x,
        global.scale_y,
    ]);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_round_trip_through_offsets() {
        let cache = FrameCache::default();
        cache.enable(10.0, 1.0, 2, 1);
        assert_eq!(cache.frame_count(), 11);
        assert_eq!(cache.bone_record(1, 3), -1);

        let m = Matrix::new(1.0, 0.5, -0.5, 1.0, 4.0, 2.0);
        let t = Transform {
            x: 4.0,
            y: 2.0,
            skew: 0.0,
            rotation: 0.46,
            scale_x: 1.1,
            scale_y: 1.1,
        };
        let offset = cache.store_bone(1, 3, &m, &t);
        assert_eq!(cache.bone_record(1, 3), offset);

        let mut m2 = Matrix::IDENTITY;
        let mut t2 = Transform::IDENTITY;
        assert!(cache.read(offset, &mut m2, &mut t2));
        assert_eq!(m2, m);
        assert_eq!(t2, t);
    }

    #[test]
    fn enable_is_sticky() {
        let cache = FrameCache::default();
        cache.enable(24.0, 1.0, 1, 1);
        cache.enable(60.0, 1.0, 1, 1);
        assert_eq!(cache.frame_rate(), 24.0);
    }
}
