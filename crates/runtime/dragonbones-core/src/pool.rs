//! Object reuse for transient runtime objects.
//!
//! Two flavours:
//! - [`Pool`]: a generational arena. Values live in slots and are addressed by
//!   [`Handle`]; releasing a slot clears the value and bumps its generation so
//!   stale handles resolve to `None` instead of aliasing the next occupant.
//! - [`ObjectPool`]: a by-value free list for objects that leave the owner
//!   (buffered events, recycled armatures).
//!
//! Both call [`Poolable::clear`] before a value becomes reusable. Pools grow on
//! demand and only shrink on an explicit `clear`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Reset contract for pooled values. `clear` must drop every owned reference and
/// restore every field to its default so a reused value carries no stale state.
pub trait Poolable: Default {
    fn clear(&mut self);
}

/// Generational index into a [`Pool`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    generation: u32,
    live: bool,
}

/// Generational arena of poolable values.
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Borrow a cleared value, reusing a released slot when one exists.
    pub fn acquire(&mut self) -> Handle<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.live = true;
            return Handle::new(index, entry.generation);
        }
        let index = self.entries.len() as u32;
        if self.entries.len() == self.entries.capacity() {
            log::debug!("pool grows past {} entries", self.entries.len());
        }
        self.entries.push(Entry {
            value: T::default(),
            generation: 0,
            live: true,
        });
        Handle::new(index, 0)
    }

    /// Clear the value and make its slot reusable. Returns false for stale handles.
    pub fn release(&mut self, handle: Handle<T>) -> bool {
        let Some(entry) = self.entries.get_mut(handle.index()) else {
            return false;
        };
        if !entry.live || entry.generation != handle.generation {
            return false;
        }
        entry.value.clear();
        entry.live = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        true
    }

    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.entries
            .get(handle.index())
            .filter(|e| e.live && e.generation == handle.generation)
            .map(|e| &e.value)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.entries
            .get_mut(handle.index())
            .filter(|e| e.live && e.generation == handle.generation)
            .map(|e| &mut e.value)
    }

    /// Number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Released slots waiting for reuse.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Release every live value.
    pub fn release_all(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.live {
                entry.value.clear();
                entry.live = false;
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }
}

/// By-value free list.
#[derive(Debug)]
pub struct ObjectPool<T: Poolable> {
    free: Vec<T>,
    max_count: usize,
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            max_count: usize::MAX,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            max_count: usize::MAX,
        }
    }

    /// Cap the number of idle objects kept around; surplus returns are dropped.
    pub fn set_max_count(&mut self, max_count: usize) {
        self.max_count = max_count;
        self.free.truncate(max_count);
    }

    /// A cleared object, freshly built when the free list is empty.
    #[inline]
    pub fn borrow_object(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    pub fn return_object(&mut self, mut object: T) {
        object.clear();
        if self.free.len() < self.max_count {
            self.free.push(object);
        }
    }

    #[inline]
    pub fn idle_count(&self) -> usize {
        self.free.len()
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}
