//! Typed allocation helpers
//!
//! Each helper pushes `count * size_of::<T>()` bytes aligned to
//! `max(8, align_of::<T>())` unless an explicit alignment is given. Returned
//! references borrow the arena, so they cannot outlive a rewind.
//!
//! Values pushed with these helpers are never dropped by the arena; the
//! container helpers return owners that drop their own elements.

use std::mem::MaybeUninit;
use std::ptr::NonNull;

use bytemuck::Zeroable;

use super::Arena;
use crate::error::{MemoryError, MemoryResult};
use crate::pool::{ElementPool, Slot, StaticPool};
use crate::queue::{Queue, StaticQueue};
use crate::storage::StaticStorage;
use crate::vector::{StaticVec, Vector};

/// Default alignment for typed pushes
const MIN_TYPED_ALIGN: usize = 8;

#[inline]
fn typed_align<T>() -> usize {
    align_of::<T>().max(MIN_TYPED_ALIGN)
}

impl Arena {
    fn push_typed<T>(&self, count: usize, align: usize, zero: bool) -> MemoryResult<NonNull<T>> {
        let size = count
            .checked_mul(size_of::<T>())
            .ok_or_else(|| MemoryError::size_overflow("typed arena push"))?;
        let ptr = if zero {
            self.push_zeroed(size, align)?
        } else {
            self.push(size, align)?
        };
        Ok(ptr.cast())
    }

    fn push_uninit_slice<T>(
        &self,
        count: usize,
        align: usize,
        zero: bool,
    ) -> MemoryResult<&mut [MaybeUninit<T>]> {
        let ptr = self.push_typed::<MaybeUninit<T>>(count, align, zero)?;
        // SAFETY: the push handed out `count` exclusive, aligned slots.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), count) })
    }

    /// Zeroed array of `count` elements
    pub fn push_array<T: Zeroable>(&self, count: usize) -> MemoryResult<&mut [T]> {
        self.push_array_aligned(count, typed_align::<T>())
    }

    /// Zeroed array of `count` elements aligned to at least `align`
    ///
    /// # Errors
    ///
    /// [`MemoryError::InvalidAlignment`] if `align` is not a power of two.
    pub fn push_array_aligned<T: Zeroable>(
        &self,
        count: usize,
        align: usize,
    ) -> MemoryResult<&mut [T]> {
        if !align.is_power_of_two() {
            return Err(MemoryError::invalid_alignment(align));
        }
        let ptr = self.push_typed::<T>(count, align.max(align_of::<T>()), true)?;
        // SAFETY: `count` aligned slots, all zero bytes, which is a valid T
        // for Zeroable types.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), count) })
    }

    /// Uninitialised array of `count` elements
    pub fn push_array_no_zero<T>(&self, count: usize) -> MemoryResult<&mut [MaybeUninit<T>]> {
        self.push_uninit_slice(count, typed_align::<T>(), false)
    }

    /// Uninitialised array of `count` elements aligned to at least `align`
    pub fn push_array_no_zero_aligned<T>(
        &self,
        count: usize,
        align: usize,
    ) -> MemoryResult<&mut [MaybeUninit<T>]> {
        if !align.is_power_of_two() {
            return Err(MemoryError::invalid_alignment(align));
        }
        self.push_uninit_slice(count, align.max(align_of::<T>()), false)
    }

    /// Fixed-capacity vector whose buffer is zeroed
    pub fn push_vector<T>(&self, capacity: usize) -> MemoryResult<StaticVec<'_, T>> {
        let buf = self.push_uninit_slice(capacity, typed_align::<T>(), true)?;
        Ok(Vector::from_buffer(buf))
    }

    /// Fixed-capacity vector over an uninitialised buffer
    pub fn push_vector_no_zero<T>(&self, capacity: usize) -> MemoryResult<StaticVec<'_, T>> {
        let buf = self.push_uninit_slice(capacity, typed_align::<T>(), false)?;
        Ok(Vector::from_buffer(buf))
    }

    /// Fixed-capacity element pool whose slots are zeroed
    pub fn push_pool<T>(&self, capacity: usize) -> MemoryResult<StaticPool<'_, T>> {
        let buf = self.push_uninit_slice::<Slot<T>>(capacity, typed_align::<Slot<T>>(), true)?;
        Ok(ElementPool::from_storage(StaticStorage::new(buf)))
    }

    /// Fixed-capacity element pool over uninitialised slots
    pub fn push_pool_no_zero<T>(&self, capacity: usize) -> MemoryResult<StaticPool<'_, T>> {
        let buf = self.push_uninit_slice::<Slot<T>>(capacity, typed_align::<Slot<T>>(), false)?;
        Ok(ElementPool::from_storage(StaticStorage::new(buf)))
    }

    /// Fixed-capacity ring buffer
    pub fn push_queue<T>(&self, capacity: usize) -> MemoryResult<StaticQueue<'_, T>> {
        let buf = self.push_uninit_slice(capacity, typed_align::<T>(), false)?;
        Ok(Queue::from_buffer(buf))
    }

    /// Move `value` into the arena
    pub fn push_value<T>(&self, value: T) -> MemoryResult<&mut T> {
        let ptr = self.push_typed::<T>(1, typed_align::<T>(), false)?;
        // SAFETY: one exclusive, aligned, uninitialised slot.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Copy `values` into the arena
    pub fn push_slice<T: Copy>(&self, values: &[T]) -> MemoryResult<&mut [T]> {
        let ptr = self.push_typed::<T>(values.len(), typed_align::<T>(), false)?;
        // SAFETY: the destination is a fresh region of values.len() slots.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), ptr.as_ptr(), values.len());
            Ok(std::slice::from_raw_parts_mut(ptr.as_ptr(), values.len()))
        }
    }

    /// Copy `s` into the arena
    pub fn push_str(&self, s: &str) -> MemoryResult<&str> {
        let ptr = self.push(s.len(), 1)?;
        // SAFETY: fresh region of s.len() bytes, filled with valid UTF-8.
        unsafe {
            std::ptr::copy_nonoverlapping(s.as_ptr(), ptr.as_ptr(), s.len());
            let bytes = std::slice::from_raw_parts(ptr.as_ptr(), s.len());
            Ok(std::str::from_utf8_unchecked(bytes))
        }
    }
}
