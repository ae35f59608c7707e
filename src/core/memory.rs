// src/core/memory.rs

//! Heap usage accounting for per-connection state.
//!
//! Figures are estimates of the bytes each structure owns on the heap. Container
//! overhead is approximated from capacity and element size; it does not try to model
//! allocator rounding or hash table control bytes exactly.

use crate::core::commands::StoredCmd;
use bytes::Bytes;
use std::collections::HashSet;
use std::mem::size_of;

/// Reports the heap bytes owned by a value, excluding the value's own inline size.
pub trait HeapSize {
    fn heap_size(&self) -> usize;
}

impl HeapSize for Bytes {
    fn heap_size(&self) -> usize {
        self.len()
    }
}

impl HeapSize for String {
    fn heap_size(&self) -> usize {
        self.capacity()
    }
}

impl HeapSize for u64 {
    fn heap_size(&self) -> usize {
        0
    }
}

impl HeapSize for u16 {
    fn heap_size(&self) -> usize {
        0
    }
}

impl HeapSize for StoredCmd<'_> {
    fn heap_size(&self) -> usize {
        self.used_memory()
    }
}

impl<A: HeapSize, B: HeapSize> HeapSize for (A, B) {
    fn heap_size(&self) -> usize {
        self.0.heap_size() + self.1.heap_size()
    }
}

impl<T: HeapSize> HeapSize for Vec<T> {
    fn heap_size(&self) -> usize {
        self.capacity() * size_of::<T>() + self.iter().map(HeapSize::heap_size).sum::<usize>()
    }
}

impl<T: HeapSize> HeapSize for HashSet<T> {
    fn heap_size(&self) -> usize {
        self.capacity() * size_of::<T>() + self.iter().map(HeapSize::heap_size).sum::<usize>()
    }
}

impl<T: HeapSize> HeapSize for Option<Box<T>> {
    fn heap_size(&self) -> usize {
        self.as_ref()
            .map_or(0, |boxed| size_of::<T>() + boxed.heap_size())
    }
}
