//
// spacecp-rs is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License  v3
// as published by the Free Software Foundation.
//
// spacecp-rs is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY.
// See the GNU Lesser General Public License  for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with spacecp-rs. If not, see http://www.gnu.org/licenses/lgpl-3.0.en.html
//
// Copyright (c)  2026 by the spacecp-rs developers
//

//! This module provides the region allocator: a stack-discipline arena which
//! hands out scratch memory to a propagator for the duration of one single
//! propagation step. Memory is never released block by block: everything that
//! has been obtained from a region is reclaimed at once when the region is
//! dropped.
//!
//! # Note
//! A region never talks to the system allocator directly in the common case.
//! It borrows fixed size chunks from a process wide [`ChunkPool`] and bumps a
//! cursor inside the current chunk. Only the requests that would not fit in a
//! chunk are served from the heap (and released as soon as the region dies).

use std::{
    cell::{Cell, RefCell},
    mem::{align_of, size_of},
    ptr::NonNull,
    sync::Mutex,
};

use once_cell::sync::Lazy;

/// The number of bytes in one chunk of region memory
pub const CHUNK_SIZE: usize = 16 * 1024;
/// The maximum number of idle chunks kept by a pool. Chunks returned when the
/// pool is full are given back to the system allocator.
pub const POOL_CAPACITY: usize = 64;
/// The strongest alignment a region is able to honor
pub const MAX_ALIGN: usize = 16;
/// The byte pattern written over recycled memory in debug builds
pub const POISON: u8 = 0xA5;

/// This is the error which is raised when the region (or the heap behind it)
/// is not able to serve a memory request anymore.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq, Hash)]
#[error("resource exhausted: could not allocate {requested} bytes")]
pub struct ResourceExhausted {
    /// How many bytes were requested when the allocation failed
    pub requested: usize,
}

/// The unit of storage of a chunk. Its only purpose is to guarantee the
/// alignment of the chunk memory.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(16))]
struct Block([u8; MAX_ALIGN]);

/// A chunk is an owned slab of heap memory. It is manipulated through a raw
/// pointer (rather than a `Box`) so that handing out disjoint slices of it
/// never requires to borrow the whole chunk.
#[derive(Debug)]
struct Chunk {
    ptr: NonNull<Block>,
    blocks: usize,
}

// SAFETY: a chunk exclusively owns the memory it points to. Moving it to an
// other thread moves that ownership along.
unsafe impl Send for Chunk {}

impl Chunk {
    /// Allocates a fresh chunk able to hold `bytes` bytes
    fn allocate(bytes: usize) -> Result<Self, ResourceExhausted> {
        let blocks = bytes.div_ceil(MAX_ALIGN).max(1);
        let mut storage: Vec<Block> = Vec::new();
        storage
            .try_reserve_exact(blocks)
            .map_err(|_| ResourceExhausted { requested: bytes })?;
        storage.resize(blocks, Block([0; MAX_ALIGN]));

        let raw = Box::into_raw(storage.into_boxed_slice()) as *mut Block;
        // SAFETY: `Box::into_raw` never returns a null pointer
        let ptr = unsafe { NonNull::new_unchecked(raw) };
        Ok(Self { ptr, blocks })
    }
    /// The number of bytes available in this chunk
    fn len(&self) -> usize {
        self.blocks * MAX_ALIGN
    }
    /// Returns a pointer to the byte at offset `offset` in this chunk
    fn at(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset <= self.len());
        // SAFETY: the offset stays within (or one past the end of) the chunk
        unsafe { (self.ptr.as_ptr() as *mut u8).add(offset) }
    }
    /// Overwrites the complete chunk with the poison byte
    fn poison(&mut self) {
        // SAFETY: the chunk owns `len()` bytes starting at `ptr` and nobody
        // else holds a reference to that memory (we have `&mut self`).
        unsafe { std::ptr::write_bytes(self.at(0), POISON, self.len()) }
    }
    /// Returns true iff every byte of the chunk holds the poison pattern
    fn is_poisoned(&self) -> bool {
        // SAFETY: the chunk owns `len()` initialized bytes starting at `ptr`
        let bytes = unsafe { std::slice::from_raw_parts(self.at(0), self.len()) };
        bytes.iter().all(|b| *b == POISON)
    }
}
impl Drop for Chunk {
    fn drop(&mut self) {
        let slice = std::ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.blocks);
        // SAFETY: the pointer was obtained with `Box::into_raw` on a boxed
        // slice of exactly `blocks` elements and is released only once.
        drop(unsafe { Box::from_raw(slice) });
    }
}

/// The chunk pool amortizes the cost of asking the system for memory. It is
/// shared by all regions (across threads) which is why it is guarded by a
/// mutex.
#[derive(Debug)]
pub struct ChunkPool {
    /// The chunks that are ready to be reused
    idle: Mutex<Vec<Chunk>>,
    /// The max number of idle chunks that are kept around
    capacity: usize,
}

static GLOBAL_POOL: Lazy<ChunkPool> = Lazy::new(|| ChunkPool::new(POOL_CAPACITY));

/// Returns a reference to the process wide chunk pool
pub fn global_pool() -> &'static ChunkPool {
    &GLOBAL_POOL
}

impl ChunkPool {
    /// Creates a new pool that keeps at most `capacity` idle chunks
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(vec![]),
            capacity,
        }
    }
    /// Returns the number of chunks currently waiting to be reused
    pub fn idle_chunks(&self) -> usize {
        self.lock().len()
    }
    /// Returns true iff all the idle chunks of this pool have been poisoned.
    /// This is only meaningful in debug builds, release builds never poison
    /// the memory they recycle.
    pub fn idle_chunks_poisoned(&self) -> bool {
        self.lock().iter().all(Chunk::is_poisoned)
    }
    /// Gets a chunk either from the idle list or from the system
    fn acquire(&self) -> Result<Chunk, ResourceExhausted> {
        let recycled = self.lock().pop();
        match recycled {
            Some(chunk) => Ok(chunk),
            None => Chunk::allocate(CHUNK_SIZE),
        }
    }
    /// Gives a chunk back to the pool
    fn release(&self, mut chunk: Chunk) {
        if cfg!(debug_assertions) {
            chunk.poison();
        }
        let mut idle = self.lock();
        if idle.len() < self.capacity {
            idle.push(chunk);
        }
    }
    /// Locks the idle list. A poisoned mutex is of no concern here: the list
    /// of chunks is always in a consistent state.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Chunk>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A region is a scoped handle to temporary memory. All slices handed out by
/// a region borrow the region itself, so the borrow checker guarantees that
/// none of them outlives the region scope.
///
/// # Example
/// ```
/// # use spacecp::Region;
/// let region = Region::new();
/// let seen = region.alloc(10, false);
/// let tmp  = region.alloc(10, 0_i64);
/// seen[3] = true;
/// tmp[3]  = 42;
/// assert!(seen[3]);
/// assert_eq!(42, tmp[3]);
/// ```
#[derive(Debug)]
pub struct Region {
    /// The pool from which the chunks are borrowed
    pool: &'static ChunkPool,
    /// The chunks borrowed from the pool. The last one is the current chunk.
    chunks: RefCell<Vec<Chunk>>,
    /// The offset of the first free byte in the current chunk
    cursor: Cell<usize>,
    /// The memory that was too big to fit in a chunk
    large: RefCell<Vec<Chunk>>,
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl Region {
    /// Opens a new region backed by the global chunk pool
    pub fn new() -> Self {
        Self::with_pool(global_pool())
    }
    /// Opens a new region backed by the given pool
    pub fn with_pool(pool: &'static ChunkPool) -> Self {
        Self {
            pool,
            chunks: RefCell::new(vec![]),
            cursor: Cell::new(0),
            large: RefCell::new(vec![]),
        }
    }
    /// Returns the number of chunks this region is currently holding
    pub fn chunks(&self) -> usize {
        self.chunks.borrow().len()
    }
    /// Allocates a slice of `n` elements all equal to `init`.
    ///
    /// # Panics
    /// Running out of memory in the middle of a propagation is fatal: this
    /// method panics if the request cannot be served. Use `try_alloc` when
    /// the failure must be handled gracefully.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc<T: Copy>(&self, n: usize, init: T) -> &mut [T] {
        match self.try_alloc(n, init) {
            Ok(slice) => slice,
            Err(exhausted) => panic!("{exhausted}"),
        }
    }
    /// Allocates a slice of `n` elements all equal to `init` or tells why
    /// this was impossible.
    #[allow(clippy::mut_from_ref)]
    pub fn try_alloc<T: Copy>(&self, n: usize, init: T) -> Result<&mut [T], ResourceExhausted> {
        assert!(
            align_of::<T>() <= MAX_ALIGN,
            "region memory cannot be aligned on more than {MAX_ALIGN} bytes"
        );
        let bytes = size_of::<T>()
            .checked_mul(n)
            .ok_or(ResourceExhausted {
                requested: usize::MAX,
            })?;

        let ptr = if bytes == 0 {
            NonNull::<T>::dangling().as_ptr()
        } else if bytes > CHUNK_SIZE {
            let chunk = Chunk::allocate(bytes)?;
            let ptr = chunk.at(0) as *mut T;
            self.large.borrow_mut().push(chunk);
            ptr
        } else {
            self.bump(bytes, align_of::<T>())? as *mut T
        };

        for i in 0..n {
            // SAFETY: `ptr` points to `bytes` = n * size_of::<T>() bytes of
            // properly aligned memory that has not been handed out before.
            unsafe { ptr.add(i).write(init) };
        }
        // SAFETY: the memory is initialized, aligned and exclusively reserved
        // for this slice until the region is dropped (the slice borrows the
        // region, hence it cannot outlive it).
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr, n) })
    }
    /// Reserves `bytes` bytes aligned on `align` in the current chunk (or in a
    /// new one when the current chunk is exhausted).
    fn bump(&self, bytes: usize, align: usize) -> Result<*mut u8, ResourceExhausted> {
        let mut chunks = self.chunks.borrow_mut();
        let start = (self.cursor.get() + align - 1) & !(align - 1);

        let fits = chunks.last().map_or(false, |c| start + bytes <= c.len());
        let start = if fits {
            start
        } else {
            chunks.push(self.pool.acquire()?);
            0
        };
        self.cursor.set(start + bytes);
        // there is always a current chunk at this point
        let chunk = chunks.last().ok_or(ResourceExhausted { requested: bytes })?;
        Ok(chunk.at(start))
    }
    /// Releases all memory that was handed out by this region. The region
    /// can be used again afterwards.
    pub fn reset(&mut self) {
        for chunk in self.chunks.get_mut().drain(..) {
            self.pool.release(chunk);
        }
        self.large.get_mut().clear();
        self.cursor.set(0);
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        self.reset();
    }
}
