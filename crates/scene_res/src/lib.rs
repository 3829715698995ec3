#![warn(clippy::all)]

//! A safe generational arena.
//!
//! The render core never holds a pointer into asset storage, only a
//! `Handle<T>` (slot index + generation). Handles are `Copy`, have no
//! destructor, and a stale handle (from a freed and reused slot) is detected
//! rather than dereferenced.

pub mod arena;
pub mod handle;

pub use arena::Arena;
pub use handle::Handle;
