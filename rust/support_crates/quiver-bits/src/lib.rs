//! Bitmap primitives for validity and boolean buffers.
//!
//! All bitmaps are least-significant-bit first: bit `i` lives in byte `i / 8`
//! at position `i % 8`. A set bit marks a valid (non-null) element, or a
//! `true` boolean value.

pub mod bitmap;
pub mod builder;
pub mod iter;

pub use bitmap::*;
pub use builder::BitmapBuilder;
pub use iter::{BitIndexIterator, BitIterator, SetBitRunIterator};
