//! Raster helpers used by validation and thumbnail derivation.
//!
//! Everything here is synchronous and CPU-bound; callers run it on the
//! blocking thread pool.

pub mod codec;
pub mod resize;

pub use codec::ImageCodec;
pub use resize::ImageResize;
