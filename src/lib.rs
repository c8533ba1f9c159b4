//! An encoder for ETC1, ETC2 and EAC compressed textures.
//!
//! Images are split into 4x4 tiles. Every tile gets a cheap initial encoding,
//! after which the worst tiles are searched further until a fraction of all
//! tiles (given by the effort) cannot improve anymore. The result is one
//! packed block per tile in the standard bit layout of the format.
//!
//! ```no_run
//! use etcenc::{encode, EncodeOptions, Format};
//!
//! let pixels = vec![[0.2, 0.5, 0.8, 1.0]; 64 * 64];
//! let mut options = EncodeOptions::default();
//! options.format = Format::RGB8;
//! options.effort = 60.0;
//!
//! let encoded = encode(&pixels, 64, 64, &options);
//! assert!(!encoded.status.is_error());
//! let blocks = encoded.into_result().unwrap();
//! assert_eq!(blocks.len(), 16 * 16 * 8);
//! ```

#![forbid(unsafe_code)]

mod block;
mod color;
mod decode;
mod encode;
mod error;
mod format;
mod image;
mod metric;
mod progress;
mod sorted;
mod status;
mod tile;

pub use block::BlockMode;
pub use decode::*;
pub use encode::{
    encode, encode_with_progress, EncodeOptions, Encoded, DEFAULT_EFFORT, DEFAULT_JOBS,
    MAX_EFFORT, MAX_JOBS, MIN_EFFORT,
};
pub use error::*;
pub use format::*;
pub use image::Image;
pub use metric::*;
pub use progress::Progress;
pub use status::*;
pub use tile::*;
