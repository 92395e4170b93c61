//! Rampart World Geometry
//!
//! Integer block positions inside named worlds, the 16x16 chunk columns
//! that contain them, and the distance predicates used to decide which
//! claims touch a location.
//!
//! # Distance Semantics
//!
//! - Locations in different worlds are never near each other, whatever the
//!   radius.
//! - Radius checks are inclusive: a block exactly `radius` away is inside.
//! - "Flat" checks ignore the vertical axis entirely.

mod chunk;
mod location;

pub use chunk::ChunkCoord;
pub use location::{BlockLocation, ParseLocationError};

/// Width of a chunk column, in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// log2 of [`CHUNK_WIDTH`], used to derive chunk coordinates by shifting.
pub const CHUNK_SHIFT: u32 = 4;

// Chunk derivation relies on the width being a power of two
const _: () = assert!(1 << CHUNK_SHIFT == CHUNK_WIDTH);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_shift_matches_width() {
        assert_eq!(1 << CHUNK_SHIFT, CHUNK_WIDTH);
    }
}
