//! A library for working with the file-types of the Nintendo DS version of Phantasy Star Zero.
//!
//! Only the container layers are handled here: getting named, raw files out of the game's compressed archives. What
//! those files contain (Nitro models, textures, animations) is left to the caller.

pub mod extract;

pub use crate::extract::*;
