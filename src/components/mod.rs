//! Data types attached to the world.
//!
//! Submodules overview:
//! - [`timer`] – countdown/repeat timer, its builder, handle and snapshot
//! - [`typingeffect`] – text revealed progressively by a scheduler timer

pub mod timer;
pub mod typingeffect;
