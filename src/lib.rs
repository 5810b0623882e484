//! Traffic Junction Library
//!
//! Thread-based coordination of vehicles crossing signalled intersections.

pub mod simulation;
