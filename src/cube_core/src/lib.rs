#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_panics_doc
)]

//! The model of an n×n×n twisty cube: facelets, configurations, twists and state keys.

pub mod cube;
pub mod encoding;
pub mod facelet;
pub mod rotation;

pub use cube::{Cube, FaceGrid, MAX_SIZE, OBSERVATION_ORDER, Validation};
pub use encoding::{StateKey, decode, encode};
pub use facelet::{Color, Facelet};
pub use rotation::{Action, Direction, TwistEngine, max_slice};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CubeError {
    #[error("Cube size must be between 2 and {MAX_SIZE} but was {0}")]
    InvalidSize(usize),
    #[error("{0} is not a valid face, expected 0 through 5")]
    InvalidFace(u8),
    #[error("{0} is not a valid direction. Anticlockwise: 0, Clockwise: 1")]
    InvalidDirection(u8),
    #[error(
        "Max slice distance from face for cube of length {n} is {max} but was passed {slice}"
    )]
    InvalidSlice { slice: u8, max: u8, n: usize },
    #[error("Twists for a cube of length {engine} cannot be applied to a cube of length {cube}")]
    SizeMismatch { engine: usize, cube: usize },
    #[error("Expected {expected} values but found {found}")]
    MalformedShape { expected: usize, found: usize },
    #[error("{0} does not name a face")]
    InvalidFaceletValue(u8),
    #[error("Found {count} {facelet} facelets where a reachable cube has exactly {expected}")]
    ConservationViolated {
        facelet: Facelet,
        count: usize,
        expected: usize,
    },
}
