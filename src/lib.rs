//! Contact Search Library
//!
//! Geometric contact search and contact evaluation for beam discretizations:
//! k-DOP binary trees over slave and master elements, a distributed collision
//! search behind a communicator interface, Newton point-to-curve projection
//! with first and second order sensitivities, and penalty contact pairs that
//! assemble force and stiffness into a global sparse system.

pub mod config;
pub mod contact;
pub mod error;
pub mod fad;
pub mod io;
pub mod mesh;
pub mod projection;
pub mod search;

pub use error::{ContactSearchError, Result};
