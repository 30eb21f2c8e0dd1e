//! Request schema
//!
//! This module defines the untrusted input accepted at the service boundary.
//! Values here are unchecked; [`crate::normalizer::Normalizer`] turns them into
//! a validated [`crate::types::Workout`].

mod request;

pub use request::*;
