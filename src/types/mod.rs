//! Types that are used across the components of the round state, but have no PBFT-specific behavior.
//!
//! Types specific to collecting votes can be found in [`crate::round::types`].

pub mod basic;

pub mod validators;
