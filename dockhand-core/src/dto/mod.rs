//! Data Transfer Objects
//!
//! Wire shapes exchanged with API callers and callback endpoints. DTOs are
//! projections of the domain types; they never carry state of their own.

pub mod callback;
pub mod health;
pub mod job;
