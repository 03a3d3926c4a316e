//! Dockhand Core
//!
//! Core types and abstractions for the Dockhand docking job service.
//!
//! This crate contains:
//! - Domain types: Job lifecycle, docking results, failures, delivery outcomes
//! - DTOs: Wire shapes for the HTTP API and callback payloads
//! - Validation: Request checks performed at admission

pub mod domain;
pub mod dto;
pub mod validation;
