//! Member/team use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into roster-level operations.
//! - Build read models (`MemberView`, `MemberDto`) from stored records.

pub mod read_model;
pub mod roster_service;
