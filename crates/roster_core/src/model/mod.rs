//! Domain model for roster records.
//!
//! # Responsibility
//! - Define the `Entity` contract shared by every stored record type.
//! - Define the concrete `Member` and `Team` records.
//!
//! # Invariants
//! - Identifiers are assigned by the store on first insert and never change.
//! - Audit timestamps are owned by the store, never by callers.
//! - Deletion is a hard delete; there are no tombstoned rows.

pub mod entity;
pub mod member;
pub mod team;
pub mod validation;
