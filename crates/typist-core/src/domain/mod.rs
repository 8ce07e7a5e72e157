//! Domain entities for sheet-typist.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no HTTP, no files, no HID device.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer is called the **domain**.  Domain code contains the
//! core business rules, can be compiled and tested on any platform without
//! external setup, and is depended on by outer layers but never depends on
//! them.  Here the rules are: how a spreadsheet row is shaped, how its
//! timestamp and vehicle fields are rewritten before typing, and which fields
//! identify a ticket for deduplication.

/// Stable dedup key derived from selected fields.
pub mod entry_id;

/// Ordered field→value rows and the header-aligned sheet snapshot.
pub mod row;

/// Pure per-field rewrites applied before typing.
pub mod transform;
