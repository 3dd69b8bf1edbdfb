//! Outbound adapters implementing the driven ports.
//!
//! - **documents**: JSON document store seam, in-memory store, and typed
//!   repositories built on top of it
//! - **persistence**: PostgreSQL document store using Diesel
//! - **identity**: bearer token verification
//! - **tts**: HTTP text-to-speech client
//!
//! Adapters translate between domain types and infrastructure formats and
//! hold no business rules.

pub mod documents;
pub mod identity;
pub mod persistence;
pub mod tts;
