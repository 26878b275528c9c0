//! zenflow-core - Core library for ZenFlow
//!
//! Local-first storage for moods, habits, focus sessions, gratitude entries
//! and settings, a versioned backup codec, and the cloud sync engine that
//! keeps one backup document per user in Supabase.

pub mod auth;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Collection, Record};
