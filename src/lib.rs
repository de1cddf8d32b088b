//! Momentum: consistency scoring and streak engine for daily routines.
//!
//! The crate splits along one seam:
//! - [`engine`] is pure computation — date normalization, schedule
//!   filtering, day classification, streaks, period rollups, milestones,
//!   and the weekly digest. It performs no I/O and has no failure modes.
//! - Everything else is the I/O shell: the SQLite store ([`db`]), the
//!   consumer surfaces ([`services`]), the job loop ([`scheduler`]), and
//!   push delivery ([`notification`]).
//!
//! Callers fetch one batched window per recomputation and hand the engine
//! plain data, so every surface — and the UI-less digest job — produces
//! byte-identical results for the same inputs.

pub mod db;
pub mod engine;
pub mod error;
pub mod notification;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod types;
