//! Consumer surfaces: today view, progress dashboard, trophy case, and the
//! weekly digest assembly used by the scheduled job.
//!
//! Each service performs one batched window read, runs the pure engine, and
//! returns a plain DTO. A fetch failure degrades to an empty window (every
//! date classifies as empty, every sum is zero) — the engine never throws.

pub mod digest;
pub mod progress;
pub mod today;
pub mod trophies;

use chrono::NaiveDate;

use crate::db::HabitDb;
use crate::engine::EngineWindow;

/// Fetch a window, degrading to empty on any store failure.
fn window_or_empty(db: &HabitDb, start: NaiveDate, end: NaiveDate) -> EngineWindow {
    match db.fetch_window(start, end) {
        Ok(window) => window,
        Err(e) => {
            log::warn!("Window fetch failed, degrading to empty window: {e}");
            EngineWindow::empty()
        }
    }
}
