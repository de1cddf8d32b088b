//! momentumd: runs the scheduled reminder and weekly-digest jobs.

use std::sync::Arc;

use momentum_lib::scheduler::Scheduler;
use momentum_lib::state::AppState;

#[tokio::main]
async fn main() {
    env_logger::init();

    let state = Arc::new(AppState::new());
    log::info!("momentumd started");

    Scheduler::new(state).run().await;
}
