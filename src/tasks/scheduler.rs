use anyhow::Result;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::shutdown::{shutdown_signal, Shutdown};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::jobs as job_rows;
use crate::tasks::jobs;
use crate::tasks::schedule::{ScheduleEntry, SCHEDULE};

/// Longest single sleep of the cron loop, so clock jumps are noticed.
const MAX_SCHEDULER_SLEEP: Duration = Duration::from_secs(60);

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown, shutdown_rx) = Shutdown::new();
    let concurrency = state.settings().jobs().worker_concurrency;

    let mut handles = Vec::with_capacity(concurrency + 1);
    for worker in 0..concurrency {
        handles.push(tokio::spawn(job_worker(worker, state.clone(), shutdown_rx.clone())));
    }
    handles.push(tokio::spawn(cron_loop(state.clone(), shutdown_rx.clone())));

    tracing::info!(workers = concurrency, "Job runner started");

    shutdown_signal().await;
    shutdown.trigger();

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn job_worker(worker: usize, state: AppState, mut shutdown: watch::Receiver<bool>) {
    let poll_interval = state.settings().jobs().poll_interval();

    loop {
        if *shutdown.borrow() {
            break;
        }

        match job_rows::claim_next(state.db(), primitive_now_utc()).await {
            Ok(Some(job)) => {
                tracing::debug!(worker, job_id = %job.id, "Job claimed");
                jobs::execute(&state, job).await;
                continue;
            }
            Ok(None) => {}
            Err(err) => tracing::error!(worker, error = %err, "Failed to claim job"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(poll_interval) => {}
        }
    }

    tracing::debug!(worker, "Job worker stopped");
}

async fn cron_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let start = primitive_now_utc();
    let mut upcoming: Vec<(ScheduleEntry, time::PrimitiveDateTime)> =
        SCHEDULE.iter().map(|entry| (*entry, entry.next_after(start))).collect();

    for (entry, fire_at) in &upcoming {
        tracing::info!(kind = entry.kind.as_str(), next = %fire_at, "Scheduled job");
    }

    loop {
        let now = primitive_now_utc();

        for (entry, fire_at) in upcoming.iter_mut() {
            if *fire_at > now {
                continue;
            }

            let dedupe_key = entry.dedupe_key(*fire_at);
            match jobs::enqueue(state.db(), entry.kind, json!({}), None, Some(&dedupe_key)).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!(dedupe_key = %dedupe_key, "Slot already enqueued elsewhere")
                }
                Err(err) => tracing::error!(
                    dedupe_key = %dedupe_key,
                    error = %err,
                    "Failed to enqueue scheduled job"
                ),
            }
            *fire_at = entry.next_after(*fire_at);
        }

        let wait = upcoming
            .iter()
            .map(|(_, fire_at)| *fire_at - now)
            .min()
            .and_then(|until| Duration::try_from(until).ok())
            .unwrap_or(Duration::ZERO)
            .min(MAX_SCHEDULER_SLEEP);

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(wait) => {}
        }
    }

    tracing::debug!("Cron loop stopped");
}
