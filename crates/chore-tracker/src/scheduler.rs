//! Periodic overdue check.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::service::ChoreService;

/// Run [`ChoreService::check_overdue`] now and then every `interval` until
/// `shutdown` resolves.
///
/// Failed checks are logged and retried on the next tick.
pub async fn run_scheduler<F>(service: Arc<ChoreService>, interval: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    info!("Overdue checks every {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Scheduler shutting down");
                break;
            }
            _ = ticker.tick() => {
                let svc = Arc::clone(&service);
                match tokio::task::spawn_blocking(move || svc.check_overdue(Utc::now())).await {
                    Ok(Ok(report)) => debug!(
                        "Overdue check done: {} overdue, {} reset",
                        report.marked_overdue.len(),
                        report.reset_to_pending.len()
                    ),
                    Ok(Err(err)) => error!("Overdue check failed: {}", err),
                    Err(err) => error!("Overdue check task panicked: {}", err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::testing::RecordingSink;
    use crate::service::{AddChore, ServiceOptions};
    use crate::storage::ChoreStore;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_scheduler_checks_once_then_stops() {
        let sink = Arc::new(RecordingSink::default());
        let service = Arc::new(ChoreService::new(
            ChoreStore::in_memory(),
            sink.clone(),
            ServiceOptions::default(),
        ));
        service
            .add_chore(AddChore {
                due_date: NaiveDate::from_ymd_opt(2000, 1, 1),
                ..AddChore::new("Ancient")
            })
            .unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(run_scheduler(
            Arc::clone(&service),
            Duration::from_secs(3600),
            async move {
                let _ = rx.await;
            },
        ));

        // The first tick fires immediately.
        for _ in 0..100 {
            if sink.kinds().contains(&"overdue") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(sink.kinds(), vec!["created", "overdue"]);
    }
}
