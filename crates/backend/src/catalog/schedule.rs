//! Monthly feed refresh scheduling.
//!
//! The refresh runs at 03:00 on the first of each month, shop-local time.
//! A failed run is logged and otherwise ignored; the previously published
//! snapshot stays authoritative until a run succeeds.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::task::JoinHandle;

use super::CatalogRefresher;

/// Refresh cron expression (sec min hour day-of-month month day-of-week).
pub const REFRESH_SCHEDULE: &str = "0 0 3 1 * *";

/// Timezone the schedule is evaluated in.
pub const REFRESH_TZ: Tz = chrono_tz::Europe::Moscow;

/// Arm the monthly refresh task.
pub fn spawn_monthly_refresh(refresher: Arc<CatalogRefresher>) -> JoinHandle<()> {
    let schedule = Schedule::from_str(REFRESH_SCHEDULE).expect("refresh cron expression is valid");

    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(REFRESH_TZ).next() else {
                break;
            };
            let wait = (next.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or_default();
            tracing::info!(next = %next, "next feed refresh scheduled");
            tokio::time::sleep(wait).await;

            match refresher.regenerate().await {
                Ok(()) => tracing::info!("scheduled feed refresh completed"),
                Err(error) => {
                    tracing::error!(error = %error, "scheduled feed refresh failed");
                }
            }
        }
    })
}
