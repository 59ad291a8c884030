// Daily self-update of svtplay-dl

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const UPDATE_PROGRAM: &str = "pip";
const UPDATE_ARGS: [&str; 3] = [
    "install",
    "--upgrade",
    "git+https://github.com/spaam/svtplay-dl.git",
];
const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Fires once per day at a fixed local time.
/// Starting after today's slot means the first run is tomorrow.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    at: NaiveTime,
    last_run: Option<NaiveDate>,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        let last_run = (now.time() >= at).then(|| now.date());
        Self { at, last_run }
    }

    /// True at most once per calendar day, on the first check at or after `at`
    pub fn is_due(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if now.time() >= self.at && self.last_run != Some(today) {
            self.last_run = Some(today);
            return true;
        }
        false
    }
}

/// Upgrade svtplay-dl through pip. Failures are logged only.
pub async fn update_downloader() {
    tracing::info!("Updating svtplay-dl");
    match run_update().await {
        Ok(()) => tracing::info!("svtplay-dl updated successfully"),
        Err(e) => tracing::error!("Failed to update svtplay-dl: {:#}", e),
    }
}

async fn run_update() -> Result<()> {
    let output = Command::new(UPDATE_PROGRAM)
        .args(UPDATE_ARGS)
        .output()
        .await
        .with_context(|| format!("Failed to run {}", UPDATE_PROGRAM))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} exited with {}: {}", UPDATE_PROGRAM, output.status, stderr.trim());
    }
    Ok(())
}

/// Check the schedule once a minute until cancelled
pub async fn run_scheduler(at: NaiveTime, cancel: CancellationToken) {
    let mut schedule = DailySchedule::new(at, Local::now().naive_local());
    tracing::info!("Downloader update scheduled daily at {}", at.format("%H:%M"));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Update scheduler received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(CHECK_INTERVAL) => {
                if schedule.is_due(Local::now().naive_local()) {
                    update_downloader().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: (i32, u32, u32), hm: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(hm.0, hm.1, 0)
            .unwrap()
    }

    #[test]
    fn test_starting_before_slot_runs_same_day() {
        let two_am = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        let mut schedule = DailySchedule::new(two_am, at((2026, 10, 18), (1, 30)));

        assert!(!schedule.is_due(at((2026, 10, 18), (1, 59))));
        assert!(schedule.is_due(at((2026, 10, 18), (2, 0))));
        assert!(!schedule.is_due(at((2026, 10, 18), (2, 1))));
        assert!(!schedule.is_due(at((2026, 10, 18), (23, 59))));
        assert!(!schedule.is_due(at((2026, 10, 19), (1, 0))));
        assert!(schedule.is_due(at((2026, 10, 19), (2, 1))));
    }

    #[test]
    fn test_starting_after_slot_waits_until_tomorrow() {
        let two_am = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        let mut schedule = DailySchedule::new(two_am, at((2026, 10, 18), (10, 0)));

        assert!(!schedule.is_due(at((2026, 10, 18), (10, 1))));
        assert!(schedule.is_due(at((2026, 10, 19), (2, 0))));
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            cancel.clone(),
        ));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
