//! Work partitioning: (mode, families, window) → sub-window work items.

use chrono::{Duration, NaiveDate};

use cm_domain::config::Config;
use cm_domain::family::Family;
use cm_domain::report::{RunMode, RunRequest};
use cm_domain::window::DateWindow;
use cm_domain::{Error, Result};

/// One unit of parallel dispatch: a single family over a sub-window of at
/// most `max_range_days` days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub family: Family,
    pub window: DateWindow,
}

/// Resolve the run's overall date window from its mode.
pub fn resolve_window(
    request: &RunRequest,
    config: &Config,
    today: NaiveDate,
) -> Result<DateWindow> {
    let window = match request.mode {
        RunMode::Incremental => {
            let lookback = request
                .lookback_days
                .unwrap_or(config.ingest.default_lookback_days);
            if lookback < 0 {
                return Err(Error::Config("lookback must not be negative".into()));
            }
            // The trailing `lookback` days, today included.
            DateWindow::new(
                today - Duration::days(lookback.saturating_sub(1).max(0)),
                today + Duration::days(if lookback == 0 { 0 } else { 1 }),
            )
        }
        RunMode::Refresh => request
            .window
            .ok_or_else(|| Error::Config("refresh mode requires a date window".into()))?,
        RunMode::Bulk => DateWindow::new(
            config.ingest.date_ranges.min_date,
            today + Duration::days(1),
        ),
    };

    Ok(window.clamp_start(config.ingest.date_ranges.min_date))
}

/// Split the resolved window into per-family sub-windows.
///
/// Items come out in stable family order, and oldest-window-first within a
/// family; workers drain the queue front-to-back, which realizes the
/// scheduler's tie-breaking rules.
pub fn partition(request: &RunRequest, config: &Config, today: NaiveDate) -> Result<Vec<WorkItem>> {
    let window = resolve_window(request, config, today)?;
    let max_days = config.ingest.date_ranges.max_range_days;

    let mut items = Vec::new();
    for family in request.resolved_families() {
        for chunk in window.split(max_days) {
            items.push(WorkItem {
                family,
                window: chunk,
            });
        }
    }

    tracing::info!(
        mode = ?request.mode,
        window = %window,
        families = request.resolved_families().len(),
        sub_windows = items.len(),
        "run partitioned"
    );
    Ok(items)
}
