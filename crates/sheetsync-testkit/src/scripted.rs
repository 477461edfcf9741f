//! Deterministic stand-ins for the spreadsheet, the rate feed and the clock.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use sheetsync_feeds::{RateError, RateProvider, RawRow, SheetError, SheetRange, SheetSource};
use sheetsync_reconcile::Clock;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

struct SheetState {
    /// Whole sheet, row 1 first.
    grid: Vec<RawRow>,
    requests: Vec<String>,
    fetches: usize,
    fail_on: Option<usize>,
}

/// A sheet held in memory. `fetch` answers like the values API: only rows
/// inside the range, with trailing blank rows trimmed.
pub struct ScriptedSheet {
    state: Mutex<SheetState>,
}

impl ScriptedSheet {
    /// `header_rows` title rows followed by `data`.
    pub fn new(header_rows: u32, data: Vec<RawRow>) -> Self {
        Self {
            state: Mutex::new(SheetState {
                grid: build_grid(header_rows, data),
                requests: Vec::new(),
                fetches: 0,
                fail_on: None,
            }),
        }
    }

    /// Replace the sheet contents between runs.
    pub fn set_data(&self, header_rows: u32, data: Vec<RawRow>) {
        lock(&self.state).grid = build_grid(header_rows, data);
    }

    /// Make the `nth` (1-based) fetch fail with a transport error.
    pub fn fail_on_fetch(&self, nth: usize) {
        lock(&self.state).fail_on = Some(nth);
    }

    /// A1 ranges requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }
}

fn build_grid(header_rows: u32, data: Vec<RawRow>) -> Vec<RawRow> {
    let mut grid: Vec<RawRow> = (0..header_rows)
        .map(|_| {
            ["row", "order_id", "price", "delivery_date"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
        .collect();
    grid.extend(data);
    grid
}

#[async_trait::async_trait]
impl SheetSource for ScriptedSheet {
    fn name(&self) -> &'static str {
        "scripted_sheet"
    }

    async fn fetch(&self, range: &SheetRange) -> Result<Vec<RawRow>, SheetError> {
        let mut st = lock(&self.state);
        st.fetches += 1;
        st.requests.push(range.to_a1());
        if st.fail_on == Some(st.fetches) {
            return Err(SheetError::Transport("scripted outage".to_string()));
        }

        let start = (range.start_row.saturating_sub(1) as usize).min(st.grid.len());
        let end = (range.end_row as usize).min(st.grid.len());
        let mut rows: Vec<RawRow> = st.grid[start..end].to_vec();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Rate
// ---------------------------------------------------------------------------

struct RateState {
    /// `None` entries fail. The last entry repeats once the queue drains.
    script: VecDeque<Option<f64>>,
    last: Option<f64>,
    calls: usize,
}

pub struct ScriptedRate {
    state: Mutex<RateState>,
}

impl ScriptedRate {
    pub fn fixed(rate: f64) -> Self {
        Self::sequence(vec![Some(rate)])
    }

    /// Always unavailable.
    pub fn failing() -> Self {
        Self::sequence(vec![None])
    }

    pub fn sequence(script: Vec<Option<f64>>) -> Self {
        Self {
            state: Mutex::new(RateState {
                script: script.into(),
                last: None,
                calls: 0,
            }),
        }
    }

    /// Switch to a new constant rate.
    pub fn set(&self, rate: f64) {
        let mut st = lock(&self.state);
        st.script.clear();
        st.last = Some(rate);
    }

    pub fn calls(&self) -> usize {
        lock(&self.state).calls
    }
}

#[async_trait::async_trait]
impl RateProvider for ScriptedRate {
    fn name(&self) -> &'static str {
        "scripted_rate"
    }

    async fn get_rate(&self) -> Result<f64, RateError> {
        let mut st = lock(&self.state);
        st.calls += 1;
        let next = match st.script.pop_front() {
            Some(v) => {
                st.last = v;
                v
            }
            None => st.last,
        };
        next.ok_or_else(|| RateError::Transport("scripted outage".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Clock that only moves when told to, plus an optional step per `now()`.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self::with_step(start, Duration::zero())
    }

    /// Each `now()` returns the current instant, then advances by `step`.
    pub fn with_step(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }

    pub fn peek(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = lock(&self.now);
        let t = *now;
        *now += self.step;
        t
    }
}
