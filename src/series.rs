//! # Series
//! Common `(date, value)` shapes shared by every fetcher plus the pure
//! transforms the processor applies to them: sorting with last-wins
//! dedup, trailing-12-month compounding, monthly resampling, and the
//! month-start forward fill used by the Big Mac snapshot.

use chrono::{Datelike, NaiveDate};

/// One raw upstream record. Duplicate dates may appear; they are
/// resolved downstream (last-wins on resample).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub value: f64,
}

impl RawObservation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// The unit of output: two same-length columns, dates strictly
/// ascending, no NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from observations assumed sorted ascending with unique
    /// dates. Non-finite values are dropped here as a last line of
    /// defense; parse stages should already have removed them.
    pub fn from_observations(obs: Vec<RawObservation>) -> Self {
        let mut dates = Vec::with_capacity(obs.len());
        let mut values = Vec::with_capacity(obs.len());
        for o in obs {
            if !o.value.is_finite() {
                continue;
            }
            dates.push(o.date);
            values.push(o.value);
        }
        Self { dates, values }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Dates rendered as ISO `yyyy-mm-dd`, the wire format of `/dados`.
    pub fn iso_dates(&self) -> Vec<String> {
        self.dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
    }
}

/// Sort ascending by date; when the same date appears more than once,
/// keep the observation that arrived last (upstream revisions win).
pub fn sort_dedup_last(obs: &mut Vec<RawObservation>) {
    // Stable sort preserves arrival order within equal dates.
    obs.sort_by_key(|o| o.date);
    let mut out: Vec<RawObservation> = Vec::with_capacity(obs.len());
    for o in obs.drain(..) {
        match out.last_mut() {
            Some(last) if last.date == o.date => *last = o,
            _ => out.push(o),
        }
    }
    *obs = out;
}

/// Trailing-12-month compounded accumulation over monthly percentage
/// changes: `(∏(1 + p_i/100) - 1) × 100` for each window of 12
/// consecutive observations. The first 11 rows have no full window and
/// are dropped; fewer than 12 inputs yield an empty result.
pub fn accumulate_trailing_12m(obs: &[RawObservation]) -> Vec<RawObservation> {
    const WINDOW: usize = 12;
    if obs.len() < WINDOW {
        return Vec::new();
    }
    let factors: Vec<f64> = obs.iter().map(|o| 1.0 + o.value / 100.0).collect();
    let mut out = Vec::with_capacity(obs.len() - WINDOW + 1);
    for i in (WINDOW - 1)..obs.len() {
        let prod: f64 = factors[i + 1 - WINDOW..=i].iter().product();
        out.push(RawObservation::new(obs[i].date, (prod - 1.0) * 100.0));
    }
    out
}

/// Collapse to monthly cadence keeping the last observation in each
/// calendar month, labeled with the month-end date. Input must be
/// sorted ascending.
pub fn resample_monthly_last(obs: Vec<RawObservation>) -> Vec<RawObservation> {
    let mut out: Vec<RawObservation> = Vec::new();
    for o in obs {
        let label = month_end(o.date);
        match out.last_mut() {
            Some(last) if last.date == label => last.value = o.value,
            _ => out.push(RawObservation::new(label, o.value)),
        }
    }
    out
}

/// Carry the last known value forward across a month-start grid
/// spanning `[start, end]`. Grid points before the first observation
/// stay unfilled and are dropped. Input must be sorted ascending.
pub fn forward_fill_month_starts(
    obs: &[RawObservation],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<RawObservation> {
    let mut out = Vec::new();
    let mut grid = match first_month_start_on_or_after(start) {
        Some(d) => d,
        None => return out,
    };
    let mut idx = 0usize;
    let mut carried: Option<f64> = None;
    while grid <= end {
        while idx < obs.len() && obs[idx].date <= grid {
            carried = Some(obs[idx].value);
            idx += 1;
        }
        if let Some(v) = carried {
            out.push(RawObservation::new(grid, v));
        }
        grid = match next_month_start(grid) {
            Some(d) => d,
            None => break,
        };
    }
    out
}

/// Last calendar day of the month containing `d`.
pub fn month_end(d: NaiveDate) -> NaiveDate {
    next_month_start(d)
        .and_then(|f| f.pred_opt())
        .unwrap_or(d)
}

fn first_month_start_on_or_after(d: NaiveDate) -> Option<NaiveDate> {
    if d.day() == 1 {
        Some(d)
    } else {
        next_month_start(d)
    }
}

fn next_month_start(d: NaiveDate) -> Option<NaiveDate> {
    let (y, m) = (d.year(), d.month());
    if m == 12 {
        NaiveDate::from_ymd_opt(y + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(y, m + 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sort_dedup_keeps_last_arrival_for_equal_dates() {
        let mut obs = vec![
            RawObservation::new(d(2024, 3, 1), 2.0),
            RawObservation::new(d(2024, 1, 1), 1.0),
            RawObservation::new(d(2024, 1, 1), 1.5),
        ];
        sort_dedup_last(&mut obs);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].date, d(2024, 1, 1));
        assert_eq!(obs[0].value, 1.5);
        assert_eq!(obs[1].value, 2.0);
    }

    #[test]
    fn accumulation_needs_a_full_window() {
        let obs: Vec<_> = (1..=11)
            .map(|m| RawObservation::new(d(2024, m, 1), 0.5))
            .collect();
        assert!(accumulate_trailing_12m(&obs).is_empty());
    }

    #[test]
    fn accumulation_compounds_twelve_months() {
        // 12 months of exactly 1% each: (1.01^12 - 1) * 100
        let obs: Vec<_> = (1..=12)
            .map(|m| RawObservation::new(d(2024, m, 1), 1.0))
            .collect();
        let out = accumulate_trailing_12m(&obs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, d(2024, 12, 1));
        let expected = (1.01f64.powi(12) - 1.0) * 100.0;
        assert!((out[0].value - expected).abs() < 1e-9);
    }

    #[test]
    fn accumulation_window_slides() {
        let mut pcts = vec![3.0];
        pcts.extend(std::iter::repeat(1.0).take(12));
        let obs: Vec<_> = pcts
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let m = (i % 12) as u32 + 1;
                let y = 2023 + (i / 12) as i32;
                RawObservation::new(d(y, m, 15), *p)
            })
            .collect();
        let out = accumulate_trailing_12m(&obs);
        assert_eq!(out.len(), 2);
        // Second window excludes the 3% outlier entirely.
        let expected = (1.01f64.powi(12) - 1.0) * 100.0;
        assert!((out[1].value - expected).abs() < 1e-9);
    }

    #[test]
    fn resample_keeps_last_observation_per_month() {
        let obs = vec![
            RawObservation::new(d(2024, 1, 2), 10.0),
            RawObservation::new(d(2024, 1, 30), 12.0),
            RawObservation::new(d(2024, 2, 10), 20.0),
        ];
        let out = resample_monthly_last(obs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d(2024, 1, 31));
        assert_eq!(out[0].value, 12.0);
        assert_eq!(out[1].date, d(2024, 2, 29));
        assert_eq!(out[1].value, 20.0);
    }

    #[test]
    fn forward_fill_carries_last_value_and_skips_leading_gap() {
        let obs = vec![
            RawObservation::new(d(2024, 2, 1), 5.0),
            RawObservation::new(d(2024, 4, 1), 7.0),
        ];
        let out = forward_fill_month_starts(&obs, d(2024, 1, 1), d(2024, 4, 30));
        // January has nothing to carry; Feb..Apr filled.
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], RawObservation::new(d(2024, 2, 1), 5.0));
        assert_eq!(out[1], RawObservation::new(d(2024, 3, 1), 5.0));
        assert_eq!(out[2], RawObservation::new(d(2024, 4, 1), 7.0));
    }

    #[test]
    fn month_end_handles_year_boundary_and_leap() {
        assert_eq!(month_end(d(2024, 12, 5)), d(2024, 12, 31));
        assert_eq!(month_end(d(2024, 2, 1)), d(2024, 2, 29));
    }

    #[test]
    fn series_drops_non_finite_values() {
        let s = IndicatorSeries::from_observations(vec![
            RawObservation::new(d(2024, 1, 31), 1.0),
            RawObservation::new(d(2024, 2, 29), f64::NAN),
        ]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.iso_dates(), vec!["2024-01-31".to_string()]);
    }
}
