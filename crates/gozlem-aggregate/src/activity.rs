use std::collections::{BTreeMap, HashMap};

use gozlem_core::models::domain::Domain;
use gozlem_core::models::media::MediaEvent;
use gozlem_core::models::record::ObservationRecord;
use jiff::ToSpan;
use jiff::civil::Date;
use serde::Serialize;
use ts_rs::TS;

const SECONDS_PER_DAY: i64 = 86_400;

/// One calendar day of activity in the caller's time zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DayActivity {
    #[ts(type = "string")]
    pub date: Date,
    /// Short display label, e.g. `07 Mar`.
    pub label: String,
    pub observations: usize,
    pub media: usize,
}

/// Per-day observation and media counts for the `window_days` calendar days
/// ending today in `now`'s time zone. Oldest first, zero-filled.
pub fn activity_by_day(
    records: &[ObservationRecord],
    media: &[MediaEvent],
    window_days: usize,
    now: &jiff::Zoned,
) -> Vec<DayActivity> {
    let tz = now.time_zone();
    let mut days: Vec<Date> = now.date().series(-1.day()).take(window_days).collect();
    days.reverse();

    let index: HashMap<Date, usize> = days.iter().enumerate().map(|(i, d)| (*d, i)).collect();
    let mut out: Vec<DayActivity> = days
        .iter()
        .map(|d| DayActivity {
            date: *d,
            label: d.strftime("%d %b").to_string(),
            observations: 0,
            media: 0,
        })
        .collect();

    for record in records {
        let day = record.observation.created_at.to_zoned(tz.clone()).date();
        if let Some(i) = index.get(&day) {
            out[*i].observations += 1;
        }
    }
    for event in media {
        let day = event.created_at.to_zoned(tz.clone()).date();
        if let Some(i) = index.get(&day) {
            out[*i].media += 1;
        }
    }
    out
}

/// Per-domain observation counts in 7-day buckets counted back from `now`.
///
/// Bucket 0 covers the most recent 7 days. Every domain is present with
/// `weeks` buckets. Records dated after `now` count toward bucket 0;
/// records older than the window are dropped.
pub fn weekly_trend(
    records: &[ObservationRecord],
    weeks: usize,
    now: jiff::Timestamp,
) -> BTreeMap<Domain, Vec<usize>> {
    let mut trend: BTreeMap<Domain, Vec<usize>> =
        Domain::ALL.iter().map(|d| (*d, vec![0; weeks])).collect();

    for record in records {
        let age_days = (now.as_second() - record.observation.created_at.as_second())
            .div_euclid(SECONDS_PER_DAY)
            .max(0);
        let bucket = (age_days / 7) as usize;
        if bucket >= weeks {
            continue;
        }
        for domain in &record.observation.domains {
            if let Some(counts) = trend.get_mut(domain) {
                counts[bucket] += 1;
            }
        }
    }
    trend
}
