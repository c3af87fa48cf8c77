//! Fixed UTC cron table for periodic jobs.

use time::macros::time;
use time::{Duration, PrimitiveDateTime, Time, Weekday};

use crate::core::time::{format_primitive, month_start, shift_month};
use crate::db::types::JobKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cadence {
    Daily,
    /// First day of every month.
    Monthly,
    Weekly(Weekday),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScheduleEntry {
    pub(crate) kind: JobKind,
    pub(crate) cadence: Cadence,
    pub(crate) at: Time,
}

pub(crate) const SCHEDULE: [ScheduleEntry; 3] = [
    ScheduleEntry { kind: JobKind::DailyReminders, cadence: Cadence::Daily, at: time!(18:00) },
    ScheduleEntry { kind: JobKind::MonthlyReports, cadence: Cadence::Monthly, at: time!(09:00) },
    ScheduleEntry {
        kind: JobKind::Cleanup,
        cadence: Cadence::Weekly(Weekday::Monday),
        at: time!(02:00),
    },
];

impl ScheduleEntry {
    /// The first fire time strictly after `now`.
    pub(crate) fn next_after(&self, now: PrimitiveDateTime) -> PrimitiveDateTime {
        match self.cadence {
            Cadence::Daily => {
                let today = PrimitiveDateTime::new(now.date(), self.at);
                if today > now {
                    today
                } else {
                    today.saturating_add(Duration::days(1))
                }
            }
            Cadence::Weekly(weekday) => {
                let ahead = (i64::from(weekday.number_days_from_monday())
                    - i64::from(now.weekday().number_days_from_monday()))
                .rem_euclid(7);
                let candidate = PrimitiveDateTime::new(now.date(), self.at)
                    .saturating_add(Duration::days(ahead));
                if candidate > now {
                    candidate
                } else {
                    candidate.saturating_add(Duration::weeks(1))
                }
            }
            Cadence::Monthly => {
                let this_month = PrimitiveDateTime::new(month_start(now).date(), self.at);
                if this_month > now {
                    this_month
                } else {
                    PrimitiveDateTime::new(shift_month(now, 1).date(), self.at)
                }
            }
        }
    }

    /// Unique per slot so concurrent schedulers enqueue a slot at most once.
    pub(crate) fn dedupe_key(&self, fire_at: PrimitiveDateTime) -> String {
        format!("{}:{}", self.kind.as_str(), format_primitive(fire_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(kind: JobKind) -> ScheduleEntry {
        SCHEDULE.into_iter().find(|entry| entry.kind == kind).expect("scheduled")
    }

    #[test]
    fn daily_reminders_fire_at_six_pm() {
        let reminders = entry(JobKind::DailyReminders);

        assert_eq!(reminders.next_after(datetime!(2025-03-10 09:00)), datetime!(2025-03-10 18:00));
        assert_eq!(reminders.next_after(datetime!(2025-03-10 18:00)), datetime!(2025-03-11 18:00));
        assert_eq!(reminders.next_after(datetime!(2024-12-31 19:00)), datetime!(2025-01-01 18:00));
        assert_eq!(reminders.next_after(datetime!(2024-02-28 20:00)), datetime!(2024-02-29 18:00));
    }

    #[test]
    fn monthly_reports_fire_on_the_first() {
        let reports = entry(JobKind::MonthlyReports);

        assert_eq!(reports.next_after(datetime!(2025-03-01 08:59)), datetime!(2025-03-01 09:00));
        assert_eq!(reports.next_after(datetime!(2025-03-01 09:00)), datetime!(2025-04-01 09:00));
        assert_eq!(reports.next_after(datetime!(2025-12-15 00:00)), datetime!(2026-01-01 09:00));
    }

    #[test]
    fn cleanup_fires_monday_morning() {
        let cleanup = entry(JobKind::Cleanup);

        // 2025-03-10 is a Monday.
        assert_eq!(cleanup.next_after(datetime!(2025-03-10 01:00)), datetime!(2025-03-10 02:00));
        assert_eq!(cleanup.next_after(datetime!(2025-03-10 02:00)), datetime!(2025-03-17 02:00));
        assert_eq!(cleanup.next_after(datetime!(2025-03-12 12:00)), datetime!(2025-03-17 02:00));
        assert_eq!(cleanup.next_after(datetime!(2025-12-30 12:00)), datetime!(2026-01-05 02:00));
    }

    #[test]
    fn dedupe_key_names_kind_and_slot() {
        let reminders = entry(JobKind::DailyReminders);
        assert_eq!(
            reminders.dedupe_key(datetime!(2025-03-10 18:00)),
            "daily_reminders:2025-03-10T18:00:00Z"
        );
    }
}
