//! Report assembly: dashboard series, reminder rules and monthly reports.
//!
//! Everything here is pure; the callers fetch rows through
//! `repositories::dashboard` and `repositories::reports`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

use crate::core::time::{format_date, month_key, month_label, month_start, shift_month};
use crate::repositories::reports::AttemptDetail;
use crate::services::scoring::{percentage, round2};

/// Months shown in activity charts, current month included.
pub(crate) const ACTIVITY_MONTHS: i32 = 6;

const DISTRIBUTION_LABELS: [&str; 5] = ["0-20", "20-40", "40-60", "60-80", "80-100"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MonthlyActivity {
    pub(crate) month: String,
    pub(crate) key: String,
    pub(crate) attempts: i64,
}

/// Start of the oldest month in the activity window ending at `now`.
pub(crate) fn activity_window_start(now: PrimitiveDateTime) -> PrimitiveDateTime {
    shift_month(now, -(ACTIVITY_MONTHS - 1))
}

/// Zero-filled monthly series, oldest first.
pub(crate) fn monthly_series(
    now: PrimitiveDateTime,
    counts: &[(PrimitiveDateTime, i64)],
) -> Vec<MonthlyActivity> {
    let by_month: HashMap<String, i64> =
        counts.iter().map(|(month, attempts)| (month_key(*month), *attempts)).collect();

    (0..ACTIVITY_MONTHS)
        .rev()
        .map(|back| {
            let month = shift_month(now, -back);
            let key = month_key(month);
            MonthlyActivity {
                month: month_label(month),
                attempts: by_month.get(&key).copied().unwrap_or(0),
                key,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DistributionBucket {
    pub(crate) range: String,
    pub(crate) count: i64,
}

pub(crate) fn score_distribution(buckets: &[(i32, i64)]) -> Vec<DistributionBucket> {
    DISTRIBUTION_LABELS
        .iter()
        .enumerate()
        .map(|(index, range)| DistributionBucket {
            range: range.to_string(),
            count: buckets
                .iter()
                .filter(|(bucket, _)| *bucket as usize == index)
                .map(|(_, count)| *count)
                .sum(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReminderReason {
    NeverAttempted,
    Inactive,
    NewQuizzes(usize),
}

impl ReminderReason {
    pub(crate) fn message(&self) -> String {
        match self {
            Self::NeverAttempted => "You haven't taken any quizzes yet!".to_string(),
            Self::Inactive => "It's been a while since your last quiz attempt!".to_string(),
            Self::NewQuizzes(count) => format!("There are {count} new quizzes available!"),
        }
    }
}

/// Why a student should be reminded, if at all.
///
/// New quizzes since the last attempt take precedence over inactivity.
pub(crate) fn reminder_reason(
    last_attempt: Option<PrimitiveDateTime>,
    new_quizzes: usize,
    now: PrimitiveDateTime,
) -> Option<ReminderReason> {
    let Some(last_attempt) = last_attempt else {
        return Some(ReminderReason::NeverAttempted);
    };
    if new_quizzes > 0 {
        return Some(ReminderReason::NewQuizzes(new_quizzes));
    }
    (now - last_attempt >= Duration::days(1)).then_some(ReminderReason::Inactive)
}

pub(crate) fn reminder_email(full_name: &str, reason: &ReminderReason, app_url: &str) -> String {
    format!(
        "<html><body>\
         <h2>Hello {name}!</h2>\
         <p>{reason}</p>\
         <p>Visit Quiz Master to continue your learning journey:</p>\
         <ul><li>Take new quizzes</li><li>Improve your scores</li><li>Track your progress</li></ul>\
         <p><a href=\"{url}\">Visit Quiz Master</a></p>\
         <p>Happy learning!</p><p>The Quiz Master Team</p>\
         </body></html>",
        name = escape_html(full_name),
        reason = escape_html(&reason.message()),
        url = escape_html(app_url),
    )
}

pub(crate) fn reminder_chat(full_name: &str, reason: &ReminderReason) -> String {
    format!(
        "Reminder for {full_name}: {} Visit Quiz Master to continue learning!",
        reason.message()
    )
}

/// `[first of last month, first of this month)`.
pub(crate) fn previous_month_window(now: PrimitiveDateTime) -> (PrimitiveDateTime, PrimitiveDateTime) {
    (shift_month(now, -1), month_start(now))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MonthlyReport {
    pub(crate) quizzes_taken: usize,
    pub(crate) average_percentage: f64,
    pub(crate) best: AttemptDetail,
    pub(crate) worst: AttemptDetail,
    pub(crate) attempts: Vec<AttemptDetail>,
    pub(crate) rank: usize,
    pub(crate) ranked_users: usize,
}

fn attempt_percentage(attempt: &AttemptDetail) -> f64 {
    percentage(attempt.total_scored as i64, attempt.total_marks)
}

/// Groups a month's attempts per user and ranks users by average percentage.
///
/// A user's average is total scored over total possible marks in the window.
/// Users whose attempts carry no possible marks are left out of the ranking
/// and reported at the last rank.
pub(crate) fn build_monthly_reports(attempts: &[AttemptDetail]) -> HashMap<String, MonthlyReport> {
    let mut per_user: HashMap<&str, Vec<&AttemptDetail>> = HashMap::new();
    for attempt in attempts {
        per_user.entry(attempt.user_id.as_str()).or_default().push(attempt);
    }

    let mut averages: Vec<(&str, f64)> = per_user
        .iter()
        .filter_map(|(user_id, rows)| {
            let scored: i64 = rows.iter().map(|row| row.total_scored as i64).sum();
            let possible: i64 = rows.iter().map(|row| row.total_marks).sum();
            (possible > 0).then(|| (*user_id, percentage(scored, possible)))
        })
        .collect();
    averages.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let ranked_users = averages.len();

    per_user
        .into_iter()
        .filter_map(|(user_id, rows)| {
            let best = rows
                .iter()
                .copied()
                .max_by(|a, b| attempt_percentage(a).total_cmp(&attempt_percentage(b)))?;
            let worst = rows
                .iter()
                .copied()
                .min_by(|a, b| attempt_percentage(a).total_cmp(&attempt_percentage(b)))?;

            let ranking = averages.iter().position(|(id, _)| *id == user_id);
            let report = MonthlyReport {
                quizzes_taken: rows.len(),
                average_percentage: ranking.map(|index| averages[index].1).unwrap_or(0.0),
                best: best.clone(),
                worst: worst.clone(),
                attempts: rows.iter().map(|row| (*row).clone()).collect(),
                rank: ranking.map(|index| index + 1).unwrap_or(ranked_users),
                ranked_users,
            };
            Some((user_id.to_string(), report))
        })
        .collect()
}

fn attempt_line(attempt: &AttemptDetail) -> String {
    format!(
        "{:.1}% ({}/{})",
        attempt_percentage(attempt),
        attempt.total_scored,
        attempt.total_marks
    )
}

pub(crate) fn render_monthly_report(
    full_name: &str,
    month: &str,
    report: &MonthlyReport,
    app_url: &str,
) -> String {
    let rows: String = report
        .attempts
        .iter()
        .map(|attempt| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{:.1}%</td><td>{}</td></tr>",
                escape_html(&attempt.quiz_title),
                escape_html(&attempt.subject),
                escape_html(&attempt.chapter),
                attempt.total_scored,
                attempt.total_marks,
                attempt_percentage(attempt),
                format_date(attempt.attempted_at.date()),
            )
        })
        .collect();

    format!(
        "<html><body>\
         <h1>Monthly Quiz Report</h1><h2>{month}</h2>\
         <p>Hello {name}! Here's your quiz performance summary for {month}:</p>\
         <ul>\
         <li><strong>Quizzes Taken:</strong> {taken}</li>\
         <li><strong>Average Score:</strong> {average:.1}%</li>\
         <li><strong>Best Performance:</strong> {best}</li>\
         <li><strong>Lowest Score:</strong> {worst}</li>\
         <li><strong>Your Ranking:</strong> #{rank} out of {ranked} active users</li>\
         </ul>\
         <table><thead><tr><th>Quiz Title</th><th>Subject</th><th>Chapter</th><th>Score</th>\
         <th>Percentage</th><th>Date</th></tr></thead><tbody>{rows}</tbody></table>\
         <p><a href=\"{url}\">Continue Learning</a></p>\
         </body></html>",
        month = escape_html(month),
        name = escape_html(full_name),
        taken = report.quizzes_taken,
        average = round2(report.average_percentage),
        best = attempt_line(&report.best),
        worst = attempt_line(&report.worst),
        rank = report.rank,
        ranked = report.ranked_users,
        url = escape_html(app_url),
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn attempt(user_id: &str, scored: i32, marks: i64, at: PrimitiveDateTime) -> AttemptDetail {
        AttemptDetail {
            user_id: user_id.to_string(),
            quiz_title: "Quiz".to_string(),
            subject: "Math".to_string(),
            chapter: "Algebra".to_string(),
            total_scored: scored,
            total_marks: marks,
            attempted_at: at,
        }
    }

    #[test]
    fn series_is_zero_filled_and_oldest_first() {
        let now = datetime!(2025-02-14 10:00);
        let counts = [(datetime!(2024-12-01 0:00), 3), (datetime!(2025-02-01 0:00), 1)];

        let series = monthly_series(now, &counts);

        let keys: Vec<&str> = series.iter().map(|entry| entry.key.as_str()).collect();
        assert_eq!(keys, ["2024-09", "2024-10", "2024-11", "2024-12", "2025-01", "2025-02"]);
        let attempts: Vec<i64> = series.iter().map(|entry| entry.attempts).collect();
        assert_eq!(attempts, [0, 0, 0, 3, 0, 1]);
        assert_eq!(series[0].month, "September 2024");
        assert_eq!(activity_window_start(now), datetime!(2024-09-01 0:00));
    }

    #[test]
    fn distribution_has_all_five_buckets() {
        let buckets = score_distribution(&[(0, 2), (4, 5)]);
        let counts: Vec<i64> = buckets.iter().map(|bucket| bucket.count).collect();
        assert_eq!(counts, [2, 0, 0, 0, 5]);
        assert_eq!(buckets[4].range, "80-100");
    }

    #[test]
    fn reminder_rules() {
        let now = datetime!(2025-03-10 18:00);

        assert_eq!(reminder_reason(None, 0, now), Some(ReminderReason::NeverAttempted));
        assert_eq!(
            reminder_reason(Some(datetime!(2025-03-08 12:00)), 0, now),
            Some(ReminderReason::Inactive)
        );
        assert_eq!(reminder_reason(Some(datetime!(2025-03-10 09:00)), 0, now), None);
        assert_eq!(
            reminder_reason(Some(datetime!(2025-03-10 09:00)), 2, now),
            Some(ReminderReason::NewQuizzes(2))
        );
        assert_eq!(
            ReminderReason::NewQuizzes(2).message(),
            "There are 2 new quizzes available!"
        );
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let (start, end) = previous_month_window(datetime!(2025-01-01 09:00));
        assert_eq!(start, datetime!(2024-12-01 0:00));
        assert_eq!(end, datetime!(2025-01-01 0:00));
    }

    #[test]
    fn monthly_reports_rank_by_average_percentage() {
        let at = datetime!(2025-01-15 12:00);
        let attempts = [
            attempt("amy", 10, 20, at),
            attempt("amy", 20, 20, at),
            attempt("bob", 18, 20, at),
            attempt("cat", 0, 0, at),
        ];

        let reports = build_monthly_reports(&attempts);

        let amy = &reports["amy"];
        assert_eq!(amy.quizzes_taken, 2);
        assert_eq!(amy.average_percentage, 75.0);
        assert_eq!(amy.best.total_scored, 20);
        assert_eq!(amy.worst.total_scored, 10);
        assert_eq!((amy.rank, amy.ranked_users), (2, 2));
        assert_eq!(reports["bob"].rank, 1);
        assert_eq!(reports["cat"].rank, 2);
    }

    #[test]
    fn report_html_escapes_user_content() {
        let at = datetime!(2025-01-15 12:00);
        let reports = build_monthly_reports(&[attempt("amy", 5, 10, at)]);
        let html = render_monthly_report("<Amy>", "January 2025", &reports["amy"], "http://app");

        assert!(html.contains("Hello &lt;Amy&gt;!"));
        assert!(html.contains("#1 out of 1"));
        assert!(html.contains("50.0% (5/10)"));
        assert!(html.contains("2025-01-15"));
    }
}
