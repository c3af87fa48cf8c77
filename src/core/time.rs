use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, PrimitiveDateTime, Time};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_date(value: Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

pub(crate) fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Midnight on the first day of the month containing `value`.
pub(crate) fn month_start(value: PrimitiveDateTime) -> PrimitiveDateTime {
    let date = value.date().replace_day(1).unwrap_or(value.date());
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
}

/// First day of the month `delta` months away from `value`'s month.
pub(crate) fn shift_month(value: PrimitiveDateTime, delta: i32) -> PrimitiveDateTime {
    let start = month_start(value);
    let index = start.year() * 12 + (u8::from(start.month()) as i32 - 1) + delta;
    let year = index.div_euclid(12);
    let month = Month::try_from((index.rem_euclid(12) + 1) as u8).unwrap_or(Month::January);
    let date = Date::from_calendar_date(year, month, 1).unwrap_or(start.date());
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
}

/// `YYYY-MM` label for month buckets.
pub(crate) fn month_key(value: PrimitiveDateTime) -> String {
    format!("{:04}-{:02}", value.year(), u8::from(value.month()))
}

/// `Month YYYY` label used in report subjects.
pub(crate) fn month_label(value: PrimitiveDateTime) -> String {
    format!("{} {}", value.month(), value.year())
}
