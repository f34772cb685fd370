use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

// Calendar dates travel as `YYYY-MM-DD` strings.
time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), ISO_DATE).ok()
}

/// Drops sub-microsecond digits, which `TIMESTAMPTZ` cannot hold.
pub fn to_micros(t: OffsetDateTime) -> OffsetDateTime {
    t.replace_nanosecond(t.nanosecond() / 1_000 * 1_000)
        .unwrap_or(t)
}

/// Timestamp for `created_at` / `updated_at`, equal to what Postgres stores.
pub fn now_utc() -> OffsetDateTime {
    to_micros(OffsetDateTime::now_utc())
}
