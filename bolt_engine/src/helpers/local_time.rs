//! Wall-clock helpers. Times are kept in UTC everywhere and only converted to a local timezone when deciding whether
//! to bother someone, or when rendering a time for people to read.
use chrono::{DateTime, Local, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

/// Reminders are not sent from this hour onwards...
pub const QUIET_HOURS_START: u32 = 21;
/// ...until this hour the next morning.
pub const QUIET_HOURS_END: u32 = 9;

/// Parses an IANA timezone name. Empty or unknown names give `None`, meaning "use the server's local time".
pub fn parse_timezone(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>().ok()
}

pub fn local_time_of_day(now: DateTime<Utc>, tz: Option<Tz>) -> NaiveTime {
    match tz {
        Some(tz) => now.with_timezone(&tz).time(),
        None => now.with_timezone(&Local).time(),
    }
}

/// True if `now` falls in the quiet hours of `timezone`. Falls back to the server's local time when the timezone is
/// unset or cannot be parsed.
pub fn is_quiet_hour(now: DateTime<Utc>, timezone: &str) -> bool {
    let hour = local_time_of_day(now, parse_timezone(timezone)).hour();
    hour >= QUIET_HOURS_START || hour < QUIET_HOURS_END
}

pub fn format_hh_mm(t: DateTime<Utc>, tz: Option<Tz>) -> String {
    format_in(t, tz, "%H:%M")
}

pub fn is_same_day(a: DateTime<Utc>, b: DateTime<Utc>, tz: Option<Tz>) -> bool {
    match tz {
        Some(tz) => a.with_timezone(&tz).date_naive() == b.with_timezone(&tz).date_naive(),
        None => a.with_timezone(&Local).date_naive() == b.with_timezone(&Local).date_naive(),
    }
}

/// A Slack date token that renders in each reader's own timezone. Only the time is shown if `t` is on the same day as
/// `now`. The fallback text is rendered in `tz`.
pub fn slack_date(t: DateTime<Utc>, tz: Option<Tz>, now: DateTime<Utc>) -> String {
    let token_format = if is_same_day(t, now, tz) { "{time}" } else { "{date_num} {time}" };
    let fallback = format_in(t, tz, "%Y-%m-%d %H:%M");
    format!("<!date^{}^{token_format}|{fallback}>", t.timestamp())
}

fn format_in(t: DateTime<Utc>, tz: Option<Tz>, fmt: &str) -> String {
    match tz {
        Some(tz) => t.with_timezone(&tz).format(fmt).to_string(),
        None => t.with_timezone(&Local).format(fmt).to_string(),
    }
}

//--------------------------------------   JoinCutoff   ---------------------------------------------------------
/// A time of day after which new group orders are politely declined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinCutoff {
    pub time: NaiveTime,
    pub timezone: Option<Tz>,
}

impl JoinCutoff {
    /// Parses a `HH:MM` time of day.
    pub fn parse(hh_mm: &str, timezone: Option<Tz>) -> Result<Self, chrono::ParseError> {
        let time = NaiveTime::parse_from_str(hh_mm.trim(), "%H:%M")?;
        Ok(Self { time, timezone })
    }

    /// True if `now` is at or after the cutoff, on the same local day.
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        let local = local_time_of_day(now, self.timezone);
        (local.hour(), local.minute()) >= (self.time.hour(), self.time.minute())
    }
}
