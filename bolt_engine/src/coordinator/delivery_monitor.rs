//! Follows the delivery once the rates are out. The rates message is edited in place to show a little road with the
//! courier moving from the venue towards the destination.
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::*;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wolt_tools::OrderStatus;

use crate::{
    coordinator::CoordinatorError,
    group_session::GroupSession,
    helpers::format_hh_mm,
    traits::{GroupOrderApi, Notifier},
};

pub const GET_READY_MESSAGE: &str = "Get ready, delivery coming soon";
pub const DELIVERED_MESSAGE: &str = "Delivery arrived";

const SPACES_BETWEEN_TIMES: usize = 23;
const SPACES_BEFORE_DESTINATION: usize = 3;
const ROAD_TILES: i64 = 13;
// Out-of-range progress still renders, but the road can't grow without bound
const MAX_RENDERED_TILES: i64 = ROAD_TILES * 4;
const ROAD_TILE: &str = "_";
const COURIER_EMOJI: &str = ":bike:";
const VENUE_EMOJI: &str = ":cook:";

/// Two lines of progress art. The courier travels right to left, from the venue to the destination.
///
/// The courier's position is `now` relative to `started_at` and `eta`. It is not clamped, so a progress outside 0..1
/// draws a lopsided road rather than failing.
pub fn build_progress_art(
    started_at: DateTime<Utc>,
    eta: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Option<Tz>,
    destination_emoji: &str,
) -> String {
    let first_line =
        format!("`{}`{}`{}`", format_hh_mm(eta, tz), " ".repeat(SPACES_BETWEEN_TIMES), format_hh_mm(started_at, tz));
    let elapsed = (now - started_at).num_milliseconds() as f64;
    let total = (eta - started_at).num_milliseconds() as f64;
    // `as` saturates, and NaN becomes 0
    let behind = ((elapsed / total) * ROAD_TILES as f64).round() as i64;
    let ahead = ROAD_TILES.saturating_sub(behind);
    let tiles = |n: i64| ROAD_TILE.repeat(n.clamp(0, MAX_RENDERED_TILES) as usize);
    let second_line = format!(
        "{}:{destination_emoji}:{}{COURIER_EMOJI}{}{VENUE_EMOJI}",
        " ".repeat(SPACES_BEFORE_DESTINATION),
        tiles(ahead),
        tiles(behind)
    );
    format!("{first_line}\n{second_line}")
}

/// The rates message with progress art appended.
pub fn with_progress_art(rates_message: &str, art: &str) -> String {
    format!("{}\n\n{art}", rates_message.strip_suffix('\n').unwrap_or(rates_message))
}

pub struct DeliveryMonitor<'a, N> {
    pub notifier: &'a N,
    pub group_id: &'a str,
    pub receiver: &'a str,
    pub thread_ts: &'a str,
    pub rates_message: &'a str,
    pub timezone: Option<Tz>,
    pub destination_emoji: &'a str,
    pub interval: Duration,
    pub get_ready_threshold: Duration,
}

impl<'a, N: Notifier> DeliveryMonitor<'a, N> {
    /// Polls the order until it is delivered.
    ///
    /// A canceled order, the `timeout` elapsing and `shutdown` all end the monitor with an error. Failed chat updates
    /// are logged and skipped.
    pub async fn run<G: GroupOrderApi>(
        &self,
        session: &mut GroupSession<G>,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Result<(), CoordinatorError> {
        let deadline = Instant::now() + timeout;
        let rates_message_id = session.rates_message_id().map(str::to_string);
        let threshold = chrono::Duration::from_std(self.get_ready_threshold).unwrap_or_else(|_| chrono::Duration::zero());
        let mut get_ready_sent = false;
        loop {
            let details = session.refetch_details().await?;
            if details.status == OrderStatus::Canceled {
                return Err(CoordinatorError::Canceled(self.group_id.to_string()));
            }
            let now = Utc::now();
            if let Some(eta) = details.delivery_eta() {
                if let Some(started_at) = details.purchase_datetime() {
                    self.show_progress(rates_message_id.as_deref(), started_at, eta, now).await;
                }
                if !get_ready_sent && !details.is_delivered() && eta - now < threshold {
                    info!("🚚️ Delivery for group {} is due at {eta}", self.group_id);
                    self.notify(GET_READY_MESSAGE).await;
                    get_ready_sent = true;
                }
            }
            if details.is_delivered() {
                info!("🚚️ Group {} was delivered", self.group_id);
                self.notify(DELIVERED_MESSAGE).await;
                if let Some(started_at) = details.purchase_datetime() {
                    let delivered_at = details.delivered_at().unwrap_or(now);
                    self.show_progress(rates_message_id.as_deref(), started_at, delivered_at, now).await;
                }
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(CoordinatorError::Timeout(format!("group {} was not delivered in time", self.group_id)));
                },
                _ = shutdown.cancelled() => return Err(CoordinatorError::Interrupted),
            }
        }
    }

    async fn show_progress(
        &self,
        rates_message_id: Option<&str>,
        started_at: DateTime<Utc>,
        eta: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let Some(message_id) = rates_message_id else {
            return;
        };
        let art = build_progress_art(started_at, eta, now, self.timezone, self.destination_emoji);
        let text = with_progress_art(self.rates_message, &art);
        if let Err(e) = self.notifier.edit_message(self.receiver, &text, message_id).await {
            warn!("🚚️ Could not update the rates message for group {}. {e}", self.group_id);
        }
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.send_message(self.receiver, text, Some(self.thread_ts)).await {
            warn!("🚚️ Could not send delivery notice for group {}. {e}", self.group_id);
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn progress_art_halfway() {
        let tz = Some(chrono_tz::UTC);
        let art = build_progress_art(at(12, 0), at(12, 40), at(12, 20), tz, "house");
        let lines: Vec<&str> = art.lines().collect();
        assert_eq!(lines[0], format!("`12:40`{}`12:00`", " ".repeat(23)));
        // 6.5 rounds away from zero
        assert_eq!(lines[1], format!("   :house:{}:bike:{}:cook:", "_".repeat(6), "_".repeat(7)));
    }

    #[test]
    fn progress_art_edges() {
        let tz = Some(chrono_tz::UTC);
        let start = build_progress_art(at(12, 0), at(12, 40), at(12, 0), tz, "office");
        assert!(start.ends_with(&format!(":office:{}:bike::cook:", "_".repeat(13))));
        let done = build_progress_art(at(12, 0), at(12, 40), at(12, 40), tz, "office");
        assert!(done.ends_with(&format!(":office::bike:{}:cook:", "_".repeat(13))));
        // Late deliveries and a zero-length window don't panic
        let late = build_progress_art(at(12, 0), at(12, 40), at(14, 0), tz, "house");
        assert!(late.contains(":house::bike:"));
        let degenerate = build_progress_art(at(12, 0), at(12, 0), at(12, 30), tz, "house");
        assert!(degenerate.contains(":bike:"));
    }

    #[test]
    fn art_replaces_trailing_newline() {
        assert_eq!(with_progress_art("Rates\nA: 1.00\n", "ART"), "Rates\nA: 1.00\n\nART");
        assert_eq!(with_progress_art("Rates", "ART"), "Rates\n\nART");
    }
}
