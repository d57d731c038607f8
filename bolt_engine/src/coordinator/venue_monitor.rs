//! Watches the venue while the group is still open, and tells the group when the venue stops or resumes delivering.
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::*;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    helpers::{parse_timezone, slack_date},
    traits::{GroupOrderApi, Notifier},
};

pub const VENUE_REOPENED_MESSAGE: &str = "Venue is now open for delivery";

pub fn build_closed_venue_message(reopens_at: Option<DateTime<Utc>>, tz: Option<Tz>, now: DateTime<Utc>) -> String {
    let mut msg = String::from("Venue is closed for delivery");
    if let Some(t) = reopens_at {
        msg.push_str(&format!(" (allegedly until {})", slack_date(t, tz, now)));
    }
    msg.push_str(" – I'll let you know when it opens");
    msg
}

//--------------------------------------   VenueWatch   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub enum VenueTransition {
    Unchanged,
    Closed(Option<DateTime<Utc>>),
    Reopened,
    EstimateChanged(Option<DateTime<Utc>>),
}

/// The open/closed state machine, fed one observation per tick.
#[derive(Debug, Default)]
pub struct VenueWatch {
    closed: bool,
    reopen_estimate: Option<DateTime<Utc>>,
    closed_message_id: Option<String>,
}

impl VenueWatch {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn observe(&mut self, delivering: bool, reopen_estimate: Option<DateTime<Utc>>) -> VenueTransition {
        match (self.closed, delivering) {
            (true, true) => {
                self.closed = false;
                self.reopen_estimate = None;
                self.closed_message_id = None;
                VenueTransition::Reopened
            },
            (false, false) => {
                self.closed = true;
                self.reopen_estimate = reopen_estimate;
                VenueTransition::Closed(reopen_estimate)
            },
            (true, false) if self.reopen_estimate != reopen_estimate => {
                self.reopen_estimate = reopen_estimate;
                VenueTransition::EstimateChanged(reopen_estimate)
            },
            _ => VenueTransition::Unchanged,
        }
    }
}

//--------------------------------------   VenueMonitor   ---------------------------------------------------------
pub struct VenueMonitor<G, N> {
    pub group: Arc<G>,
    pub notifier: Arc<N>,
    pub venue_id: String,
    pub group_id: String,
    pub receiver: String,
    pub thread_ts: String,
    pub interval: Duration,
}

impl<G, N> VenueMonitor<G, N>
where
    G: GroupOrderApi + 'static,
    N: Notifier + 'static,
{
    /// Starts the monitor on its own task. It stops when `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    pub async fn run(self, token: CancellationToken) {
        debug!("🏪️ Watching venue {} for group {}", self.venue_id, self.group_id);
        let mut watch = VenueWatch::default();
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {},
            }
            let venue = match self.group.venue(&self.venue_id).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("🏪️ Could not fetch venue {} for group {}. {e}", self.venue_id, self.group_id);
                    continue;
                },
            };
            let tz = parse_timezone(&venue.timezone);
            match watch.observe(venue.is_delivering(), venue.offline_period_end()) {
                VenueTransition::Unchanged => trace!("🏪️ No change in venue {}", self.venue_id),
                VenueTransition::Reopened => {
                    info!("🏪️ Venue {} is delivering again (group {})", self.venue_id, self.group_id);
                    self.send(VENUE_REOPENED_MESSAGE).await;
                },
                VenueTransition::Closed(estimate) => {
                    info!("🏪️ Venue {} stopped delivering (group {})", self.venue_id, self.group_id);
                    let msg = build_closed_venue_message(estimate, tz, chrono::Utc::now());
                    watch.closed_message_id = self.send(&msg).await;
                },
                VenueTransition::EstimateChanged(estimate) => {
                    debug!("🏪️ Venue {} now expects to reopen at {estimate:?}", self.venue_id);
                    let msg = build_closed_venue_message(estimate, tz, chrono::Utc::now());
                    match watch.closed_message_id.as_deref() {
                        Some(id) => {
                            if let Err(e) = self.notifier.edit_message(&self.receiver, &msg, id).await {
                                warn!("🏪️ Could not update the venue notice for group {}. {e}", self.group_id);
                            }
                        },
                        None => watch.closed_message_id = self.send(&msg).await,
                    }
                },
            }
        }
        debug!("🏪️ Stopped watching venue {} for group {}", self.venue_id, self.group_id);
    }

    async fn send(&self, text: &str) -> Option<String> {
        match self.notifier.send_message(&self.receiver, text, Some(&self.thread_ts)).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("🏪️ Could not send venue notice for group {}. {e}", self.group_id);
                None
            },
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn open_closed_open_gives_two_transitions() {
        let mut watch = VenueWatch::default();
        let estimate = Some(Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap());
        assert_eq!(watch.observe(true, None), VenueTransition::Unchanged);
        assert_eq!(watch.observe(false, estimate), VenueTransition::Closed(estimate));
        assert!(watch.is_closed());
        assert_eq!(watch.observe(false, estimate), VenueTransition::Unchanged);
        assert_eq!(watch.observe(false, estimate), VenueTransition::Unchanged);
        assert_eq!(watch.observe(true, None), VenueTransition::Reopened);
        assert_eq!(watch.observe(true, None), VenueTransition::Unchanged);
    }

    #[test]
    fn new_estimate_while_closed() {
        let mut watch = VenueWatch::default();
        let first = Some(Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap());
        let second = Some(Utc.with_ymd_and_hms(2024, 1, 15, 19, 30, 0).unwrap());
        assert_eq!(watch.observe(false, None), VenueTransition::Closed(None));
        assert_eq!(watch.observe(false, first), VenueTransition::EstimateChanged(first));
        assert_eq!(watch.observe(false, second), VenueTransition::EstimateChanged(second));
        assert_eq!(watch.observe(false, second), VenueTransition::Unchanged);
    }

    #[test]
    fn closed_messages() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            build_closed_venue_message(None, None, now),
            "Venue is closed for delivery – I'll let you know when it opens"
        );
        let reopen = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap();
        let tz = parse_timezone("Asia/Jerusalem");
        assert_eq!(
            build_closed_venue_message(Some(reopen), tz, now),
            "Venue is closed for delivery (allegedly until <!date^1705321800^{time}|2024-01-15 14:30>) – I'll let you \
             know when it opens"
        );
    }
}
