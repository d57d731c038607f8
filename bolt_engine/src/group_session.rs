//! # Group order session
//!
//! A thin stateful layer over one external group order. Order details, venue info and the delivery fee are fetched
//! once and cached for the life of the session; [`GroupSession::refetch_details`] is the only way to refresh them.
//!
//! The underlying group handle is held in an `Arc` so that background monitors can poll it while the session itself
//! is busy waiting on the order.
use std::{sync::Arc, time::Duration};

use log::*;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wolt_tools::{OrderDetails, OrderStatus, VenueInfo, WoltApiError};

use crate::{
    coordinator::CoordinatorError,
    db_types::{NewOrderRecord, OrderParticipant, RecordStatus},
    rates::{delivery_fee, GroupRate},
    traits::GroupOrderApi,
};

pub struct GroupSession<G> {
    id: String,
    group: Arc<G>,
    details: Option<OrderDetails>,
    venue: Option<VenueInfo>,
    delivery_fee: Option<i64>,
    ready_marked: bool,
    rates_message_id: Option<String>,
}

impl<G: GroupOrderApi> GroupSession<G> {
    /// Joins the group and returns a session for it. Join failures are not retried beyond the client's own policy.
    pub async fn join(id: &str, group: G) -> Result<Self, CoordinatorError> {
        group.join().await.map_err(|e| CoordinatorError::Join { group_id: id.to_string(), reason: e.to_string() })?;
        debug!("🔄️ Joined group {id}");
        Ok(Self {
            id: id.to_string(),
            group: Arc::new(group),
            details: None,
            venue: None,
            delivery_fee: None,
            ready_marked: false,
            rates_message_id: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn group(&self) -> Arc<G> {
        Arc::clone(&self.group)
    }

    pub fn is_ready_marked(&self) -> bool {
        self.ready_marked
    }

    pub fn rates_message_id(&self) -> Option<&str> {
        self.rates_message_id.as_deref()
    }

    pub fn set_rates_message_id(&mut self, message_id: String) {
        self.rates_message_id = Some(message_id);
    }

    pub async fn mark_as_ready(&mut self) -> Result<(), WoltApiError> {
        if self.ready_marked {
            return Ok(());
        }
        self.group.mark_as_ready().await?;
        self.ready_marked = true;
        Ok(())
    }

    /// The cached order details, fetched on first use.
    pub async fn details(&mut self) -> Result<OrderDetails, WoltApiError> {
        match &self.details {
            Some(details) => Ok(details.clone()),
            None => self.refetch_details().await,
        }
    }

    pub async fn refetch_details(&mut self) -> Result<OrderDetails, WoltApiError> {
        let details = self.group.details().await?;
        trace!("🔄️ Group {} is {}", self.id, details.status);
        self.details = Some(details.clone());
        Ok(details)
    }

    /// The cached venue info, fetched on first use.
    pub async fn venue(&mut self) -> Result<VenueInfo, WoltApiError> {
        if let Some(venue) = &self.venue {
            return Ok(venue.clone());
        }
        let details = self.details().await?;
        let venue = self.group.venue(details.venue_id()).await?;
        self.venue = Some(venue.clone());
        Ok(venue)
    }

    /// The delivery fee in whole currency units, derived from the venue's distance brackets.
    pub async fn calculate_delivery_rate(&mut self) -> Result<i64, WoltApiError> {
        if let Some(fee) = self.delivery_fee {
            return Ok(fee);
        }
        let details = self.details().await?;
        let venue = self.venue().await?;
        let fee = delivery_fee(&venue, &details.delivery_coordinate()?)?;
        self.delivery_fee = Some(fee);
        Ok(fee)
    }

    /// Polls the group every `interval` until it leaves the active state.
    ///
    /// Returns the final status for purchased (or pending) orders. A canceled order, an unexpected status, the
    /// `timeout` elapsing, and `shutdown` being triggered are all errors. Fetch errors are returned immediately.
    pub async fn wait_until_finished(
        &mut self,
        interval: Duration,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Result<OrderStatus, CoordinatorError> {
        let deadline = Instant::now() + timeout;
        let mut details = self.refetch_details().await?;
        while details.status == OrderStatus::Active {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(CoordinatorError::Timeout(format!("group {} was not ordered in time", self.id)));
                },
                _ = shutdown.cancelled() => return Err(CoordinatorError::Interrupted),
            }
            details = self.refetch_details().await?;
        }
        match details.status {
            OrderStatus::Canceled => Err(CoordinatorError::Canceled(self.id.clone())),
            status if status.is_purchased() => Ok(status),
            status => Err(CoordinatorError::UnexpectedStatus { group_id: self.id.clone(), status: status.to_string() }),
        }
    }

    /// A summary of the order for the order history.
    pub async fn to_order_record(
        &mut self,
        group_rate: &GroupRate,
        receiver: &str,
    ) -> Result<NewOrderRecord, WoltApiError> {
        let details = self.details().await?;
        let venue = self.venue().await?;
        let status = match details.status {
            OrderStatus::Canceled => RecordStatus::Canceled,
            s if s.is_purchased() => RecordStatus::Done,
            _ => RecordStatus::Invalid,
        };
        let participants = group_rate
            .rates
            .iter()
            .map(|r| OrderParticipant {
                name: r.label.clone(),
                user_id: r.user.as_ref().map(|u| u.id.clone()).unwrap_or_default(),
                amount: r.amount,
            })
            .collect();
        Ok(NewOrderRecord {
            original_id: self.id.clone(),
            created_at: details.created_at,
            receiver: receiver.to_string(),
            venue_name: venue.name,
            venue_id: details.venue_id().to_string(),
            venue_link: venue.public_url,
            venue_city: venue.city,
            host: details.host_name().unwrap_or_default(),
            host_id: details.host_id.clone(),
            status,
            participants,
            delivery_rate: group_rate.delivery_fee,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        test_utils::fakes::{order_details, participant, venue, ScriptedProvider},
        traits::GroupOrderProvider,
    };

    fn provider() -> ScriptedProvider {
        let people = || vec![participant("w-alice", "Alice", 2000)];
        ScriptedProvider::new(
            vec![
                order_details(OrderStatus::Active, "w-alice", people()),
                order_details(OrderStatus::Purchased, "w-alice", people()),
            ],
            vec![venue(true, 1000)],
        )
    }

    #[tokio::test]
    async fn ready_is_only_sent_once() {
        let provider = provider();
        let mut session = GroupSession::join("G1", provider.open_group("G1").unwrap()).await.unwrap();
        assert!(!session.is_ready_marked());
        session.mark_as_ready().await.unwrap();
        session.mark_as_ready().await.unwrap();
        assert!(session.is_ready_marked());
        assert_eq!(provider.ready_calls(), 1);
    }

    #[tokio::test]
    async fn details_are_cached_until_refetched() {
        let mut session = GroupSession::join("G1", provider().open_group("G1").unwrap()).await.unwrap();
        assert_eq!(session.details().await.unwrap().status, OrderStatus::Active);
        assert_eq!(session.details().await.unwrap().status, OrderStatus::Active);
        assert_eq!(session.refetch_details().await.unwrap().status, OrderStatus::Purchased);
        assert_eq!(session.details().await.unwrap().status, OrderStatus::Purchased);
        assert_eq!(session.calculate_delivery_rate().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn remembers_the_rates_message() {
        let mut session = GroupSession::join("G1", provider().open_group("G1").unwrap()).await.unwrap();
        assert_eq!(session.rates_message_id(), None);
        session.set_rates_message_id("msg-7".to_string());
        assert_eq!(session.rates_message_id(), Some("msg-7"));
    }
}
