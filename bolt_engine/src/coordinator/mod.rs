//! # Lifecycle coordinator
//!
//! [`OrderCoordinator`] drives one group order from the moment its link is shared until the food arrives:
//!
//! 1. Join the group and say so in the thread of the shared link.
//! 2. Mark the bot as ready, then poll the group until it is ordered, canceled or the wait times out. A
//!    [`VenueMonitor`] reports the venue closing or reopening in the meantime.
//! 3. Split the bill, including the delivery fee, and post the rates message.
//! 4. Record the order and start tracking debts. The debt reminders run on their own task in the
//!    [`DebtTaskRegistry`] and outlive the coordinator run.
//! 5. Follow the delivery, drawing its progress under the rates message.
//!
//! Steps for one order always run in this sequence. A [`DedupSet`] makes sure a group shared twice is only
//! coordinated once at a time. Every failure that ends a run early is explained with one message in the thread, apart
//! from a failed announcement: if nobody can see the bot's messages there is no point in carrying on, or in saying so.
mod dedup;
mod delivery_monitor;
mod errors;
mod venue_monitor;

use std::sync::Arc;

use chrono::Utc;
pub use dedup::{DedupGuard, DedupSet};
pub use delivery_monitor::{build_progress_art, with_progress_art, DeliveryMonitor, DELIVERED_MESSAGE, GET_READY_MESSAGE};
pub use errors::CoordinatorError;
use log::*;
use tokio_util::sync::CancellationToken;
pub use venue_monitor::{build_closed_venue_message, VenueMonitor, VenueTransition, VenueWatch, VENUE_REOPENED_MESSAGE};

use crate::{
    config::CoordinatorConfig,
    debts::{run_reminders, DebtApi, DebtTaskRegistry, HostCancelOutcome, HOST_CANCEL_REACTION, MARK_PAID_REACTION},
    directory::resolve_user,
    events::{LinkSharedEvent, ReactionAddedEvent},
    group_session::GroupSession,
    helpers::{group_id_from_link, order_id_from_message, parse_timezone, WOLT_DOMAIN},
    rates::{build_rates_message, split_delivery_fee, GroupRate, Rate},
    traits::{DebtManagement, GroupOrderApi, GroupOrderProvider, Notifier, OrderManagement, UserDirectory},
};

pub const TOO_LATE_MESSAGE: &str = "It's too late for me.. I won't join this order :sleeping:";
pub const NO_DELIVERY_RATE_MESSAGE: &str =
    "I can't find the delivery rate, I'll publish the rates without including the delivery rate";
pub const DEBTS_FAILED_MESSAGE: &str = "I had an error adding debts, I won't track this order";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoordinatorState {
    Joining,
    Announced,
    AwaitingReady,
    AwaitingFinish,
    RatesPublished,
    MonitoringDelivery,
    Done,
    Canceled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// No group link in the message.
    Ignored,
    /// The group is already being coordinated.
    Duplicate,
    /// Declined because of the join cutoff.
    TooLate,
    Finished(CoordinatorState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Ignored,
    MarkedPaid(bool),
    HostCancel(HostCancelOutcome),
    Failed,
}

pub struct OrderCoordinator<P, N, B, D> {
    config: CoordinatorConfig,
    provider: P,
    notifier: Arc<N>,
    db: B,
    directory: Arc<D>,
    debts: DebtApi<B, N, D>,
    registry: DebtTaskRegistry,
    dedup: DedupSet,
    self_id: String,
    shutdown: CancellationToken,
}

impl<P, N, B, D> OrderCoordinator<P, N, B, D>
where
    P: GroupOrderProvider,
    N: Notifier + 'static,
    B: DebtManagement + OrderManagement + Clone + 'static,
    D: UserDirectory + 'static,
{
    /// `self_id` is the bot's own chat id. Only reactions to the bot's own messages are acted on.
    ///
    /// Coordinator runs and their monitors stop when `shutdown` is cancelled. Debt reminders only stop when
    /// `registry` is drained.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoordinatorConfig,
        provider: P,
        notifier: Arc<N>,
        db: B,
        directory: Arc<D>,
        self_id: &str,
        registry: DebtTaskRegistry,
        shutdown: CancellationToken,
    ) -> Self {
        let debts = DebtApi::new(db.clone(), Arc::clone(&notifier), Arc::clone(&directory));
        Self {
            config,
            provider,
            notifier,
            db,
            directory,
            debts,
            registry,
            dedup: DedupSet::new(),
            self_id: self_id.to_string(),
            shutdown,
        }
    }

    pub fn dedup(&self) -> &DedupSet {
        &self.dedup
    }

    pub fn registry(&self) -> &DebtTaskRegistry {
        &self.registry
    }

    pub fn debts(&self) -> &DebtApi<B, N, D> {
        &self.debts
    }

    /// Coordinates the group order in the first group link of the message, if there is one. Returns once the order
    /// is delivered or the run fails.
    pub async fn handle_link_shared(&self, event: LinkSharedEvent) -> LinkOutcome {
        let group_id =
            event.links.iter().filter(|l| l.domain == WOLT_DOMAIN).find_map(|l| group_id_from_link(&l.url));
        let Some(group_id) = group_id else {
            debug!("🔄️ No group links in message {} ({:?})", event.message_ts, event.links);
            return LinkOutcome::Ignored;
        };
        let Some(_guard) = self.dedup.try_acquire(&group_id) else {
            info!("🔄️ Already working on group {group_id}");
            return LinkOutcome::Duplicate;
        };
        if self.config.dont_join_after.is_some_and(|c| c.has_passed(Utc::now())) {
            info!("🔄️ Not joining group {group_id}, it's past the join cutoff");
            self.inform(&event.channel, TOO_LATE_MESSAGE, Some(&event.message_ts)).await;
            return LinkOutcome::TooLate;
        }
        info!("🔄️ Coordinating group {group_id} shared in {}", event.channel);
        let mut state = CoordinatorState::Joining;
        let final_state = match self.coordinate(&group_id, &event, &mut state).await {
            Ok(()) => CoordinatorState::Done,
            Err(e) => {
                error!("🔄️ Coordinating group {group_id} failed while {state:?}. {e}");
                self.report_failure(&group_id, &event, state, &e).await;
                match e {
                    CoordinatorError::Canceled(_) => CoordinatorState::Canceled,
                    _ => CoordinatorState::Error,
                }
            },
        };
        info!("🔄️ Finished with group {group_id}: {final_state:?}");
        LinkOutcome::Finished(final_state)
    }

    /// Acts on the paid and host-cancel reactions to the bot's own rates and reminder messages. Everything else is
    /// ignored.
    pub async fn handle_reaction_added(&self, event: ReactionAddedEvent) -> ReactionOutcome {
        if event.message_author != self.self_id {
            trace!("🔄️ Ignoring a reaction to someone else's message");
            return ReactionOutcome::Ignored;
        }
        if event.reaction != MARK_PAID_REACTION && event.reaction != HOST_CANCEL_REACTION {
            return ReactionOutcome::Ignored;
        }
        let Some(order_id) = order_id_from_message(&event.message_text) else {
            debug!("🔄️ Got a :{}: reaction on a message without an order id. Ignoring", event.reaction);
            return ReactionOutcome::Ignored;
        };
        if event.reaction == MARK_PAID_REACTION {
            match self.debts.mark_paid(&order_id, &event.from_user).await {
                Ok(cleared) => ReactionOutcome::MarkedPaid(cleared),
                Err(e) => {
                    error!("🔄️ Could not mark {} as paid for order {order_id}. {e}", event.from_user);
                    ReactionOutcome::Failed
                },
            }
        } else {
            match self.debts.host_cancel(&order_id, &event.from_user).await {
                Ok(outcome) => ReactionOutcome::HostCancel(outcome),
                Err(e) => {
                    error!("🔄️ Could not cancel the debts of order {order_id}. {e}");
                    ReactionOutcome::Failed
                },
            }
        }
    }

    async fn coordinate(
        &self,
        group_id: &str,
        event: &LinkSharedEvent,
        state: &mut CoordinatorState,
    ) -> Result<(), CoordinatorError> {
        let channel = event.channel.as_str();
        let thread_ts = event.message_ts.as_str();
        let interval = self.config.status_check_interval;

        let group = self
            .provider
            .open_group(group_id)
            .map_err(|e| CoordinatorError::Join { group_id: group_id.to_string(), reason: e.to_string() })?;
        let mut session = GroupSession::join(group_id, group).await?;

        let announcement = format!("Hey :) Just letting you know I joined the group {group_id}");
        if let Err(e) = self.notifier.send_message(channel, &announcement, Some(thread_ts)).await {
            warn!("🔄️ Could not announce group {group_id}. {e}");
            return Err(CoordinatorError::Announce(group_id.to_string()));
        }
        advance(state, CoordinatorState::Announced, group_id);

        advance(state, CoordinatorState::AwaitingReady, group_id);
        session.mark_as_ready().await?;

        advance(state, CoordinatorState::AwaitingFinish, group_id);
        let venue_id = session.details().await?.venue_id().to_string();
        let monitor_token = self.shutdown.child_token();
        let venue_monitor = VenueMonitor {
            group: session.group(),
            notifier: Arc::clone(&self.notifier),
            venue_id,
            group_id: group_id.to_string(),
            receiver: channel.to_string(),
            thread_ts: thread_ts.to_string(),
            interval,
        }
        .spawn(monitor_token.clone());
        let finished = {
            let _stop_monitor = monitor_token.drop_guard();
            session.wait_until_finished(interval, self.config.ready_timeout, &self.shutdown).await
        };
        if let Err(e) = venue_monitor.await {
            warn!("🔄️ Venue monitor for group {group_id} ended abnormally. {e}");
        }
        let status = finished?;
        info!("🔄️ Group {group_id} was ordered ({status})");

        let group_rate = self.calculate_rates(&mut session, channel, thread_ts).await?;
        let rates_message = build_rates_message(group_id, &group_rate);
        let rates_message_id = self.notifier.send_message(channel, &rates_message, Some(thread_ts)).await?;
        if let Err(e) = self.notifier.add_reaction(channel, &rates_message_id, MARK_PAID_REACTION).await {
            warn!("🔄️ Could not add the paid reaction to the rates of group {group_id}. {e}");
        }
        session.set_rates_message_id(rates_message_id);
        advance(state, CoordinatorState::RatesPublished, group_id);
        self.record_order(&mut session, &group_rate, channel).await;
        self.start_debt_tracking(group_id, &group_rate, channel, thread_ts).await;

        advance(state, CoordinatorState::MonitoringDelivery, group_id);
        let timezone = match session.venue().await {
            Ok(venue) => parse_timezone(&venue.timezone),
            Err(e) => {
                warn!("🔄️ Could not fetch the venue of group {group_id}, times will be in local time. {e}");
                None
            },
        };
        let delivery_monitor = DeliveryMonitor {
            notifier: self.notifier.as_ref(),
            group_id,
            receiver: channel,
            thread_ts,
            rates_message: &rates_message,
            timezone,
            destination_emoji: &self.config.destination_emoji,
            interval,
            get_ready_threshold: self.config.get_ready_threshold,
        };
        match delivery_monitor.run(&mut session, self.config.delivery_timeout, &self.shutdown).await {
            Ok(()) => {},
            Err(CoordinatorError::Timeout(reason)) => {
                warn!("🔄️ Stopped following the delivery of group {group_id}: {reason}");
                let msg = format!("I stopped following the delivery of group ID {group_id}");
                self.inform(channel, &msg, Some(thread_ts)).await;
            },
            Err(e) => return Err(e),
        }
        advance(state, CoordinatorState::Done, group_id);
        Ok(())
    }

    async fn calculate_rates<G: GroupOrderApi>(
        &self,
        session: &mut GroupSession<G>,
        channel: &str,
        thread_ts: &str,
    ) -> Result<GroupRate, CoordinatorError> {
        let details = session.details().await?;
        let host = details.host_name().unwrap_or_default();
        let delivery_fee = match session.calculate_delivery_rate().await {
            Ok(fee) => fee,
            Err(e) => {
                warn!("🔄️ Could not work out the delivery fee for group {}. {e}", session.id());
                self.inform(channel, NO_DELIVERY_RATE_MESSAGE, Some(thread_ts)).await;
                0
            },
        };
        let amounts = split_delivery_fee(&details.totals_by_participant(), &host, delivery_fee);
        let mut rates = Vec::with_capacity(amounts.len());
        for (label, amount) in amounts {
            let user = resolve_user(self.directory.as_ref(), &label).await;
            rates.push(Rate { label, user, amount });
        }
        let host_user = rates.iter().find(|r| r.label == host).and_then(|r| r.user.clone());
        Ok(GroupRate { rates, host, host_user, delivery_fee })
    }

    async fn record_order<G: GroupOrderApi>(&self, session: &mut GroupSession<G>, group_rate: &GroupRate, channel: &str) {
        let record = match session.to_order_record(group_rate, channel).await {
            Ok(r) => r,
            Err(e) => {
                warn!("🔄️ Could not summarise group {} for the order history. {e}", session.id());
                return;
            },
        };
        match self.db.save_order(record).await {
            Ok(saved) => debug!("🔄️ Saved group {} as order {}", saved.original_id, saved.id),
            Err(e) => warn!("🔄️ Could not save group {} to the order history. {e}", session.id()),
        }
    }

    async fn start_debt_tracking(&self, group_id: &str, group_rate: &GroupRate, channel: &str, thread_ts: &str) {
        match self.debts.start_tracking(group_id, group_rate, channel, thread_ts).await {
            Ok(0) => debug!("🔄️ No debts to track for group {group_id}"),
            Ok(_) => {
                let api = self.debts.clone();
                let order_id = group_id.to_string();
                let interval = self.config.debt_reminder_interval;
                let max_duration = self.config.debt_maximum_duration;
                self.registry.spawn(group_id, move |token| run_reminders(api, order_id, interval, max_duration, token));
            },
            Err(e) => {
                error!("🔄️ Could not start tracking debts for group {group_id}. {e}");
                self.inform(channel, DEBTS_FAILED_MESSAGE, Some(thread_ts)).await;
            },
        }
    }

    async fn report_failure(
        &self,
        group_id: &str,
        event: &LinkSharedEvent,
        state: CoordinatorState,
        error: &CoordinatorError,
    ) {
        let msg = match error {
            CoordinatorError::Announce(_) => return,
            CoordinatorError::Canceled(_) => format!("Order for group ID {group_id} was canceled"),
            CoordinatorError::Interrupted => format!("I'm shutting down, so I stopped following group ID {group_id}"),
            CoordinatorError::Timeout(_) if state == CoordinatorState::AwaitingFinish => {
                format!("I gave up waiting for group ID {group_id} to be ordered")
            },
            _ if state >= CoordinatorState::MonitoringDelivery => {
                format!("I had an error following the delivery of group ID {group_id}")
            },
            _ => format!("I had an error getting rate for group ID {group_id}"),
        };
        self.inform(&event.channel, &msg, Some(&event.message_ts)).await;
    }

    async fn inform(&self, receiver: &str, text: &str, in_reply_to: Option<&str>) {
        if let Err(e) = self.notifier.send_message(receiver, text, in_reply_to).await {
            warn!("🔄️ Could not inform {receiver}. {e}");
        }
    }
}

fn advance(state: &mut CoordinatorState, next: CoordinatorState, group_id: &str) {
    debug!("🔄️ Group {group_id}: {state:?} -> {next:?}");
    *state = next;
}
