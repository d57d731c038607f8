use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{Debt, NewDebt, User},
    debts::DebtApiError,
    helpers::is_quiet_hour,
    rates::GroupRate,
    traits::{DebtManagement, Notifier, UserDirectory},
};

/// Reacting with this to the rates message (or a reminder) marks the reactor's debt as paid.
pub const MARK_PAID_REACTION: &str = "money_mouth_face";
/// The host reacts with this to the rates message to stop tracking the order's debts.
pub const HOST_CANCEL_REACTION: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCancelOutcome {
    /// There was nothing to cancel.
    NoDebts,
    /// Someone other than the host tried to cancel.
    Rejected,
    Removed(u64),
}

/// What happened in one round of reminders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderTick {
    /// Debts still open at the start of the round.
    pub live: usize,
    pub reminded: usize,
    /// Borrowers skipped because it is night where they are.
    pub quiet: usize,
}

pub struct DebtApi<B, N, D> {
    db: B,
    notifier: Arc<N>,
    directory: Arc<D>,
}

impl<B: Clone, N, D> Clone for DebtApi<B, N, D> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), notifier: Arc::clone(&self.notifier), directory: Arc::clone(&self.directory) }
    }
}

impl<B, N, D> DebtApi<B, N, D>
where
    B: DebtManagement,
    N: Notifier,
    D: UserDirectory,
{
    pub fn new(db: B, notifier: Arc<N>, directory: Arc<D>) -> Self {
        Self { db, notifier, directory }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Records a debt for every participant except the host, and explains how debts are cleared.
    ///
    /// Nothing is tracked if the host is not a known user. Participants that are not known users are skipped with a
    /// notice. Returns the number of debts created.
    pub async fn start_tracking(
        &self,
        order_id: &str,
        group_rate: &GroupRate,
        channel: &str,
        thread_ts: &str,
    ) -> Result<usize, DebtApiError> {
        let Some(host) = group_rate.host_user.as_ref() else {
            warn!("💸️ Host '{}' of order {order_id} is not a known user. Debts won't be tracked", group_rate.host);
            let msg = format!(
                "I didn't find the user of the host ({}), I won't track debts for order {order_id}",
                group_rate.host
            );
            self.inform(channel, &msg, Some(thread_ts)).await;
            return Ok(0);
        };
        let explainer = format!(
            "I'll keep reminding you to pay, when you pay you can react with :{MARK_PAID_REACTION}: to the rates \
             message and I'll stop bothering you.\n{}, as the host, you can react with :{HOST_CANCEL_REACTION}: to \
             the rates message to cancel debts tracking for Wolt order ID {order_id}",
            host.mention()
        );
        self.inform(channel, &explainer, Some(thread_ts)).await;

        let mut count = 0;
        for rate in group_rate.borrowers() {
            let Some(borrower) = rate.user.as_ref() else {
                let msg = format!("I won't track \"{}\" payment because I can't find their user.", rate.label);
                self.inform(channel, &msg, Some(thread_ts)).await;
                continue;
            };
            let debt = NewDebt {
                borrower_id: borrower.id.clone(),
                lender_id: host.id.clone(),
                order_id: order_id.to_string(),
                amount: rate.amount,
                initial_transport: channel.to_string(),
                thread_ts: thread_ts.to_string(),
            };
            match self.db.add_debt(debt).await {
                Ok(debt) => {
                    debug!("💸️ {} owes {} for order {order_id}", borrower.full_name, debt.amount);
                    count += 1;
                },
                Err(e) => error!("💸️ Could not add a debt for '{}' in order {order_id}. {e}", rate.label),
            }
        }
        info!("💸️ Tracking {count} debts for order {order_id}");
        Ok(count)
    }

    /// Sends a reminder for every open debt of the order, except to borrowers in their quiet hours.
    pub async fn remind_debts(&self, order_id: &str, now: DateTime<Utc>) -> Result<ReminderTick, DebtApiError> {
        let debts = self.db.list_debts_for_order(order_id).await?;
        let mut tick = ReminderTick { live: debts.len(), ..Default::default() };
        for debt in &debts {
            let borrower = match self.directory.get_user(&debt.borrower_id).await {
                Ok(u) => u,
                Err(e) => {
                    warn!("💸️ Could not find borrower {} of order {order_id}. {e}", debt.borrower_id);
                    continue;
                },
            };
            if is_quiet_hour(now, &borrower.timezone) {
                debug!("💸️ Not reminding {} about order {order_id}, it's quiet hours for them", borrower.full_name);
                tick.quiet += 1;
                continue;
            }
            if self.remind(debt, &borrower).await {
                tick.reminded += 1;
            }
        }
        trace!("💸️ Reminder round for order {order_id}: {tick:?}");
        Ok(tick)
    }

    async fn remind(&self, debt: &Debt, borrower: &User) -> bool {
        let lender = self.mention_for(&debt.lender_id).await;
        let msg = format!(
            "Reminder, you should pay {} nis to {lender} for Wolt order ID {}.\nIf you paid, you can mark yourself as \
             paid by adding :{MARK_PAID_REACTION}: reaction to this message \\ the original rates message.",
            debt.amount, debt.order_id
        );
        match self.notifier.send_message(&borrower.transport_id, &msg, None).await {
            Ok(message_id) => {
                if let Err(e) = self.notifier.add_reaction(&borrower.transport_id, &message_id, MARK_PAID_REACTION).await
                {
                    warn!("💸️ Could not add the paid reaction to a reminder for {}. {e}", borrower.full_name);
                }
                true
            },
            Err(e) => {
                warn!("💸️ Could not remind {} about order {}. {e}", borrower.full_name, debt.order_id);
                false
            },
        }
    }

    /// Clears the debt of the person with chat id `transport_id` in the order, if they have one, and lets both sides
    /// know. Returns true if a debt was cleared.
    ///
    /// The lender is told privately. If the lender can't be looked up, the notice goes to the thread the order was
    /// shared in instead.
    pub async fn mark_paid(&self, order_id: &str, transport_id: &str) -> Result<bool, DebtApiError> {
        let debts = self.db.list_debts_for_order(order_id).await?;
        for debt in debts {
            let borrower = match self.directory.get_user(&debt.borrower_id).await {
                Ok(u) => u,
                Err(e) => {
                    warn!("💸️ Could not find borrower {} of order {order_id}. {e}", debt.borrower_id);
                    continue;
                },
            };
            if borrower.transport_id != transport_id {
                continue;
            }
            self.db.remove_debt_in_order(order_id, &debt.id).await?;
            info!("💸️ {} paid {} for order {order_id}", borrower.full_name, debt.amount);
            let msg = format!("OK! I removed your debt for order {order_id}");
            self.inform(&borrower.transport_id, &msg, None).await;

            let msg = format!("{} marked themselves as paid for order ID {order_id}", borrower.mention());
            match self.directory.get_user(&debt.lender_id).await {
                Ok(lender) => self.inform(&lender.transport_id, &msg, None).await,
                Err(e) => {
                    warn!("💸️ Could not find lender {} of order {order_id}. {e}", debt.lender_id);
                    self.inform(&debt.initial_transport, &msg, Some(&debt.thread_ts)).await
                },
            }
            return Ok(true);
        }
        debug!("💸️ {transport_id} has no debt in order {order_id}");
        Ok(false)
    }

    /// Cancels all debt tracking for the order, if `transport_id` belongs to the host.
    pub async fn host_cancel(&self, order_id: &str, transport_id: &str) -> Result<HostCancelOutcome, DebtApiError> {
        let debts = self.db.list_debts_for_order(order_id).await?;
        let Some(lender_id) = debts.first().map(|d| d.lender_id.clone()) else {
            return Ok(HostCancelOutcome::NoDebts);
        };
        let host = self.directory.get_user(&lender_id).await?;
        if host.transport_id != transport_id {
            warn!("💸️ {transport_id} tried to cancel the debts of order {order_id}, but isn't the host");
            let msg = format!(
                "Nice try :stuck_out_tongue_winking_eye: Only the host ({}) can cancel debts for this order",
                host.mention()
            );
            self.inform(transport_id, &msg, None).await;
            return Ok(HostCancelOutcome::Rejected);
        }
        let removed = self.remove_all_debts(order_id, "the host requested to cancel debts tracking").await?;
        Ok(HostCancelOutcome::Removed(removed))
    }

    /// Drops every open debt for the order in one go and tells the lender why.
    pub async fn remove_all_debts(&self, order_id: &str, reason: &str) -> Result<u64, DebtApiError> {
        let debts = self.db.list_debts_for_order(order_id).await?;
        let Some(first) = debts.first() else {
            return Ok(0);
        };
        let removed = self.db.remove_all_debts_for_order(order_id).await?;
        info!("💸️ Removed {removed} debts for order {order_id} because {reason}");
        let msg = format!("I removed all debts for order ID {order_id} because {reason}");
        match self.directory.get_user(&first.lender_id).await {
            Ok(lender) => self.inform(&lender.transport_id, &msg, None).await,
            Err(e) => {
                warn!("💸️ Could not find lender {} of order {order_id}. {e}", first.lender_id);
                self.inform(&first.initial_transport, &msg, Some(&first.thread_ts)).await
            },
        }
        Ok(removed)
    }

    async fn mention_for(&self, user_id: &str) -> String {
        match self.directory.get_user(user_id).await {
            Ok(user) => user.mention(),
            Err(e) => {
                warn!("💸️ Could not look up user {user_id}. {e}");
                format!("<@{user_id}>")
            },
        }
    }

    async fn inform(&self, receiver: &str, text: &str, in_reply_to: Option<&str>) {
        if let Err(e) = self.notifier.send_message(receiver, text, in_reply_to).await {
            warn!("💸️ Could not inform {receiver}. {e}");
        }
    }
}
