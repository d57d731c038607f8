use std::time::Duration;

use chrono::Utc;
use log::*;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    debts::DebtApi,
    traits::{DebtManagement, Notifier, UserDirectory},
};

pub const DEBT_TIMEOUT_REASON: &str = "timeout has been reached";

/// Reminds the borrowers of `order_id` every `interval` until their debts are gone.
///
/// After `max_duration` any remaining debts are dropped and the lender is told. A cancelled `token` stops the task
/// without touching the ledger. Failing to read the ledger skips a round; it never ends the task.
pub async fn run_reminders<B, N, D>(
    api: DebtApi<B, N, D>,
    order_id: String,
    interval: Duration,
    max_duration: Duration,
    token: CancellationToken,
) where
    B: DebtManagement,
    N: Notifier,
    D: UserDirectory,
{
    let expiry = tokio::time::sleep(max_duration);
    tokio::pin!(expiry);
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    loop {
        tokio::select! {
            _ = &mut expiry => {
                info!("💸️ Debts for order {order_id} have expired");
                if let Err(e) = api.remove_all_debts(&order_id, DEBT_TIMEOUT_REASON).await {
                    error!("💸️ Could not remove expired debts for order {order_id}. {e}");
                }
                return;
            },
            _ = token.cancelled() => {
                info!("💸️ Stopping reminders for order {order_id}");
                return;
            },
            _ = ticker.tick() => {},
        }
        match api.remind_debts(&order_id, Utc::now()).await {
            Ok(tick) if tick.live == 0 => {
                info!("💸️ All debts for order {order_id} are settled");
                return;
            },
            Ok(tick) => debug!("💸️ Reminded {} of {} borrowers for order {order_id}", tick.reminded, tick.live),
            Err(e) => warn!("💸️ Skipping this round of reminders for order {order_id}. {e}"),
        }
    }
}
