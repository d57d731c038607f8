//! # Debt ledger and reminders
//!
//! Once the rates are published, every participant that isn't the host owes the host their share. [`DebtApi`] records
//! those debts and handles the two ways they can be cleared by people: a borrower marking themselves as paid, or the
//! host cancelling tracking altogether.
//!
//! The reminder loop for an order runs on its own task, owned by a [`DebtTaskRegistry`] rather than by the request that
//! started it. It ends when no debts are left, or when the maximum tracking duration has passed, in which case any
//! remaining debts are dropped.
mod debt_api;
mod errors;
mod registry;
mod reminder;

pub use debt_api::{DebtApi, HostCancelOutcome, ReminderTick, HOST_CANCEL_REACTION, MARK_PAID_REACTION};
pub use errors::DebtApiError;
pub use registry::DebtTaskRegistry;
pub use reminder::{run_reminders, DEBT_TIMEOUT_REASON};
