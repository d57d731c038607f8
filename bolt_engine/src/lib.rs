//! Bolt Engine
//!
//! The engine behind a chat bot that coordinates Wolt group orders. When someone shares a group order link, the bot
//! joins the group, waits for it to be ordered, splits the bill (delivery fee included) among the participants, and
//! keeps reminding everyone who owes the host money until they have paid.
//!
//! The library is transport-agnostic and is divided into these parts:
//! 1. The collaborator interfaces ([`mod@traits`]). Storage backends, chat transports, user directories and the
//!    group-ordering service all sit behind these traits. An SQLite backend is provided in [`mod@sqlite`].
//! 2. The order lifecycle ([`mod@coordinator`] and [`mod@group_session`]), which drives a single group order from the
//!    shared link to the delivery.
//! 3. Bill splitting ([`mod@rates`]) and the debt ledger and reminders ([`mod@debts`]).
//! 4. The ingress queue ([`mod@events`]) that hands inbound chat events to a fixed pool of workers.
pub mod config;
pub mod coordinator;
pub mod db_types;
pub mod debts;
pub mod directory;
pub mod events;
pub mod group_session;
pub mod helpers;
pub mod rates;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorError, CoordinatorState, LinkOutcome, OrderCoordinator, ReactionOutcome};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
