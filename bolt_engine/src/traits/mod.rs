//! # Collaborator interfaces
//!
//! The coordinator talks to the outside world exclusively through the traits defined here, so that storage backends,
//! chat transports and the group-ordering service can be swapped out (or faked in tests).
//!
//! * [`UserManagement`], [`DebtManagement`] and [`OrderManagement`] are implemented by storage backends.
//! * [`Notifier`] is implemented by chat transports.
//! * [`GroupOrderApi`] and [`GroupOrderProvider`] wrap the external group-ordering service.
//! * [`UserDirectory`] resolves participant names to users.
mod debt_management;
mod group_order;
mod notifier;
mod order_management;
mod user_directory;
mod user_management;

pub use debt_management::{DebtManagement, DebtManagementError};
pub use group_order::{GroupOrderApi, GroupOrderProvider, WoltProvider};
pub use notifier::{Notifier, NotifierError};
pub use order_management::{OrderManagement, OrderManagementError};
pub use user_directory::{StoreDirectory, UserDirectory, UserDirectoryError};
pub use user_management::{UserManagement, UserManagementError};
