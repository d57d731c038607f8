use std::{fmt::Display, str::FromStr};

use bolt_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use thiserror::Error;

//--------------------------------------   PaymentMethod   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Bit,
    Paybox,
    PepperPay,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown payment method: {0}")]
pub struct PaymentMethodParseError(String);

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bit => write!(f, "Bit"),
            Self::Paybox => write!(f, "Paybox"),
            Self::PepperPay => write!(f, "Pepper pay"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentMethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bit" => Ok(Self::Bit),
            "paybox" => Ok(Self::Paybox),
            "pepper pay" | "pepper" => Ok(Self::PepperPay),
            _ => Err(PaymentMethodParseError(s.to_string())),
        }
    }
}

/// Payment preferences are stored as a comma-separated list, in order of preference.
pub fn payment_methods_to_db(methods: &[PaymentMethod]) -> String {
    methods.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(",")
}

pub fn payment_methods_from_db(value: &str) -> Vec<PaymentMethod> {
    value.split(',').filter(|s| !s.trim().is_empty()).filter_map(|s| s.parse().ok()).collect()
}

//--------------------------------------   User   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// IANA timezone name. Empty if unknown.
    pub timezone: String,
    /// The user's id on the chat transport, e.g. a Slack member id.
    pub transport_id: String,
    pub payment_preferences: Vec<PaymentMethod>,
}

impl User {
    /// A chat mention for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.transport_id)
    }
}

impl FromRow<'_, SqliteRow> for User {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let preferences: String = row.try_get("payment_preferences")?;
        Ok(Self {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            timezone: row.try_get("timezone")?,
            transport_id: row.try_get("transport_id")?,
            payment_preferences: payment_methods_from_db(&preferences),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub timezone: String,
    pub transport_id: String,
    pub payment_preferences: Vec<PaymentMethod>,
}

/// Users matching any of the given names, or the given transport id.
#[derive(Debug, Clone, Default)]
pub struct UserQueryFilter {
    pub names: Vec<String>,
    pub transport_id: Option<String>,
}

impl UserQueryFilter {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn with_transport_id<S: Into<String>>(mut self, transport_id: S) -> Self {
        self.transport_id = Some(transport_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.transport_id.is_none()
    }
}

//--------------------------------------   Debt   ---------------------------------------------------------
/// An amount a borrower owes to the host (the lender) of a group order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Debt {
    pub id: String,
    pub borrower_id: String,
    pub lender_id: String,
    pub order_id: String,
    pub amount: Money,
    /// The channel the group link was shared in.
    pub initial_transport: String,
    /// The message that started the order, for threading replies.
    pub thread_ts: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDebt {
    pub borrower_id: String,
    pub lender_id: String,
    pub order_id: String,
    pub amount: Money,
    pub initial_transport: String,
    pub thread_ts: String,
}

//--------------------------------------   OrderRecord   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum RecordStatus {
    Invalid,
    Canceled,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParticipant {
    pub name: String,
    /// Empty when the participant could not be matched to a user.
    pub user_id: String,
    pub amount: Money,
}

/// A summary of a finished group order, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRecord {
    pub original_id: String,
    pub created_at: DateTime<Utc>,
    pub receiver: String,
    pub venue_name: String,
    pub venue_id: String,
    pub venue_link: String,
    pub venue_city: String,
    pub host: String,
    pub host_id: String,
    pub status: RecordStatus,
    pub participants: Vec<OrderParticipant>,
    /// Whole currency units.
    pub delivery_rate: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub original_id: String,
    pub created_at: DateTime<Utc>,
    pub db_created_at: DateTime<Utc>,
    pub receiver: String,
    pub venue_name: String,
    pub venue_id: String,
    pub venue_link: String,
    pub venue_city: String,
    pub host: String,
    pub host_id: String,
    pub status: RecordStatus,
    pub participants: sqlx::types::Json<Vec<OrderParticipant>>,
    pub delivery_rate: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payment_methods_round_trip_through_db_format() {
        let methods = vec![PaymentMethod::PepperPay, PaymentMethod::Bit];
        let stored = payment_methods_to_db(&methods);
        assert_eq!(stored, "Pepper pay,Bit");
        assert_eq!(payment_methods_from_db(&stored), methods);
        assert!(payment_methods_from_db("").is_empty());
        assert_eq!(payment_methods_from_db("Paybox,cash"), vec![PaymentMethod::Paybox]);
    }
}
