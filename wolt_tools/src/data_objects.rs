use std::{collections::BTreeMap, fmt::Display};

use bolt_common::Money;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::WoltApiError;

//--------------------------------------   Dates   ---------------------------------------------------------
/// Wolt encodes timestamps as `{"$date": <unix millis>}`.
#[derive(Debug, Clone, Copy, Deserialize)]
struct WoltDate {
    #[serde(rename = "$date")]
    millis: i64,
}

impl WoltDate {
    fn to_utc(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.millis).single()
    }
}

fn wolt_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where D: Deserializer<'de> {
    let date = WoltDate::deserialize(deserializer)?;
    date.to_utc().ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", date.millis)))
}

/// Missing, null and zero-epoch dates all decode as `None`.
fn optional_wolt_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where D: Deserializer<'de> {
    let date = Option::<WoltDate>::deserialize(deserializer)?;
    Ok(date.filter(|d| d.millis != 0).and_then(WoltDate::to_utc))
}

//--------------------------------------   Coordinate   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl TryFrom<&[f64]> for Coordinate {
    type Error = WoltApiError;

    fn try_from(value: &[f64]) -> Result<Self, Self::Error> {
        match value {
            [lat, lon] => Ok(Self::new(*lat, *lon)),
            _ => Err(WoltApiError::InvalidCoordinates(format!("expected exactly 2 elements, got {value:?}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

//--------------------------------------   OrderDetails   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Active,
    #[serde(rename = "cancelled")]
    Canceled,
    PendingTransaction,
    Purchased,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Purchased and pending-transaction orders both count as finalized for splitting the bill.
    pub fn is_purchased(&self) -> bool {
        matches!(self, Self::Purchased | Self::PendingTransaction)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Canceled => "cancelled",
            Self::PendingTransaction => "pending_transaction",
            Self::Purchased => "purchased",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    /// Price in minor units, after options and discounts.
    #[serde(default)]
    pub end_amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Basket {
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub status: String,
    pub user_id: String,
    #[serde(default)]
    pub basket: Basket,
}

impl Participant {
    pub fn name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }

    pub fn item_total(&self) -> Money {
        self.basket.items.iter().map(|i| Money::from_minor(i.end_amount)).sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryLocation {
    #[serde(default)]
    pub coordinates: GeoPoint,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryInfo {
    #[serde(default)]
    pub location: DeliveryLocation,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupDetails {
    #[serde(default)]
    pub venue_id: String,
    #[serde(default)]
    pub delivery_info: DeliveryInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryStatusEntry {
    pub status: String,
    #[serde(default, deserialize_with = "optional_wolt_date")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Purchase {
    #[serde(default, deserialize_with = "optional_wolt_date")]
    pub purchase_datetime: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_wolt_date")]
    pub delivery_eta: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_status: String,
    #[serde(default)]
    pub delivery_status_log: Vec<DeliveryStatusEntry>,
}

pub const DELIVERED_STATUS: &str = "delivered";

/// The guest view of a group order, as returned by the participants endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDetails {
    pub status: OrderStatus,
    #[serde(deserialize_with = "wolt_date")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub details: GroupDetails,
    #[serde(default)]
    pub host_id: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub purchase: Option<Purchase>,
}

impl OrderDetails {
    pub fn venue_id(&self) -> &str {
        &self.details.venue_id
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == self.host_id)
    }

    /// The display name of the participant hosting the group, if they are in the participant list.
    pub fn host_name(&self) -> Option<String> {
        self.host().map(Participant::name)
    }

    pub fn delivery_coordinate(&self) -> Result<Coordinate, WoltApiError> {
        Coordinate::try_from(self.details.delivery_info.location.coordinates.coordinates.as_slice())
    }

    /// Item totals keyed by participant name. Participants sharing a name are summed together.
    pub fn totals_by_participant(&self) -> BTreeMap<String, Money> {
        let mut totals = BTreeMap::new();
        for participant in &self.participants {
            *totals.entry(participant.name()).or_insert_with(Money::default) += participant.item_total();
        }
        totals
    }

    pub fn purchase_datetime(&self) -> Option<DateTime<Utc>> {
        self.purchase.as_ref().and_then(|p| p.purchase_datetime)
    }

    pub fn delivery_eta(&self) -> Option<DateTime<Utc>> {
        self.purchase.as_ref().and_then(|p| p.delivery_eta)
    }

    pub fn is_delivered(&self) -> bool {
        self.purchase.as_ref().is_some_and(|p| {
            p.delivery_status == DELIVERED_STATUS || p.delivery_status_log.iter().any(|e| e.status == DELIVERED_STATUS)
        })
    }

    /// The logged delivery time, if the status log carries one.
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.purchase
            .as_ref()?
            .delivery_status_log
            .iter()
            .find(|e| e.status == DELIVERED_STATUS)
            .and_then(|e| e.timestamp)
    }
}

//--------------------------------------   VenueInfo   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DistanceRange {
    #[serde(rename = "a")]
    pub added_price: i64,
    #[serde(rename = "min")]
    pub min_distance: i64,
    /// Zero means the range is unbounded.
    #[serde(rename = "max")]
    pub max_distance: i64,
}

impl DistanceRange {
    pub fn contains(&self, distance: i64) -> bool {
        distance >= self.min_distance && (distance < self.max_distance || self.max_distance == 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeliveryPricing {
    #[serde(default)]
    pub base_price: i64,
    #[serde(default)]
    pub distance_ranges: Vec<DistanceRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliverySpecs {
    #[serde(default)]
    pub delivery_enabled: bool,
    #[serde(default)]
    pub delivery_pricing: DeliveryPricing,
    #[serde(default, deserialize_with = "optional_wolt_date")]
    pub offline_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub public_url: String,
    /// IANA timezone name, e.g. `Asia/Jerusalem`.
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub location: GeoPoint,
    #[serde(default)]
    pub delivery_specs: DeliverySpecs,
}

impl VenueInfo {
    pub fn coordinate(&self) -> Result<Coordinate, WoltApiError> {
        Coordinate::try_from(self.location.coordinates.as_slice())
    }

    pub fn is_delivering(&self) -> bool {
        self.online && self.delivery_specs.delivery_enabled
    }

    pub fn offline_period_end(&self) -> Option<DateTime<Utc>> {
        self.delivery_specs.offline_period_end
    }

    pub fn pricing(&self) -> &DeliveryPricing {
        &self.delivery_specs.delivery_pricing
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VenueResponse {
    #[serde(default)]
    pub results: Vec<VenueInfo>,
}

#[cfg(test)]
mod test {
    use super::*;

    const DETAILS: &str = r#"{
        "status": "purchased",
        "created_at": {"$date": 1700000000000},
        "details": {
            "venue_id": "5ae6013cf78b3d000ba7ef4d",
            "delivery_info": {"location": {"coordinates": {"type": "Point", "coordinates": [32.07, 34.78]}}}
        },
        "host_id": "h1",
        "participants": [
            {"first_name": "Dana", "last_name": "Levi", "user_id": "h1", "basket": {"items": []}},
            {"first_name": "Avi", "user_id": "p2", "basket": {"items": [{"end_amount": 4500}, {"end_amount": 1250}]}},
            {"first_name": "Avi", "user_id": "p3", "basket": {"items": [{"end_amount": 100}]}}
        ],
        "purchase": {
            "purchase_datetime": {"$date": 1700000100000},
            "delivery_eta": {"$date": 0},
            "delivery_status": "in_progress",
            "delivery_status_log": [{"status": "delivered", "timestamp": {"$date": 1700003000000}}]
        }
    }"#;

    #[test]
    fn decodes_order_details() {
        let details: OrderDetails = serde_json::from_str(DETAILS).unwrap();
        assert_eq!(details.status, OrderStatus::Purchased);
        assert!(details.status.is_purchased());
        assert_eq!(details.venue_id(), "5ae6013cf78b3d000ba7ef4d");
        assert_eq!(details.host_name().as_deref(), Some("Dana Levi"));
        assert_eq!(details.delivery_coordinate().unwrap(), Coordinate::new(32.07, 34.78));
        assert_eq!(details.created_at.timestamp_millis(), 1_700_000_000_000);
        assert!(details.delivery_eta().is_none());
        assert!(details.purchase_datetime().is_some());
        assert!(details.is_delivered());
        assert_eq!(details.delivered_at().unwrap().timestamp_millis(), 1_700_003_000_000);

        let totals = details.totals_by_participant();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Avi"], Money::from_minor(5850));
        assert_eq!(totals["Dana Levi"], Money::default());
    }

    #[test]
    fn unknown_status_and_missing_purchase() {
        let json = r#"{"status": "refunded", "created_at": {"$date": 1}, "host_id": "x"}"#;
        let details: OrderDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.status, OrderStatus::Unknown);
        assert!(details.host_name().is_none());
        assert!(!details.is_delivered());
        assert!(details.delivery_coordinate().is_err());
    }

    #[test]
    fn decodes_venue() {
        let json = r#"{"results": [{
            "name": "Falafel", "city": "Tel Aviv", "public_url": "https://wolt.com/venue/falafel",
            "timezone": "Asia/Jerusalem", "online": true,
            "location": {"coordinates": [32.08, 34.79]},
            "delivery_specs": {
                "delivery_enabled": false,
                "offline_period_end": {"$date": 1700000000000},
                "delivery_pricing": {"base_price": 1000, "distance_ranges": [{"a": 0, "min": 0, "max": 500}, {"a": 500, "min": 500, "max": 0}]}
            }
        }]}"#;
        let response: VenueResponse = serde_json::from_str(json).unwrap();
        let venue = &response.results[0];
        assert!(!venue.is_delivering());
        assert!(venue.offline_period_end().is_some());
        assert_eq!(venue.coordinate().unwrap(), Coordinate::new(32.08, 34.79));
        assert_eq!(venue.pricing().base_price, 1000);
        assert!(venue.pricing().distance_ranges[1].contains(10_000));
        assert!(!venue.pricing().distance_ranges[0].contains(500));
    }
}
