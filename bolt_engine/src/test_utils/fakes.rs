use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wolt_tools::{
    data_objects::{
        Basket,
        DeliveryInfo,
        DeliveryLocation,
        DeliverySpecs,
        DeliveryStatusEntry,
        GeoPoint,
        GroupDetails,
        Item,
        Purchase,
    },
    DeliveryPricing,
    DistanceRange,
    OrderDetails,
    OrderStatus,
    Participant,
    VenueInfo,
    WoltApiError,
};

use crate::{
    db_types::User,
    traits::{GroupOrderApi, GroupOrderProvider, Notifier, NotifierError, UserDirectory, UserDirectoryError},
};

//--------------------------------------   RecordingNotifier   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub receiver: String,
    pub text: String,
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub receiver: String,
    pub message_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub receiver: String,
    pub message_id: String,
    pub reaction: String,
}

/// A notifier that remembers everything it was asked to do. Message ids are `msg-1`, `msg-2`, ...
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<Edit>>,
    reactions: Mutex<Vec<Reaction>>,
    next_id: AtomicUsize,
    fail_sends: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `send_message` fails.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn sent_to(&self, receiver: &str) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| m.receiver == receiver).collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.sent().iter().filter(|m| m.text.contains(needle)).count()
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.edits.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, receiver: &str, text: &str, in_reply_to: Option<&str>) -> Result<String, NotifierError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NotifierError::SendFailed { receiver: receiver.to_string(), reason: "offline".into() });
        }
        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().unwrap().push(SentMessage {
            id: id.clone(),
            receiver: receiver.to_string(),
            text: text.to_string(),
            in_reply_to: in_reply_to.map(String::from),
        });
        Ok(id)
    }

    async fn edit_message(&self, receiver: &str, text: &str, message_id: &str) -> Result<(), NotifierError> {
        self.edits.lock().unwrap().push(Edit {
            receiver: receiver.to_string(),
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(&self, receiver: &str, message_id: &str, reaction: &str) -> Result<(), NotifierError> {
        self.reactions.lock().unwrap().push(Reaction {
            receiver: receiver.to_string(),
            message_id: message_id.to_string(),
            reaction: reaction.to_string(),
        });
        Ok(())
    }
}

//--------------------------------------   ScriptedGroup   ---------------------------------------------------------
/// Replays a list of responses, repeating the last one forever.
#[derive(Debug)]
struct Script<T> {
    steps: Mutex<VecDeque<T>>,
}

impl<T: Clone> Script<T> {
    fn new(steps: Vec<T>) -> Self {
        Self { steps: Mutex::new(steps.into()) }
    }

    fn next(&self) -> Option<T> {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

/// A group order that plays back pre-recorded detail and venue responses.
#[derive(Debug)]
pub struct ScriptedGroup {
    details: Script<OrderDetails>,
    venues: Script<VenueInfo>,
    join_fails: bool,
    ready_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl GroupOrderApi for ScriptedGroup {
    async fn join(&self) -> Result<(), WoltApiError> {
        if self.join_fails {
            return Err(WoltApiError::BootstrapNotFound);
        }
        Ok(())
    }

    async fn mark_as_ready(&self) -> Result<(), WoltApiError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn details(&self) -> Result<OrderDetails, WoltApiError> {
        self.details.next().ok_or_else(|| WoltApiError::Request("no details scripted".into()))
    }

    async fn venue(&self, venue_id: &str) -> Result<VenueInfo, WoltApiError> {
        self.venues.next().ok_or_else(|| WoltApiError::VenueNotFound(venue_id.to_string()))
    }
}

/// Hands out [`ScriptedGroup`]s that all follow the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    pub details: Vec<OrderDetails>,
    pub venues: Vec<VenueInfo>,
    pub join_fails: bool,
    opened: Arc<AtomicUsize>,
    ready_calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(details: Vec<OrderDetails>, venues: Vec<VenueInfo>) -> Self {
        Self { details, venues, ..Default::default() }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

impl GroupOrderProvider for ScriptedProvider {
    type Group = ScriptedGroup;

    fn open_group(&self, _group_id: &str) -> Result<Self::Group, WoltApiError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedGroup {
            details: Script::new(self.details.clone()),
            venues: Script::new(self.venues.clone()),
            join_fails: self.join_fails,
            ready_calls: Arc::clone(&self.ready_calls),
        })
    }
}

//--------------------------------------   MemoryDirectory   ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    pub users: Vec<User>,
}

impl MemoryDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, UserDirectoryError> {
        Ok(self.users.iter().filter(|u| u.full_name == name).cloned().collect())
    }

    async fn get_user(&self, id: &str) -> Result<User, UserDirectoryError> {
        self.users.iter().find(|u| u.id == id).cloned().ok_or_else(|| UserDirectoryError::NotFound(id.to_string()))
    }
}

//--------------------------------------   Builders   ---------------------------------------------------------
pub const TEST_VENUE_ID: &str = "venue-1";

pub fn user(id: &str, full_name: &str, transport_id: &str) -> User {
    User {
        id: id.to_string(),
        full_name: full_name.to_string(),
        transport_id: transport_id.to_string(),
        timezone: "UTC".to_string(),
        ..Default::default()
    }
}

/// A participant whose basket holds a single item of `minor` units.
pub fn participant(user_id: &str, first_name: &str, minor: i64) -> Participant {
    Participant {
        first_name: first_name.to_string(),
        last_name: String::new(),
        status: "ready".to_string(),
        user_id: user_id.to_string(),
        basket: Basket { items: vec![Item { end_amount: minor }] },
    }
}

/// Order details delivering to the venue's own doorstep, so the fee is the base price.
pub fn order_details(status: OrderStatus, host_id: &str, participants: Vec<Participant>) -> OrderDetails {
    OrderDetails {
        status,
        created_at: Utc::now(),
        details: GroupDetails {
            venue_id: TEST_VENUE_ID.to_string(),
            delivery_info: DeliveryInfo {
                location: DeliveryLocation { coordinates: GeoPoint { coordinates: vec![32.0, 34.8] } },
            },
        },
        host_id: host_id.to_string(),
        participants,
        purchase: None,
    }
}

pub fn with_purchase(
    mut details: OrderDetails,
    purchased_at: DateTime<Utc>,
    eta: DateTime<Utc>,
    delivered: bool,
) -> OrderDetails {
    let delivery_status = if delivered { "delivered" } else { "on_the_way" }.to_string();
    let delivery_status_log = if delivered {
        vec![DeliveryStatusEntry { status: "delivered".to_string(), timestamp: Some(eta) }]
    } else {
        Vec::new()
    };
    details.purchase = Some(Purchase {
        purchase_datetime: Some(purchased_at),
        delivery_eta: Some(eta),
        delivery_status,
        delivery_status_log,
    });
    details
}

/// A venue at the same coordinates as [`order_details`]' destination, with a flat fee of `base_price` minor units.
pub fn venue(delivering: bool, base_price: i64) -> VenueInfo {
    VenueInfo {
        name: "Falafel Stand".to_string(),
        city: "Tel Aviv".to_string(),
        public_url: "https://wolt.com/en/isr/tel-aviv/restaurant/falafel".to_string(),
        timezone: "UTC".to_string(),
        online: delivering,
        location: GeoPoint { coordinates: vec![32.0, 34.8] },
        delivery_specs: DeliverySpecs {
            delivery_enabled: true,
            delivery_pricing: DeliveryPricing {
                base_price,
                distance_ranges: vec![DistanceRange { added_price: 0, min_distance: 0, max_distance: 0 }],
            },
            offline_period_end: None,
        },
    }
}
