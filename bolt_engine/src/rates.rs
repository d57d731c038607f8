//! # Rate calculator
//!
//! Turns the raw item totals of a finished group order into what each participant owes, including an equal share of
//! the delivery fee, and renders the rates message.
//!
//! The delivery fee is not part of the group order details, so it is reconstructed from the venue's pricing table:
//! the great-circle distance between the venue and the delivery location selects a distance bracket, and the fee is
//! the venue's base price plus that bracket's surcharge.
use std::{collections::BTreeMap, fmt::Write};

use bolt_common::Money;
use wolt_tools::{Coordinate, DeliveryPricing, VenueInfo, WoltApiError};

use crate::db_types::User;

/// Mean Earth radius used for delivery distances, in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// Great-circle distance between two points, in metres.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = b.lon.to_radians() - a.lon.to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// The delivery fee in whole currency units for a delivery `distance` metres away. The first matching bracket wins;
/// if none matches only the base price applies.
pub fn delivery_fee_for_distance(pricing: &DeliveryPricing, distance: i64) -> i64 {
    let surcharge =
        pricing.distance_ranges.iter().find(|r| r.contains(distance)).map(|r| r.added_price).unwrap_or_default();
    (pricing.base_price + surcharge) / 100
}

pub fn delivery_fee(venue: &VenueInfo, destination: &Coordinate) -> Result<i64, WoltApiError> {
    let origin = venue.coordinate()?;
    let distance = haversine_distance(&origin, destination) as i64;
    Ok(delivery_fee_for_distance(venue.pricing(), distance))
}

/// Adds an equal share of the delivery fee to each participant's item total.
///
/// Participants who ordered nothing are left out, except the host, who always appears and always pays a share of the
/// delivery. The result is ordered by participant name.
pub fn split_delivery_fee(totals: &BTreeMap<String, Money>, host: &str, delivery_fee: i64) -> BTreeMap<String, Money> {
    let mut rates: BTreeMap<String, Money> =
        totals.iter().filter(|(_, total)| !total.is_zero()).map(|(name, total)| (name.clone(), *total)).collect();
    if !host.is_empty() {
        rates.entry(host.to_string()).or_insert_with(|| totals.get(host).copied().unwrap_or_default());
    }
    let per_head = Money::from_major(delivery_fee).share_of(rates.len());
    rates.values_mut().for_each(|amount| *amount += per_head);
    rates
}

//--------------------------------------   Rates   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    /// The participant's name in the group order.
    pub label: String,
    pub user: Option<User>,
    pub amount: Money,
}

impl Rate {
    /// A mention if the participant is a known user, their name otherwise.
    pub fn display_name(&self) -> String {
        self.user.as_ref().map(User::mention).unwrap_or_else(|| self.label.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupRate {
    /// Sorted by label.
    pub rates: Vec<Rate>,
    pub host: String,
    pub host_user: Option<User>,
    /// Whole currency units.
    pub delivery_fee: i64,
}

impl GroupRate {
    pub fn host_display_name(&self) -> String {
        self.host_user.as_ref().map(User::mention).unwrap_or_else(|| self.host.clone())
    }

    pub fn total(&self) -> Money {
        self.rates.iter().map(|r| r.amount).sum()
    }

    /// Everyone but the host, i.e. the people that will owe money.
    pub fn borrowers(&self) -> impl Iterator<Item = &Rate> {
        self.rates.iter().filter(move |r| r.label != self.host)
    }
}

/// Renders the rates message. The output only depends on the group rate, so repeated calls give identical text.
pub fn build_rates_message(group_id: &str, group_rate: &GroupRate) -> String {
    let mut msg = String::new();
    let _ = writeln!(msg, "Rates for Wolt order ID {group_id} (including {} NIS for delivery):", group_rate.delivery_fee);
    for rate in &group_rate.rates {
        let _ = writeln!(msg, "{}: {}", rate.display_name(), rate.amount);
    }
    let _ = writeln!(msg, "\nPay to: {}", group_rate.host_display_name());
    if let Some(host) = group_rate.host_user.as_ref().filter(|u| !u.payment_preferences.is_empty()) {
        let methods = host.payment_preferences.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ");
        let _ = writeln!(msg, "Preferred payments methods (in order): {methods}");
    }
    msg
}
