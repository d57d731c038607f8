mod api;
mod config;
mod error;

pub mod data_objects;

pub use api::{extract_group_id_from_html, WoltGroup};
pub use config::WoltConfig;
pub use data_objects::{Coordinate, DeliveryPricing, DistanceRange, OrderDetails, OrderStatus, Participant, VenueInfo};
pub use error::WoltApiError;
