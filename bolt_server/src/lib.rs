//! # Bolt server
//! The Slack-facing side of Bolt. It is responsible for:
//! * Receiving Slack events, checking their signatures and queueing them for the order coordinator.
//! * Sending the bot's messages, edits and reactions through the Slack Web API.
//! * Looking up workspace members for the user directory and the admin commands.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/events`: The Slack Events API endpoint.
//! * `/add-user`: The `/add-user` slash command, for admins.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
