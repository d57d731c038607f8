//! Helpers for tests: an in-memory store and scripted fakes of the external collaborators.
pub mod fakes;
pub mod prepare_env;
