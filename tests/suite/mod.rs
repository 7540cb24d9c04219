//! Integration test suite modules

mod client;
mod engine;
mod session;
