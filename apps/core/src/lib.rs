pub mod action_executor;
pub mod command;
pub mod config;
pub mod contract;
pub mod dispatcher;
pub mod display;
pub mod hotkey;
pub mod logging;
pub mod relay;
pub mod runtime;
pub mod session;
pub mod stream_consumer;
pub mod title;
pub mod transport;
pub mod web_search;
