pub mod clock;
pub mod command;
pub mod cost;
pub mod ledger;
pub mod log;
pub mod poller;
pub mod registry;
pub mod resolver;
