pub mod config;
pub mod cost;
pub mod init;
pub mod log;
pub mod registry;
pub mod status;
pub mod timer;
pub mod watch;
