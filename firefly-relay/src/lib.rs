pub mod api;
pub mod broadcast;
pub mod config;
pub mod mailbox;
pub mod registry;
