pub mod allocation_policy;
pub mod client;
pub mod common;
pub mod config;
pub mod events;
pub mod flavor;
pub mod host;
pub mod host_view;
pub mod image;
pub mod metrics;
pub mod queue;
pub mod reference_host;
pub mod service;
pub mod vm;
