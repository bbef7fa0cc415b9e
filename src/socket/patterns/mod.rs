// src/socket/patterns/mod.rs

pub mod fair_queue;
pub mod load_balancer;

pub use fair_queue::{FairQueue, PushError};
pub use load_balancer::LoadBalancer;
