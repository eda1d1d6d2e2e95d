//! Application services - Business logic orchestration

pub mod event_service;
pub mod group_notifier;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use event_service::EventService;
pub use group_notifier::GroupNotifier;
pub use supervisor::{ConnectionSupervisor, SupervisorSettings};
