//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Session credential persistence
//! - Adapters: Transport implementations (console)

pub mod config;
pub mod storage;
pub mod adapters;
