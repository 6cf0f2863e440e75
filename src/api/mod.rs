//! Tryton JSON-RPC boundary
//!
//! Session handling, request encoding, error mapping and the [`TrytonApi`]
//! trait every other module talks to.

pub mod auth;
pub mod client;
pub mod constants;
pub mod logging;
pub mod models;
pub mod rpc;
pub mod traits;

pub use auth::{SessionContext, SessionToken};
pub use client::RpcClient;
pub use logging::{ApiLogger, LogLevel, MonitoringConfig, OperationContext};
pub use models::{ActionTarget, MenuRow, WizardButton, WizardInstance, WizardStepResult, WizardView};
pub use traits::TrytonApi;
