//! Handlers 模块

pub mod discovery;
pub mod health;
pub mod metrics;
pub mod provisioning;
pub mod templates;

pub use discovery::*;
pub use health::*;
pub use metrics::*;
pub use provisioning::*;
pub use templates::*;
