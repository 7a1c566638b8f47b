//! iotrec: reconciliation handlers for IoT logging and topic rule destinations.
//!
//! Three resource types are reconciled against the IoT control plane:
//! - `AWS::IoT::Logging`: the account's logging options singleton
//! - `AWS::IoT::ResourceSpecificLogging`: per-target log level overrides
//! - `AWS::IoT::TopicRuleDestination`: HTTP and VPC rule destinations
//!
//! Each handler runs one verb per invocation and reports an [`Outcome`]. The
//! [`Dispatcher`] routes JSON requests from the orchestrator to the matching
//! handler.

pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lookup;
pub mod model;
pub mod outcome;
pub mod reconciler;
pub mod target_id;
pub mod translate;

pub use config::LookupConfig;
pub use dispatch::{Dispatcher, HandlerInvocation};
pub use error::HandlerError;
pub use outcome::{HandlerErrorCode, OperationStatus, Outcome};
pub use reconciler::{Action, HandlerRequest, ResourceHandler};
