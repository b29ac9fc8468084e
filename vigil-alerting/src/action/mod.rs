//! Transport actions and their request/response envelopes.

mod get_monitor;
mod index_job;

pub use get_monitor::{GetMonitorAction, GetMonitorRequest, GetMonitorResponse};
pub use index_job::{
    IndexDestinationAction, IndexDestinationRequest, IndexDestinationResponse, IndexJobAction,
    IndexJobRequest, IndexJobResponse, IndexMonitorAction, IndexMonitorRequest,
    IndexMonitorResponse,
};

use crate::error::AlertingResult;
use async_trait::async_trait;
use vigil_types::Caller;

/// An operation executed on behalf of a caller.
#[async_trait]
pub trait TransportAction: Send + Sync {
    type Request: Send + 'static;
    type Response: Send + 'static;

    async fn execute(&self, request: Self::Request, caller: &Caller) -> AlertingResult<Self::Response>;
}
