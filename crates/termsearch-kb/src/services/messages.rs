//! Message types for service communication

use tokio::sync::oneshot;

use crate::data::{RetrievalError, TermSearchRequest, TermSearchResponse, TraceContext};

/// Request sent to a running [`RetrievalService`](crate::services::RetrievalService)
#[derive(Debug)]
pub struct SearchMessage {
    pub request: TermSearchRequest,
    pub trace_ctx: TraceContext,
}

/// Response type for searches
#[derive(Debug)]
pub enum SearchResponse {
    Success(TermSearchResponse),
    Error(RetrievalError),
}

/// Wrapper for the oneshot sender to return search results
#[derive(Debug)]
pub struct SearchResultSender {
    pub sender: oneshot::Sender<SearchResponse>,
}
