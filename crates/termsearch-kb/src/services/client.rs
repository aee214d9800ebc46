use tokio::sync::{mpsc, oneshot};

use crate::data::{RetrievalError, TermSearchRequest, TermSearchResponse, TraceContext};
use crate::services::messages::{SearchMessage, SearchResponse, SearchResultSender};

/// Cloneable handle for sending searches to a running retrieval service.
#[derive(Clone)]
pub struct TermSearchClient {
    search_tx: mpsc::Sender<(SearchMessage, SearchResultSender)>,
}

impl TermSearchClient {
    pub fn new(search_tx: mpsc::Sender<(SearchMessage, SearchResultSender)>) -> Self {
        TermSearchClient { search_tx }
    }

    /// Sends a search request and awaits the response.
    pub async fn search(
        &self,
        request: TermSearchRequest,
        trace_ctx: TraceContext,
    ) -> Result<TermSearchResponse, RetrievalError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.search_tx
            .send((SearchMessage { request, trace_ctx }, SearchResultSender { sender: response_tx }))
            .await
            .map_err(|_| RetrievalError::ServiceClosed("search channel closed".to_string()))?;

        let response = response_rx
            .await
            .map_err(|_| RetrievalError::ServiceClosed("search response channel closed by service".to_string()))?;

        match response {
            SearchResponse::Success(response) => Ok(response),
            SearchResponse::Error(err) => Err(err),
        }
    }

    /// Searches with a fresh root trace.
    pub async fn search_text(&self, query: impl Into<String>, top_k: usize) -> Result<TermSearchResponse, RetrievalError> {
        self.search(TermSearchRequest::new(query, top_k), TraceContext::new_root())
            .await
    }
}
