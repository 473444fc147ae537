//! Search index client over the Solr JSON update API.
//!
//! Document collections are posted as a JSON array to
//! `{base_url}/solr/{core}/update?commit=true`; each [`IndexKind`] maps to a
//! configured core name.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use nbindex_shared::{Document, IndexKind, NbIndexError, Result, SolrConfig};

/// User-Agent string for index requests.
const USER_AGENT: &str = concat!("nbindex/", env!("CARGO_PKG_VERSION"));

/// Pushes built documents to a search backend.
pub trait IndexClient: Send + Sync {
    /// Index `documents` into the collection for `kind`.
    fn index_documents(
        &self,
        kind: IndexKind,
        documents: &[Document],
    ) -> impl Future<Output = Result<()>>;
}

// ---------------------------------------------------------------------------
// SolrClient
// ---------------------------------------------------------------------------

/// HTTP client for a Solr server with one core per [`IndexKind`].
#[derive(Debug, Clone)]
pub struct SolrClient {
    client: Client,
    base_url: Url,
    cell_core: String,
    notebook_core: String,
}

impl SolrClient {
    pub fn new(config: &SolrConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            NbIndexError::config(format!("invalid solr base_url {:?}: {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NbIndexError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            cell_core: config.cell_core.clone(),
            notebook_core: config.notebook_core.clone(),
        })
    }

    /// Configured core name for `kind`.
    pub fn core_name(&self, kind: IndexKind) -> &str {
        match kind {
            IndexKind::Cell => &self.cell_core,
            IndexKind::Notebook => &self.notebook_core,
        }
    }

    /// Update endpoint for `core`, resolved against the base URL.
    fn update_url(&self, core: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("solr/{core}/update"))
            .map_err(|e| NbIndexError::config(format!("invalid core name {core:?}: {e}")))?;
        url.query_pairs_mut().append_pair("commit", "true");
        Ok(url)
    }
}

impl IndexClient for SolrClient {
    #[instrument(skip_all, fields(core = %self.core_name(kind), count = documents.len()))]
    async fn index_documents(&self, kind: IndexKind, documents: &[Document]) -> Result<()> {
        let core = self.core_name(kind);
        let url = self.update_url(core)?;

        let response = self
            .client
            .post(url.clone())
            .json(documents)
            .send()
            .await
            .map_err(|e| NbIndexError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NbIndexError::Network(format!(
                "core {core}: HTTP {status}: {}",
                body.trim()
            )));
        }

        debug!(%status, "documents indexed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> SolrConfig {
        SolrConfig {
            base_url: base_url.to_string(),
            ..SolrConfig::default()
        }
    }

    fn doc(id: &str) -> Document {
        let mut d = Document::new();
        d.set("id", id);
        d.set("index", 0usize);
        d
    }

    #[test]
    fn maps_kinds_to_configured_cores() {
        let mut cfg = config("http://localhost:8983");
        cfg.cell_core = "cells".into();
        let client = SolrClient::new(&cfg).unwrap();
        assert_eq!(client.core_name(IndexKind::Cell), "cells");
        assert_eq!(client.core_name(IndexKind::Notebook), "jupyter-notebook");
    }

    #[test]
    fn update_url_joins_base() {
        let client = SolrClient::new(&config("http://localhost:8983")).unwrap();
        assert_eq!(
            client.update_url("jupyter-cell").unwrap().as_str(),
            "http://localhost:8983/solr/jupyter-cell/update?commit=true"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = SolrClient::new(&config("not a url")).unwrap_err();
        assert!(err.to_string().contains("invalid solr base_url"));
    }

    #[tokio::test]
    async fn posts_documents_as_json_array() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/solr/jupyter-cell/update"))
            .and(query_param("commit", "true"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!([
                {"id": "nb_0", "index": 0},
                {"id": "nb_1", "index": 0}
            ])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SolrClient::new(&config(&server.uri())).unwrap();
        client
            .index_documents(IndexKind::Cell, &[doc("nb_0"), doc("nb_1")])
            .await
            .expect("index");
    }

    #[tokio::test]
    async fn notebook_kind_uses_notebook_core() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/solr/jupyter-notebook/update"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = SolrClient::new(&config(&server.uri())).unwrap();
        client
            .index_documents(IndexKind::Notebook, &[doc("nb")])
            .await
            .expect("index");
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("undefined field foo"))
            .mount(&server)
            .await;

        let client = SolrClient::new(&config(&server.uri())).unwrap();
        let err = client
            .index_documents(IndexKind::Cell, &[doc("x")])
            .await
            .unwrap_err();

        assert!(matches!(err, NbIndexError::Network(_)));
        let message = err.to_string();
        assert!(message.contains("jupyter-cell"));
        assert!(message.contains("400"));
        assert!(message.contains("undefined field foo"));
    }
}
