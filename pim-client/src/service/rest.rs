//! REST implementation of the entity service contract
//!
//! Endpoint layout relative to `<base_url>/<resource>`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | get_multiple | `GET <resource>?<params>` (pagination in headers) |
//! | get_multiple_by_ids | `POST <resource>/multiple?<params>` with JSON id array |
//! | get_one_or_default | `GET <resource>/<id>` |
//! | create | `POST <resource>` with JSON array |
//! | patch | `PATCH <resource>` with JSON object keyed by id |
//! | delete | `DELETE <resource>` with JSON id array |

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{ErrorResponseBody, PaginatedList, Pagination, SearchParameters};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionProvider;

use super::{DeletableService, EntityService, ReadService};

/// Network service for one entity resource
///
/// `V` is the view model, `C` the create payload and `P` the patch payload.
pub struct RestService<V, C = (), P = ()> {
    client: Client,
    base_url: String,
    resource: String,
    session: Arc<dyn SessionProvider>,
    _types: PhantomData<fn() -> (V, C, P)>,
}

impl<V, C, P> Clone for RestService<V, C, P> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            resource: self.resource.clone(),
            session: Arc::clone(&self.session),
            _types: PhantomData,
        }
    }
}

impl<V, C, P> std::fmt::Debug for RestService<V, C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestService")
            .field("base_url", &self.base_url)
            .field("resource", &self.resource)
            .finish()
    }
}

impl<V, C, P> RestService<V, C, P> {
    pub fn new(
        config: &ClientConfig,
        resource: impl Into<String>,
        session: Arc<dyn SessionProvider>,
    ) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, config, resource, session))
    }

    /// Share one connection pool between several resources
    pub fn with_client(
        client: Client,
        config: &ClientConfig,
        resource: impl Into<String>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            resource: resource.into().trim_matches('/').to_string(),
            session,
            _types: PhantomData,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    fn url(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}/{}/{}", self.base_url, self.resource, suffix),
            None => format!("{}/{}", self.base_url, self.resource),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        tracing::debug!(resource = %self.resource, %status, "Request rejected");
        Err(match status {
            StatusCode::UNAUTHORIZED => {
                self.session.on_unauthorized();
                ClientError::Unauthorized
            }
            StatusCode::FORBIDDEN => ClientError::Forbidden(text),
            StatusCode::NOT_FOUND => ClientError::NotFound(text),
            StatusCode::BAD_REQUEST => ClientError::BadRequest {
                body: serde_json::from_str::<ErrorResponseBody>(&text).ok(),
                message: text,
            },
            _ => ClientError::Internal(format!("{}: {}", status, text)),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }
}

/// Race a request against its cancellation signal; dropping the losing
/// future aborts the HTTP exchange.
async fn cancellable<T>(
    signal: &CancellationToken,
    request: impl Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(ClientError::Cancelled),
        result = request => result,
    }
}

#[async_trait]
impl<V, C, P> ReadService for RestService<V, C, P>
where
    V: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    type View = V;

    async fn get_multiple(
        &self,
        params: &SearchParameters,
        signal: &CancellationToken,
    ) -> ClientResult<PaginatedList<V>> {
        cancellable(signal, async {
            let request = self.client.get(self.url(None)).query(params);
            let response = self.send(request).await?;
            let pagination = Pagination::from_headers(response.headers())?;
            let data: Vec<V> = response.json().await?;
            Ok(PaginatedList::new(data, pagination))
        })
        .await
    }

    async fn get_multiple_by_ids(
        &self,
        ids: &[String],
        params: Option<&SearchParameters>,
        signal: &CancellationToken,
    ) -> ClientResult<Vec<V>> {
        cancellable(signal, async {
            let mut request = self.client.post(self.url(Some("multiple"))).json(ids);
            if let Some(params) = params {
                request = request.query(params);
            }
            self.send_json(request).await
        })
        .await
    }

    async fn get_one_or_default(&self, id: &str) -> ClientResult<V> {
        self.send_json(self.client.get(self.url(Some(id)))).await
    }
}

#[async_trait]
impl<V, C, P> EntityService for RestService<V, C, P>
where
    V: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Serialize + Send + Sync + 'static,
    P: Serialize + Send + Sync + 'static,
{
    type Create = C;
    type Patch = P;

    async fn create(&self, entities: &[C]) -> ClientResult<Vec<V>> {
        self.send_json(self.client.post(self.url(None)).json(entities))
            .await
    }

    async fn patch(&self, patches: &BTreeMap<String, P>) -> ClientResult<BTreeMap<String, V>> {
        self.send_json(self.client.patch(self.url(None)).json(patches))
            .await
    }
}

#[async_trait]
impl<V, C, P> DeletableService for RestService<V, C, P>
where
    V: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Serialize + Send + Sync + 'static,
    P: Serialize + Send + Sync + 'static,
{
    async fn delete(&self, ids: &[String]) -> ClientResult<()> {
        self.send(self.client.delete(self.url(None)).json(ids))
            .await?;
        Ok(())
    }
}
