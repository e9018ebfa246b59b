//! Pagination over ARM list operations.
//!
//! List operations return `{"value": [...], "nextLink": "..."}`. [`Pager`]
//! fetches one page per call and follows `nextLink` until it is absent or
//! empty. Use [`Pager::into_stream`] to iterate over items instead of pages.

use crate::client::ArmClient;
use crate::error::{ArmError, ArmResult};
use crate::request::{join_path, Request};
use crate::response::decode;
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// One page of a list result.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new", rename = "value")]
    pub items: Vec<T>,
    /// Link to the next page, if any.
    #[serde(default, rename = "nextLink")]
    pub next_link: Option<String>,
}

/// Iterates over the pages of a list operation.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example(mut pager: azure_arm_core::Pager<serde_json::Value>) -> azure_arm_core::ArmResult<()> {
/// while let Some(page) = pager.next_page().await {
///     for item in page?.items {
///         println!("{item}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pager<T> {
    client: ArmClient,
    first: Option<Request>,
    next_link: Option<String>,
    api_version: Option<String>,
    done: bool,
    _item: std::marker::PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("next_link", &self.next_link)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> Pager<T> {
    /// Create a pager whose first page is fetched with `request`.
    ///
    /// The `api-version` of `request` is carried over to next links that lack one.
    pub fn new(client: ArmClient, request: Request) -> Self {
        let api_version = request
            .url()
            .query_pairs()
            .find(|(k, _)| k == "api-version")
            .map(|(_, v)| v.into_owned());
        Self {
            client,
            first: Some(request),
            next_link: None,
            api_version,
            done: false,
            _item: std::marker::PhantomData,
        }
    }

    /// Returns `true` while another page may be fetched.
    pub fn more(&self) -> bool {
        !self.done
    }

    /// Fetch the next page, or `None` once the last page was returned.
    ///
    /// A failed fetch leaves the pager where it was, so the same page is
    /// requested again on the next call.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::pager::next_page`.
    #[tracing::instrument(name = "arm::pager::next_page", skip(self))]
    pub async fn next_page(&mut self) -> Option<ArmResult<Page<T>>> {
        if self.done {
            return None;
        }
        Some(self.fetch().await)
    }

    async fn fetch(&mut self) -> ArmResult<Page<T>> {
        let request = match (&self.first, &self.next_link) {
            (Some(first), _) => first.clone(),
            (None, Some(link)) => Request::get(self.resolve_link(link)?),
            (None, None) => {
                return Err(ArmError::InvalidPollingUrl("pager has no next link".into()));
            }
        };

        let response = self.client.send(&request).await?;
        let page: Page<T> = decode(&response, &[200])?;

        self.first = None;
        self.next_link = page.next_link.clone().filter(|link| !link.trim().is_empty());
        self.done = self.next_link.is_none();

        tracing::debug!(
            items = page.items.len(),
            has_next = !self.done,
            "fetched page"
        );
        Ok(page)
    }

    /// Absolute next links are used as-is; relative ones are joined to the endpoint.
    fn resolve_link(&self, link: &str) -> ArmResult<Url> {
        let mut url = match Url::parse(link) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let (path, query) = link.split_once('?').unwrap_or((link, ""));
                let mut url = join_path(self.client.endpoint(), path)?;
                if !query.is_empty() {
                    url.set_query(Some(query));
                }
                url
            }
            Err(e) => {
                return Err(ArmError::invalid_endpoint_with_source(
                    format!("invalid next link: {link}"),
                    e,
                ))
            }
        };

        if let Some(version) = &self.api_version {
            if !url.query_pairs().any(|(k, _)| k == "api-version") {
                url.query_pairs_mut().append_pair("api-version", version);
            }
        }
        Ok(url)
    }
}

impl<T: DeserializeOwned + Send + 'static> Pager<T> {
    /// Flatten the pages into a stream of items.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = ArmResult<T>> + Send {
        stream::unfold(Some(self), |pager| async move {
            let mut pager = pager?;
            let next = pager.next_page().await?;
            Some(match next {
                Ok(page) => (Ok(page.items), Some(pager)),
                Err(e) => (Err(e), None),
            })
        })
        .flat_map(|page| match page {
            Ok(items) => stream::iter(items.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(e) => stream::iter(vec![Err(e)]),
        })
    }
}
