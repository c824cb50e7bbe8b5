//! Lazy page-by-page iteration.
//!
//! A page is fetched only when the consumer polls for it, and only after the
//! previous page's stop predicate was evaluated, so at most one request is in
//! flight. Endpoints disagree on how they signal the last page, hence the
//! per-call stop predicate.

use crate::client::SearchClient;
use crate::dispatcher::RequestOptions;
use crate::error::{SearchflowError, SearchflowResult};
use crate::models::{BrowseParams, SearchPageParams};
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use std::future::Future;

/// Where the next page starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Cursor(String),
    Number(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

struct PaginationState<F, S> {
    fetch_page: F,
    stop: S,
    /// `None` once iteration is over
    cursor: Option<Option<PageCursor>>,
}

/// Stream pages from `fetch_page` until `stop` holds for a page.
///
/// The first call receives `None`, later calls receive the previous page's
/// `next`. Iteration also ends after a page without `next` and after the
/// first error, which is yielded as the last item.
pub fn paginate<T, F, Fut, S>(
    fetch_page: F,
    stop: S,
) -> impl Stream<Item = SearchflowResult<Page<T>>>
where
    F: FnMut(Option<PageCursor>) -> Fut,
    Fut: Future<Output = SearchflowResult<Page<T>>>,
    S: Fn(&Page<T>) -> bool,
{
    let state = PaginationState {
        fetch_page,
        stop,
        cursor: Some(None),
    };

    futures::stream::unfold(state, |mut state| async move {
        let cursor = state.cursor.take()?;
        match (state.fetch_page)(cursor).await {
            Ok(page) => {
                if !(state.stop)(&page) && page.next.is_some() {
                    state.cursor = Some(page.next.clone());
                }
                Some((Ok(page), state))
            }
            Err(e) => Some((Err(e), state)),
        }
    })
}

/// Drain a page stream into its records
pub async fn collect_items<T, St>(pages: St) -> SearchflowResult<Vec<T>>
where
    St: Stream<Item = SearchflowResult<Page<T>>>,
{
    let pages: Vec<Page<T>> = pages.try_collect().await?;
    Ok(pages.into_iter().flat_map(|page| page.items).collect())
}

impl SearchClient {
    /// Browse every record of an index, following the browse cursor
    pub fn browse_objects<'a>(
        &'a self,
        index_name: &'a str,
        params: BrowseParams,
    ) -> impl Stream<Item = SearchflowResult<Page<Value>>> + 'a {
        paginate(
            move |cursor| {
                let mut params = params.clone();
                if let Some(PageCursor::Cursor(cursor)) = cursor {
                    params.cursor = Some(cursor);
                }
                async move {
                    let resp = self
                        .browse_page(index_name, &params, &RequestOptions::default())
                        .await?;
                    Ok::<_, SearchflowError>(Page {
                        items: resp.hits,
                        next: resp.cursor.map(PageCursor::Cursor),
                    })
                }
            },
            |page: &Page<Value>| page.next.is_none(),
        )
    }

    /// Every record of an index
    pub async fn browse_objects_all(
        &self,
        index_name: &str,
        params: BrowseParams,
    ) -> SearchflowResult<Vec<Value>> {
        collect_items(self.browse_objects(index_name, params)).await
    }

    /// Browse every rule of an index, page by page
    pub fn browse_rules<'a>(
        &'a self,
        index_name: &'a str,
        hits_per_page: u32,
    ) -> impl Stream<Item = SearchflowResult<Page<Value>>> + 'a {
        self.browse_search_pages(index_name, "rules", hits_per_page)
    }

    /// Browse every synonym of an index, page by page
    pub fn browse_synonyms<'a>(
        &'a self,
        index_name: &'a str,
        hits_per_page: u32,
    ) -> impl Stream<Item = SearchflowResult<Page<Value>>> + 'a {
        self.browse_search_pages(index_name, "synonyms", hits_per_page)
    }

    /// Every rule of an index
    pub async fn browse_rules_all(
        &self,
        index_name: &str,
        hits_per_page: u32,
    ) -> SearchflowResult<Vec<Value>> {
        collect_items(self.browse_rules(index_name, hits_per_page)).await
    }

    /// Every synonym of an index
    pub async fn browse_synonyms_all(
        &self,
        index_name: &str,
        hits_per_page: u32,
    ) -> SearchflowResult<Vec<Value>> {
        collect_items(self.browse_synonyms(index_name, hits_per_page)).await
    }

    // A short page means there is nothing after it
    fn browse_search_pages<'a>(
        &'a self,
        index_name: &'a str,
        kind: &'static str,
        hits_per_page: u32,
    ) -> impl Stream<Item = SearchflowResult<Page<Value>>> + 'a {
        let hits_per_page = hits_per_page.max(1);
        paginate(
            move |cursor| {
                let page = match cursor {
                    Some(PageCursor::Number(page)) => page,
                    _ => 0,
                };
                async move {
                    let params = SearchPageParams {
                        query: String::new(),
                        page,
                        hits_per_page,
                    };
                    let resp = self
                        .search_page(index_name, kind, &params, &RequestOptions::default())
                        .await?;
                    Ok::<_, SearchflowError>(Page {
                        items: resp.hits,
                        next: Some(PageCursor::Number(page + 1)),
                    })
                }
            },
            move |page: &Page<Value>| page.items.len() < hits_per_page as usize,
        )
    }
}
