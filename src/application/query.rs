//! Listing query executor.
//!
//! Runs a normalized search against the listing store and assembles a
//! [`ResultPage`]. It never touches the cache; the search service decides
//! whether the executor is needed at all.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use tracing::debug;

use crate::application::filter::FilterDescriptor;
use crate::application::pagination::{PageWindow, ResultPage};
use crate::application::repos::{ListingsRepo, RepoError, bounded};
use crate::domain::entities::ListingRecord;

const METRIC_LISTING_QUERY_MS: &str = "abode_listing_query_ms";

#[derive(Clone)]
pub struct ListingQueryExecutor {
    repo: Arc<dyn ListingsRepo>,
    timeout: Duration,
}

impl ListingQueryExecutor {
    pub fn new(repo: Arc<dyn ListingsRepo>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// Fetch one page and the total match count for `filter`.
    ///
    /// The page and the count are issued concurrently and each is bounded by
    /// the configured store timeout. Either failing fails the whole query.
    pub async fn execute(
        &self,
        filter: &FilterDescriptor,
    ) -> Result<ResultPage<ListingRecord>, RepoError> {
        let started_at = Instant::now();
        let window = PageWindow::from(filter);

        let (items, total_count) = tokio::try_join!(
            bounded(self.timeout, self.repo.search_listings(filter, window)),
            bounded(self.timeout, self.repo.count_listings(filter)),
        )?;

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_LISTING_QUERY_MS).record(elapsed_ms);
        debug!(
            page = filter.page(),
            page_size = filter.page_size(),
            returned = items.len(),
            total_count,
            elapsed_ms,
            "Listing query executed"
        );

        Ok(ResultPage::new(
            items,
            filter.page(),
            filter.page_size(),
            total_count,
        ))
    }
}
