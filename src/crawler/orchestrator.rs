//! Multi-site fan-out
//!
//! One task per site, bounded by a semaphore. A panicking or failing site
//! only affects its own result slot.

use crate::models::{CrawlResult, SiteTarget};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs one crawl per target concurrently and collects results in input order
#[derive(Debug, Clone)]
pub struct MultiSiteOrchestrator {
    max_concurrent: usize,
}

impl MultiSiteOrchestrator {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Spawns `crawl(target)` for every target
    ///
    /// At most `max_concurrent` crawls run at once. The returned vector has
    /// exactly one result per target, in the order the targets were given.
    pub async fn run<F, Fut>(
        &self,
        targets: Vec<SiteTarget>,
        keyword: Option<&str>,
        crawl: F,
    ) -> Vec<CrawlResult>
    where
        F: Fn(SiteTarget) -> Fut,
        Fut: Future<Output = CrawlResult> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let semaphore = Arc::clone(&semaphore);
                let task = crawl(target);
                tokio::spawn(async move {
                    // The semaphore is never closed
                    let _permit = semaphore.acquire_owned().await.ok();
                    task.await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, target)| match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("{}: crawl task aborted: {}", target.name, e);
                    CrawlResult::failure(
                        &target.name,
                        keyword,
                        &target.url,
                        format!("unexpected fault: {}", e),
                    )
                }
            })
            .collect()
    }
}
