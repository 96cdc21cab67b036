use std::future::Future;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Controls how per-item insight requests are issued.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of insight requests in flight. 1 means strictly sequential.
    pub concurrency: usize,
    pub progress: ProgressBar,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            progress: ProgressBar::hidden(),
        }
    }
}

impl FetchOptions {
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            ..Self::default()
        }
    }
}

/// Run `f` over every item with at most `options.concurrency` futures in
/// flight. Results come back in input order.
pub(crate) async fn fan_out<I, T, F, Fut>(items: Vec<I>, options: &FetchOptions, f: F) -> Vec<T>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = T>,
{
    let progress = &options.progress;
    progress.reset();
    progress.set_length(items.len() as u64);

    let results: Vec<T> = stream::iter(items)
        .map(f)
        .buffered(options.concurrency.max(1))
        .inspect(|_| progress.inc(1))
        .collect()
        .await;

    progress.finish_and_clear();
    results
}

/// Fallible [`fan_out`]: stops at the first error, dropping any requests
/// still in flight and never starting the rest.
pub(crate) async fn try_fan_out<I, T, E, F, Fut>(
    items: Vec<I>,
    options: &FetchOptions,
    mut f: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let progress = &options.progress;
    progress.reset();
    progress.set_length(items.len() as u64);

    let results = stream::iter(items)
        .map(|item| Ok::<_, E>(f(item)))
        .try_buffered(options.concurrency.max(1))
        .inspect_ok(|_| progress.inc(1))
        .try_collect()
        .await;

    progress.finish_and_clear();
    results
}
