// src/analyze/limiter.rs
//! Wave-based concurrency cap: at most `limit` tasks in flight, waves run
//! strictly one after another, results keep input order.

use std::future::Future;

use futures::future::join_all;

pub async fn run_in_waves<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let limit = limit.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut pending = items.into_iter().peekable();

    while pending.peek().is_some() {
        let wave: Vec<Fut> = pending.by_ref().take(limit).map(&f).collect();
        results.extend(join_all(wave).await);
    }
    results
}
