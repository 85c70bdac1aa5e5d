use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;
use std::time::Duration;

/// true  => login is TAKEN
/// false => login is AVAILABLE (usually we store only taken)
pub static LOGIN_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single login as taken
pub async fn mark_taken(login: &str) {
    LOGIN_CACHE.insert(login.to_lowercase(), true).await;
}

/// Drop a login from the cache (account deleted or renamed)
pub async fn forget(login: &str) {
    LOGIN_CACHE.invalidate(&login.to_lowercase()).await;
}

/// Check if login is taken. A miss is not authoritative; the
/// transactional check still runs.
pub async fn is_taken(login: &str) -> bool {
    LOGIN_CACHE
        .get(&login.to_lowercase())
        .await
        .unwrap_or(false)
}

/// Batch mark logins as taken
async fn batch_mark(logins: &[String]) {
    let futures: Vec<_> = logins
        .iter()
        .map(|l| LOGIN_CACHE.insert(l.to_lowercase(), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Load existing logins into the in-memory cache (batched)
pub async fn warmup_login_cache(pool: &SqlitePool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String,)>("SELECT login FROM users ORDER BY id").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (login,) = row?;
        batch.push(login);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    tracing::info!("Login cache warmup complete: {} accounts", total_count);

    Ok(())
}
