/// Background job bodies
use crate::{context::AppContext, error::AppResult};

/// Check database connectivity
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

/// Drop expired cache entries. Returns the number removed.
pub fn sweep_cache(ctx: &AppContext) -> usize {
    let removed = ctx.cache.purge_expired();
    let stats = ctx.cache.stats();
    tracing::trace!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate,
        "Cache stats"
    );
    removed
}
