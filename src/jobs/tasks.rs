/// Background task implementations
use crate::{context::AppContext, error::CmsResult};
use chrono::Utc;
use std::time::Instant;

/// Remove refresh tokens past their expiry and stale reset tokens
pub async fn cleanup_expired_tokens(ctx: &AppContext) -> CmsResult<u64> {
    ctx.users.purge_expired(Utc::now()).await
}

/// Forget rate-limit windows that have run out
pub fn prune_rate_limit_windows(ctx: &AppContext) -> usize {
    ctx.rate_limiter.prune(Instant::now())
}

/// Health check - verify storage is reachable
pub async fn health_check(ctx: &AppContext) -> CmsResult<()> {
    crate::db::test_connection(&ctx.db).await?;
    ctx.users.count().await?;
    Ok(())
}
