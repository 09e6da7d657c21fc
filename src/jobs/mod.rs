use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_token_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Purge expired refresh and reset tokens (runs every hour)
    async fn expired_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            debug!("Running expired token cleanup");

            match tasks::cleanup_expired_tokens(&scheduler.context).await {
                Ok(count) if count > 0 => info!("Cleaned up {} expired tokens", count),
                Ok(_) => debug!("Token cleanup: nothing expired"),
                Err(e) => error!("Failed to cleanup expired tokens: {}", e),
            }

            let windows = tasks::prune_rate_limit_windows(&scheduler.context);
            if windows > 0 {
                debug!("Dropped {} stale rate-limit windows", windows);
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                error!("Health check failed: {}", e);
            }
        }
    }
}
