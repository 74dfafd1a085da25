use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

pub mod tasks;

/// Database health probe interval
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("Starting background job scheduler");

        let handles = vec![
            tokio::spawn(Self::cache_sweep_job(Arc::clone(&self))),
            tokio::spawn(Self::health_check_job(Arc::clone(&self))),
        ];

        info!("Background jobs started");
        handles
    }

    /// Sweep expired cache entries (runs every CACHE_SWEEP_INTERVAL_SECS)
    async fn cache_sweep_job(scheduler: Arc<Self>) {
        let period = Duration::from_secs(scheduler.context.config.cache.sweep_interval);
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let removed = tasks::sweep_cache(&scheduler.context);
            if removed > 0 {
                debug!("Cache sweep removed {} expired entries", removed);
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(HEALTH_CHECK_INTERVAL);

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - health is good
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
