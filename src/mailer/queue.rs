/// Background mail queue with retries
use super::Mailer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Delivery attempts per job
pub const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailJob {
    Welcome { email: String, username: String },
    PasswordResetNotice { email: String, username: String },
}

impl MailJob {
    pub fn name(&self) -> &'static str {
        match self {
            MailJob::Welcome { .. } => "welcome",
            MailJob::PasswordResetNotice { .. } => "password-reset-notice",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            MailJob::Welcome { email, .. } | MailJob::PasswordResetNotice { email, .. } => email,
        }
    }
}

/// Fire-and-forget handle to the mail worker
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::UnboundedSender<MailJob>,
}

impl MailQueue {
    /// Spawn the worker and return its queue handle
    pub fn start(mailer: Arc<Mailer>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(mailer, receiver, INITIAL_BACKOFF));
        Self { sender }
    }

    /// A queue whose jobs are handed to the given receiver instead of a worker
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<MailJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Never blocks and never fails the caller
    pub fn enqueue(&self, job: MailJob) {
        let name = job.name();
        if self.sender.send(job).is_err() {
            tracing::warn!(job = name, "Mail worker is gone, dropping job");
        }
    }
}

async fn run_worker(
    mailer: Arc<Mailer>,
    mut receiver: mpsc::UnboundedReceiver<MailJob>,
    initial_backoff: Duration,
) {
    tracing::info!("Mail worker started");

    while let Some(job) = receiver.recv().await {
        let mailer = mailer.clone();
        // One job's retries must not hold up the rest of the queue
        tokio::spawn(async move {
            deliver_with_retry(&mailer, &job, initial_backoff).await;
        });
    }

    tracing::info!("Mail worker stopped");
}

/// Returns true if the job was eventually delivered
async fn deliver_with_retry(mailer: &Mailer, job: &MailJob, initial_backoff: Duration) -> bool {
    let mut backoff = initial_backoff;

    for attempt in 1..=MAX_ATTEMPTS {
        match mailer.deliver(job).await {
            Ok(()) => {
                tracing::info!(job = job.name(), attempt, "Mail job completed");
                return true;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    job = job.name(),
                    attempt,
                    retry_in_ms = backoff.as_millis() as u64,
                    "Mail job failed: {}",
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => {
                tracing::error!(
                    job = job.name(),
                    recipient = job.recipient(),
                    "Mail job failed after {} attempts: {}",
                    MAX_ATTEMPTS,
                    e
                );
            }
        }
    }

    false
}
