use tracing::info;

/// Outbound notification seam. Delivery transport belongs to the
/// surrounding system; implementations are fire-and-forget and must never
/// propagate failure back into the state transition that triggered a send.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str);
}

/// Default sink: records the dispatch in the application log.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) {
        info!(to, subject, body_len = body.len(), "Email dispatched");
    }
}
