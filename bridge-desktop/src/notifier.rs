//! Notifier that routes user-facing messages into the tracing pipeline.
//!
//! Useful for headless hosts and tests; GUI hosts replace it with a toast
//! implementation.

use bridge_traits::notify::{NoticeKind, Notifier};
use tracing::{error, info};

/// Logs notices at `info`/`error` level under the `notifier` target.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Info => info!(target: "notifier", notice = message, "User notice"),
            NoticeKind::Error => error!(target: "notifier", notice = message, "User error notice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_does_not_panic_without_subscriber() {
        let notifier = TracingNotifier::new();
        notifier.notify(NoticeKind::Info, "Now playing");
        notifier.notify(NoticeKind::Error, "Purchase required");
    }
}
