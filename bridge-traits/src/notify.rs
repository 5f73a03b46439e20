//! User-facing notification sink (toasts, alerts, snackbars).

use serde::{Deserialize, Serialize};

use crate::platform::PlatformSendSync;

/// Category of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

/// Surfaces short messages to the user.
///
/// Calls are fire-and-forget; implementations must not block.
pub trait Notifier: PlatformSendSync {
    fn notify(&self, kind: NoticeKind, message: &str);
}
