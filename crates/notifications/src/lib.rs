//! `railtrace-notifications` — severity-tagged operator notifications.

pub mod notification;

pub use notification::{Notification, NotificationDraft, Severity};
