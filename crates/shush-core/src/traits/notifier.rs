// # Notification Presenter Trait
//
// Posts the transition notification. Every transition reuses the same
// notification id, so a new notification replaces the previous one.

use serde::{Deserialize, Serialize};

/// Small icon shown with the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationIcon {
    /// Volume-off glyph, used on ENTER
    Muted,
    /// Volume-up glyph, used on EXIT
    Unmuted,
}

/// A notification ready to post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Fixed slot id
    pub id: i32,
    pub title: String,
    pub body: String,
    pub icon: NotificationIcon,
}

/// Trait for notification presenter implementations
pub trait NotificationPresenter: Send + Sync {
    fn show(&self, notification: &Notification) -> Result<(), crate::Error>;
}
