//! API request handlers

use crate::AppState;
use crate::error::Result;

pub mod branch;
pub mod notifications;
pub mod reports;
pub mod views;
pub mod websocket;

/// Unread badge count and render time shown on every full page
pub(crate) async fn page_header(state: &AppState) -> Result<(i64, String)> {
    let unread = state.notifications.unread_notification_count().await?;
    let sync_time = chrono::Local::now().format("%H:%M").to_string();
    Ok((unread, sync_time))
}
