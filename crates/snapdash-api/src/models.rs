//! Response and request bodies

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snapdash_relay::{time_ago, NotificationEvent};
use snapdash_store::{
    DrillResult, DrillRow, FooterTotals, Notification, PageMeta, ReportRow, StatValue,
    StatsRecord,
};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::format;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatEntry {
    pub key: String,
    #[schema(value_type = f64)]
    pub value: Value,
    /// `plain`, `percent` or `out_of_five`
    pub unit: String,
    pub display: String,
}

pub fn stat_entries(stats: &StatsRecord) -> Vec<StatEntry> {
    stats
        .stats
        .iter()
        .map(|stat| StatEntry {
            key: stat.key.to_string(),
            value: match stat.value {
                StatValue::Count(v) => Value::from(v),
                StatValue::Amount(v) => Value::from(v),
            },
            unit: serde_json::to_value(stat.unit)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            display: format::stat(stat),
        })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FooterView {
    #[schema(value_type = Object)]
    pub totals: FooterTotals,
    pub display: BTreeMap<String, String>,
}

impl From<FooterTotals> for FooterView {
    fn from(totals: FooterTotals) -> Self {
        Self {
            display: format::footer(&totals),
            totals,
        }
    }
}

/// A report page, or its table fragment when `unread_count`/`sync_time` are absent
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportView {
    pub report: String,
    /// Fragment flavour for `/partial/{view_type}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
    /// Local `HH:MM` of the render
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_time: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub snapshot_date: Option<NaiveDate>,
    pub stats: Vec<StatEntry>,
    pub footer: FooterView,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<ReportRow>,
    #[schema(value_type = Object)]
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BranchRowView {
    pub zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub level: String,
    pub totals: Vec<StatEntry>,
}

impl From<&DrillRow> for BranchRowView {
    fn from(row: &DrillRow) -> Self {
        Self {
            zone: row.zone.clone(),
            state: row.state.clone(),
            location: row.location.clone(),
            level: row.level.as_str().to_string(),
            totals: stat_entries(&row.totals),
        }
    }
}

/// Drill-down page or fragment.
///
/// Child expansions (`parent_level` set) carry rows only: no stats,
/// footer or pagination.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_time: Option<String>,
    pub level: String,
    #[schema(value_type = Option<String>, format = Date)]
    pub snapshot_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Vec<StatEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Vec<StatEntry>>,
    pub rows: Vec<BranchRowView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub pagination: Option<PageMeta>,
}

impl From<DrillResult> for BranchView {
    fn from(result: DrillResult) -> Self {
        let stats = result.stats.as_ref().map(stat_entries);
        // The stock report's footer repeats its totals
        let footer = result.stats.as_ref().map(stat_entries);
        let pagination = stats.as_ref().map(|_| result.rows.meta);

        Self {
            unread_count: None,
            sync_time: None,
            level: result.level.as_str().to_string(),
            snapshot_date: result.snapshot_date,
            stats,
            footer,
            rows: result.rows.items.iter().map(BranchRowView::from).collect(),
            pagination,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationView {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub icon: String,
    pub is_read: bool,
    pub priority: String,
    pub related_order_id: Option<String>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    /// `just now`, `5m ago`, `3h ago`, `2d ago`
    pub time: String,
}

impl NotificationView {
    pub fn new(notification: Notification, now_ms: i64) -> Self {
        Self {
            time: time_ago(notification.created_at, now_ms),
            id: notification.id,
            title: notification.title,
            message: notification.message,
            notification_type: notification.notification_type,
            icon: notification.icon,
            is_read: notification.is_read,
            priority: notification.priority,
            related_order_id: notification.related_order_id,
            created_at: notification.created_at,
        }
    }
}

pub fn notification_event(notification: &Notification, now_ms: i64) -> NotificationEvent {
    NotificationEvent {
        id: notification.id,
        title: notification.title.clone(),
        message: notification.message.clone(),
        notification_type: notification.notification_type.clone(),
        icon: notification.icon.clone(),
        priority: notification.priority.clone(),
        time: time_ago(notification.created_at, now_ms),
        related_order_id: notification.related_order_id.clone(),
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationList {
    pub unread_count: i64,
    pub notifications: Vec<NotificationView>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    /// Default `info`
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    /// Default `notifications`
    pub icon: Option<String>,
    /// Default `low`
    pub priority: Option<String>,
    pub related_order_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateNotificationResponse {
    pub status: String,
    pub message: String,
    pub id: i64,
    /// False when the notification was stored but could not be announced
    pub broadcast: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRequest {
    /// Default `default`
    pub view_id: Option<String>,
    /// Default `{}`
    #[schema(value_type = Object)]
    pub payload: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether a Redis relay answered PING
    pub redis: bool,
    /// `redis` or `memory`
    pub relay: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
