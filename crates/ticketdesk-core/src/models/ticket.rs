use chrono::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "Open"),
            TicketStatus::InProgress => write!(f, "In Progress"),
            TicketStatus::Closed => write!(f, "Closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketPriority::Low => write!(f, "Low"),
            TicketPriority::Medium => write!(f, "Medium"),
            TicketPriority::High => write!(f, "High"),
        }
    }
}

/// Queue filter used by the support view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketTab {
    #[default]
    New,
    InProgress,
    Closed,
    All,
}

impl TicketTab {
    /// Value sent as the `tab` query parameter
    pub fn as_param(self) -> &'static str {
        match self {
            TicketTab::New => "new",
            TicketTab::InProgress => "in_progress",
            TicketTab::Closed => "closed",
            TicketTab::All => "all",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Some(TicketTab::New),
            "in_progress" | "in-progress" => Some(TicketTab::InProgress),
            "closed" => Some(TicketTab::Closed),
            "all" => Some(TicketTab::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TicketListItem {
    pub id: i64,
    #[serde(rename = "ticketNumber")]
    pub ticket_number: String,
    pub title: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    #[serde(rename = "assigneeName", default)]
    pub assignee_name: Option<String>,
}

impl TicketListItem {
    pub fn display_assignee(&self) -> &str {
        display_assignee(self.assignee_name.as_deref())
    }

    pub fn formatted_date(&self) -> String {
        format_created_at(&self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TicketDetail {
    pub id: i64,
    #[serde(rename = "ticketNumber")]
    pub ticket_number: String,
    pub title: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub topic: String,
    #[serde(rename = "fromName")]
    pub from_name: String,
    #[serde(default)]
    pub dept: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "assigneeId", default)]
    pub assignee_id: Option<i64>,
    #[serde(rename = "assigneeName", default)]
    pub assignee_name: Option<String>,
}

impl TicketDetail {
    pub fn display_assignee(&self) -> &str {
        display_assignee(self.assignee_name.as_deref())
    }

    pub fn formatted_date(&self) -> String {
        format_created_at(&self.created_at)
    }

    pub fn is_assigned(&self) -> bool {
        self.assignee_id.is_some()
    }
}

fn display_assignee(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => "Unassigned",
    }
}

fn format_created_at(created_at: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(created_at) {
        dt.format("%b %d, %Y %H:%M").to_string()
    } else {
        // Fall back to the raw value, date part only
        created_at.chars().take(10).collect()
    }
}
