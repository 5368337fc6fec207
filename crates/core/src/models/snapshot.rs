use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal display record published to lightweight reader processes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl SnapshotItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            image_url: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Snapshot of the latest data, as seen by the widget/extension reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSnapshot {
    pub items: Vec<SnapshotItem>,
    pub last_updated: DateTime<Utc>,
}

impl SharedSnapshot {
    pub fn new(items: Vec<SnapshotItem>) -> Self {
        Self {
            items,
            last_updated: Utc::now(),
        }
    }
}
