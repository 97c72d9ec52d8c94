/// Tab and tab-group snapshots crossing the host API boundary
use serde::{Deserialize, Serialize};

/// Sentinel group id the host reports for an ungrouped tab.
pub const TAB_GROUP_NONE: i32 = -1;

/// A browser tab as the host reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: i32,
    pub window_id: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default = "ungrouped")]
    pub group_id: i32,
    #[serde(default)]
    pub pinned: bool,
    pub index: i32,
}

fn ungrouped() -> i32 {
    TAB_GROUP_NONE
}

impl TabInfo {
    pub fn is_grouped(&self) -> bool {
        self.group_id != TAB_GROUP_NONE
    }
}

/// A live host tab group. The color is the host's raw string; the engine
/// only ever compares titles and pushes its own palette colors out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupInfo {
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_info_deserializes_host_shape() {
        let tab: TabInfo = serde_json::from_str(
            r#"{"id": 7, "windowId": 2, "url": "https://example.com", "groupId": 4, "pinned": true, "index": 0}"#,
        )
        .unwrap();

        assert_eq!(tab.id, 7);
        assert_eq!(tab.window_id, 2);
        assert_eq!(tab.group_id, 4);
        assert!(tab.pinned);
        assert!(tab.is_grouped());
    }

    #[test]
    fn test_tab_info_defaults_for_missing_fields() {
        // Hosts without tab-group support omit groupId entirely; discarded
        // tabs can omit url.
        let tab: TabInfo =
            serde_json::from_str(r#"{"id": 1, "windowId": 1, "index": 3}"#).unwrap();

        assert_eq!(tab.group_id, TAB_GROUP_NONE);
        assert!(!tab.is_grouped());
        assert_eq!(tab.url, "");
        assert!(!tab.pinned);
    }

    #[test]
    fn test_tab_group_info_round_trip() {
        let group = TabGroupInfo {
            id: 12,
            title: "Work".to_string(),
            color: "blue".to_string(),
        };

        let json = serde_json::to_string(&group).unwrap();
        let back: TabGroupInfo = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, 12);
        assert_eq!(back.title, "Work");
        assert_eq!(back.color, "blue");
    }
}
