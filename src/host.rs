/// Host browser API seam: the slice of the extension API the engine consumes
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::config::GroupColor;
use crate::tabs::{TabGroupInfo, TabInfo};

/// A failed call into the browser's tab/group/storage APIs. Never fatal;
/// callers log and leave the affected tab for the next triggering event.
#[derive(Debug, Clone, Error)]
#[error("host api error: {0}")]
pub struct HostError(pub String);

impl From<JsValue> for HostError {
    fn from(value: JsValue) -> Self {
        HostError(format!("{value:?}"))
    }
}

impl From<serde_wasm_bindgen::Error> for HostError {
    fn from(value: serde_wasm_bindgen::Error) -> Self {
        HostError(value.to_string())
    }
}

/// Fields pushed onto a live host group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<GroupColor>,
}

impl GroupUpdate {
    pub fn color_only(color: GroupColor) -> Self {
        GroupUpdate {
            title: None,
            color: Some(color),
        }
    }

    pub fn titled(title: String, color: GroupColor) -> Self {
        GroupUpdate {
            title: Some(title),
            color: Some(color),
        }
    }
}

/// The host surface the engine drives. The production implementation
/// forwards to the background bridge script; tests substitute an in-memory
/// fake.
#[async_trait(?Send)]
pub trait HostBrowser {
    /// All open tabs across all windows.
    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError>;

    async fn get_tab(&self, tab_id: i32) -> Result<TabInfo, HostError>;

    /// Add tabs to `group`, or mint a fresh host group when `group` is
    /// None. Returns the host group id the tabs ended up in.
    async fn group_tabs(&self, tab_ids: &[i32], group: Option<i32>) -> Result<i32, HostError>;

    async fn ungroup_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError>;

    /// All live tab groups across all windows.
    async fn query_tab_groups(&self) -> Result<Vec<TabGroupInfo>, HostError>;

    async fn get_tab_group(&self, group_id: i32) -> Result<TabGroupInfo, HostError>;

    async fn update_tab_group(
        &self,
        group_id: i32,
        update: &GroupUpdate,
    ) -> Result<(), HostError>;

    /// Move a tab to `index` within its window.
    async fn move_tab(&self, tab_id: i32, index: i32) -> Result<(), HostError>;

    /// Read stored values for `keys` as one object; absent keys are simply
    /// missing from the result.
    async fn storage_get(&self, keys: &[&str]) -> Result<Value, HostError>;

    /// Merge `items` (an object of key to value) into the store.
    async fn storage_set(&self, items: &Value) -> Result<(), HostError>;

    /// Host clock, milliseconds since the epoch.
    fn now_ms(&self) -> f64;
}

// Import JS bridge functions. The bridge wraps browser.tabs / tabGroups /
// storage so both promise-based namespaces (chrome, browser) look the same
// from here.
#[wasm_bindgen(module = "/js/host_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTabs(tab_ids: JsValue, group_id: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn ungroupTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabGroups() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTabGroup(group_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateTabGroup(group_id: i32, properties: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveTab(tab_id: i32, index: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(items: JsValue) -> Result<(), JsValue>;
}

/// Serialize into plain JS objects rather than Map instances; the extension
/// APIs only accept plain objects.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, HostError> {
    Ok(value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

/// Production host backed by the background bridge script.
pub struct ExtensionHost;

#[async_trait(?Send)]
impl HostBrowser for ExtensionHost {
    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError> {
        let tabs = queryTabs().await?;
        Ok(serde_wasm_bindgen::from_value(tabs)?)
    }

    async fn get_tab(&self, tab_id: i32) -> Result<TabInfo, HostError> {
        let tab = getTab(tab_id).await?;
        Ok(serde_wasm_bindgen::from_value(tab)?)
    }

    async fn group_tabs(&self, tab_ids: &[i32], group: Option<i32>) -> Result<i32, HostError> {
        let group_id = groupTabs(to_js(&tab_ids)?, to_js(&group)?).await?;
        Ok(serde_wasm_bindgen::from_value(group_id)?)
    }

    async fn ungroup_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError> {
        Ok(ungroupTabs(to_js(&tab_ids)?).await?)
    }

    async fn query_tab_groups(&self) -> Result<Vec<TabGroupInfo>, HostError> {
        let groups = queryTabGroups().await?;
        Ok(serde_wasm_bindgen::from_value(groups)?)
    }

    async fn get_tab_group(&self, group_id: i32) -> Result<TabGroupInfo, HostError> {
        let group = getTabGroup(group_id).await?;
        Ok(serde_wasm_bindgen::from_value(group)?)
    }

    async fn update_tab_group(
        &self,
        group_id: i32,
        update: &GroupUpdate,
    ) -> Result<(), HostError> {
        Ok(updateTabGroup(group_id, to_js(update)?).await?)
    }

    async fn move_tab(&self, tab_id: i32, index: i32) -> Result<(), HostError> {
        Ok(moveTab(tab_id, index).await?)
    }

    async fn storage_get(&self, keys: &[&str]) -> Result<Value, HostError> {
        let stored = getStorage(to_js(&keys)?).await?;
        Ok(serde_wasm_bindgen::from_value(stored)?)
    }

    async fn storage_set(&self, items: &Value) -> Result<(), HostError> {
        Ok(setStorage(to_js(items)?).await?)
    }

    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}
