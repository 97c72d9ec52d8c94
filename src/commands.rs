/// Command channel and host event dispatch for the background page
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::config::GroupColor;
use crate::host::{ExtensionHost, HostBrowser};
use crate::matcher::PatternKind;
use crate::reconciler::{Engine, EngineError};
use crate::tabs::TabInfo;

/// Everything the popup can ask the background page to do.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    Ping,
    Toggle,
    ToggleIgnorePinnedTabs,
    SetTabPlacement {
        placement: String,
    },
    Ungroup,
    Regroup,
    GetStatus,
    #[serde(rename_all = "camelCase")]
    AddGroup {
        group_id: String,
        name: String,
        color: GroupColor,
    },
    #[serde(rename_all = "camelCase")]
    RemoveGroup {
        group_id: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateGroup {
        group_id: String,
        name: String,
        color: GroupColor,
    },
    #[serde(rename_all = "camelCase")]
    AddRule {
        pattern: String,
        group_id: String,
        #[serde(default)]
        kind: PatternKind,
    },
    RemoveRule {
        pattern: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateRule {
        old_pattern: String,
        new_pattern: String,
        group_id: String,
        #[serde(default)]
        kind: PatternKind,
    },
}

const KNOWN_ACTIONS: [&str; 13] = [
    "ping",
    "toggle",
    "toggleIgnorePinnedTabs",
    "setTabPlacement",
    "ungroup",
    "regroup",
    "getStatus",
    "addGroup",
    "removeGroup",
    "updateGroup",
    "addRule",
    "removeRule",
    "updateRule",
];

/// A group definition as the status snapshot reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    pub group_id: String,
    pub name: String,
    pub color: GroupColor,
}

/// A pattern rule with its group's name and color denormalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEntry {
    pub pattern: String,
    pub group_id: String,
    pub kind: PatternKind,
    pub group_name: String,
    pub group_color: GroupColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub enabled: bool,
    pub ignore_pinned_tabs: bool,
    pub tab_placement: crate::config::TabPlacement,
    pub groups: Vec<GroupEntry>,
    pub rules: Vec<RuleEntry>,
    pub initialized: bool,
}

/// Handle one command message and produce its response value. Failures
/// become `{error: message}`; nothing escapes as a panic or rejection.
pub async fn dispatch<H: HostBrowser>(engine: &Engine<H>, message: Value) -> Value {
    let action = message
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match serde_json::from_value::<Command>(message) {
        Ok(command) => match run(engine, command).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("command {action} failed: {e}");
                json!({ "error": e.to_string() })
            }
        },
        Err(e) if KNOWN_ACTIONS.contains(&action.as_str()) => {
            log::warn!("malformed {action} command: {e}");
            json!({ "error": format!("invalid {action} request: {e}") })
        }
        Err(_) => {
            log::warn!("unknown message action: {action}");
            json!({ "error": "Unknown action" })
        }
    }
}

async fn run<H: HostBrowser>(
    engine: &Engine<H>,
    command: Command,
) -> Result<Value, EngineError> {
    match command {
        Command::Ping => Ok(json!({
            "pong": true,
            "timestamp": engine.host().now_ms(),
            "initialized": engine.is_initialized(),
        })),
        Command::Toggle => {
            let enabled = engine.toggle_enabled().await;
            Ok(json!({ "enabled": enabled }))
        }
        Command::ToggleIgnorePinnedTabs => {
            let ignore = engine.toggle_ignore_pinned_tabs().await;
            Ok(json!({ "ignorePinnedTabs": ignore }))
        }
        Command::SetTabPlacement { placement } => {
            let placement = engine.set_tab_placement(&placement).await?;
            Ok(json!({ "tabPlacement": placement.as_str() }))
        }
        Command::Ungroup => {
            engine.ungroup_all().await?;
            Ok(json!({ "success": true }))
        }
        Command::Regroup => {
            engine.reconcile_all().await;
            Ok(json!({ "success": true }))
        }
        Command::GetStatus => Ok(json!(engine.status())),
        Command::AddGroup {
            group_id,
            name,
            color,
        } => {
            engine.add_group(group_id, name, color).await;
            Ok(json!({ "success": true }))
        }
        Command::RemoveGroup { group_id } => {
            engine.remove_group(&group_id).await;
            Ok(json!({ "success": true }))
        }
        Command::UpdateGroup {
            group_id,
            name,
            color,
        } => {
            engine.update_group(&group_id, name, color).await?;
            Ok(json!({ "success": true }))
        }
        Command::AddRule {
            pattern,
            group_id,
            kind,
        } => {
            engine.add_rule(pattern, group_id, kind).await?;
            Ok(json!({ "success": true }))
        }
        Command::RemoveRule { pattern } => {
            engine.remove_rule(&pattern).await;
            Ok(json!({ "success": true }))
        }
        Command::UpdateRule {
            old_pattern,
            new_pattern,
            group_id,
            kind,
        } => {
            engine
                .update_rule(&old_pattern, new_pattern, group_id, kind)
                .await?;
            Ok(json!({ "success": true }))
        }
    }
}

// ── Background page wiring ──

thread_local! {
    static ENGINE: RefCell<Option<Rc<Engine<ExtensionHost>>>> = RefCell::new(None);
}

fn current_engine() -> Option<Rc<Engine<ExtensionHost>>> {
    ENGINE.with(|engine| engine.borrow().clone())
}

// Import JS bridge functions. The bridge registers the actual
// browser.* listeners and forwards: created/url-changed pass the full tab,
// activated passes the tab id, group/window removal pass the dead id, the
// lifecycle hook fires for both install and startup, and the message hook
// must return a promise resolving to the response.
#[wasm_bindgen(module = "/js/host_bridge.js")]
extern "C" {
    fn onTabCreated(callback: &js_sys::Function);
    fn onTabUrlChanged(callback: &js_sys::Function);
    fn onTabActivated(callback: &js_sys::Function);
    fn onTabGroupRemoved(callback: &js_sys::Function);
    fn onWindowRemoved(callback: &js_sys::Function);
    fn onRuntimeMessage(callback: &js_sys::Function);
    fn onLifecycle(callback: &js_sys::Function);
}

/// Stand up the background engine. Listener registration must happen
/// synchronously here so events are delivered reliably after the background
/// page is suspended and revived; every handler gates itself on
/// initialization.
pub fn start_background() {
    let engine = Rc::new(Engine::new(ExtensionHost));
    ENGINE.with(|slot| *slot.borrow_mut() = Some(engine.clone()));

    register_tab_listeners();
    register_message_listener();
    register_lifecycle_listener();

    spawn_local(async move {
        engine.initialize().await;
    });
}

fn parse_tab(payload: JsValue) -> Option<TabInfo> {
    match serde_wasm_bindgen::from_value::<TabInfo>(payload) {
        Ok(tab) => Some(tab),
        Err(e) => {
            log::warn!("unreadable tab payload: {e}");
            None
        }
    }
}

fn register_tab_listeners() {
    let created = Closure::<dyn Fn(JsValue)>::new(|payload: JsValue| {
        let Some(engine) = current_engine() else {
            return;
        };
        if let Some(tab) = parse_tab(payload) {
            spawn_local(async move { engine.on_tab_created(&tab).await });
        }
    });
    onTabCreated(created.as_ref().unchecked_ref());
    created.forget();

    let url_changed = Closure::<dyn Fn(JsValue)>::new(|payload: JsValue| {
        let Some(engine) = current_engine() else {
            return;
        };
        if let Some(tab) = parse_tab(payload) {
            spawn_local(async move { engine.on_tab_url_changed(&tab).await });
        }
    });
    onTabUrlChanged(url_changed.as_ref().unchecked_ref());
    url_changed.forget();

    let activated = Closure::<dyn Fn(i32)>::new(|tab_id: i32| {
        let Some(engine) = current_engine() else {
            return;
        };
        spawn_local(async move { engine.on_tab_activated(tab_id).await });
    });
    onTabActivated(activated.as_ref().unchecked_ref());
    activated.forget();

    let group_removed = Closure::<dyn Fn(i32)>::new(|group_id: i32| {
        if let Some(engine) = current_engine() {
            engine.on_tab_group_removed(group_id);
        }
    });
    onTabGroupRemoved(group_removed.as_ref().unchecked_ref());
    group_removed.forget();

    let window_removed = Closure::<dyn Fn(i32)>::new(|window_id: i32| {
        if let Some(engine) = current_engine() {
            engine.on_window_removed(window_id);
        }
    });
    onWindowRemoved(window_removed.as_ref().unchecked_ref());
    window_removed.forget();
}

fn register_message_listener() {
    let handler = Closure::<dyn Fn(JsValue) -> js_sys::Promise>::new(|message: JsValue| {
        future_to_promise(async move {
            let Some(engine) = current_engine() else {
                return Err(JsValue::from_str("background engine not started"));
            };
            let message: Value = serde_wasm_bindgen::from_value(message).unwrap_or(Value::Null);
            let response = dispatch(engine.as_ref(), message).await;
            response
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    });
    onRuntimeMessage(handler.as_ref().unchecked_ref());
    handler.forget();
}

fn register_lifecycle_listener() {
    let lifecycle = Closure::<dyn Fn()>::new(|| {
        let Some(engine) = current_engine() else {
            return;
        };
        log::info!("lifecycle signal received, reinitializing");
        spawn_local(async move { engine.initialize().await });
    });
    onLifecycle(lifecycle.as_ref().unchecked_ref());
    lifecycle.forget();
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::reconciler::fake::{FAKE_NOW_MS, FakeHost};

    fn engine() -> Engine<FakeHost> {
        Engine::new(FakeHost::new())
    }

    #[test]
    fn test_add_group_then_get_status_round_trip() {
        let engine = engine();

        let added = block_on(dispatch(
            &engine,
            json!({ "action": "addGroup", "groupId": "work", "name": "Work", "color": "blue" }),
        ));
        assert_eq!(added, json!({ "success": true }));

        let status = block_on(dispatch(&engine, json!({ "action": "getStatus" })));
        let status: StatusResponse = serde_json::from_value(status).unwrap();
        assert_eq!(
            status.groups,
            vec![GroupEntry {
                group_id: "work".to_string(),
                name: "Work".to_string(),
                color: GroupColor::Blue,
            }]
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let engine = engine();

        let response = block_on(dispatch(&engine, json!({ "action": "teleport" })));
        assert_eq!(response, json!({ "error": "Unknown action" }));

        let response = block_on(dispatch(&engine, json!({ "payload": 1 })));
        assert_eq!(response, json!({ "error": "Unknown action" }));
    }

    #[test]
    fn test_malformed_known_action_reports_invalid_request() {
        let engine = engine();

        let response = block_on(dispatch(&engine, json!({ "action": "addGroup" })));

        let error = response.get("error").and_then(Value::as_str).unwrap();
        assert!(error.starts_with("invalid addGroup request"));
    }

    #[test]
    fn test_add_rule_with_bad_regex_surfaces_error() {
        let engine = engine();
        block_on(dispatch(
            &engine,
            json!({ "action": "addGroup", "groupId": "work", "name": "Work", "color": "blue" }),
        ));

        let response = block_on(dispatch(
            &engine,
            json!({ "action": "addRule", "pattern": "[unclosed", "groupId": "work", "kind": "regex" }),
        ));

        let error = response.get("error").and_then(Value::as_str).unwrap();
        assert!(error.starts_with("invalid regex pattern"));
    }

    #[test]
    fn test_ping_reports_liveness() {
        let engine = engine();

        let response = block_on(dispatch(&engine, json!({ "action": "ping" })));

        assert_eq!(response.get("pong"), Some(&json!(true)));
        assert_eq!(response.get("timestamp"), Some(&json!(FAKE_NOW_MS)));
        assert_eq!(response.get("initialized"), Some(&json!(false)));
    }

    #[test]
    fn test_set_tab_placement_command() {
        let engine = engine();

        let response = block_on(dispatch(
            &engine,
            json!({ "action": "setTabPlacement", "placement": "first" }),
        ));
        assert_eq!(response, json!({ "tabPlacement": "first" }));

        let response = block_on(dispatch(
            &engine,
            json!({ "action": "setTabPlacement", "placement": "middle" }),
        ));
        let error = response.get("error").and_then(Value::as_str).unwrap();
        assert!(error.contains("invalid tab placement"));
    }

    #[test]
    fn test_toggle_command_reports_new_state() {
        let engine = engine();

        let response = block_on(dispatch(&engine, json!({ "action": "toggle" })));
        assert_eq!(response, json!({ "enabled": false }));

        let response = block_on(dispatch(&engine, json!({ "action": "toggle" })));
        assert_eq!(response, json!({ "enabled": true }));
    }
}
