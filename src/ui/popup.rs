/// Popup UI for Auto Tab Grouper

use patternfly_yew::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::commands::StatusResponse;
use crate::config::{GroupColor, TabPlacement};
use crate::matcher::PatternKind;
use crate::ui::components::{ColorDot, ColorPicker};

// Import JS bridge functions
#[wasm_bindgen(module = "/js/popup_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;
}

#[derive(Clone, PartialEq)]
enum AppState {
    Loading(String),
    Idle,
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading("Loading status...".to_string()));
    let status = use_state(|| None::<StatusResponse>);
    let notice = use_state(|| None::<String>);

    let group_name = use_state(String::new);
    let group_color = use_state(|| GroupColor::Blue);
    let rule_pattern = use_state(String::new);
    let rule_kind = use_state(|| PatternKind::Simple);
    let rule_group = use_state(String::new);

    // Load status on mount
    {
        let state = state.clone();
        let status = status.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match fetch_status().await {
                    Ok(snapshot) => {
                        status.set(Some(snapshot));
                        state.set(AppState::Idle);
                    }
                    Err(e) => {
                        state.set(AppState::Error(format!("Failed to load status: {e}")));
                    }
                }
            });
            || ()
        });
    }

    // One-shot command buttons share the send-then-refresh shape
    let command_button = {
        let state = state.clone();
        let status = status.clone();
        let notice = notice.clone();
        move |message: Value, busy: &'static str| {
            let state = state.clone();
            let status = status.clone();
            let notice = notice.clone();
            Callback::from(move |_: MouseEvent| {
                execute_command(
                    state.clone(),
                    status.clone(),
                    notice.clone(),
                    message.clone(),
                    busy,
                );
            })
        }
    };

    let on_toggle = command_button(json!({ "action": "toggle" }), "Toggling...");
    let on_regroup = command_button(json!({ "action": "regroup" }), "Regrouping tabs...");
    let on_ungroup = command_button(json!({ "action": "ungroup" }), "Ungrouping tabs...");
    let on_toggle_pinned = command_button(
        json!({ "action": "toggleIgnorePinnedTabs" }),
        "Updating settings...",
    );

    let on_placement_change = {
        let state = state.clone();
        let status = status.clone();
        let notice = notice.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                execute_command(
                    state.clone(),
                    status.clone(),
                    notice.clone(),
                    json!({ "action": "setTabPlacement", "placement": select.value() }),
                    "Updating settings...",
                );
            }
        })
    };

    let on_group_name_input = {
        let group_name = group_name.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                group_name.set(input.value());
            }
        })
    };

    let on_color_select = {
        let group_color = group_color.clone();
        Callback::from(move |color: GroupColor| {
            group_color.set(color);
        })
    };

    let on_add_group = {
        let state = state.clone();
        let status = status.clone();
        let notice = notice.clone();
        let group_name = group_name.clone();
        let group_color = group_color.clone();
        Callback::from(move |_: MouseEvent| {
            let name = (*group_name).trim().to_string();
            if name.is_empty() {
                notice.set(Some("Please enter a group name".to_string()));
                return;
            }
            let message = json!({
                "action": "addGroup",
                "groupId": format!("group_{}", Uuid::new_v4().simple()),
                "name": name,
                "color": group_color.as_str(),
            });
            group_name.set(String::new());
            execute_command(
                state.clone(),
                status.clone(),
                notice.clone(),
                message,
                "Adding group...",
            );
        })
    };

    let on_rule_pattern_input = {
        let rule_pattern = rule_pattern.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                rule_pattern.set(input.value());
            }
        })
    };

    let on_rule_kind_change = {
        let rule_kind = rule_kind.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                rule_kind.set(if select.value() == "regex" {
                    PatternKind::Regex
                } else {
                    PatternKind::Simple
                });
            }
        })
    };

    let on_rule_group_change = {
        let rule_group = rule_group.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                rule_group.set(select.value());
            }
        })
    };

    let on_add_rule = {
        let state = state.clone();
        let status = status.clone();
        let notice = notice.clone();
        let rule_pattern = rule_pattern.clone();
        let rule_kind = rule_kind.clone();
        let rule_group = rule_group.clone();
        Callback::from(move |_: MouseEvent| {
            let pattern = (*rule_pattern).trim().to_string();
            if pattern.is_empty() {
                notice.set(Some("Please enter a URL pattern".to_string()));
                return;
            }
            if rule_group.is_empty() {
                notice.set(Some("Please select a group for the rule".to_string()));
                return;
            }
            let kind = match *rule_kind {
                PatternKind::Regex => "regex",
                PatternKind::Simple => "simple",
            };
            let message = json!({
                "action": "addRule",
                "pattern": pattern,
                "groupId": (*rule_group).clone(),
                "kind": kind,
            });
            rule_pattern.set(String::new());
            execute_command(
                state.clone(),
                status.clone(),
                notice.clone(),
                message,
                "Adding rule...",
            );
        })
    };

    let is_busy = matches!(*state, AppState::Loading(_));

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Auto Tab Grouper"}</h1>

            // Status header
            {match &*status {
                Some(snapshot) => html! {
                    <div class="status-row">
                        <span style={format!("display: inline-block; width: 10px; height: 10px; border-radius: 50%; margin-right: 6px; background-color: {};", if snapshot.enabled { "#188038" } else { "#9aa0a6" })}></span>
                        <span class="status-text">
                            {if snapshot.enabled { "Active" } else { "Paused" }}
                            {if snapshot.initialized { "" } else { " (starting up...)" }}
                        </span>
                    </div>
                },
                None => html! {},
            }}

            // Command failures and form validation messages
            if let Some(message) = (*notice).clone() {
                <Alert r#type={AlertType::Danger} title={message} inline={true}>
                </Alert>
            }

            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                AppState::Idle => html! {},
            }}

            {match &*status {
                Some(snapshot) => {
                    let toggle_label = if snapshot.enabled { "Disable" } else { "Enable" };
                    html! {
                        <>
                            <div class="flex-column-gap">
                                <Button onclick={on_toggle} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                                    {toggle_label}
                                </Button>
                                <Button onclick={on_regroup} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                    {"Regroup All Tabs"}
                                </Button>
                                <Button onclick={on_ungroup} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                    {"Ungroup All Tabs"}
                                </Button>
                            </div>

                            <div class="settings-section">
                                <h2 class="section-title">{"Settings"}</h2>
                                <label class="settings-row">
                                    <input
                                        type="checkbox"
                                        checked={snapshot.ignore_pinned_tabs}
                                        disabled={is_busy}
                                        onclick={on_toggle_pinned}
                                    />
                                    {" Ignore pinned tabs"}
                                </label>
                                <label class="settings-row">
                                    {"New tabs go "}
                                    <select onchange={on_placement_change} disabled={is_busy}>
                                        <option value="last" selected={snapshot.tab_placement == TabPlacement::Last}>{"last in group"}</option>
                                        <option value="first" selected={snapshot.tab_placement == TabPlacement::First}>{"first in group"}</option>
                                    </select>
                                </label>
                            </div>

                            <div class="groups-section">
                                <h2 class="section-title">{"Groups"}</h2>
                                {if snapshot.groups.is_empty() {
                                    html! { <p class="empty-hint">{"No groups yet"}</p> }
                                } else {
                                    html! {
                                        <div class="list-box">
                                            {for snapshot.groups.iter().map(|group| {
                                                let remove = {
                                                    let state = state.clone();
                                                    let status = status.clone();
                                                    let notice = notice.clone();
                                                    let group_id = group.group_id.clone();
                                                    Callback::from(move |_: MouseEvent| {
                                                        execute_command(
                                                            state.clone(),
                                                            status.clone(),
                                                            notice.clone(),
                                                            json!({ "action": "removeGroup", "groupId": group_id.clone() }),
                                                            "Removing group...",
                                                        );
                                                    })
                                                };
                                                html! {
                                                    <div class="list-row">
                                                        <ColorDot color={group.color} />
                                                        <span class="list-name">{&group.name}</span>
                                                        <Button onclick={remove} disabled={is_busy} variant={ButtonVariant::Danger}>
                                                            {"Remove"}
                                                        </Button>
                                                    </div>
                                                }
                                            })}
                                        </div>
                                    }
                                }}
                                <div class="add-form">
                                    <input
                                        type="text"
                                        placeholder="Group name"
                                        value={(*group_name).clone()}
                                        oninput={on_group_name_input}
                                    />
                                    <ColorPicker selected={*group_color} on_select={on_color_select} />
                                    <Button onclick={on_add_group} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                        {"Add Group"}
                                    </Button>
                                </div>
                            </div>

                            <div class="rules-section">
                                <h2 class="section-title">{"Rules"}</h2>
                                {if snapshot.rules.is_empty() {
                                    html! { <p class="empty-hint">{"No rules yet"}</p> }
                                } else {
                                    html! {
                                        <div class="list-box">
                                            {for snapshot.rules.iter().map(|rule| {
                                                let remove = {
                                                    let state = state.clone();
                                                    let status = status.clone();
                                                    let notice = notice.clone();
                                                    let pattern = rule.pattern.clone();
                                                    Callback::from(move |_: MouseEvent| {
                                                        execute_command(
                                                            state.clone(),
                                                            status.clone(),
                                                            notice.clone(),
                                                            json!({ "action": "removeRule", "pattern": pattern.clone() }),
                                                            "Removing rule...",
                                                        );
                                                    })
                                                };
                                                let kind_label = match rule.kind {
                                                    PatternKind::Regex => "regex",
                                                    PatternKind::Simple => "simple",
                                                };
                                                html! {
                                                    <div class="list-row">
                                                        <span class="rule-pattern">{&rule.pattern}</span>
                                                        <span class="rule-kind">{kind_label}</span>
                                                        <span class="rule-target">
                                                            <ColorDot color={rule.group_color} />
                                                            {&rule.group_name}
                                                        </span>
                                                        <Button onclick={remove} disabled={is_busy} variant={ButtonVariant::Danger}>
                                                            {"Remove"}
                                                        </Button>
                                                    </div>
                                                }
                                            })}
                                        </div>
                                    }
                                }}
                                <div class="add-form">
                                    <input
                                        type="text"
                                        placeholder="URL pattern, e.g. example.com/docs"
                                        value={(*rule_pattern).clone()}
                                        oninput={on_rule_pattern_input}
                                    />
                                    <select onchange={on_rule_kind_change}>
                                        <option value="simple" selected={*rule_kind == PatternKind::Simple}>{"Simple"}</option>
                                        <option value="regex" selected={*rule_kind == PatternKind::Regex}>{"Regex"}</option>
                                    </select>
                                    <select onchange={on_rule_group_change}>
                                        <option value="" selected={rule_group.is_empty()}>{"Select group"}</option>
                                        {for snapshot.groups.iter().map(|group| html! {
                                            <option value={group.group_id.clone()} selected={*rule_group == group.group_id}>
                                                {&group.name}
                                            </option>
                                        })}
                                    </select>
                                    <Button onclick={on_add_rule} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                        {"Add Rule"}
                                    </Button>
                                </div>
                            </div>
                        </>
                    }
                }
                None => html! {},
            }}

            <p class="footer-popup">
                {"Auto Tab Grouper v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

fn execute_command(
    state: UseStateHandle<AppState>,
    status: UseStateHandle<Option<StatusResponse>>,
    notice: UseStateHandle<Option<String>>,
    message: Value,
    busy: &str,
) {
    state.set(AppState::Loading(busy.to_string()));
    notice.set(None);
    spawn_local(async move {
        if let Err(e) = send_command(message).await {
            notice.set(Some(e));
        }
        match fetch_status().await {
            Ok(snapshot) => {
                status.set(Some(snapshot));
                state.set(AppState::Idle);
            }
            Err(e) => state.set(AppState::Error(e)),
        }
    });
}

async fn send_command(message: Value) -> Result<Value, String> {
    let payload = message
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to encode command: {e}"))?;
    let response = sendMessage(payload)
        .await
        .map_err(|e| format!("Failed to reach background page: {e:?}"))?;
    let response: Value = serde_wasm_bindgen::from_value(response)
        .map_err(|e| format!("Failed to parse response: {e}"))?;
    if let Some(error) = response.get("error").and_then(Value::as_str) {
        return Err(error.to_string());
    }
    Ok(response)
}

async fn fetch_status() -> Result<StatusResponse, String> {
    let response = send_command(json!({ "action": "getStatus" })).await?;
    serde_json::from_value(response).map_err(|e| format!("Malformed status response: {e}"))
}
