/// Popup UI for the duplicate tab remover

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use patternfly_yew::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::messages::{CloseResponse, DetectResponse, Request, UndoResponse};
use crate::selection::{duplicate_stats, GroupCheck, Selection};
use crate::settings::{UserSettings, SETTINGS_KEY};
use crate::tab_data::{DuplicateGroup, TabId};

// Import JS bridge functions
#[wasm_bindgen(module = "/js/popup_bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn sendMessage(request: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;
}

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Idle);
    let settings = use_state(UserSettings::default);
    let groups = use_state(|| None::<Vec<DuplicateGroup>>);
    let selection = use_state(Selection::new);
    let undo_available = use_state(|| false);
    let notice = use_state(|| None::<String>);
    let show_settings = use_state(|| false);

    // Load settings on mount
    {
        let settings = settings.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match load_settings().await {
                    Ok(loaded) => settings.set(loaded),
                    Err(e) => log::warn!("Could not load settings: {}", e),
                }
            });
            || ()
        });
    }

    let on_analyze = {
        let state = state.clone();
        let settings = settings.clone();
        let groups = groups.clone();
        let selection = selection.clone();
        let notice = notice.clone();

        Callback::from(move |_| {
            notice.set(None);
            let settings = *settings;
            let state = state.clone();
            let groups = groups.clone();
            let selection = selection.clone();
            spawn_local(async move {
                analyze(settings, state, groups, selection).await;
            });
        })
    };

    let on_close = {
        let state = state.clone();
        let settings = settings.clone();
        let groups = groups.clone();
        let selection = selection.clone();
        let undo_available = undo_available.clone();
        let notice = notice.clone();

        Callback::from(move |_| {
            let shown = (*groups).clone().unwrap_or_default();
            let tab_ids = selection.ids(&shown);

            if tab_ids.is_empty() {
                notice.set(Some("No tabs selected for closing.".to_string()));
                return;
            }

            let settings = *settings;
            if settings.confirm_close && !confirm_close(tab_ids.len()) {
                return;
            }

            let state = state.clone();
            let groups = groups.clone();
            let selection = selection.clone();
            let undo_available = undo_available.clone();
            let notice = notice.clone();

            state.set(AppState::Loading("Closing tabs...".to_string()));

            spawn_local(async move {
                match send_request::<CloseResponse>(&Request::CloseTabs { tab_ids }).await {
                    Ok(response) if response.success => {
                        undo_available.set(response.undo_available);
                        notice.set(Some(response.message));
                        analyze(settings, state, groups, selection).await;
                    }
                    Ok(response) => {
                        state.set(AppState::Error(format!("Error closing tabs: {}", response.message)));
                    }
                    Err(e) => {
                        state.set(AppState::Error(format!("Error closing tabs: {}", e)));
                    }
                }
            });
        })
    };

    let on_undo = {
        let state = state.clone();
        let settings = settings.clone();
        let groups = groups.clone();
        let selection = selection.clone();
        let undo_available = undo_available.clone();
        let notice = notice.clone();

        Callback::from(move |_| {
            let settings = *settings;
            let state = state.clone();
            let groups = groups.clone();
            let selection = selection.clone();
            let undo_available = undo_available.clone();
            let notice = notice.clone();

            state.set(AppState::Loading("Restoring...".to_string()));

            spawn_local(async move {
                match send_request::<UndoResponse>(&Request::UndoClose).await {
                    Ok(response) => {
                        undo_available.set(response.undo_available);
                        if response.success {
                            notice.set(Some(response.message));
                            analyze(settings, state, groups, selection).await;
                        } else {
                            state.set(AppState::Error(format!("Undo failed: {}", response.message)));
                        }
                    }
                    Err(e) => {
                        state.set(AppState::Error(format!("Error undoing: {}", e)));
                    }
                }
            });
        })
    };

    let on_select_all = {
        let groups = groups.clone();
        let selection = selection.clone();
        Callback::from(move |_| {
            let mut next = (*selection).clone();
            next.select_all(&(*groups).clone().unwrap_or_default());
            selection.set(next);
        })
    };

    let on_select_none = {
        let selection = selection.clone();
        Callback::from(move |_| {
            selection.set(Selection::new());
        })
    };

    let on_toggle_settings = {
        let show_settings = show_settings.clone();
        Callback::from(move |_| {
            show_settings.set(!*show_settings);
        })
    };

    let on_setting = {
        let settings = settings.clone();
        let state = state.clone();
        move |update: fn(&mut UserSettings, bool)| {
            let settings = settings.clone();
            let state = state.clone();
            Callback::from(move |e: Event| {
                if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                    let mut next = *settings;
                    update(&mut next, input.checked());
                    settings.set(next);

                    let state = state.clone();
                    spawn_local(async move {
                        if let Err(e) = save_settings(&next).await {
                            state.set(AppState::Error(format!("Could not save settings: {}", e)));
                        }
                    });
                }
            })
        }
    };

    let is_busy = !matches!(*state, AppState::Idle);
    let shown = (*groups).clone();

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Duplicate Tab Remover"}</h1>

            <div class="flex-column-gap">
                <Button onclick={on_analyze} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                    {"Find Duplicate Tabs"}
                </Button>
                <Button onclick={on_toggle_settings} variant={ButtonVariant::Link}>
                    {"Settings"}
                </Button>
            </div>

            if *show_settings {
                <div class="settings-panel">
                    <label class="setting-item">
                        <input
                            type="checkbox"
                            checked={settings.confirm_close}
                            onchange={on_setting(|s, v| s.confirm_close = v)}
                        />
                        {" Confirm before closing"}
                    </label>
                    <label class="setting-item">
                        <input
                            type="checkbox"
                            checked={settings.auto_select}
                            onchange={on_setting(|s, v| s.auto_select = v)}
                        />
                        {" Auto-select duplicates"}
                    </label>
                    <label class="setting-item">
                        <input
                            type="checkbox"
                            checked={settings.performance_mode}
                            onchange={on_setting(|s, v| s.performance_mode = v)}
                        />
                        {" Performance mode"}
                    </label>
                </div>
            }

            // Status display
            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            if let Some(message) = (*notice).clone() {
                <Alert r#type={AlertType::Info} title={message} inline={true}>
                </Alert>
            }

            {match shown {
                None => html! {},
                Some(found) if found.is_empty() => html! {
                    <p class="no-duplicates">{"No duplicate tabs found."}</p>
                },
                Some(found) => {
                    let stats = duplicate_stats(&found, &selection);
                    html! {
                        <div class="results">
                            <div class="stats-box">
                                <span class="stat-item">{format!("Groups: {}", stats.groups)}</span>
                                <span class="stat-item">{format!("Duplicates: {}", stats.tabs)}</span>
                                <span class="stat-item">{format!("Selected: {}", stats.selected)}</span>
                            </div>
                            <div class="bulk-actions">
                                <Button onclick={on_select_all} disabled={is_busy} variant={ButtonVariant::Secondary}>
                                    {"Select All"}
                                </Button>
                                <Button onclick={on_select_none} disabled={is_busy} variant={ButtonVariant::Secondary}>
                                    {"Select None"}
                                </Button>
                            </div>
                            {for found.iter().map(|group| view_group(group, &selection))}
                            <Button onclick={on_close} disabled={is_busy || stats.selected == 0} variant={ButtonVariant::Danger} block={true}>
                                {"Close Selected Tabs"}
                            </Button>
                        </div>
                    }
                }
            }}

            if *undo_available {
                <div class="message-top-margin">
                    <Button onclick={on_undo} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                        {"Undo Last Close"}
                    </Button>
                </div>
            }
        </div>
    }
}

fn view_group(group: &DuplicateGroup, selection: &UseStateHandle<Selection>) -> Html {
    let on_group_change = {
        let group = group.clone();
        let selection = selection.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let mut next = (*selection).clone();
                if input.checked() {
                    next.select_group(&group);
                } else {
                    next.clear_group(&group);
                }
                selection.set(next);
            }
        })
    };

    let header_class = match selection.group_check(group) {
        GroupCheck::Mixed => "group-header group-mixed",
        _ => "group-header",
    };

    html! {
        <div class="duplicate-group">
            <div class={header_class}>
                <input
                    type="checkbox"
                    checked={selection.group_check(group) == GroupCheck::Checked}
                    onchange={on_group_change}
                />
                <span class="group-url">{format!("{} ({} tabs)", group.key, group.len())}</span>
            </div>
            <div class="tab-list">
                {for group.tabs.iter().map(|tab| {
                    let title = if tab.title.is_empty() { "Untitled Tab".to_string() } else { tab.title.clone() };
                    html! {
                        <label class="tab-item" title={tab.url.clone()}>
                            <input
                                type="checkbox"
                                checked={selection.contains(tab.id)}
                                onchange={on_tab_change(tab.id, selection)}
                            />
                            <span class="tab-title">{title}</span>
                        </label>
                    }
                })}
            </div>
        </div>
    }
}

fn on_tab_change(tab_id: TabId, selection: &UseStateHandle<Selection>) -> Callback<Event> {
    let selection = selection.clone();
    Callback::from(move |e: Event| {
        if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
            let mut next = (*selection).clone();
            next.set(tab_id, input.checked());
            selection.set(next);
        }
    })
}

// Helper functions

async fn analyze(
    settings: UserSettings,
    state: UseStateHandle<AppState>,
    groups: UseStateHandle<Option<Vec<DuplicateGroup>>>,
    selection: UseStateHandle<Selection>,
) {
    state.set(AppState::Loading(settings.loading_message().to_string()));

    let result = send_request::<DetectResponse>(&Request::AnalyzeTabs)
        .await
        .and_then(DetectResponse::into_groups);

    match result {
        Ok(found) => {
            selection.set(Selection::initial(&found, settings.auto_select));
            groups.set(Some(found));
            state.set(AppState::Idle);
        }
        Err(e) => {
            state.set(AppState::Error(format!("Error analyzing tabs: {}", e)));
        }
    }
}

async fn send_request<T: DeserializeOwned>(request: &Request) -> Result<T, String> {
    let request_js = request
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))?;

    let response_js = sendMessage(request_js)
        .await
        .map_err(|e| format!("Message failed: {:?}", e))?;

    serde_wasm_bindgen::from_value(response_js)
        .map_err(|e| format!("Failed to parse response: {:?}", e))
}

async fn load_settings() -> Result<UserSettings, String> {
    let stored_js = getStorage(SETTINGS_KEY)
        .await
        .map_err(|e| format!("Failed to get storage: {:?}", e))?;

    if stored_js.is_null() || stored_js.is_undefined() {
        return Ok(UserSettings::default());
    }

    let stored: serde_json::Value = serde_wasm_bindgen::from_value(stored_js)
        .map_err(|e| format!("Failed to parse settings: {:?}", e))?;
    Ok(UserSettings::from_stored(Some(stored)))
}

async fn save_settings(settings: &UserSettings) -> Result<(), String> {
    let settings_js = settings
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize settings: {:?}", e))?;

    setStorage(SETTINGS_KEY, settings_js)
        .await
        .map_err(|e| format!("Failed to save settings: {:?}", e))
}

fn confirm_close(count: usize) -> bool {
    let message = format!(
        "Are you sure you want to close {} tab{}?",
        count,
        if count == 1 { "" } else { "s" }
    );

    web_sys::window()
        .and_then(|window| window.confirm_with_message(&message).ok())
        .unwrap_or(false)
}
