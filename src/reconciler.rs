/// Tab reconciliation engine: decides each tab's target group and drives
/// the host APIs to realize it
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use thiserror::Error;

use crate::commands::{GroupEntry, RuleEntry, StatusResponse};
use crate::config::{self, ConfigStore, GroupColor, GroupDefinition, PatternRule, TabPlacement};
use crate::group_index::{WindowGroupIndex, attribute_windows};
use crate::host::{GroupUpdate, HostBrowser, HostError};
use crate::matcher::{self, PatternKind, matches_pattern};
use crate::tabs::TabInfo;

/// Pages the reconciler never touches: browser-internal URLs and the
/// extension's own pages.
const INTERNAL_SCHEMES: [&str; 5] = [
    "about:",
    "chrome:",
    "edge:",
    "moz-extension:",
    "chrome-extension:",
];

fn is_internal_url(url: &str) -> bool {
    INTERNAL_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Failures surfaced through the command channel. Host API errors escape
/// only from explicit commands; event-driven reconciliation logs them and
/// moves on.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid tab placement: {0}")]
    InvalidPlacement(String),
    #[error("group definition not found: {0}")]
    GroupNotFound(String),
    #[error("no rule for pattern: {0}")]
    RuleNotFound(String),
    #[error("a rule for pattern {0} already exists")]
    DuplicatePattern(String),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// The engine owns all mutable state: the configuration store and the
/// per-window group index, both behind RefCell since the host event loop is
/// single-threaded and handlers run to completion. Borrows are never held
/// across an await.
pub struct Engine<H: HostBrowser> {
    host: H,
    config: RefCell<ConfigStore>,
    index: RefCell<WindowGroupIndex>,
    initialized: Cell<bool>,
}

impl<H: HostBrowser> Engine<H> {
    pub fn new(host: H) -> Self {
        Engine {
            host,
            config: RefCell::new(ConfigStore::new()),
            index: RefCell::new(WindowGroupIndex::new()),
            initialized: Cell::new(false),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Full startup: load configuration, rebuild the window group index
    /// from live host state, then bring every open tab into line. Runs for
    /// both the install and startup lifecycle signals, so it is safe to run
    /// more than once.
    pub async fn initialize(&self) {
        log::info!("initializing auto tab grouper");

        match self.host.storage_get(&config::STORAGE_KEYS).await {
            Ok(blob) => *self.config.borrow_mut() = ConfigStore::from_blob(&blob),
            Err(e) => log::error!("could not load configuration, starting from defaults: {e}"),
        }
        {
            let store = self.config.borrow();
            log::info!(
                "configuration loaded: {} groups, {} rules, enabled={}",
                store.groups.len(),
                store.rules().len(),
                store.settings.enabled
            );
        }

        self.rebuild_index().await;
        self.reconcile_all().await;
        self.initialized.set(true);

        log::info!("auto tab grouper initialized");
    }

    /// Persist the whole store. A storage failure is logged, not
    /// propagated; the in-memory store stays authoritative until the next
    /// successful write.
    async fn persist(&self) {
        let blob = self.config.borrow().to_blob();
        if let Err(e) = self.host.storage_set(&blob).await {
            log::error!("could not persist configuration: {e}");
        }
    }

    // ── Reconciliation ──

    /// Bring one tab into its correct group, or out of any group.
    pub async fn reconcile(&self, tab: &TabInfo) {
        let target = {
            let store = self.config.borrow();
            if !store.settings.enabled {
                return;
            }
            if tab.url.is_empty() || is_internal_url(&tab.url) {
                return;
            }
            if store.settings.ignore_pinned_tabs && tab.pinned {
                return;
            }
            store
                .first_match(&tab.url)
                .map(|rule| rule.group_id.clone())
        };

        match target {
            Some(group_id) => self.assign_to_group(tab, &group_id).await,
            None => self.ungroup_tab(tab).await,
        }
    }

    /// Reconcile every open tab across all windows.
    pub async fn reconcile_all(&self) {
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::error!("could not list tabs for reconciliation: {e}");
                return;
            }
        };
        for tab in &tabs {
            self.reconcile(tab).await;
        }
    }

    async fn ungroup_tab(&self, tab: &TabInfo) {
        if !tab.is_grouped() {
            return;
        }
        if let Err(e) = self.host.ungroup_tabs(&[tab.id]).await {
            log::error!("could not ungroup tab {}: {e}", tab.id);
        }
    }

    async fn assign_to_group(&self, tab: &TabInfo, group_id: &str) {
        let Some(definition) = self.config.borrow().group(group_id).cloned() else {
            // Cascade delete keeps rules from dangling, so this only fires
            // on a corrupted store.
            log::warn!("no group definition for groupId {group_id}");
            return;
        };

        // Correctness is judged by title, not by tracked id: a host group
        // carrying the right name is the right group wherever it came from.
        if tab.is_grouped() {
            match self.host.get_tab_group(tab.group_id).await {
                Ok(current) if current.title == definition.name => return,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("could not inspect tab {}'s current group: {e}", tab.id);
                }
            }
        }

        let mut target = self.index.borrow().get(tab.window_id, group_id);

        if target.is_none() {
            // Lost binding: adopt a live group in this window whose title
            // matches, re-asserting our configured color.
            match self.find_live_group(tab.window_id, &definition.name).await {
                Ok(Some(host_group)) => {
                    self.index
                        .borrow_mut()
                        .record(tab.window_id, group_id, host_group);
                    log::info!(
                        "adopted existing group \"{}\" ({host_group}) in window {}",
                        definition.name,
                        tab.window_id
                    );
                    self.recolor(host_group, definition.color).await;
                    target = Some(host_group);
                }
                Ok(None) => {}
                Err(e) => log::warn!(
                    "could not search window {} for group \"{}\": {e}",
                    tab.window_id,
                    definition.name
                ),
            }
        }

        match target {
            None => {
                let host_group = match self.host.group_tabs(&[tab.id], None).await {
                    Ok(id) => id,
                    Err(e) => {
                        log::error!("could not create a group for tab {}: {e}", tab.id);
                        return;
                    }
                };
                if let Err(e) = self
                    .host
                    .update_tab_group(
                        host_group,
                        &GroupUpdate::titled(definition.name.clone(), definition.color),
                    )
                    .await
                {
                    log::warn!("could not title new group {host_group}: {e}");
                }
                self.index
                    .borrow_mut()
                    .record(tab.window_id, group_id, host_group);
                log::info!(
                    "created group \"{}\" ({host_group}) in window {}",
                    definition.name,
                    tab.window_id
                );
            }
            Some(host_group) => {
                if let Err(e) = self.host.group_tabs(&[tab.id], Some(host_group)).await {
                    log::error!("could not move tab {} into group {host_group}: {e}", tab.id);
                    return;
                }
                self.apply_placement(tab.id, host_group).await;
            }
        }
    }

    /// Best-effort placement inside the group the tab just joined. With
    /// `last` the host's natural append position already satisfies the
    /// policy; with `first` the tab moves to the group's current first
    /// member's index. A failed move leaves the tab grouped.
    async fn apply_placement(&self, tab_id: i32, host_group: i32) {
        if self.config.borrow().settings.tab_placement != TabPlacement::First {
            return;
        }
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::warn!("could not inspect group {host_group} for placement: {e}");
                return;
            }
        };
        let mut members: Vec<&TabInfo> =
            tabs.iter().filter(|t| t.group_id == host_group).collect();
        members.sort_by_key(|t| t.index);
        let Some(first) = members.first() else {
            return;
        };
        let first_index = first.index;
        let Some(me) = members.iter().find(|t| t.id == tab_id) else {
            return;
        };
        if me.index != first_index {
            if let Err(e) = self.host.move_tab(tab_id, first_index).await {
                log::warn!("could not move tab {tab_id} to the front of group {host_group}: {e}");
            }
        }
    }

    /// A live host group in `window_id` titled `name`, if any. Windows are
    /// attributed through member tabs.
    async fn find_live_group(
        &self,
        window_id: i32,
        name: &str,
    ) -> Result<Option<i32>, HostError> {
        let groups = self.host.query_tab_groups().await?;
        let tabs = self.host.query_tabs().await?;
        let windows = attribute_windows(&tabs);
        Ok(groups
            .iter()
            .find(|g| g.title == name && windows.get(&g.id) == Some(&window_id))
            .map(|g| g.id))
    }

    async fn recolor(&self, host_group: i32, color: GroupColor) {
        if let Err(e) = self
            .host
            .update_tab_group(host_group, &GroupUpdate::color_only(color))
            .await
        {
            log::warn!("could not update color of group {host_group}: {e}");
        }
    }

    /// Drop all bindings and re-derive them from live host state: every
    /// host group whose title equals a definition's name is adopted, and
    /// its color pushed back to the configured value.
    pub async fn rebuild_index(&self) {
        self.index.borrow_mut().clear();

        let groups = match self.host.query_tab_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                log::error!("could not scan existing tab groups: {e}");
                return;
            }
        };
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::error!("could not list tabs to place groups in windows: {e}");
                return;
            }
        };
        let windows = attribute_windows(&tabs);

        let mut adopted = Vec::new();
        {
            let store = self.config.borrow();
            let mut index = self.index.borrow_mut();
            for group in &groups {
                let Some(window_id) = windows.get(&group.id) else {
                    continue;
                };
                if let Some((group_id, definition)) = store
                    .groups
                    .iter()
                    .find(|(_, definition)| definition.name == group.title)
                {
                    index.record(*window_id, group_id, group.id);
                    adopted.push((group.id, definition.color));
                }
            }
        }
        log::info!(
            "tracking {} existing group(s) across {} window(s)",
            self.index.borrow().binding_count(),
            self.index.borrow().window_count()
        );

        // Repair color drift on everything we adopted.
        for (host_group, color) in adopted {
            self.recolor(host_group, color).await;
        }
    }

    /// Pull every tab out of every host group and drop all bindings.
    pub async fn ungroup_all(&self) -> Result<(), EngineError> {
        let tabs = self.host.query_tabs().await?;
        let grouped: Vec<i32> = tabs
            .iter()
            .filter(|t| t.is_grouped())
            .map(|t| t.id)
            .collect();
        if !grouped.is_empty() {
            self.host.ungroup_tabs(&grouped).await?;
        }
        self.index.borrow_mut().clear();
        Ok(())
    }

    // ── Command mutations ──

    pub async fn toggle_enabled(&self) -> bool {
        let enabled = {
            let mut store = self.config.borrow_mut();
            store.settings.enabled = !store.settings.enabled;
            store.settings.enabled
        };
        self.persist().await;
        if enabled {
            self.reconcile_all().await;
        }
        enabled
    }

    pub async fn toggle_ignore_pinned_tabs(&self) -> bool {
        let (ignore, enabled) = {
            let mut store = self.config.borrow_mut();
            store.settings.ignore_pinned_tabs = !store.settings.ignore_pinned_tabs;
            (store.settings.ignore_pinned_tabs, store.settings.enabled)
        };
        self.persist().await;
        if enabled {
            self.reconcile_all().await;
        }
        ignore
    }

    pub async fn set_tab_placement(&self, value: &str) -> Result<TabPlacement, EngineError> {
        let placement = TabPlacement::parse(value)
            .ok_or_else(|| EngineError::InvalidPlacement(value.to_string()))?;
        self.config.borrow_mut().settings.tab_placement = placement;
        self.persist().await;
        Ok(placement)
    }

    pub async fn add_group(&self, group_id: String, name: String, color: GroupColor) {
        self.config
            .borrow_mut()
            .upsert_group(group_id, GroupDefinition { name, color });
        self.persist().await;
    }

    /// Remove a definition, its dependent rules, and its index bindings as
    /// one operation, persisting once; then ungroup the tabs its host
    /// groups were holding.
    pub async fn remove_group(&self, group_id: &str) {
        let removed = self.config.borrow_mut().remove_group_cascade(group_id);
        let Some((definition, rules)) = removed else {
            log::warn!("removeGroup: unknown groupId {group_id}, nothing to do");
            return;
        };
        self.index.borrow_mut().remove_group_everywhere(group_id);
        log::info!(
            "removed group \"{}\" and {} dependent rule(s)",
            definition.name,
            rules.len()
        );
        self.persist().await;

        if self.config.borrow().settings.enabled {
            self.ungroup_titled(&definition.name).await;
        }
    }

    pub async fn update_group(
        &self,
        group_id: &str,
        name: String,
        color: GroupColor,
    ) -> Result<(), EngineError> {
        {
            let mut store = self.config.borrow_mut();
            if store.group(group_id).is_none() {
                return Err(EngineError::GroupNotFound(group_id.to_string()));
            }
            store.upsert_group(
                group_id.to_string(),
                GroupDefinition {
                    name: name.clone(),
                    color,
                },
            );
        }
        self.persist().await;

        // Push the new identity onto every window's live group.
        let bindings = self.index.borrow().bindings_for_group(group_id);
        for (window_id, host_group) in bindings {
            if let Err(e) = self
                .host
                .update_tab_group(host_group, &GroupUpdate::titled(name.clone(), color))
                .await
            {
                log::warn!("could not update live group {host_group} in window {window_id}: {e}");
            }
        }
        Ok(())
    }

    pub async fn add_rule(
        &self,
        pattern: String,
        group_id: String,
        kind: PatternKind,
    ) -> Result<(), EngineError> {
        // Validation precedes every mutation: a rejected rule leaves both
        // the store and storage untouched.
        if self.config.borrow().group(&group_id).is_none() {
            return Err(EngineError::GroupNotFound(group_id));
        }
        matcher::validate_pattern(&pattern, kind)
            .map_err(|e| EngineError::InvalidPattern(e.to_string()))?;

        self.config.borrow_mut().upsert_rule(PatternRule {
            pattern,
            group_id,
            kind,
        });
        self.persist().await;

        if self.config.borrow().settings.enabled {
            self.reconcile_all().await;
        }
        Ok(())
    }

    pub async fn remove_rule(&self, pattern: &str) {
        let removed = self.config.borrow_mut().remove_rule(pattern);
        let Some(removed) = removed else {
            log::warn!("removeRule: no rule for pattern {pattern}, nothing to do");
            return;
        };
        self.persist().await;

        if !self.config.borrow().settings.enabled {
            return;
        }
        // Re-decide every tab the dead rule used to claim: tabs only it
        // matched come out of their group, tabs another rule also claims
        // get regrouped under that rule.
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::error!("could not list tabs after rule removal: {e}");
                return;
            }
        };
        for tab in &tabs {
            if matches_pattern(&tab.url, &removed.pattern, removed.kind) {
                self.reconcile(tab).await;
            }
        }
    }

    pub async fn update_rule(
        &self,
        old_pattern: &str,
        new_pattern: String,
        group_id: String,
        kind: PatternKind,
    ) -> Result<(), EngineError> {
        {
            let store = self.config.borrow();
            if store.group(&group_id).is_none() {
                return Err(EngineError::GroupNotFound(group_id));
            }
            if !store.has_rule(old_pattern) {
                return Err(EngineError::RuleNotFound(old_pattern.to_string()));
            }
            if new_pattern != old_pattern && store.has_rule(&new_pattern) {
                return Err(EngineError::DuplicatePattern(new_pattern));
            }
        }
        matcher::validate_pattern(&new_pattern, kind)
            .map_err(|e| EngineError::InvalidPattern(e.to_string()))?;

        self.config.borrow_mut().replace_rule(
            old_pattern,
            PatternRule {
                pattern: new_pattern,
                group_id,
                kind,
            },
        );
        self.persist().await;

        if self.config.borrow().settings.enabled {
            self.reconcile_all().await;
        }
        Ok(())
    }

    /// Ungroup every tab sitting in a host group with this title, one tab
    /// at a time; groups that vanish mid-scan are skipped.
    async fn ungroup_titled(&self, name: &str) {
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::error!("could not list tabs to ungroup \"{name}\": {e}");
                return;
            }
        };
        let mut titles: HashMap<i32, Option<String>> = HashMap::new();
        for tab in tabs.iter().filter(|t| t.is_grouped()) {
            if !titles.contains_key(&tab.group_id) {
                let title = self
                    .host
                    .get_tab_group(tab.group_id)
                    .await
                    .ok()
                    .map(|g| g.title);
                titles.insert(tab.group_id, title);
            }
            if titles.get(&tab.group_id).and_then(|t| t.as_deref()) == Some(name) {
                if let Err(e) = self.host.ungroup_tabs(&[tab.id]).await {
                    log::error!("could not ungroup tab {}: {e}", tab.id);
                }
            }
        }
    }

    // ── Host event entry points; all no-ops until initialization ──

    pub async fn on_tab_created(&self, tab: &TabInfo) {
        if !self.initialized.get() {
            return;
        }
        log::debug!("tab created: {}", tab.url);
        self.reconcile(tab).await;
    }

    pub async fn on_tab_url_changed(&self, tab: &TabInfo) {
        if !self.initialized.get() {
            return;
        }
        log::debug!("tab url changed: {}", tab.url);
        self.reconcile(tab).await;
    }

    pub async fn on_tab_activated(&self, tab_id: i32) {
        if !self.initialized.get() {
            return;
        }
        match self.host.get_tab(tab_id).await {
            Ok(tab) => self.reconcile(&tab).await,
            Err(e) => log::error!("could not look up activated tab {tab_id}: {e}"),
        }
    }

    pub fn on_tab_group_removed(&self, host_group_id: i32) {
        if !self.initialized.get() {
            return;
        }
        log::debug!("host group removed: {host_group_id}");
        self.index.borrow_mut().forget_host_group(host_group_id);
    }

    pub fn on_window_removed(&self, window_id: i32) {
        if !self.initialized.get() {
            return;
        }
        log::debug!("window removed: {window_id}");
        self.index.borrow_mut().remove_window(window_id);
    }

    // ── Snapshots ──

    pub fn status(&self) -> StatusResponse {
        let store = self.config.borrow();
        let groups = store
            .groups
            .iter()
            .map(|(group_id, definition)| GroupEntry {
                group_id: group_id.clone(),
                name: definition.name.clone(),
                color: definition.color,
            })
            .collect();
        let rules = store
            .rules()
            .iter()
            .map(|rule| {
                let definition = store.group(&rule.group_id);
                RuleEntry {
                    pattern: rule.pattern.clone(),
                    group_id: rule.group_id.clone(),
                    kind: rule.kind,
                    group_name: definition
                        .map_or_else(|| "Unknown Group".to_string(), |d| d.name.clone()),
                    group_color: definition.map_or(GroupColor::Grey, |d| d.color),
                }
            })
            .collect();
        StatusResponse {
            enabled: store.settings.enabled,
            ignore_pinned_tabs: store.settings.ignore_pinned_tabs,
            tab_placement: store.settings.tab_placement,
            groups,
            rules,
            initialized: self.initialized.get(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use crate::host::{GroupUpdate, HostBrowser, HostError};
    use crate::tabs::{TAB_GROUP_NONE, TabGroupInfo, TabInfo};

    pub const FAKE_NOW_MS: f64 = 1_700_000_000_000.0;

    /// In-memory host: a flat tab list, a group list, and a key-value
    /// store, with a call log for asserting what the engine touched.
    #[derive(Default)]
    pub struct FakeHost {
        pub tabs: RefCell<Vec<TabInfo>>,
        pub groups: RefCell<Vec<TabGroupInfo>>,
        pub storage: RefCell<Map<String, Value>>,
        next_group: Cell<i32>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeHost {
        pub fn new() -> Self {
            let host = FakeHost::default();
            host.next_group.set(1000);
            host
        }

        fn called(&self, name: &str) {
            self.calls.borrow_mut().push(name.to_string());
        }

        pub fn call_count(&self, name: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == name).count()
        }

        pub fn add_tab(&self, id: i32, window_id: i32, url: &str, group_id: i32) {
            self.tabs.borrow_mut().push(TabInfo {
                id,
                window_id,
                url: url.to_string(),
                group_id,
                pinned: false,
                index: id,
            });
        }

        pub fn add_group(&self, id: i32, title: &str, color: &str) {
            self.groups.borrow_mut().push(TabGroupInfo {
                id,
                title: title.to_string(),
                color: color.to_string(),
            });
        }

        pub fn tab(&self, id: i32) -> TabInfo {
            self.tabs
                .borrow()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .unwrap()
        }

        pub fn group(&self, id: i32) -> TabGroupInfo {
            self.groups
                .borrow()
                .iter()
                .find(|g| g.id == id)
                .cloned()
                .unwrap()
        }
    }

    #[async_trait(?Send)]
    impl HostBrowser for FakeHost {
        async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError> {
            self.called("query_tabs");
            Ok(self.tabs.borrow().clone())
        }

        async fn get_tab(&self, tab_id: i32) -> Result<TabInfo, HostError> {
            self.called("get_tab");
            self.tabs
                .borrow()
                .iter()
                .find(|t| t.id == tab_id)
                .cloned()
                .ok_or_else(|| HostError(format!("no tab {tab_id}")))
        }

        async fn group_tabs(
            &self,
            tab_ids: &[i32],
            group: Option<i32>,
        ) -> Result<i32, HostError> {
            self.called("group_tabs");
            let group_id = match group {
                Some(existing) => existing,
                None => {
                    let minted = self.next_group.get();
                    self.next_group.set(minted + 1);
                    self.groups.borrow_mut().push(TabGroupInfo {
                        id: minted,
                        title: String::new(),
                        color: "grey".to_string(),
                    });
                    minted
                }
            };
            for tab in self.tabs.borrow_mut().iter_mut() {
                if tab_ids.contains(&tab.id) {
                    tab.group_id = group_id;
                }
            }
            Ok(group_id)
        }

        async fn ungroup_tabs(&self, tab_ids: &[i32]) -> Result<(), HostError> {
            self.called("ungroup_tabs");
            for tab in self.tabs.borrow_mut().iter_mut() {
                if tab_ids.contains(&tab.id) {
                    tab.group_id = TAB_GROUP_NONE;
                }
            }
            // Host groups vanish once their last member leaves
            let tabs = self.tabs.borrow();
            self.groups
                .borrow_mut()
                .retain(|g| tabs.iter().any(|t| t.group_id == g.id));
            Ok(())
        }

        async fn query_tab_groups(&self) -> Result<Vec<TabGroupInfo>, HostError> {
            self.called("query_tab_groups");
            Ok(self.groups.borrow().clone())
        }

        async fn get_tab_group(&self, group_id: i32) -> Result<TabGroupInfo, HostError> {
            self.called("get_tab_group");
            self.groups
                .borrow()
                .iter()
                .find(|g| g.id == group_id)
                .cloned()
                .ok_or_else(|| HostError(format!("no group {group_id}")))
        }

        async fn update_tab_group(
            &self,
            group_id: i32,
            update: &GroupUpdate,
        ) -> Result<(), HostError> {
            self.called("update_tab_group");
            let mut groups = self.groups.borrow_mut();
            let group = groups
                .iter_mut()
                .find(|g| g.id == group_id)
                .ok_or_else(|| HostError(format!("no group {group_id}")))?;
            if let Some(title) = &update.title {
                group.title = title.clone();
            }
            if let Some(color) = update.color {
                group.color = color.as_str().to_string();
            }
            Ok(())
        }

        async fn move_tab(&self, tab_id: i32, index: i32) -> Result<(), HostError> {
            self.called("move_tab");
            if let Some(tab) = self.tabs.borrow_mut().iter_mut().find(|t| t.id == tab_id) {
                tab.index = index;
            }
            Ok(())
        }

        async fn storage_get(&self, keys: &[&str]) -> Result<Value, HostError> {
            self.called("storage_get");
            let storage = self.storage.borrow();
            let mut result = Map::new();
            for key in keys {
                if let Some(value) = storage.get(*key) {
                    result.insert((*key).to_string(), value.clone());
                }
            }
            Ok(Value::Object(result))
        }

        async fn storage_set(&self, items: &Value) -> Result<(), HostError> {
            self.called("storage_set");
            if let Value::Object(items) = items {
                self.storage.borrow_mut().extend(items.clone());
            }
            Ok(())
        }

        fn now_ms(&self) -> f64 {
            FAKE_NOW_MS
        }
    }
}
