/// Per-window bookkeeping binding group definitions to live host groups
use std::collections::HashMap;

use crate::tabs::TabInfo;

/// windowId -> (groupId -> host group id). A cache, not a source of truth:
/// every binding can be re-derived by matching a definition's name against
/// live host group titles, and entries go away when the host reports the
/// group or window destroyed.
#[derive(Debug, Default)]
pub struct WindowGroupIndex {
    windows: HashMap<i32, HashMap<String, i32>>,
}

impl WindowGroupIndex {
    pub fn new() -> Self {
        WindowGroupIndex::default()
    }

    pub fn get(&self, window_id: i32, group_id: &str) -> Option<i32> {
        self.windows.get(&window_id)?.get(group_id).copied()
    }

    /// Bind a definition to a live host group in one window, lazily
    /// creating the window's map.
    pub fn record(&mut self, window_id: i32, group_id: &str, host_group_id: i32) {
        self.windows
            .entry(window_id)
            .or_default()
            .insert(group_id.to_string(), host_group_id);
    }

    pub fn remove_window(&mut self, window_id: i32) {
        self.windows.remove(&window_id);
    }

    /// Drop a definition's binding from every window, discarding window
    /// maps that become empty.
    pub fn remove_group_everywhere(&mut self, group_id: &str) {
        for bindings in self.windows.values_mut() {
            bindings.remove(group_id);
        }
        self.windows.retain(|_, bindings| !bindings.is_empty());
    }

    /// Drop whichever binding points at a destroyed host group.
    pub fn forget_host_group(&mut self, host_group_id: i32) {
        for bindings in self.windows.values_mut() {
            bindings.retain(|_, bound| *bound != host_group_id);
        }
        self.windows.retain(|_, bindings| !bindings.is_empty());
    }

    /// Every (windowId, host group id) currently bound to a definition.
    pub fn bindings_for_group(&self, group_id: &str) -> Vec<(i32, i32)> {
        self.windows
            .iter()
            .filter_map(|(window_id, bindings)| {
                bindings.get(group_id).map(|bound| (*window_id, *bound))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn binding_count(&self) -> usize {
        self.windows.values().map(HashMap::len).sum()
    }
}

/// Derive which window each host group lives in from its member tabs. The
/// host group objects themselves are not consulted; a group with no member
/// tabs cannot exist, so every live group appears here.
pub fn attribute_windows(tabs: &[TabInfo]) -> HashMap<i32, i32> {
    let mut windows = HashMap::new();
    for tab in tabs {
        if tab.is_grouped() {
            windows.entry(tab.group_id).or_insert(tab.window_id);
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs::TAB_GROUP_NONE;

    fn tab(id: i32, window_id: i32, group_id: i32) -> TabInfo {
        TabInfo {
            id,
            window_id,
            url: format!("https://example.com/{id}"),
            group_id,
            pinned: false,
            index: id,
        }
    }

    #[test]
    fn test_record_and_get() {
        let mut index = WindowGroupIndex::new();

        assert_eq!(index.get(1, "work"), None);
        index.record(1, "work", 100);
        index.record(2, "work", 200);

        assert_eq!(index.get(1, "work"), Some(100));
        assert_eq!(index.get(2, "work"), Some(200));
        assert_eq!(index.get(1, "news"), None);
        assert_eq!(index.window_count(), 2);
    }

    #[test]
    fn test_remove_window() {
        let mut index = WindowGroupIndex::new();
        index.record(1, "work", 100);
        index.record(2, "work", 200);

        index.remove_window(1);

        assert_eq!(index.get(1, "work"), None);
        assert_eq!(index.get(2, "work"), Some(200));
    }

    #[test]
    fn test_remove_group_everywhere_drops_empty_windows() {
        let mut index = WindowGroupIndex::new();
        index.record(1, "work", 100);
        index.record(1, "news", 101);
        index.record(2, "work", 200);

        index.remove_group_everywhere("work");

        assert_eq!(index.get(1, "news"), Some(101));
        assert_eq!(index.get(1, "work"), None);
        assert_eq!(index.get(2, "work"), None);
        // Window 2 held only the removed group's binding
        assert_eq!(index.window_count(), 1);
    }

    #[test]
    fn test_forget_host_group() {
        let mut index = WindowGroupIndex::new();
        index.record(1, "work", 100);
        index.record(2, "work", 200);

        index.forget_host_group(200);

        assert_eq!(index.get(1, "work"), Some(100));
        assert_eq!(index.get(2, "work"), None);
        assert_eq!(index.window_count(), 1);
    }

    #[test]
    fn test_bindings_for_group() {
        let mut index = WindowGroupIndex::new();
        index.record(1, "work", 100);
        index.record(2, "work", 200);
        index.record(2, "news", 201);

        let mut bindings = index.bindings_for_group("work");
        bindings.sort();

        assert_eq!(bindings, vec![(1, 100), (2, 200)]);
        assert!(index.bindings_for_group("missing").is_empty());
    }

    #[test]
    fn test_attribute_windows_from_member_tabs() {
        let tabs = vec![
            tab(1, 10, TAB_GROUP_NONE),
            tab(2, 10, 500),
            tab(3, 10, 500),
            tab(4, 20, 600),
        ];

        let windows = attribute_windows(&tabs);

        assert_eq!(windows.get(&500), Some(&10));
        assert_eq!(windows.get(&600), Some(&20));
        assert_eq!(windows.len(), 2);
    }
}
