//! Scripted in-memory listing editor.
//!
//! The fake interprets the locator catalog by label ("floorplans import",
//! "commit control", "item 'a.pdf'", ...) and keeps a small page model:
//! open dialogs, staged imports with a busy-poll countdown, committed
//! attachments, tour rows, and banners. Behavior flags inject the failure
//! modes the engine has to survive.

use async_trait::async_trait;
use courier_ui::{Locator, SignalMap, UiDriver, UiError, UiSnapshot};
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Banner reaction scripted for a page-level action (save/deliver).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BannerScript {
    /// Success banner appears
    #[default]
    Success,
    /// No banner either way
    Silent,
    /// Error banner with this text
    Error(String),
    /// Error banner on the first click, success banner afterwards
    TransientThenSuccess(String),
}

/// Failure modes and timings for one fake page.
#[derive(Debug, Clone)]
pub struct Behavior {
    /// Busy polls reported after each import click before readiness
    pub busy_polls_before_ready: u32,
    /// Commit control never becomes enabled
    pub commit_never_ready: bool,
    /// Import click is silently swallowed (UI idle, never ready)
    pub import_does_nothing: bool,
    /// Import click raises an error banner instead of staging anything
    pub import_error_banner: Option<String>,
    /// First `fill` per field stores a corrupted value; `type_slow` is exact
    pub garble_first_fill: bool,
    /// Committed items stay invisible until the page is reloaded
    pub hide_committed_until_reload: bool,
    /// Commit modal stays open after a successful commit
    pub modal_sticks: bool,
    /// Tour widget clears its title field once, after the last field is set
    pub tour_resets_fields_once: bool,
    /// First N navigations fail at the transport
    pub goto_failures: u32,
    /// Page loads but its busy indicator never clears
    pub page_never_settles: bool,
    /// Save banner script
    pub save_banner: BannerScript,
    /// Deliver banner script
    pub deliver_banner: BannerScript,
    /// Filenames already attached before the run starts
    pub preattached: Vec<String>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            busy_polls_before_ready: 2,
            commit_never_ready: false,
            import_does_nothing: false,
            import_error_banner: None,
            garble_first_fill: false,
            hide_committed_until_reload: false,
            modal_sticks: false,
            tour_resets_fields_once: false,
            goto_failures: 0,
            page_never_settles: false,
            save_banner: BannerScript::Success,
            deliver_banner: BannerScript::Success,
            preattached: Vec::new(),
        }
    }
}

struct PendingImport {
    filename: String,
    busy_polls_left: u32,
}

#[derive(Default)]
struct Counters {
    goto_calls: u32,
    reload_calls: u32,
    import_clicks: u32,
    commit_clicks: u32,
    save_clicks: u32,
    deliver_clicks: u32,
}

struct PageState {
    url: String,
    dialog: Option<String>,
    modal_open: Option<String>,
    fields: HashMap<String, String>,
    toggles: HashMap<String, bool>,
    garbled: HashSet<String>,
    committed: BTreeSet<String>,
    hidden: BTreeSet<String>,
    tours: BTreeSet<String>,
    tour_rows: usize,
    pending: Option<PendingImport>,
    error_banner: Option<String>,
    success_banner: bool,
    tour_reset_done: bool,
    goto_failures_left: u32,
    counters: Counters,
}

struct Inner {
    behavior: Behavior,
    state: Mutex<PageState>,
    closed: AtomicBool,
}

/// Shared-handle fake page; clones observe and mutate the same state.
#[derive(Clone)]
pub struct FakeBrowser {
    inner: Arc<Inner>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new(Behavior::default())
    }
}

impl FakeBrowser {
    #[must_use]
    pub fn new(behavior: Behavior) -> Self {
        let state = PageState {
            url: String::new(),
            dialog: None,
            modal_open: None,
            fields: HashMap::new(),
            toggles: HashMap::new(),
            garbled: HashSet::new(),
            committed: behavior.preattached.iter().cloned().collect(),
            hidden: BTreeSet::new(),
            tours: BTreeSet::new(),
            tour_rows: 0,
            pending: None,
            error_banner: None,
            success_banner: false,
            tour_reset_done: false,
            goto_failures_left: behavior.goto_failures,
            counters: Counters::default(),
        };
        Self {
            inner: Arc::new(Inner {
                behavior,
                state: Mutex::new(state),
                closed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn was_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn committed(&self) -> Vec<String> {
        self.inner.state.lock().committed.iter().cloned().collect()
    }

    #[must_use]
    pub fn tours(&self) -> Vec<String> {
        self.inner.state.lock().tours.iter().cloned().collect()
    }

    #[must_use]
    pub fn import_clicks(&self) -> u32 {
        self.inner.state.lock().counters.import_clicks
    }

    #[must_use]
    pub fn commit_clicks(&self) -> u32 {
        self.inner.state.lock().counters.commit_clicks
    }

    #[must_use]
    pub fn save_clicks(&self) -> u32 {
        self.inner.state.lock().counters.save_clicks
    }

    #[must_use]
    pub fn deliver_clicks(&self) -> u32 {
        self.inner.state.lock().counters.deliver_clicks
    }

    #[must_use]
    pub fn reload_calls(&self) -> u32 {
        self.inner.state.lock().counters.reload_calls
    }

    fn apply_banner_script(state: &mut PageState, script: &BannerScript, clicks: u32) {
        state.error_banner = None;
        state.success_banner = false;
        match script {
            BannerScript::Success => state.success_banner = true,
            BannerScript::Silent => {}
            BannerScript::Error(text) => state.error_banner = Some(text.clone()),
            BannerScript::TransientThenSuccess(text) => {
                if clicks <= 1 {
                    state.error_banner = Some(text.clone());
                } else {
                    state.success_banner = true;
                }
            }
        }
    }
}

/// Last non-empty path segment, percent-decoded; the whole string when
/// there is no separator.
fn derive_filename(url: &str) -> String {
    let last = url
        .split('?')
        .next()
        .unwrap_or(url)
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or(url);
    percent_decode_str(last)
        .decode_utf8()
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| last.to_string())
}

/// Extract the quoted name from labels like `item 'a.pdf'`.
fn quoted(label: &str) -> Option<&str> {
    let start = label.find('\'')? + 1;
    let end = label.rfind('\'')?;
    (end > start).then(|| &label[start..end])
}

#[async_trait]
impl UiDriver for FakeBrowser {
    async fn goto(&self, url: &str) -> Result<(), UiError> {
        let mut st = self.inner.state.lock();
        st.counters.goto_calls += 1;
        if st.goto_failures_left > 0 {
            st.goto_failures_left -= 1;
            return Err(UiError::Navigation("scripted navigation failure".into()));
        }
        st.url = url.to_string();
        Ok(())
    }

    async fn reload(&self) -> Result<(), UiError> {
        let mut st = self.inner.state.lock();
        st.counters.reload_calls += 1;
        let revealed = std::mem::take(&mut st.hidden);
        st.committed.extend(revealed);
        st.dialog = None;
        st.modal_open = None;
        st.error_banner = None;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, UiError> {
        Ok(self.inner.state.lock().url.clone())
    }

    async fn click(&self, locator: &Locator) -> Result<(), UiError> {
        let behavior = &self.inner.behavior;
        let mut st = self.inner.state.lock();
        let label = locator.label.as_str();

        if let Some(section) = label.strip_suffix(" add-via-link") {
            let section = section.to_string();
            st.error_banner = None;
            st.fields.remove(&format!("{section} url input"));
            st.dialog = Some(section.clone());
            st.modal_open = Some(section);
        } else if let Some(section) = label.strip_suffix(" import") {
            st.counters.import_clicks += 1;
            if let Some(text) = &behavior.import_error_banner {
                st.error_banner = Some(text.clone());
            } else if !behavior.import_does_nothing {
                let url = st
                    .fields
                    .get(&format!("{section} url input"))
                    .cloned()
                    .unwrap_or_default();
                st.pending = Some(PendingImport {
                    filename: derive_filename(&url),
                    busy_polls_left: behavior.busy_polls_before_ready,
                });
            }
        } else if label == "commit control" {
            st.counters.commit_clicks += 1;
            if let Some(pending) = st.pending.take() {
                if behavior.hide_committed_until_reload {
                    st.hidden.insert(pending.filename);
                } else {
                    st.committed.insert(pending.filename);
                }
                if !behavior.modal_sticks {
                    st.modal_open = None;
                    st.dialog = None;
                }
            }
        } else if label == "tour add" {
            st.dialog = Some("tour".to_string());
        } else if label == "tour commit" {
            let url = st.fields.get("tour url input").cloned().unwrap_or_default();
            let title = st
                .fields
                .get("tour title input")
                .cloned()
                .unwrap_or_default();
            let display = st
                .fields
                .get("tour display type")
                .cloned()
                .unwrap_or_default();
            // The widget rejects an incomplete form silently.
            if !url.is_empty() && !title.is_empty() && !display.is_empty() {
                st.tours.insert(title);
                st.tour_rows += 1;
                st.dialog = None;
            }
        } else if label == "save" {
            st.counters.save_clicks += 1;
            let clicks = st.counters.save_clicks;
            Self::apply_banner_script(&mut st, &behavior.save_banner, clicks);
        } else if label == "deliver" {
            st.counters.deliver_clicks += 1;
            let clicks = st.counters.deliver_clicks;
            Self::apply_banner_script(&mut st, &behavior.deliver_banner, clicks);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), UiError> {
        let behavior = &self.inner.behavior;
        let mut st = self.inner.state.lock();
        let label = locator.label.clone();

        let stored = if behavior.garble_first_fill && !st.garbled.contains(&label) {
            st.garbled.insert(label.clone());
            format!("{value}\u{fffd}")
        } else {
            value.to_string()
        };
        st.fields.insert(label.clone(), stored);

        if behavior.tour_resets_fields_once && label == "tour display type" && !st.tour_reset_done
        {
            st.tour_reset_done = true;
            st.fields.remove("tour title input");
        }
        Ok(())
    }

    async fn type_slow(&self, locator: &Locator, value: &str) -> Result<(), UiError> {
        let mut st = self.inner.state.lock();
        st.fields.insert(locator.label.clone(), value.to_string());
        Ok(())
    }

    async fn read_value(&self, locator: &Locator) -> Result<String, UiError> {
        Ok(self
            .inner
            .state
            .lock()
            .fields
            .get(&locator.label)
            .cloned()
            .unwrap_or_default())
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>, UiError> {
        let st = self.inner.state.lock();
        if locator.label == "error banner" {
            return Ok(st.error_banner.clone());
        }
        if locator.label == "staged item name" {
            return Ok(st.pending.as_ref().map(|p| p.filename.clone()));
        }
        Ok(None)
    }

    async fn attr(&self, _locator: &Locator, _name: &str) -> Result<Option<String>, UiError> {
        Ok(None)
    }

    async fn count(&self, locator: &Locator) -> Result<usize, UiError> {
        let st = self.inner.state.lock();
        let label = locator.label.as_str();

        let n = if label.starts_with("item '") {
            match quoted(label) {
                Some(name) => usize::from(st.committed.contains(name)),
                None => 0,
            }
        } else if label.starts_with("tour '") {
            match quoted(label) {
                Some(title) => usize::from(st.tours.contains(title)),
                None => 0,
            }
        } else if label == "tour rows" {
            st.tour_rows
        } else if label == "floorplan rows" || label == "file rows" {
            st.committed.len()
        } else if label == "success banner" {
            usize::from(st.success_banner)
        } else if label == "error banner" {
            usize::from(st.error_banner.is_some())
        } else if let Some(section) = label.strip_suffix(" url input") {
            usize::from(st.dialog.as_deref() == Some(section))
        } else if let Some(section) = label.strip_suffix(" modal") {
            usize::from(st.modal_open.as_deref() == Some(section))
        } else {
            0
        };
        Ok(n)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, UiError> {
        if locator.label == "commit control" {
            return Ok(self.inner.state.lock().pending.is_some());
        }
        Ok(self.count(locator).await? > 0)
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, UiError> {
        if locator.label == "commit control" {
            let st = self.inner.state.lock();
            return Ok(st
                .pending
                .as_ref()
                .is_some_and(|p| p.busy_polls_left == 0 && !self.inner.behavior.commit_never_ready));
        }
        Ok(true)
    }

    async fn is_checked(&self, locator: &Locator) -> Result<bool, UiError> {
        Ok(self
            .inner
            .state
            .lock()
            .toggles
            .get(&locator.label)
            .copied()
            .unwrap_or(false))
    }

    async fn set_checked(&self, locator: &Locator, on: bool) -> Result<(), UiError> {
        self.inner
            .state
            .lock()
            .toggles
            .insert(locator.label.clone(), on);
        Ok(())
    }

    async fn page_contains(&self, needle: &str) -> Result<bool, UiError> {
        let st = self.inner.state.lock();
        Ok(st.committed.contains(needle) || st.tours.contains(needle))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, UiError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&self) -> Result<(), UiError> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Advances the scripted busy countdown exactly once per poll.
    async fn poll_signals(&self, _signals: &SignalMap) -> Result<UiSnapshot, UiError> {
        let mut st = self.inner.state.lock();
        let mut snap = UiSnapshot::default();

        if self.inner.behavior.page_never_settles {
            snap.progress_active = true;
            snap.progress_percent = Some(10);
        }

        if let Some(text) = &st.error_banner {
            snap.has_error_banner = true;
            snap.error_text = Some(text.clone());
        }

        if let Some(pending) = &mut st.pending {
            snap.has_staged_item = true;
            snap.has_real_filename = true;
            snap.commit_visible = true;
            if self.inner.behavior.commit_never_ready {
                snap.progress_active = true;
                snap.progress_percent = Some(50);
            } else if pending.busy_polls_left > 0 {
                pending.busy_polls_left -= 1;
                snap.progress_active = true;
                snap.progress_percent = Some(40);
            } else {
                snap.commit_enabled = true;
            }
        }

        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_derivation_decodes_and_falls_back() {
        assert_eq!(
            derive_filename("https://cdn.example.com/plans/floor%20plan.pdf"),
            "floor plan.pdf"
        );
        assert_eq!(derive_filename("https://x/a.pdf?x=1"), "a.pdf");
        assert_eq!(derive_filename("not a url"), "not a url");
    }

    #[test]
    fn quoted_label_extraction() {
        assert_eq!(quoted("item 'a.pdf'"), Some("a.pdf"));
        assert_eq!(quoted("tour '3D Tour'"), Some("3D Tour"));
        assert_eq!(quoted("no quotes"), None);
    }
}
