//! Locator catalog for the target listing editor.
//!
//! The target UI exposes no stable automation hooks, so every logical
//! element carries several candidate selectors tried in priority order.
//! The defaults below match the platform's current markup; deployments can
//! override the whole map through configuration if the markup shifts.

use courier_ui::{Locator, SignalMap};
use serde::{Deserialize, Serialize};

/// Locators for one import section (floor plans or files).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionMap {
    /// Opens the "add via link" affordance for this section
    pub add_link_button: Locator,
    /// URL input inside the add dialog
    pub url_input: Locator,
    /// Optional "derive titles from filename" toggle
    pub titles_toggle: Option<Locator>,
    /// Triggers the import
    pub import_button: Locator,
    /// The transient dialog/modal wrapping the staged import
    pub modal: Locator,
    /// Committed rows in this section
    pub rows: Locator,
}

/// Locators for the 3D tour widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourMap {
    /// Opens the add-tour form
    pub add_button: Locator,
    /// Tour URL input
    pub url_input: Locator,
    /// Tour title input
    pub title_input: Locator,
    /// Display type input/select
    pub display_type_input: Locator,
    /// Commits the tour
    pub commit_button: Locator,
    /// Committed tour rows
    pub rows: Locator,
}

/// Full locator catalog for the listing editor page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMap {
    /// Observable loading/readiness signals
    pub signals: SignalMap,
    /// Floor plan section
    pub floorplans: SectionMap,
    /// Auxiliary file section
    pub files: SectionMap,
    /// 3D tour widget
    pub tour: TourMap,
    /// Save action
    pub save_button: Locator,
    /// Deliver/publish action
    pub deliver_button: Locator,
    /// Success banner after save/deliver
    pub success_banner: Locator,
}

impl PageMap {
    /// Locator for an attached item by its (decoded) filename, across all
    /// attachment sections.
    #[must_use]
    pub fn item_named(&self, filename: &str) -> Locator {
        let escaped = escape_css_string(filename);
        Locator::any_of(
            format!("item '{filename}'"),
            [
                format!("[data-filename=\"{escaped}\"]"),
                format!(".attachment-row[title=\"{escaped}\"]"),
                format!("[aria-label=\"{escaped}\"]"),
            ],
        )
    }

    /// Locator for a committed tour row carrying the given title.
    #[must_use]
    pub fn tour_titled(&self, title: &str) -> Locator {
        let escaped = escape_css_string(title);
        Locator::any_of(
            format!("tour '{title}'"),
            [
                format!(".tour-row[data-title=\"{escaped}\"]"),
                format!(".tour-row[title=\"{escaped}\"]"),
            ],
        )
    }
}

impl Default for PageMap {
    fn default() -> Self {
        Self {
            signals: SignalMap {
                progress_bar: Locator::any_of(
                    "upload progress",
                    ["[role=progressbar]", ".upload-progress"],
                ),
                progress_percent_attr: "aria-valuenow".to_string(),
                skeleton: Locator::css("skeleton loader", ".skeleton, [data-skeleton]"),
                modal_spinner: Locator::any_of(
                    "modal spinner",
                    [".modal .spinner", ".dialog-busy"],
                ),
                staged_item: Locator::any_of(
                    "staged item",
                    [".staged-row", "[data-state=staged]"],
                ),
                staged_item_name: Locator::any_of(
                    "staged item name",
                    [".staged-row .filename", "[data-state=staged] .name"],
                ),
                commit_button: Locator::any_of(
                    "commit control",
                    ["[data-action=commit]", ".modal button[type=submit]"],
                ),
                error_banner: Locator::any_of(
                    "error banner",
                    ["[role=alert].error", ".banner--error", ".toast-error"],
                ),
                placeholder_markers: vec![
                    "uploading".to_string(),
                    "processing".to_string(),
                    "pending".to_string(),
                ],
            },
            floorplans: SectionMap {
                add_link_button: Locator::any_of(
                    "floorplans add-via-link",
                    [
                        "[data-section=floorplans] [data-action=add-link]",
                        "#floorplans .add-from-url",
                    ],
                ),
                url_input: Locator::any_of(
                    "floorplans url input",
                    [
                        "[data-section=floorplans] input[name=url]",
                        ".modal input[type=url]",
                    ],
                ),
                titles_toggle: Some(Locator::any_of(
                    "floorplans titles toggle",
                    [
                        "[data-section=floorplans] input[name=derive-titles]",
                        ".modal input[type=checkbox]",
                    ],
                )),
                import_button: Locator::any_of(
                    "floorplans import",
                    [
                        "[data-section=floorplans] [data-action=import]",
                        ".modal .import",
                    ],
                ),
                modal: Locator::css("floorplans modal", "[data-section=floorplans] .modal"),
                rows: Locator::any_of(
                    "floorplan rows",
                    ["[data-section=floorplans] .attachment-row", "#floorplans li"],
                ),
            },
            files: SectionMap {
                add_link_button: Locator::any_of(
                    "files add-via-link",
                    [
                        "[data-section=files] [data-action=add-link]",
                        "#documents .add-from-url",
                    ],
                ),
                url_input: Locator::any_of(
                    "files url input",
                    [
                        "[data-section=files] input[name=url]",
                        ".modal input[type=url]",
                    ],
                ),
                titles_toggle: Some(Locator::any_of(
                    "files titles toggle",
                    [
                        "[data-section=files] input[name=derive-titles]",
                        ".modal input[type=checkbox]",
                    ],
                )),
                import_button: Locator::any_of(
                    "files import",
                    ["[data-section=files] [data-action=import]", ".modal .import"],
                ),
                modal: Locator::css("files modal", "[data-section=files] .modal"),
                rows: Locator::any_of(
                    "file rows",
                    ["[data-section=files] .attachment-row", "#documents li"],
                ),
            },
            tour: TourMap {
                add_button: Locator::any_of(
                    "tour add",
                    ["[data-section=tour] [data-action=add]", "#tours .add-tour"],
                ),
                url_input: Locator::css("tour url input", "[data-section=tour] input[name=url]"),
                title_input: Locator::css(
                    "tour title input",
                    "[data-section=tour] input[name=title]",
                ),
                display_type_input: Locator::css(
                    "tour display type",
                    "[data-section=tour] select[name=display-type]",
                ),
                commit_button: Locator::any_of(
                    "tour commit",
                    ["[data-section=tour] [data-action=commit]", "#tours .save"],
                ),
                rows: Locator::any_of("tour rows", ["[data-section=tour] .tour-row", "#tours li"]),
            },
            save_button: Locator::any_of(
                "save",
                ["[data-action=save]", "button.save-listing", "#save"],
            ),
            deliver_button: Locator::any_of(
                "deliver",
                ["[data-action=deliver]", "button.deliver-listing", "#deliver"],
            ),
            success_banner: Locator::any_of(
                "success banner",
                ["[role=status].success", ".banner--success", ".toast-success"],
            ),
        }
    }
}

/// Escape a string for embedding inside a double-quoted CSS attribute
/// selector.
fn escape_css_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_locator_embeds_escaped_filename() {
        let page = PageMap::default();
        let locator = page.item_named("plan \"A\".pdf");
        assert!(locator.candidates[0].contains("plan \\\"A\\\".pdf"));
    }

    #[test]
    fn default_map_has_fallback_candidates() {
        let page = PageMap::default();
        assert!(page.save_button.candidates.len() > 1);
        assert!(page.signals.error_banner.candidates.len() > 1);
    }
}
