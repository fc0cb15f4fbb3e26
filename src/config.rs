use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

/// CSS markers and ids the dashboard templates put on the page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageMarkers {
    pub diff: DiffMarkers,
    pub output: OutputMarkers,
    pub filter: FilterMarkers,
    pub status: StatusMarkers,
    pub theme: ThemeMarkers,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffMarkers {
    pub container: String,
    pub before_header: String,
    pub before_content: String,
    pub after_header: String,
    pub after_content: String,
}

impl Default for DiffMarkers {
    fn default() -> Self {
        Self {
            container: ".diff".to_string(),
            before_header: ".diff-before-header".to_string(),
            before_content: ".diff-before-content".to_string(),
            after_header: ".diff-after-header".to_string(),
            after_content: ".diff-after-content".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputMarkers {
    pub card_body: String,
    pub collapsed_class: String,
    pub ansi_output: String,
}

impl Default for OutputMarkers {
    fn default() -> Self {
        Self {
            card_body: ".card .card-body".to_string(),
            collapsed_class: "card-body-collapse".to_string(),
            ansi_output: ".ansi-output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterMarkers {
    /// Id of the text input holding the query.
    pub input_id: String,
    pub container: String,
    pub element: String,
    pub field: String,
    pub hidden_class: String,
}

impl Default for FilterMarkers {
    fn default() -> Self {
        Self {
            input_id: "filter".to_string(),
            container: ".filter-container".to_string(),
            element: ".filter-element".to_string(),
            field: ".filter-field".to_string(),
            hidden_class: "d-none".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusMarkers {
    pub element_id: String,
    pub url_attribute: String,
}

impl Default for StatusMarkers {
    fn default() -> Self {
        Self {
            element_id: "running-status".to_string(),
            url_attribute: "data-status-url".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeMarkers {
    pub navbar_id: String,
    pub switch_id: String,
}

impl Default for ThemeMarkers {
    fn default() -> Self {
        Self {
            navbar_id: "navbar".to_string(),
            switch_id: "dark-mode".to_string(),
        }
    }
}

impl PageMarkers {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse markers {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_marker_file_keeps_defaults() {
        let markers: PageMarkers =
            serde_json::from_str(r#"{"filter": {"hidden_class": "hidden"}}"#).unwrap();
        assert_eq!(markers.filter.hidden_class, "hidden");
        assert_eq!(markers.filter.field, ".filter-field");
        assert_eq!(markers.diff.container, ".diff");
        assert_eq!(markers.theme.switch_id, "dark-mode");
    }
}
