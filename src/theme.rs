use crate::config::ThemeMarkers;
use crate::page::Page;
use crate::settings::{COLOR_SCHEME_KEY, SettingsStore};

const DARK_CLASSES: [&str; 2] = ["navbar-dark", "bg-dark"];
const LIGHT_CLASSES: [&str; 2] = ["navbar-light", "bg-light"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    Light,
    Dark,
}

impl ColorScheme {
    /// Anything other than `"dark"` falls back to light.
    pub fn from_preference(value: Option<&str>) -> Self {
        match value {
            Some("dark") => ColorScheme::Dark,
            None | Some("light") => ColorScheme::Light,
            Some(other) => {
                tracing::warn!(value = other, "unknown color scheme preference; using light");
                ColorScheme::Light
            }
        }
    }

    pub fn from_checked(checked: bool) -> Self {
        if checked {
            ColorScheme::Dark
        } else {
            ColorScheme::Light
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
        }
    }

    fn classes(self) -> ([&'static str; 2], [&'static str; 2]) {
        match self {
            ColorScheme::Dark => (DARK_CLASSES, LIGHT_CLASSES),
            ColorScheme::Light => (LIGHT_CLASSES, DARK_CLASSES),
        }
    }
}

/// The navbar class list after applying `scheme`; other classes keep their order.
pub fn navbar_classes(current: &[String], scheme: ColorScheme) -> Vec<String> {
    let (add, remove) = scheme.classes();
    let mut out: Vec<String> = current
        .iter()
        .filter(|c| !remove.contains(&c.as_str()))
        .cloned()
        .collect();
    for class in add {
        if !out.iter().any(|c| c == class) {
            out.push(class.to_string());
        }
    }
    out
}

pub fn apply_theme<P: Page>(page: &P, markers: &ThemeMarkers, scheme: ColorScheme) {
    let Some(navbar) = page.element_by_id(&markers.navbar_id) else {
        tracing::warn!(id = %markers.navbar_id, "navbar not found; theme not applied");
        return;
    };
    let current = page.classes(&navbar);
    let next = navbar_classes(&current, scheme);
    if next != current {
        page.set_classes(&navbar, &next);
    }
}

/// Keeps the dark-mode switch, the navbar and the stored preference in step.
pub struct ThemeToggle<'a, S: SettingsStore + ?Sized> {
    settings: &'a mut S,
    markers: &'a ThemeMarkers,
}

impl<'a, S: SettingsStore + ?Sized> ThemeToggle<'a, S> {
    pub fn new(settings: &'a mut S, markers: &'a ThemeMarkers) -> Self {
        Self { settings, markers }
    }

    pub fn init<P: Page>(&self, page: &P) -> ColorScheme {
        let scheme =
            ColorScheme::from_preference(self.settings.get(COLOR_SCHEME_KEY).as_deref());
        self.set_switch(page, scheme);
        apply_theme(page, self.markers, scheme);
        tracing::debug!(scheme = scheme.as_str(), "theme initialized");
        scheme
    }

    /// Handles the switch changing to `checked`.
    pub fn on_change<P: Page>(&mut self, page: &P, checked: bool) -> anyhow::Result<ColorScheme> {
        let scheme = ColorScheme::from_checked(checked);
        self.settings.set(COLOR_SCHEME_KEY, scheme.as_str(), true)?;
        self.set_switch(page, scheme);
        apply_theme(page, self.markers, scheme);
        tracing::info!(scheme = scheme.as_str(), "color scheme changed");
        Ok(scheme)
    }

    fn set_switch<P: Page>(&self, page: &P, scheme: ColorScheme) {
        let Some(switch) = page.element_by_id(&self.markers.switch_id) else {
            tracing::warn!(id = %self.markers.switch_id, "dark mode switch not found");
            return;
        };
        let checked = (scheme == ColorScheme::Dark).then_some("");
        page.set_attr(&switch, "checked", checked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;
    use crate::settings::MemorySettings;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn class_sets_are_exclusive_and_idempotent() {
        let start = strings(&["navbar", "navbar-light", "bg-light", "fixed-top"]);
        let dark = navbar_classes(&start, ColorScheme::Dark);
        assert_eq!(dark, strings(&["navbar", "fixed-top", "navbar-dark", "bg-dark"]));
        assert_eq!(navbar_classes(&dark, ColorScheme::Dark), dark);

        let light = navbar_classes(&dark, ColorScheme::Light);
        assert_eq!(light, strings(&["navbar", "fixed-top", "navbar-light", "bg-light"]));

        let mixed = strings(&["navbar-dark", "bg-light"]);
        assert_eq!(
            navbar_classes(&mixed, ColorScheme::Light),
            strings(&["bg-light", "navbar-light"])
        );
    }

    #[test]
    fn preference_defaults_to_light() {
        assert_eq!(ColorScheme::from_preference(None), ColorScheme::Light);
        assert_eq!(ColorScheme::from_preference(Some("DARK!")), ColorScheme::Light);
        assert_eq!(ColorScheme::from_preference(Some("dark")), ColorScheme::Dark);
    }

    const PAGE: &str = r#"<nav id="navbar" class="navbar navbar-light bg-light"></nav>
<input type="checkbox" id="dark-mode">"#;

    #[test]
    fn init_reflects_stored_preference() {
        let page = HtmlPage::parse(PAGE);
        let markers = ThemeMarkers::default();
        let mut settings = MemorySettings::with(COLOR_SCHEME_KEY, "dark");

        let scheme = ThemeToggle::new(&mut settings, &markers).init(&page);
        assert_eq!(scheme, ColorScheme::Dark);

        let nav = page.element_by_id("navbar").unwrap();
        let switch = page.element_by_id("dark-mode").unwrap();
        assert_eq!(page.classes(&nav), strings(&["navbar", "navbar-dark", "bg-dark"]));
        assert!(page.attr(&switch, "checked").is_some());
    }

    #[test]
    fn checking_the_switch_persists_dark() {
        let page = HtmlPage::parse(PAGE);
        let markers = ThemeMarkers::default();
        let mut settings = MemorySettings::default();

        let mut toggle = ThemeToggle::new(&mut settings, &markers);
        assert_eq!(toggle.init(&page), ColorScheme::Light);
        assert_eq!(toggle.on_change(&page, true).unwrap(), ColorScheme::Dark);

        let nav = page.element_by_id("navbar").unwrap();
        assert!(page.has_class(&nav, "navbar-dark"));
        assert!(page.has_class(&nav, "bg-dark"));
        assert!(!page.has_class(&nav, "navbar-light"));
        assert!(!page.has_class(&nav, "bg-light"));
        assert_eq!(settings.persisted(COLOR_SCHEME_KEY), Some("dark"));
    }

    #[test]
    fn missing_elements_are_tolerated() {
        let page = HtmlPage::parse("<p>no navbar here</p>");
        let markers = ThemeMarkers::default();
        let mut settings = MemorySettings::default();
        let mut toggle = ThemeToggle::new(&mut settings, &markers);
        assert_eq!(toggle.on_change(&page, false).unwrap(), ColorScheme::Light);
    }
}
