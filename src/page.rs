use anyhow::Context as _;
use kuchiki::NodeRef;
use kuchiki::iter::NodeIterator as _;
use kuchiki::traits::TendrilSink as _;

/// The slice of a DOM the page behaviours need.
///
/// Methods take `&self`: adapters are expected to mutate through shared handles,
/// the way a browser DOM does.
pub trait Page {
    /// Equality means the same node.
    type Element: Clone + PartialEq;

    fn select_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Descendants of `scope` matching `selector`; `scope` itself never matches.
    fn select_within(&self, scope: &Self::Element, selector: &str) -> Vec<Self::Element>;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    fn text(&self, element: &Self::Element) -> String;

    fn attr(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// `None` removes the attribute.
    fn set_attr(&self, element: &Self::Element, name: &str, value: Option<&str>);

    fn classes(&self, element: &Self::Element) -> Vec<String>;

    fn set_classes(&self, element: &Self::Element, classes: &[String]);

    fn set_inner_html(&self, element: &Self::Element, html: &str) -> anyhow::Result<()>;

    fn has_class(&self, element: &Self::Element, class: &str) -> bool {
        self.classes(element).iter().any(|c| c == class)
    }

    fn add_classes(&self, element: &Self::Element, add: &[&str]) {
        let mut classes = self.classes(element);
        let before = classes.len();
        for class in add {
            if !classes.iter().any(|c| c == class) {
                classes.push((*class).to_string());
            }
        }
        if classes.len() != before {
            self.set_classes(element, &classes);
        }
    }

    fn remove_classes(&self, element: &Self::Element, remove: &[&str]) {
        let mut classes = self.classes(element);
        let before = classes.len();
        classes.retain(|c| !remove.contains(&c.as_str()));
        if classes.len() != before {
            self.set_classes(element, &classes);
        }
    }
}

/// A parsed HTML document.
pub struct HtmlPage {
    document: NodeRef,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: kuchiki::parse_html().one(html),
        }
    }

    pub fn to_html(&self) -> anyhow::Result<String> {
        let mut out = Vec::new();
        self.document
            .serialize(&mut out)
            .context("serialize page")?;
        String::from_utf8(out).context("page html not utf-8")
    }

    fn select_from(root: &NodeRef, selector: &str, include_root: bool) -> Vec<NodeRef> {
        match root.select(selector) {
            Ok(nodes) => nodes
                .map(|n| n.as_node().clone())
                .filter(|n| include_root || n != root)
                .collect(),
            Err(()) => {
                tracing::warn!(selector, "invalid css selector");
                Vec::new()
            }
        }
    }
}

impl Page for HtmlPage {
    type Element = NodeRef;

    fn select_all(&self, selector: &str) -> Vec<NodeRef> {
        Self::select_from(&self.document, selector, true)
    }

    fn select_within(&self, scope: &NodeRef, selector: &str) -> Vec<NodeRef> {
        Self::select_from(scope, selector, false)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.document
            .descendants()
            .elements()
            .find(|el| el.attributes.borrow().get("id") == Some(id))
            .map(|el| el.as_node().clone())
    }

    fn text(&self, element: &NodeRef) -> String {
        element.text_contents()
    }

    fn attr(&self, element: &NodeRef, name: &str) -> Option<String> {
        let el = element.as_element()?;
        el.attributes.borrow().get(name).map(|v| v.to_string())
    }

    fn set_attr(&self, element: &NodeRef, name: &str, value: Option<&str>) {
        let Some(el) = element.as_element() else {
            return;
        };
        let mut attrs = el.attributes.borrow_mut();
        match value {
            Some(v) => {
                attrs.insert(name, v.to_string());
            }
            None => {
                attrs.remove(name);
            }
        }
    }

    fn classes(&self, element: &NodeRef) -> Vec<String> {
        self.attr(element, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn set_classes(&self, element: &NodeRef, classes: &[String]) {
        self.set_attr(element, "class", Some(&classes.join(" ")));
    }

    fn set_inner_html(&self, element: &NodeRef, html: &str) -> anyhow::Result<()> {
        // An explicit body keeps leading whitespace from being dropped before <body>.
        let fragment = kuchiki::parse_html().one(format!("<body>{html}"));
        let body = fragment
            .select_first("body")
            .map_err(|()| anyhow::anyhow!("fragment has no body"))?;
        let new_children: Vec<NodeRef> = body.as_node().children().collect();

        let old_children: Vec<NodeRef> = element.children().collect();
        for child in old_children {
            child.detach();
        }
        for child in new_children {
            element.append(child);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_updates_are_idempotent() {
        let page = HtmlPage::parse(r#"<nav id="navbar" class="navbar bg-light"></nav>"#);
        let nav = page.element_by_id("navbar").unwrap();

        page.add_classes(&nav, &["bg-light", "navbar-light"]);
        page.add_classes(&nav, &["navbar-light"]);
        assert_eq!(page.classes(&nav), vec!["navbar", "bg-light", "navbar-light"]);

        page.remove_classes(&nav, &["bg-light", "missing"]);
        page.remove_classes(&nav, &["bg-light"]);
        assert_eq!(page.classes(&nav), vec!["navbar", "navbar-light"]);
    }

    #[test]
    fn select_within_excludes_scope() {
        let page = HtmlPage::parse(
            r#"<div class="box" id="outer"><div class="box"><span>inner</span></div></div>"#,
        );
        let outer = page.element_by_id("outer").unwrap();
        assert_eq!(page.select_all(".box").len(), 2);
        assert_eq!(page.select_within(&outer, ".box").len(), 1);
    }

    #[test]
    fn invalid_selector_selects_nothing() {
        let page = HtmlPage::parse("<p>x</p>");
        assert!(page.select_all("p[").is_empty());
    }

    #[test]
    fn inner_html_replaces_children() {
        let page = HtmlPage::parse(r#"<div id="c"><p>old</p>text</div>"#);
        let c = page.element_by_id("c").unwrap();
        page.set_inner_html(&c, "<table><tr><td>a &amp; b</td></tr></table>")
            .unwrap();

        assert_eq!(page.text(&c), "a & b");
        let html = page.to_html().unwrap();
        assert!(!html.contains("old"));
        assert!(html.contains("<td>a &amp; b</td>"));
    }
}
