//! Site-wide copy: metadata, hero banner and the free-form page sections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Literal marker editors type into the hero title to force a line break.
pub const LINE_BREAK_MARKER: &str = "\\n";

/// Contents of `site.json`.
///
/// `site` and `hero` are typed. Every other top-level block (story,
/// newsletter, footer, ...) is kept verbatim in `sections` so that a save
/// writes back exactly the keys that were loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteContent {
    pub site: SiteMeta,
    pub hero: Hero,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteMeta {
    pub title: String,
    pub favicon_path: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    pub background_image: String,
    pub title: String,
    pub subtitle: String,
    pub primary_cta: CallToAction,
    pub secondary_cta: CallToAction,
}

impl Hero {
    /// Title split on real newlines and on the `\n` marker.
    pub fn title_lines(&self) -> Vec<&str> {
        self.title
            .split(LINE_BREAK_MARKER)
            .flat_map(|part| part.split('\n'))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallToAction {
    pub label: String,
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero(title: &str) -> Hero {
        Hero {
            background_image: String::new(),
            title: title.to_string(),
            subtitle: String::new(),
            primary_cta: CallToAction {
                label: "Shop".to_string(),
                href: "#/shop".to_string(),
            },
            secondary_cta: CallToAction {
                label: "Subscribe".to_string(),
                href: "#/subscription".to_string(),
            },
        }
    }

    #[test]
    fn test_title_lines_marker() {
        let hero = hero("Exceptional Coffee,\\nRoasted with Intention.");
        assert_eq!(
            hero.title_lines(),
            vec!["Exceptional Coffee,", "Roasted with Intention."]
        );
    }

    #[test]
    fn test_title_lines_real_newline() {
        let hero = hero("One\nTwo");
        assert_eq!(hero.title_lines(), vec!["One", "Two"]);
    }

    #[test]
    fn test_title_lines_single() {
        assert_eq!(hero("Coffee").title_lines(), vec!["Coffee"]);
    }

    #[test]
    fn test_sections_kept_verbatim() {
        let json = serde_json::json!({
            "site": { "title": "t", "faviconPath": "/f.svg", "description": "d" },
            "hero": {
                "backgroundImage": "bg", "title": "t", "subtitle": "s",
                "primaryCta": { "label": "a", "href": "#a" },
                "secondaryCta": { "label": "b", "href": "#b" }
            },
            "footer": { "legal": "(c)", "address": ["1 Lane"] },
            "newsletter": { "heading": "Join" }
        });

        let site: SiteContent = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(site.sections.len(), 2);
        assert_eq!(site.sections["footer"]["address"][0], "1 Lane");

        assert_eq!(serde_json::to_value(&site).unwrap(), json);
    }
}
