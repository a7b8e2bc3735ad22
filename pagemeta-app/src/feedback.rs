//! Script Filter JSON rendered on stdout for the launcher.
//!
//! Every invocation prints exactly one [`Feedback`]; failures are items too,
//! never a non-zero exit.

use pagemeta_common::MetadataRecord;
use pagemeta_web::title::{clean_break, pure_title};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub subtitle: String,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quicklookurl: Option<String>,
    /// Handed to downstream actions as workflow variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mods: Option<Mods>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mods {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<Modifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub subtitle: String,
}

impl Item {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            ..Self::default()
        }
    }
}

impl Feedback {
    pub fn single(item: Item) -> Self {
        Self { items: vec![item] }
    }

    pub fn help() -> Self {
        Self {
            items: vec![
                Item::new("url help", "Show this help"),
                Item::new("url {url}", "Share the page at {url}"),
            ],
        }
    }

    pub fn bad_format() -> Self {
        Self::single(Item::new("Invalid format", "Please enter a web address"))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::single(Item::new("error", message))
    }

    /// Render a looked-up record. `query` is what the user typed and is
    /// passed through untouched as the `url` variable and quicklook target.
    ///
    /// The title loses its trailing site segment and both text fields get
    /// their whitespace runs collapsed; the record itself is not modified.
    pub fn page(query: &str, record: &MetadataRecord) -> Self {
        let title = clean_break(&pure_title(&record.title));
        let description = clean_break(&record.description);

        let variables = BTreeMap::from([
            ("url".to_string(), query.to_string()),
            ("title".to_string(), title.clone()),
            ("description".to_string(), description.clone()),
            ("image".to_string(), record.image.clone()),
            ("siteName".to_string(), record.site_name.clone()),
        ]);

        Self::single(Item {
            title: format!("{title} [{}]", record.site_name),
            subtitle: description,
            valid: true,
            quicklookurl: Some(query.to_string()),
            variables,
            mods: Some(Mods {
                ctrl: Some(Modifier {
                    subtitle: "Copy as Markdown".into(),
                }),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> MetadataRecord {
        MetadataRecord {
            title: "Shipping Rust - The Blog".into(),
            description: "Notes\n  from   the\r\nrelease".into(),
            image: "https://blog.example/cover.png".into(),
            site_name: "The Blog".into(),
        }
    }

    #[test]
    fn page_item_cleans_title_and_description() {
        let fb = Feedback::page("blog.example/shipping", &record());
        assert_eq!(fb.items.len(), 1);
        let item = &fb.items[0];
        assert_eq!(item.title, "ShippingRust [The Blog]");
        assert_eq!(item.subtitle, "Notes from the release");
        assert!(item.valid);
        assert_eq!(item.quicklookurl.as_deref(), Some("blog.example/shipping"));
        assert_eq!(item.variables["url"], "blog.example/shipping");
        assert_eq!(item.variables["title"], "ShippingRust");
        assert_eq!(item.variables["description"], "Notes from the release");
        assert_eq!(item.variables["image"], "https://blog.example/cover.png");
        assert_eq!(item.variables["siteName"], "The Blog");
    }

    #[test]
    fn page_item_serializes_as_script_filter_json() {
        let value = serde_json::to_value(Feedback::page("example.com", &MetadataRecord::default()))
            .unwrap();
        assert_eq!(
            value,
            json!({
                "items": [{
                    "title": " []",
                    "subtitle": "",
                    "valid": true,
                    "quicklookurl": "example.com",
                    "variables": {
                        "description": "",
                        "image": "",
                        "siteName": "",
                        "title": "",
                        "url": "example.com"
                    },
                    "mods": { "ctrl": { "subtitle": "Copy as Markdown" } }
                }]
            })
        );
    }

    #[test]
    fn help_lists_two_entries_without_optional_members() {
        let value = serde_json::to_value(Feedback::help()).unwrap();
        assert_eq!(
            value,
            json!({
                "items": [
                    { "title": "url help", "subtitle": "Show this help", "valid": false },
                    { "title": "url {url}", "subtitle": "Share the page at {url}", "valid": false }
                ]
            })
        );
    }

    #[test]
    fn failures_are_single_items() {
        let bad = Feedback::bad_format();
        assert_eq!(bad.items, vec![Item::new("Invalid format", "Please enter a web address")]);

        let err = Feedback::error("connection refused");
        assert_eq!(err.items[0].title, "error");
        assert_eq!(err.items[0].subtitle, "connection refused");
        assert!(!err.items[0].valid);
    }
}
