//! Structured views of the `semantics.json` and `language/<code>.json`
//! documents shipped inside a library.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File holding a library's editor field definitions.
pub const SEMANTICS_FILE: &str = "semantics.json";
/// Directory holding translations of the semantics document.
pub const LANGUAGE_DIR: &str = "language";
/// Language the semantics document itself is written in. Every library
/// implicitly provides it.
pub const DEFAULT_LANGUAGE: &str = "en";
/// Script run by hosts to migrate content between library versions.
pub const UPGRADES_SCRIPT: &str = "upgrades.js";

/// A library's semantics: the ordered list of top-level fields.
pub type Semantics = Vec<SemanticField>;

/// One field of a semantics document. Nested `fields` (groups) and `field`
/// (lists) are decoded recursively; anything else is kept in `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SemanticField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SemanticField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Box<SemanticField>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Translation document for a library's semantics.
///
/// Entries mirror the semantics tree but only carry the translated strings,
/// so they stay loosely typed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LanguageDocument {
    pub semantics: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Path of the translation file for `code`, relative to the library root.
pub fn language_file(code: &str) -> String {
    format!("{LANGUAGE_DIR}/{code}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_nested_semantics() {
        let semantics: Semantics = serde_json::from_value(json!([
            {
                "name": "question",
                "type": "text",
                "label": "Question",
                "widget": "html"
            },
            {
                "name": "answers",
                "type": "list",
                "field": {
                    "name": "answer",
                    "type": "group",
                    "fields": [
                        { "name": "text", "type": "text" },
                        { "name": "correct", "type": "boolean", "optional": true }
                    ]
                }
            }
        ]))
        .unwrap();

        assert_eq!(semantics.len(), 2);
        assert_eq!(semantics[0].extra["widget"], json!("html"));
        let answer = semantics[1].field.as_ref().unwrap();
        assert_eq!(answer.fields[1].name, "correct");
        assert!(answer.fields[1].optional);
    }

    #[test]
    fn test_field_without_type_is_rejected() {
        let result: Result<Semantics, _> = serde_json::from_value(json!([{ "name": "x" }]));
        assert!(result.is_err());
    }

    #[test]
    fn test_language_document_requires_semantics() {
        let ok: Result<LanguageDocument, _> =
            serde_json::from_value(json!({ "semantics": [{ "label": "Frage" }] }));
        assert!(ok.is_ok());

        let missing: Result<LanguageDocument, _> = serde_json::from_value(json!({}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_language_file() {
        assert_eq!(language_file("de"), "language/de.json");
    }
}
