//! Declarative UI protocol.
//!
//! The executor describes result widgets as [`UiSpec`]s; a rendering surface
//! draws them and reports interactions back as [`CallbackEvent`]s.
//!
//! Wire shape (one object per widget, tagged by `type`):
//!
//!   { "id": "radio_align_1f3a…", "type": "radio", "label": "Select match", "options": [...], "default_index": 0 }
//!   { "id": "button_…", "type": "button", "label": "Confirm", "purpose": "confirm_alignment",
//!     "extra": { "linked_radio_key": "radio_align_1f3a…" } }
//!
//! Ids: when a producer omits the id, it is derived from the spec content as
//! `<type>_<first 16 hex chars of sha256(canonical json)>`. Canonical json is
//! compact JSON with object keys sorted at every level, so an unchanged spec
//! keeps its id across render cycles.
//!
//! Radio options are either plain scalars or concept records. Surfaces show
//! the human label but publish the underlying value (the concept's `uri`, or
//! the scalar itself) as the selection for the radio's id.

use crate::error::{Error, Result};
use crate::records::{AlignmentSuggestion, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Well-known `purpose` values understood by the executor.
pub mod purpose {
    pub const CONFIRM_ALIGNMENT: &str = "confirm_alignment";
    pub const ADD_TRIPLE: &str = "add_triple";
}

/// Key in a button's `extra` map naming the radio whose selection it confirms.
pub const LINKED_RADIO_KEY: &str = "linked_radio_key";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiElement {
    Markdown {
        content: String,
        #[serde(default)]
        allow_raw_markup: bool,
    },
    Dataframe {
        rows: Vec<Row>,
    },
    Table {
        rows: Vec<Row>,
    },
    Button {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        extra: BTreeMap<String, Value>,
    },
    Radio {
        label: String,
        options: Vec<RadioOption>,
        #[serde(default)]
        default_index: usize,
    },
    Form {
        label: String,
        fields: Vec<FormField>,
        #[serde(default = "default_submit_label")]
        submit_label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
    },
    Info {
        text: String,
    },
    Warning {
        text: String,
    },
    Error {
        text: String,
    },
}

fn default_submit_label() -> String {
    "Submit".to_string()
}

impl UiElement {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Markdown { .. } => "markdown",
            Self::Dataframe { .. } => "dataframe",
            Self::Table { .. } => "table",
            Self::Button { .. } => "button",
            Self::Radio { .. } => "radio",
            Self::Form { .. } => "form",
            Self::Info { .. } => "info",
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
        }
    }
}

/// A radio option: a concept record or a plain scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RadioOption {
    Concept(AlignmentSuggestion),
    Scalar(Value),
}

impl RadioOption {
    /// What the user sees.
    pub fn display_label(&self) -> String {
        match self {
            Self::Concept(c) if !c.label.is_empty() => c.label.clone(),
            Self::Concept(c) => c.uri.clone(),
            Self::Scalar(Value::String(s)) => s.clone(),
            Self::Scalar(v) => v.to_string(),
        }
    }

    /// What gets published as the selection.
    pub fn value(&self) -> Value {
        match self {
            Self::Concept(c) => Value::String(c.uri.clone()),
            Self::Scalar(v) => v.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub default: String,
}

impl FormField {
    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            default: String::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }
}

/// One renderable widget. Never mutated after creation; replace, don't edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UiSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    pub element: UiElement,
}

impl UiSpec {
    /// Spec with a content-derived id.
    pub fn new(element: UiElement) -> Self {
        let id = derive_id(&element);
        Self {
            id: Some(id),
            element,
        }
    }

    /// Spec with a producer-chosen id.
    pub fn with_id(id: impl Into<String>, element: UiElement) -> Self {
        Self {
            id: Some(id.into()),
            element,
        }
    }

    /// Parse a spec received over the wire. Missing ids are derived.
    pub fn from_value(value: Value) -> Result<Self> {
        let spec: UiSpec = serde_json::from_value(value)
            .map_err(|e| Error::InvalidUiSpec(e.to_string()))?;
        Ok(match spec.id {
            Some(ref id) if !id.is_empty() => spec,
            _ => Self::new(spec.element),
        })
    }

    pub fn id(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => derive_id(&self.element),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.element.kind()
    }

    // -- constructors -------------------------------------------------------

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::new(UiElement::Markdown {
            content: content.into(),
            allow_raw_markup: false,
        })
    }

    pub fn dataframe(rows: Vec<Row>) -> Self {
        Self::new(UiElement::Dataframe { rows })
    }

    pub fn table(rows: Vec<Row>) -> Self {
        Self::new(UiElement::Table { rows })
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(UiElement::Info { text: text.into() })
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(UiElement::Warning { text: text.into() })
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(UiElement::Error { text: text.into() })
    }

    // -- accessors ----------------------------------------------------------

    pub fn label(&self) -> Option<&str> {
        match &self.element {
            UiElement::Button { label, .. }
            | UiElement::Radio { label, .. }
            | UiElement::Form { label, .. } => Some(label),
            _ => None,
        }
    }

    pub fn purpose(&self) -> Option<&str> {
        match &self.element {
            UiElement::Button { purpose, .. } | UiElement::Form { purpose, .. } => {
                purpose.as_deref()
            }
            _ => None,
        }
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        match &self.element {
            UiElement::Button { extra, .. } => extra.get(key).and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn is_radio(&self) -> bool {
        matches!(self.element, UiElement::Radio { .. })
    }

    /// Underlying value of the option at `index`, for radios.
    pub fn option_value(&self, index: usize) -> Option<Value> {
        match &self.element {
            UiElement::Radio { options, .. } => options.get(index).map(RadioOption::value),
            _ => None,
        }
    }

    /// Value selected before the user touches the radio.
    pub fn default_value(&self) -> Option<Value> {
        match &self.element {
            UiElement::Radio { default_index, .. } => self
                .option_value(*default_index)
                .or_else(|| self.option_value(0)),
            _ => None,
        }
    }

    /// Whether `value` is the underlying value of one of this radio's options.
    pub fn offers_value(&self, value: &Value) -> bool {
        match &self.element {
            UiElement::Radio { options, .. } => options.iter().any(|o| &o.value() == value),
            _ => false,
        }
    }

    // -- interactions -------------------------------------------------------

    /// Callback for a click on this button.
    pub fn click(&self) -> Result<CallbackEvent> {
        match &self.element {
            UiElement::Button { .. } => Ok(CallbackEvent {
                element_id: self.id(),
                action: CallbackAction::ButtonClick,
                spec: self.clone(),
                data: Map::new(),
            }),
            other => Err(Error::InvalidCallback(format!(
                "cannot click a {} widget",
                other.kind()
            ))),
        }
    }

    /// Callback for submitting this form. Fields missing from `data` take their defaults.
    pub fn submit(&self, mut data: Map<String, Value>) -> Result<CallbackEvent> {
        match &self.element {
            UiElement::Form { fields, .. } => {
                if let Some(unknown) = data.keys().find(|k| !fields.iter().any(|f| &f.id == *k)) {
                    return Err(Error::InvalidCallback(format!("unknown form field '{}'", unknown)));
                }
                for field in fields {
                    data.entry(field.id.clone())
                        .or_insert_with(|| Value::String(field.default.clone()));
                }
                Ok(CallbackEvent {
                    element_id: self.id(),
                    action: CallbackAction::FormSubmit,
                    spec: self.clone(),
                    data,
                })
            }
            other => Err(Error::InvalidCallback(format!(
                "cannot submit a {} widget",
                other.kind()
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackAction {
    ButtonClick,
    FormSubmit,
}

/// Interaction reported by a surface for a button or form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub element_id: String,
    pub action: CallbackAction,
    pub spec: UiSpec,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Stable id for a spec's content.
pub fn derive_id(element: &UiElement) -> String {
    let value = serde_json::to_value(element).unwrap_or(Value::Null);
    format!("{}_{}", element.kind(), &digest_hex(&canonical_json(&value))[..16])
}

/// Short hex digest, also used for keys derived from free text.
pub fn digest_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let v = json!({"b": 1, "a": {"d": [1, {"z": 0, "y": 1}], "c": null}});
        assert_eq!(canonical_json(&v), r#"{"a":{"c":null,"d":[1,{"y":1,"z":0}]},"b":1}"#);
    }

    #[test]
    fn derived_id_is_stable_and_typed() {
        let a = UiSpec::info("hello");
        let b = UiSpec::info("hello");
        let c = UiSpec::info("other");
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert!(a.id().starts_with("info_"));
        assert_eq!(a.id().len(), "info_".len() + 16);
    }
}
