//! In-place editor registry
//!
//! Table cells are edited through short-lived editor widgets. The host toolkit
//! supplies one [`EditorConstructor`] per [`EditorKind`]; the edit controller
//! asks the [`EditorRegistry`] for a widget when a session starts and disposes
//! it when the session ends.
//!
//! Each kind decides which interaction events end the session and how the
//! editor's value maps back onto the model's value:
//!
//! | kind        | commits on                         | model value        |
//! |-------------|------------------------------------|--------------------|
//! | `text`      | Enter, focus loss                  | parsed like current|
//! | `combo`     | Enter, focus loss, selection       | as selected        |
//! | `checkbox`  | Enter, focus loss, selection       | bool               |
//! | `spinner`   | Enter, focus loss                  | int                |
//! | `date_time` | Enter, focus loss                  | as entered         |
//!
//! Escape cancels every kind.

use std::fmt;
use std::rc::Rc;

use glint_core::{EventKind, EventSource, Value, ValueKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::error::{Result, WidgetError};

/// Editor widget flavours
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorKind {
    #[default]
    Text,
    Combo,
    Checkbox,
    Spinner,
    DateTime,
}

impl EditorKind {
    pub const ALL: [EditorKind; 5] = [
        EditorKind::Text,
        EditorKind::Combo,
        EditorKind::Checkbox,
        EditorKind::Spinner,
        EditorKind::DateTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EditorKind::Text => "text",
            EditorKind::Combo => "combo",
            EditorKind::Checkbox => "checkbox",
            EditorKind::Spinner => "spinner",
            EditorKind::DateTime => "date_time",
        }
    }

    /// Whether a selection event on the editor commits
    pub fn commits_on_selection(self) -> bool {
        matches!(self, EditorKind::Combo | EditorKind::Checkbox)
    }

    /// Events the edit controller listens to on editors of this kind
    pub fn trigger_events(self) -> SmallVec<[EventKind; 3]> {
        let mut events: SmallVec<[EventKind; 3]> =
            smallvec![EventKind::KeyPressed, EventKind::FocusLost];
        if self.commits_on_selection() {
            events.push(EventKind::Selection);
        }
        events
    }

    /// Value the editor starts with
    pub fn to_editor_value(self, model_value: &Value) -> Value {
        match self {
            EditorKind::Text => Value::Str(model_value.to_display_string()),
            EditorKind::Spinner => Value::Int(model_value.to_int()),
            EditorKind::Checkbox => Value::Bool(model_value.is_truthy()),
            EditorKind::Combo | EditorKind::DateTime => model_value.clone(),
        }
    }

    /// Value written back to the model
    pub fn to_model_value(self, editor_value: &Value, current: &Value) -> Value {
        match self {
            EditorKind::Text => parse_like(editor_value, current),
            EditorKind::Spinner => Value::Int(editor_value.to_int()),
            EditorKind::Checkbox => Value::Bool(editor_value.is_truthy()),
            EditorKind::Combo | EditorKind::DateTime => editor_value.clone(),
        }
    }
}

impl fmt::Display for EditorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse typed text into the kind the model currently holds
///
/// Text that does not parse stays a string.
fn parse_like(editor_value: &Value, current: &Value) -> Value {
    let Some(text) = editor_value.as_str() else {
        return editor_value.clone();
    };
    let trimmed = text.trim();
    match current.kind() {
        ValueKind::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| editor_value.clone()),
        ValueKind::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| editor_value.clone()),
        ValueKind::Bool => match trimmed {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => editor_value.clone(),
        },
        _ => editor_value.clone(),
    }
}

/// The contract every in-place editor satisfies
pub trait EditableWidget: EventSource {
    fn value(&self) -> Value;

    fn set_value(&self, value: Value);

    fn set_focus(&self);

    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Shared editor handle
pub type EditorRef = Rc<dyn EditableWidget>;

/// What an editor is created for
#[derive(Clone, Debug, PartialEq)]
pub struct EditorArgs {
    pub kind: EditorKind,
    /// Initial editor value
    pub value: Value,
    /// Choices for combo editors
    pub items: Vec<Value>,
    pub row: usize,
    pub column: usize,
    pub property: String,
}

/// Creates editor widgets of one kind
pub trait EditorConstructor {
    fn create(&self, args: &EditorArgs) -> Result<EditorRef>;
}

impl<F> EditorConstructor for F
where
    F: Fn(&EditorArgs) -> Result<EditorRef>,
{
    fn create(&self, args: &EditorArgs) -> Result<EditorRef> {
        self(args)
    }
}

/// Maps editor kinds to constructors
#[derive(Clone, Default)]
pub struct EditorRegistry {
    constructors: FxHashMap<EditorKind, Rc<dyn EditorConstructor>>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `kind`
    pub fn register(&mut self, kind: EditorKind, constructor: Rc<dyn EditorConstructor>) {
        self.constructors.insert(kind, constructor);
    }

    /// Register one constructor for every kind
    pub fn register_all(&mut self, constructor: Rc<dyn EditorConstructor>) {
        for kind in EditorKind::ALL {
            self.register(kind, constructor.clone());
        }
    }

    pub fn with(mut self, kind: EditorKind, constructor: Rc<dyn EditorConstructor>) -> Self {
        self.register(kind, constructor);
        self
    }

    pub fn contains(&self, kind: EditorKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    pub fn create(&self, args: &EditorArgs) -> Result<EditorRef> {
        let constructor = self
            .constructors
            .get(&args.kind)
            .ok_or(WidgetError::UnknownEditor(args.kind))?;
        constructor.create(args)
    }
}

impl fmt::Debug for EditorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.constructors.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("EditorRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEditorFactory;

    fn args(kind: EditorKind) -> EditorArgs {
        EditorArgs {
            kind,
            value: Value::from("x"),
            items: Vec::new(),
            row: 0,
            column: 0,
            property: "name".into(),
        }
    }

    #[test]
    fn test_text_parses_like_current_value() {
        let text = EditorKind::Text;
        assert_eq!(text.to_model_value(&"42".into(), &Value::from(7)), Value::from(42));
        assert_eq!(text.to_model_value(&"4.5".into(), &Value::from(1.0)), Value::from(4.5));
        assert_eq!(text.to_model_value(&"abc".into(), &Value::from(7)), Value::from("abc"));
        assert_eq!(text.to_model_value(&"abc".into(), &Value::Nil), Value::from("abc"));
    }

    #[test]
    fn test_kind_conversions() {
        assert_eq!(EditorKind::Text.to_editor_value(&Value::from(30)), Value::from("30"));
        assert_eq!(EditorKind::Spinner.to_model_value(&"12".into(), &Value::Nil), Value::from(12));
        assert_eq!(
            EditorKind::Checkbox.to_model_value(&Value::Nil, &Value::from(true)),
            Value::from(false)
        );
        assert_eq!(
            EditorKind::Combo.to_model_value(&"Oslo".into(), &Value::from("Bern")),
            Value::from("Oslo")
        );
    }

    #[test]
    fn test_trigger_events() {
        assert_eq!(EditorKind::Text.trigger_events().len(), 2);
        assert!(EditorKind::Combo.trigger_events().contains(&EventKind::Selection));
        assert!(!EditorKind::Spinner.trigger_events().contains(&EventKind::Selection));
    }

    #[test]
    fn test_registry_lookup() {
        let factory = Rc::new(HeadlessEditorFactory::new());
        let registry = EditorRegistry::new().with(EditorKind::Text, factory.clone());

        assert!(registry.contains(EditorKind::Text));
        let editor = registry.create(&args(EditorKind::Text)).unwrap();
        assert_eq!(editor.value(), Value::from("x"));
        assert_eq!(factory.created().len(), 1);

        assert!(matches!(
            registry.create(&args(EditorKind::Combo)),
            Err(WidgetError::UnknownEditor(EditorKind::Combo))
        ));
    }

    #[test]
    fn test_closure_constructor() {
        let factory = Rc::new(HeadlessEditorFactory::new());
        let inner = factory.clone();
        let mut registry = EditorRegistry::new();
        registry.register(
            EditorKind::Spinner,
            Rc::new(move |args: &EditorArgs| {
                let mut args = args.clone();
                args.value = Value::from(99);
                inner.create(&args)
            }),
        );
        let editor = registry.create(&args(EditorKind::Spinner)).unwrap();
        assert_eq!(editor.value(), Value::from(99));
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: EditorKind,
        }
        let parsed: Wrapper = toml::from_str("kind = \"date_time\"").unwrap();
        assert_eq!(parsed.kind, EditorKind::DateTime);
        assert_eq!(EditorKind::DateTime.to_string(), "date_time");
    }
}
