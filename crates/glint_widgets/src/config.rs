//! Table configuration
//!
//! Tables can be described in TOML:
//!
//! ```toml
//! additional_sort_properties = ["last_name", "first_name"]
//! edit_on_activation = true
//!
//! [sort]
//! sort_property = ["age"]
//! direction = "descending"
//!
//! [[columns]]
//! title = "Name"
//! property = "first_name"
//!
//! [[columns]]
//! title = "Age"
//! property = "age"
//! editor = "spinner"
//! sort_type = "integer"
//!
//! [[columns]]
//! title = "City"
//! property = "address.city"
//! editor = "combo"
//! items = ["Bern", "Oslo"]
//! ```

use std::path::Path;

use glint_core::{SortDirection, TypeHint, Value};
use serde::{Deserialize, Serialize};

use crate::editor::EditorKind;
use crate::error::Result;
use crate::table::TableColumn;

/// A whole table
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub columns: Vec<ColumnConfig>,
    /// Tie-breakers appended to every column sort
    pub additional_sort_properties: Vec<String>,
    /// Sort applied before the first column click
    pub sort: Option<InitialSort>,
    pub edit_on_activation: bool,
    pub multi_select: bool,
}

/// One column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub title: String,
    pub property: String,
    #[serde(default)]
    pub editor: EditorKind,
    #[serde(default = "default_editable")]
    pub editable: bool,
    /// Combo editor choices
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub sort_property: Vec<String>,
    #[serde(default)]
    pub sort_type: Option<TypeHint>,
}

fn default_editable() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialSort {
    pub sort_property: Vec<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl TableConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("loading table config from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

impl ColumnConfig {
    pub fn to_column(&self) -> TableColumn {
        let mut column = TableColumn::new(&self.title, &self.property)
            .editor(self.editor)
            .editor_items(self.items.iter().map(|item| Value::from(item.as_str())))
            .sort_by(self.sort_property.iter().cloned());
        if !self.editable {
            column = column.read_only();
        }
        if let Some(hint) = self.sort_type {
            column = column.sort_type(hint);
        }
        column
    }
}
