//! # Core Value Types
//!
//! Plain data passed between the adapters, the assistant and the front-end:
//! chat messages, tabular query results and training material.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

/// A role paired with text content. Built per prompt, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Rows x columns produced by running a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataFrame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds a column by name, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// A column is numeric when it has at least one number and nothing but numbers or nulls.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut seen_number = false;
        for value in self.column(index) {
            match value {
                Value::Number(_) => seen_number = true,
                Value::Null => {}
                _ => return false,
            }
        }
        seen_number
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| self.is_numeric_column(i))
            .collect()
    }

    pub fn categorical_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| !self.is_numeric_column(i))
            .collect()
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> DataFrame {
        DataFrame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Renders the frame as a pipe-delimited markdown table.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("| ");
        out.push_str(&self.columns.join(" | "));
        out.push_str(" |\n|");
        for _ in &self.columns {
            out.push_str(":---|");
        }
        for row in &self.rows {
            out.push_str("\n| ");
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            out.push_str(&cells.join(" | "));
            out.push_str(" |");
        }
        out
    }

    /// One line per column naming its inferred type, for prompts.
    pub fn dtypes(&self) -> String {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{name}: {}", self.dtype(i)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn dtype(&self, index: usize) -> &'static str {
        let values: Vec<&Value> = self.column(index).filter(|v| !v.is_null()).collect();
        if values.is_empty() {
            "object"
        } else if values.iter().all(|v| v.is_i64() || v.is_u64()) {
            "int64"
        } else if values.iter().all(|v| v.is_number()) {
            "float64"
        } else if values.iter().all(|v| v.is_boolean()) {
            "bool"
        } else {
            "object"
        }
    }
}

/// Text of a single cell as it should appear in a table or a label.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A stored example of a question and the SQL answering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSql {
    pub question: String,
    pub sql: String,
}

/// What kind of material a training entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingDataKind {
    Sql,
    Ddl,
    Documentation,
}

/// One entry of the knowledge store, as listed to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingData {
    pub id: String,
    pub kind: TrainingDataKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub content: String,
}

/// The kind of a training plan item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPlanItemKind {
    Sql,
    Ddl,
    /// A chunk of the information schema, stored as documentation.
    InformationSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlanItem {
    pub kind: TrainingPlanItemKind,
    /// `catalog.schema`
    pub group: String,
    /// The table name, or the question for `Sql` items.
    pub name: String,
    pub value: String,
}

/// Schema metadata broken into retrievable chunks, not yet stored anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub items: Vec<TrainingPlanItem>,
}

impl TrainingPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Human readable one-line summary per item.
    pub fn summary(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| match item.kind {
                TrainingPlanItemKind::Sql => format!("Train on SQL: {}", item.name),
                TrainingPlanItemKind::Ddl => format!("Train on DDL: {} {}", item.group, item.name),
                TrainingPlanItemKind::InformationSchema => {
                    format!("Train on Information Schema: {} {}", item.group, item.name)
                }
            })
            .collect()
    }
}

/// Material to add to the knowledge store in one `train` call.
///
/// A `sql` without a `question` gets its question written by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub ddl: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
}
