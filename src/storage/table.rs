use crate::core::{GraphError, KeyValue, Result};
use std::collections::{BTreeMap, HashMap};

/// Rows of one entity type, stored as JSON objects.
///
/// The primary key is unique; other members can be indexed on demand for
/// foreign key lookups.
#[derive(Debug, Clone)]
pub struct RowTable {
    name: String,
    key_members: Vec<&'static str>,
    rows: Vec<serde_json::Value>,
    primary: HashMap<Vec<KeyValue>, usize>,
    indexes: HashMap<String, BTreeMap<KeyValue, Vec<usize>>>,
}

impl RowTable {
    pub fn new(name: &str, key_members: Vec<&'static str>) -> Self {
        Self {
            name: name.to_string(),
            key_members,
            rows: Vec::new(),
            primary: HashMap::new(),
            indexes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[serde_json::Value] {
        &self.rows
    }

    /// Key values of `row` in key member order.
    pub fn row_key(&self, row: &serde_json::Value) -> Result<Vec<KeyValue>> {
        self.key_members
            .iter()
            .map(|member| member_value(&self.name, row, member))
            .collect()
    }

    pub fn insert(&mut self, row: serde_json::Value) -> Result<usize> {
        if !row.is_object() {
            return Err(GraphError::Store(format!(
                "Row for table '{}' must be a JSON object",
                self.name
            )));
        }

        let key = self.row_key(&row)?;
        if self.primary.contains_key(&key) {
            return Err(GraphError::Store(format!(
                "Duplicate key ({}) in table '{}'",
                display_key(&key),
                self.name
            )));
        }

        let indexed = self
            .indexes
            .keys()
            .map(|member| Ok((member.clone(), member_value(&self.name, &row, member)?)))
            .collect::<Result<Vec<_>>>()?;

        let id = self.rows.len();
        for (member, value) in indexed {
            if let Some(index) = self.indexes.get_mut(&member) {
                index.entry(value).or_default().push(id);
            }
        }
        self.primary.insert(key, id);
        self.rows.push(row);
        Ok(id)
    }

    pub fn find_by_key(&self, key: &[KeyValue]) -> Option<&serde_json::Value> {
        self.primary.get(key).map(|&id| &self.rows[id])
    }

    /// Builds an index over `member` if none exists yet.
    pub fn ensure_index(&mut self, member: &str) -> Result<()> {
        if self.indexes.contains_key(member) {
            return Ok(());
        }

        let mut index: BTreeMap<KeyValue, Vec<usize>> = BTreeMap::new();
        for (id, row) in self.rows.iter().enumerate() {
            let value = member_value(&self.name, row, member)?;
            index.entry(value).or_default().push(id);
        }
        self.indexes.insert(member.to_string(), index);
        Ok(())
    }

    /// Rows whose `member` equals `value`, in insertion order.
    pub fn filter_by(&self, member: &str, value: &KeyValue) -> Result<Vec<&serde_json::Value>> {
        if value.is_null() {
            return Ok(Vec::new());
        }

        if let Some(index) = self.indexes.get(member) {
            return Ok(index
                .get(value)
                .map(|ids| ids.iter().map(|&id| &self.rows[id]).collect())
                .unwrap_or_default());
        }

        let mut matches = Vec::new();
        for row in &self.rows {
            if &member_value(&self.name, row, member)? == value {
                matches.push(row);
            }
        }
        Ok(matches)
    }
}

fn member_value(table: &str, row: &serde_json::Value, member: &str) -> Result<KeyValue> {
    let raw = row.get(member).ok_or_else(|| {
        GraphError::Store(format!("Column '{}' not found in table '{}'", member, table))
    })?;
    KeyValue::from_json(raw).ok_or_else(|| {
        GraphError::Store(format!(
            "Column '{}' in table '{}' does not hold a key-compatible value",
            member, table
        ))
    })
}

pub(crate) fn display_key(key: &[KeyValue]) -> String {
    key.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
