// Call Options passed to the migration runner

use serde::{Deserialize, Serialize};

/// Options for one runner call
///
/// A key is present only when it carries a value; an empty string counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Version to migrate to; latest when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
}

impl MigrationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: Option<&str>) -> Self {
        self.table = non_empty(table);
        self
    }

    pub fn column(mut self, column: Option<&str>) -> Self {
        self.column = non_empty(column);
        self
    }

    pub fn target(mut self, target: Option<i64>) -> Self {
        self.target = target;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.column.is_none() && self.target.is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_keys_are_omitted() {
        let options = MigrationOptions::new()
            .table(Some("schema_info"))
            .column(None)
            .target(Some(15));

        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"table": "schema_info", "target": 15})
        );
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let options = MigrationOptions::new().table(Some("")).column(Some(""));
        assert!(options.is_empty());
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({}));
    }
}
