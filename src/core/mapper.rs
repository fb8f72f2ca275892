use crate::domain::model::Record;
use crate::domain::ports::{ConfigProvider, RecordMapper};
use crate::utils::error::{EtlError, Result};
use serde_json::Map;
use std::collections::HashMap;

/// Keeps a subset of an object's fields and optionally renames them.
///
/// An empty keep-list keeps every field. Fields listed but absent from a record
/// are left out rather than written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldProjection {
    keep_only_fields: Vec<String>,
    field_mapping: HashMap<String, String>,
}

impl FieldProjection {
    pub fn keep<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keep_only_fields: fields.into_iter().map(Into::into).collect(),
            field_mapping: HashMap::new(),
        }
    }

    pub fn with_mapping(mut self, field_mapping: HashMap<String, String>) -> Self {
        self.field_mapping = field_mapping;
        self
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::keep(config.keep_only_fields().iter().cloned()).with_mapping(config.field_mapping())
    }

    /// True when mapping would hand every record back unchanged.
    pub fn is_identity(&self) -> bool {
        self.keep_only_fields.is_empty() && self.field_mapping.is_empty()
    }

    fn target_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.field_mapping.get(key).map(String::as_str).unwrap_or(key)
    }
}

impl RecordMapper for FieldProjection {
    fn map_record(&self, record: Record) -> Result<Record> {
        let mut fields = match record {
            Record::Object(fields) => fields,
            other => {
                return Err(EtlError::mapper(
                    0,
                    format!("expected a JSON object, found {}", kind_of(&other)),
                ))
            }
        };

        let mut projected = Map::new();
        if self.keep_only_fields.is_empty() {
            for (key, value) in fields {
                projected.insert(self.target_key(&key).to_string(), value);
            }
        } else {
            for key in &self.keep_only_fields {
                if let Some(value) = fields.remove(key) {
                    projected.insert(self.target_key(key).to_string(), value);
                }
            }
        }

        Ok(Record::Object(projected))
    }
}

fn kind_of(value: &Record) -> &'static str {
    match value {
        Record::Null => "null",
        Record::Bool(_) => "a boolean",
        Record::Number(_) => "a number",
        Record::String(_) => "a string",
        Record::Array(_) => "an array",
        Record::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keep_only_selected_fields() {
        let projection = FieldProjection::keep(["id", "title"]);
        let out = projection
            .map_record(json!({"id": 7, "title": "T", "body": "...", "userId": 3}))
            .unwrap();
        assert_eq!(out, json!({"id": 7, "title": "T"}));
    }

    #[test]
    fn test_keep_list_decides_key_order() {
        let projection = FieldProjection::keep(["title", "id"]);
        let out = projection
            .map_record(json!({"id": 1, "body": "b", "title": "A"}))
            .unwrap();
        assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"title":"A","id":1}"#);
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let projection = FieldProjection::keep(["id", "title"]);
        let out = projection.map_record(json!({"id": 7})).unwrap();
        assert_eq!(out, json!({"id": 7}));
    }

    #[test]
    fn test_rename_with_keep_list() {
        let mut mapping = HashMap::new();
        mapping.insert("title".to_string(), "headline".to_string());
        let projection = FieldProjection::keep(["id", "title"]).with_mapping(mapping);

        let out = projection
            .map_record(json!({"id": 1, "title": "T", "body": "b"}))
            .unwrap();
        assert_eq!(out, json!({"id": 1, "headline": "T"}));
    }

    #[test]
    fn test_rename_without_keep_list_keeps_everything() {
        let mut mapping = HashMap::new();
        mapping.insert("userId".to_string(), "author_id".to_string());
        let projection = FieldProjection::default().with_mapping(mapping);

        assert!(!projection.is_identity());
        let out = projection
            .map_record(json!({"id": 1, "userId": 9}))
            .unwrap();
        assert_eq!(out, json!({"id": 1, "author_id": 9}));
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let projection = FieldProjection::keep(["id"]);
        let err = projection.map_record(json!(null)).unwrap_err();
        assert!(matches!(err, EtlError::MapperError { .. }));
        assert!(err.to_string().contains("found null"));
    }

    #[test]
    fn test_default_is_identity() {
        assert!(FieldProjection::default().is_identity());
        assert!(!FieldProjection::keep(["id"]).is_identity());
    }
}
