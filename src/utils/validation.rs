use crate::utils::error::{EtlError, Result};
use std::collections::{HashMap, HashSet};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Field lists must hold distinct, non-blank names.
pub fn validate_field_list(field_name: &str, fields: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        validate_non_empty_string(field_name, field)?;
        if !seen.insert(field.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: field.clone(),
                reason: "Duplicate field name".to_string(),
            });
        }
    }
    Ok(())
}

/// Two source keys renamed onto the same target would silently drop one value.
pub fn validate_field_mapping(field_name: &str, mapping: &HashMap<String, String>) -> Result<()> {
    let mut targets = HashSet::new();
    for (source, target) in mapping {
        validate_non_empty_string(field_name, source)?;
        validate_non_empty_string(field_name, target)?;
        if !targets.insert(target.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: target.clone(),
                reason: "More than one field renamed to the same key".to_string(),
            });
        }
    }
    Ok(())
}
