//! Limits and constraints for schema processing
//!
//! This module defines limits that keep a conversion run bounded when it is
//! fed hostile or accidentally huge schema sets.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum XML element nesting depth inside one schema document
    pub max_xml_depth: usize,

    /// Maximum schema document size in bytes
    pub max_xml_size: usize,

    /// Maximum number of schema documents in one run (includes/imports)
    pub max_documents: usize,

    /// Maximum number of declarations in the symbol table
    pub max_declarations: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_documents: 1000,
            max_declarations: 1_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of schema documents is within limits
    pub fn check_documents(&self, count: usize) -> Result<()> {
        if count > self.max_documents {
            Err(Error::LimitExceeded(format!(
                "Schema document count {} exceeds maximum {}",
                count, self.max_documents
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of declarations is within limits
    pub fn check_declarations(&self, count: usize) -> Result<()> {
        if count > self.max_declarations {
            Err(Error::LimitExceeded(format!(
                "Declaration count {} exceeds maximum {}",
                count, self.max_declarations
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_xml_depth, 1000);
        assert!(limits.check_xml_depth(500).is_ok());
        assert!(limits.check_xml_depth(1500).is_err());
    }

    #[test]
    fn test_declaration_limit() {
        let limits = Limits {
            max_declarations: 2,
            ..Default::default()
        };
        assert!(limits.check_declarations(2).is_ok());
        assert!(limits.check_declarations(3).is_err());
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let limits: Limits = serde_json::from_str(r#"{"max_documents": 3}"#).unwrap();
        assert_eq!(limits.max_documents, 3);
        assert_eq!(limits.max_xml_depth, Limits::default().max_xml_depth);
    }
}
