// SPDX-License-Identifier: MIT

//! Route table loader - YAML file loading and parsing

use super::types::RouteTableDef;
use crate::adk::error::RelayError;
use std::fs;
use std::path::Path;

/// Loads route table definitions from YAML
pub struct RouteTableLoader;

impl RouteTableLoader {
    /// Load a route table definition from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RouteTableDef, RelayError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a route table definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<RouteTableDef, RelayError> {
        let def: RouteTableDef = serde_yaml::from_str(content)?;
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::workflow::types::RouteDef;

    #[test]
    fn test_parse_route_table() {
        let yaml = r#"
name: compliance_monitoring
description: "Screen, validate, alert"
max_steps: 6
routes:
  - when: "watchlist_result is unset"
    worker: watchlist_screening
  - when: "policy_result is unset"
    worker: policy_validation
"#;
        let def = RouteTableLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.name, "compliance_monitoring");
        assert_eq!(def.max_steps, Some(6));
        assert_eq!(
            def.routes[1],
            RouteDef {
                when: "policy_result is unset".to_string(),
                worker: "policy_validation".to_string(),
            }
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let def = RouteTableLoader::parse_yaml("name: bare\n").unwrap();
        assert_eq!(def.description, "");
        assert!(def.max_steps.is_none());
        assert!(def.routes.is_empty());
    }

    #[test]
    fn test_missing_name_is_yaml_error() {
        let err = RouteTableLoader::parse_yaml("routes: []\n").unwrap_err();
        assert!(matches!(err, RelayError::Yaml(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = RouteTableLoader::load("/nonexistent/routes.yaml").unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}
