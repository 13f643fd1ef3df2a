// element.rs — The external element tree a policy is compiled from.
//
// The builder only needs three things from a document node: its qualified
// name, attribute lookup by qualified name, and its ordered child elements.
// `PolicyElement` captures exactly that so any parsed representation can be
// plugged in. `Element` is an owned implementation that can be loaded from
// YAML or JSON:
//
// ```yaml
// name: "{http://www.w3.org/ns/ws-policy}Policy"
// children:
//   - name: "{http://www.w3.org/ns/ws-policy}ExactlyOne"
//     children:
//       - name: "{urn:example}Timestamp"
//         attributes:
//           "{http://www.w3.org/ns/ws-policy}Optional": "true"
// ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::PolicyError;
use crate::qname::QualifiedName;

/// Read-only view of one node of an external policy document.
pub trait PolicyElement {
    fn name(&self) -> &QualifiedName;

    fn attribute(&self, name: &QualifiedName) -> Option<&str>;

    /// Child elements in document order.
    fn children(&self) -> Vec<&dyn PolicyElement>;
}

/// An owned element tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Element {
    pub name: QualifiedName,
    #[serde(default)]
    pub attributes: HashMap<QualifiedName, String>,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: QualifiedName, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load an element tree from disk. `.json` files are read as JSON,
    /// everything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }
}

impl PolicyElement for Element {
    fn name(&self) -> &QualifiedName {
        &self.name
    }

    fn attribute(&self, name: &QualifiedName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn children(&self) -> Vec<&dyn PolicyElement> {
        self.children
            .iter()
            .map(|c| c as &dyn PolicyElement)
            .collect()
    }
}

/// Parse an `xsd:boolean` attribute value. Absent or unrecognized values are false.
pub fn parse_bool_attribute(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const WSP: &str = "http://www.w3.org/ns/ws-policy";

    #[test]
    fn yaml_document_loads_names_attributes_and_children() {
        let yaml = r#"
name: "{http://www.w3.org/ns/ws-policy}Policy"
children:
  - name: "{urn:example}Timestamp"
    attributes:
      "{http://www.w3.org/ns/ws-policy}Optional": "true"
  - name: "{urn:example}Signature"
"#;
        let element = Element::from_yaml_str(yaml).unwrap();
        assert_eq!(element.name, QualifiedName::new(WSP, "Policy"));
        assert_eq!(element.children.len(), 2);

        let first = PolicyElement::children(&element)[0];
        assert_eq!(first.name(), &QualifiedName::new("urn:example", "Timestamp"));
        assert_eq!(
            first.attribute(&QualifiedName::new(WSP, "Optional")),
            Some("true")
        );
        assert_eq!(first.attribute(&QualifiedName::new(WSP, "Ignorable")), None);
    }

    #[test]
    fn json_document_loads() {
        let json = r#"{"name": "{urn:example}A", "children": [{"name": "{urn:example}B"}]}"#;
        let element = Element::from_json_str(json).unwrap();
        assert_eq!(element.children[0].name, QualifiedName::new("urn:example", "B"));
        assert!(element.attributes.is_empty());
    }

    #[test]
    fn invalid_name_is_rejected() {
        let result = Element::from_yaml_str("name: \"{urn:example\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn from_file_picks_format_by_extension() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("policy.json");
        fs::write(&json_path, r#"{"name": "{urn:example}A"}"#).unwrap();
        let yaml_path = dir.path().join("policy.yaml");
        fs::write(&yaml_path, "name: \"{urn:example}A\"\n").unwrap();

        let from_json = Element::from_file(&json_path).unwrap();
        let from_yaml = Element::from_file(&yaml_path).unwrap();
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        match Element::from_file(&missing) {
            Err(PolicyError::Io { path, .. }) => assert!(path.contains("absent.yaml")),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn boolean_attribute_parsing() {
        assert!(parse_bool_attribute(Some("true")));
        assert!(parse_bool_attribute(Some(" 1 ")));
        assert!(!parse_bool_attribute(Some("false")));
        assert!(!parse_bool_attribute(Some("yes")));
        assert!(!parse_bool_attribute(None));
    }
}
