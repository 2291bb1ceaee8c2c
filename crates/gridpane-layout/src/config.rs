#![forbid(unsafe_code)]

//! Declarative layout descriptions.
//!
//! A [`LayoutSpec`] describes one container: its axis and an ordered list of
//! panes and handles. Panes may nest another container through `split`.
//! Specs load from TOML or JSON and are validated before anything is built.
//!
//! ```toml
//! axis = "row"
//!
//! [[children]]
//! kind = "pane"
//! size = "240px"
//! min = "120px"
//! max = "40%"
//!
//! [[children]]
//! kind = "handle"
//! size = "6px"
//!
//! [[children]]
//! kind = "pane"
//! size = "1fr"
//! ```

use std::path::Path;

use gridpane_core::Axis;
use serde::{Deserialize, Serialize};

use crate::LayoutError;
use crate::engine::ResizeEngine;
use crate::registry::NodeId;
use crate::unit::{Length, Size, SizeSpec};

/// Track size used by handles that do not declare one.
pub const DEFAULT_HANDLE_SIZE: Size = Size::Px(4.0);

fn default_pane_size() -> Size {
    Size::default()
}

fn default_handle_size() -> Size {
    DEFAULT_HANDLE_SIZE
}

/// One container in a declarative layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSpec {
    pub axis: Axis,
    pub children: Vec<ChildSpec>,
}

/// A child of a [`LayoutSpec`], in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildSpec {
    Pane {
        #[serde(default = "default_pane_size")]
        size: Size,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Length>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Length>,
        /// Nested container rendered inside this pane.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        split: Option<Box<LayoutSpec>>,
    },
    Handle {
        #[serde(default = "default_handle_size")]
        size: Size,
    },
}

impl ChildSpec {
    /// Validated size declaration of this child.
    pub fn size_spec(&self) -> Result<SizeSpec, LayoutError> {
        match self {
            Self::Pane { size, min, max, .. } => SizeSpec::bounded(*size, *min, *max),
            Self::Handle { size } => Ok(SizeSpec::new(*size)),
        }
    }
}

/// A built container with the engines of its nested containers.
#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub engine: ResizeEngine,
    /// Nested containers keyed by the pane that hosts them, in child order.
    pub nested: Vec<(NodeId, LayoutTree)>,
}

impl LayoutTree {
    /// Nested container hosted by `pane`.
    #[must_use]
    pub fn nested(&self, pane: NodeId) -> Option<&LayoutTree> {
        self.nested
            .iter()
            .find_map(|(host, tree)| (*host == pane).then_some(tree))
    }

    #[must_use]
    pub fn nested_mut(&mut self, pane: NodeId) -> Option<&mut LayoutTree> {
        self.nested
            .iter_mut()
            .find_map(|(host, tree)| (*host == pane).then_some(tree))
    }
}

impl LayoutSpec {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, LayoutConfigError> {
        let spec: Self = toml::from_str(s).map_err(LayoutConfigError::Toml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, LayoutConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(LayoutConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, LayoutConfigError> {
        let spec: Self = serde_json::from_str(s).map_err(LayoutConfigError::Json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LayoutConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(LayoutConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check every declaration, nested containers included.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for child in &self.children {
            child.size_spec()?;
            if let ChildSpec::Pane {
                split: Some(nested),
                ..
            } = child
            {
                nested.validate()?;
            }
        }
        Ok(())
    }

    /// Mount every child into fresh engines. Container sizes start at zero
    /// and are fed by the host's measurements.
    pub fn build(&self) -> Result<LayoutTree, LayoutError> {
        let mut engine = ResizeEngine::new(self.axis);
        let mut nested = Vec::new();
        for child in &self.children {
            let spec = child.size_spec()?;
            match child {
                ChildSpec::Pane { split, .. } => {
                    let id = engine.mount_pane(spec)?;
                    if let Some(inner) = split {
                        nested.push((id, inner.build()?));
                    }
                }
                ChildSpec::Handle { .. } => {
                    engine.mount_handle(spec)?;
                }
            }
        }
        Ok(LayoutTree { engine, nested })
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, LayoutConfigError> {
        toml::to_string_pretty(self).map_err(LayoutConfigError::TomlSer)
    }
}

/// Errors that can occur when loading a layout description.
#[derive(Debug)]
pub enum LayoutConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// TOML serialization error.
    TomlSer(toml::ser::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// The description parsed but declares an invalid layout.
    Layout(LayoutError),
}

impl From<LayoutError> for LayoutConfigError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl std::fmt::Display for LayoutConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::TomlSer(e) => write!(f, "TOML serialization error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Layout(e) => write!(f, "invalid layout: {e}"),
        }
    }
}

impl std::error::Error for LayoutConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::TomlSer(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Layout(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDEBAR: &str = r#"
axis = "row"

[[children]]
kind = "pane"
size = "240px"
min = "120px"
max = "40%"

[[children]]
kind = "handle"
size = "6px"

[[children]]
kind = "pane"

[children.split]
axis = "column"

[[children.split.children]]
kind = "pane"
size = "2fr"

[[children.split.children]]
kind = "handle"

[[children.split.children]]
kind = "pane"
size = "30%"
"#;

    #[test]
    fn toml_layout_builds_nested_engines() {
        let spec = LayoutSpec::from_toml_str(SIDEBAR).expect("valid layout");
        let tree = spec.build().expect("build");
        assert_eq!(tree.engine.axis(), Axis::Row);
        assert_eq!(tree.engine.template(), "max(120px, min(240px, 40%)) 6px 1fr");
        let host = tree.engine.order()[2];
        let inner = tree.nested(host).expect("nested container");
        assert_eq!(inner.engine.axis(), Axis::Column);
        assert_eq!(inner.engine.template(), "2fr 4px 30%");
        assert!(tree.nested(tree.engine.order()[0]).is_none());
    }

    #[test]
    fn json_layout_loads() {
        let json = r#"{
            "axis": "column",
            "children": [
                {"kind": "pane", "size": "1fr"},
                {"kind": "handle", "size": "2px"},
                {"kind": "pane", "size": "100px", "max": "200px"}
            ]
        }"#;
        let spec = LayoutSpec::from_json_str(json).expect("valid layout");
        assert_eq!(spec.children.len(), 3);
        assert_eq!(
            spec.build().expect("build").engine.template(),
            "1fr 2px min(100px, 200px)"
        );
    }

    #[test]
    fn bounded_fraction_is_rejected_at_load() {
        let toml = r#"
[[children]]
kind = "pane"
size = "1fr"
min = "10px"
"#;
        let err = LayoutSpec::from_toml_str(toml).expect_err("fraction with bound");
        assert!(matches!(
            err,
            LayoutConfigError::Layout(LayoutError::BoundedFraction { .. })
        ));
    }

    #[test]
    fn malformed_token_is_a_parse_error() {
        let toml = r#"
[[children]]
kind = "pane"
size = "12"
"#;
        let err = LayoutSpec::from_toml_str(toml).expect_err("unsuffixed token");
        assert!(matches!(err, LayoutConfigError::Toml(_)));
        assert!(err.to_string().contains("no unit"));
    }

    #[test]
    fn toml_round_trips() {
        let spec = LayoutSpec::from_toml_str(SIDEBAR).expect("valid layout");
        let text = spec.to_toml_string().expect("serialize");
        assert_eq!(LayoutSpec::from_toml_str(&text).expect("reload"), spec);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LayoutSpec::from_toml_file("/nonexistent/gridpane.toml").expect_err("missing");
        assert!(matches!(err, LayoutConfigError::Io(_)));
    }
}
