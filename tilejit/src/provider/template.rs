//! Tile URL templating.
//!
//! A tile URL template is a string containing literal `{z}`, `{x}` and `{y}`
//! placeholders. Substitution uses base-10 integers with no padding and no
//! URL-encoding of the placeholders themselves.

use crate::coord::TileCoord;
use thiserror::Error;

/// Errors raised while validating a tile URL template.
///
/// These are programmer/configuration errors and are detected eagerly at
/// construction, never during a fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// The template string is empty
    #[error("missing tile URL template")]
    Empty,
    /// A required placeholder does not appear in the template
    #[error("tile URL template {template:?} is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },
}

/// A validated `{z}/{x}/{y}` tile URL template.
#[derive(Debug, Clone, PartialEq)]
pub struct TileUrlTemplate {
    template: String,
}

impl TileUrlTemplate {
    /// Validates and wraps a template string.
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        if template.is_empty() {
            return Err(TemplateError::Empty);
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(TemplateError::MissingPlaceholder {
                    template,
                    placeholder,
                });
            }
        }
        Ok(Self { template })
    }

    /// Builds the concrete URL for one tile coordinate.
    pub fn url_for(&self, coord: &TileCoord) -> String {
        self.template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }

    /// The raw template string.
    pub fn as_str(&self) -> &str {
        &self.template
    }
}
