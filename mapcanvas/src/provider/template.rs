//! Tile URL templates.
//!
//! Templates name the zoom, column and row with `{z}`, `{x}` and `{y}`:
//!
//! ```text
//! https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! ```
//!
//! Each placeholder must appear at least once; every occurrence is
//! substituted.

use std::fmt;

use crate::coord::TileRequest;
use crate::provider::types::ProtocolError;

/// Zoom level placeholder.
pub const ZOOM_PLACEHOLDER: &str = "{z}";
/// Column placeholder.
pub const X_PLACEHOLDER: &str = "{x}";
/// Row placeholder.
pub const Y_PLACEHOLDER: &str = "{y}";

/// A validated tile URL template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Parses and validates a template.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the template is empty or lacks any of the
    /// three placeholders.
    pub fn parse(template: &str) -> Result<Self, ProtocolError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(ProtocolError::EmptyTemplate);
        }

        for placeholder in [ZOOM_PLACEHOLDER, X_PLACEHOLDER, Y_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(ProtocolError::MissingPlaceholder(placeholder));
            }
        }

        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Substitutes the tile coordinates into the template.
    pub fn expand(&self, tile: &TileRequest) -> String {
        self.template
            .replace(ZOOM_PLACEHOLDER, &tile.z.to_string())
            .replace(X_PLACEHOLDER, &tile.x.to_string())
            .replace(Y_PLACEHOLDER, &tile.y.to_string())
    }

    /// The raw template string.
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        let template = UrlTemplate::parse("https://tile.example.org/{z}/{x}/{y}.png").unwrap();
        let url = template.expand(&TileRequest::new(12, 2154, 1340));
        assert_eq!(url, "https://tile.example.org/12/2154/1340.png");
    }

    #[test]
    fn test_expand_query_style() {
        let template = UrlTemplate::parse("http://tiles/map?x={x}&y={y}&zoom={z}").unwrap();
        assert_eq!(
            template.expand(&TileRequest::new(3, 4, 5)),
            "http://tiles/map?x=4&y=5&zoom=3"
        );
    }

    #[test]
    fn test_expand_repeated_placeholder() {
        let template = UrlTemplate::parse("http://t/{z}/{x}/{y}?cache={z}").unwrap();
        assert_eq!(
            template.expand(&TileRequest::new(7, 1, 2)),
            "http://t/7/1/2?cache=7"
        );
    }

    #[test]
    fn test_missing_placeholders() {
        assert_eq!(
            UrlTemplate::parse("http://t/{x}/{y}.png"),
            Err(ProtocolError::MissingPlaceholder("{z}"))
        );
        assert_eq!(
            UrlTemplate::parse("http://t/{z}/{y}.png"),
            Err(ProtocolError::MissingPlaceholder("{x}"))
        );
        assert_eq!(
            UrlTemplate::parse("http://t/{z}/{x}.png"),
            Err(ProtocolError::MissingPlaceholder("{y}"))
        );
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(UrlTemplate::parse("   "), Err(ProtocolError::EmptyTemplate));
    }

    #[test]
    fn test_template_is_trimmed() {
        let template = UrlTemplate::parse("  http://t/{z}/{x}/{y}  ").unwrap();
        assert_eq!(template.as_str(), "http://t/{z}/{x}/{y}");
    }
}
