//! Minimal HTML helpers shared by the tree and table serializers.

/// Escapes text for use in element content and double-quoted attribute values.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
