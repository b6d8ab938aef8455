//! Mystery-image references derived from a grid's theme.

/// Default image service template. `{theme}` is replaced by the encoded theme.
pub const DEFAULT_IMAGE_URL_TEMPLATE: &str = "https://source.unsplash.com/1024x1024/?{theme}";

/// Placeholder substituted in image URL templates.
pub const THEME_PLACEHOLDER: &str = "{theme}";

/// Encodes a theme for use as a query string.
///
/// Each whitespace character becomes `+`; bytes outside the RFC 3986
/// unreserved set are percent-encoded.
#[must_use]
pub fn encode_theme(theme: &str) -> String {
    let mut out = String::with_capacity(theme.len());
    for ch in theme.chars() {
        if ch.is_whitespace() {
            out.push('+');
        } else if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~') {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

/// Builds the mystery image URL for a theme.
#[must_use]
pub fn mystery_image_url(template: &str, theme: &str) -> String {
    template.replace(THEME_PLACEHOLDER, &encode_theme(theme))
}
