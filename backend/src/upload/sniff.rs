//! Content type resolution from file bytes

use mime::Mime;

/// Resolves the MIME type `data` is stored with
///
/// Magic-byte detection wins over the declared type. Without a match the
/// declared type is used if it parses as a MIME type.
#[must_use]
pub fn resolve_content_type(data: &[u8], declared: Option<&str>) -> Option<String> {
    if let Some(kind) = infer::get(data) {
        return Some(kind.mime_type().to_string());
    }

    declared
        .and_then(|declared| declared.trim().parse::<Mime>().ok())
        .as_ref()
        .map(ToString::to_string)
}
