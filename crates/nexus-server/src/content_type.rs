//! `Content-Type` inference from a file's extension.

/// The MIME type for `path`, with `; charset=utf-8` appended for `text/*`
/// and for the handful of `application/*` types the spec calls out as
/// textual (JSON, JavaScript, XML/XHTML, form-urlencoded).
#[must_use]
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_lowercase());
    let base = match ext.as_deref() {
        Some("js") | Some("mjs") | Some("cjs") => "text/javascript",
        Some("json") => "application/json",
        Some("css") => "text/css",
        Some("html") | Some("htm") => "text/html",
        Some("xml") => "application/xml",
        Some("xhtml") => "application/xhtml+xml",
        Some("txt") | Some("md") | Some("markdown") => "text/plain",
        Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("wasm") => "application/wasm",
        Some("yaml") | Some("yml") => "application/x-yaml",
        Some("zip") => "application/zip",
        Some("gz") | Some("tgz") => "application/gzip",
        _ => "application/octet-stream",
    };

    if needs_charset_suffix(base) {
        charset_variant(base)
    } else {
        base
    }
}

fn needs_charset_suffix(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json" | "text/javascript" | "application/xml" | "application/xhtml+xml"
        )
}

fn charset_variant(mime: &str) -> &'static str {
    match mime {
        "text/javascript" => "text/javascript; charset=utf-8",
        "application/json" => "application/json; charset=utf-8",
        "text/css" => "text/css; charset=utf-8",
        "text/html" => "text/html; charset=utf-8",
        "text/plain" => "text/plain; charset=utf-8",
        "application/xml" => "application/xml; charset=utf-8",
        "application/xhtml+xml" => "application/xhtml+xml; charset=utf-8",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_gets_charset() {
        assert_eq!(content_type_for("dist/js/uikit.js"), "text/javascript; charset=utf-8");
    }

    #[test]
    fn json_gets_charset() {
        assert_eq!(content_type_for("package.json"), "application/json; charset=utf-8");
    }

    #[test]
    fn image_has_no_charset() {
        assert_eq!(content_type_for("logo.png"), "image/png");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn extension_matching_is_case_insensitive() {
        assert_eq!(content_type_for("STYLE.CSS"), "text/css; charset=utf-8");
    }
}
