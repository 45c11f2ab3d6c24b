//! MIME type handling
//!
//! Content types are looked up in the `mime_guess` table first. Hosts disagree
//! on a handful of common extensions (scripts are often reported as plain
//! text), so a small built-in table backs it up and `.js` is pinned to
//! `application/javascript`.

use mime_guess::mime;

const JAVASCRIPT: &str = "application/javascript";
const OCTET_STREAM: &str = "application/octet-stream";

/// Extension of `filename`, from the last dot and including it.
///
/// Returns an empty string when the final path element has no dot.
pub fn extension(filename: &str) -> &str {
    match filename.rfind(['.', '/']) {
        Some(i) if filename[i..].starts_with('.') => &filename[i..],
        _ => "",
    }
}

/// Content type for a file name
pub fn type_by_extension(filename: &str) -> String {
    let ext = extension(filename);

    match host_type(ext) {
        Some(t) if ext == ".js" && is_script_or_plain_text(&t) => JAVASCRIPT.to_string(),
        Some(t) => t,
        None => fallback_type(ext).to_string(),
    }
}

/// Lookup in the registered table; text types carry a UTF-8 charset
fn host_type(ext: &str) -> Option<String> {
    let ext = ext.strip_prefix('.').filter(|e| !e.is_empty())?;
    let guessed = mime_guess::from_ext(ext).first()?;

    if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none() {
        Some(format!("{}; charset=utf-8", guessed.essence_str()))
    } else {
        Some(guessed.to_string())
    }
}

fn is_script_or_plain_text(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    matches!(essence, "text/plain" | "text/javascript")
}

/// Types for extensions the registered table does not know
fn fallback_type(ext: &str) -> &'static str {
    match ext {
        ".json" => "application/json",
        ".js" => JAVASCRIPT,
        ".zip" => "application/zip",
        ".3gp" => "video/3gpp",
        ".7z" => "application/x-7z-compressed",
        ".ace" => "application/x-ace-compressed",
        ".aac" => "audio/x-aac",
        ".ico" => "image/x-icon",
        ".png" => "image/png",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(extension("index.html"), ".html");
        assert_eq!(extension("/a/b/archive.tar.gz"), ".gz");
        assert_eq!(extension("/a.d/README"), "");
        assert_eq!(extension("Makefile"), "");
        assert_eq!(extension(".js"), ".js");
    }

    #[test]
    fn test_mime_types() {
        assert!(type_by_extension("index.html").starts_with("text/html"));
        assert!(type_by_extension("style.css").starts_with("text/css"));
        assert_eq!(type_by_extension(".json"), "application/json");
        assert_eq!(type_by_extension("logo.png"), "image/png");
        assert_eq!(type_by_extension(".unknownext"), OCTET_STREAM);
        assert_eq!(type_by_extension("no_extension"), OCTET_STREAM);
    }

    #[test]
    fn test_scripts_are_never_plain_text() {
        for name in [".js", "app.js", "/static/vendor/lib.min.js"] {
            let t = type_by_extension(name);
            assert_eq!(t, JAVASCRIPT, "{}", name);
            assert!(!t.starts_with("text/plain"));
        }
    }

    #[test]
    fn test_text_types_get_charset() {
        assert_eq!(type_by_extension("notes.txt"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_fallback_table() {
        assert_eq!(fallback_type(".7z"), "application/x-7z-compressed");
        assert_eq!(fallback_type(".ace"), "application/x-ace-compressed");
        assert_eq!(fallback_type(".aac"), "audio/x-aac");
        assert_eq!(fallback_type(".3gp"), "video/3gpp");
        assert_eq!(fallback_type(".ico"), "image/x-icon");
        assert_eq!(fallback_type(".nope"), OCTET_STREAM);
    }
}
