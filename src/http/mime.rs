//! # Tipos MIME
//! src/http/mime.rs
//!
//! `Content-Type` de un archivo estático según su extensión. Los fuentes
//! (`.py`, `.c`, `.h`, `.rs`) se sirven como texto para que el navegador los
//! muestre en vez de descargarlos.

use std::path::Path;

use mime::Mime;

/// Tipo MIME para `path`; `application/octet-stream` si no se reconoce
///
/// # Ejemplo
/// ```
/// use origin_http::http::mime::mime_type;
/// use std::path::Path;
///
/// assert_eq!(mime_type(Path::new("www/index.html")), mime::TEXT_HTML);
/// assert_eq!(mime_type(Path::new("README")), mime::APPLICATION_OCTET_STREAM);
/// ```
pub fn mime_type(path: &Path) -> Mime {
    let extension = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return mime::APPLICATION_OCTET_STREAM,
    };

    match extension.as_str() {
        "html" | "htm" => mime::TEXT_HTML,
        "txt" | "py" | "c" | "h" | "rs" | "sh" => mime::TEXT_PLAIN,
        "css" => mime::TEXT_CSS,
        "js" | "mjs" => mime::TEXT_JAVASCRIPT,
        "xml" => mime::TEXT_XML,
        "csv" => mime::TEXT_CSV,
        "json" => mime::APPLICATION_JSON,
        "pdf" => mime::APPLICATION_PDF,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "woff" => mime::FONT_WOFF,
        "woff2" => mime::FONT_WOFF2,
        other => extra_type(other).unwrap_or(mime::APPLICATION_OCTET_STREAM),
    }
}

/// Tipos sin constante en el crate `mime`
fn extra_type(extension: &str) -> Option<Mime> {
    let essence = match extension {
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "wasm" => "application/wasm",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => return None,
    };
    essence.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(mime_type(Path::new("a.html")), mime::TEXT_HTML);
        assert_eq!(mime_type(Path::new("a.htm")), mime::TEXT_HTML);
        assert_eq!(mime_type(Path::new("a.css")), mime::TEXT_CSS);
        assert_eq!(mime_type(Path::new("a.png")), mime::IMAGE_PNG);
    }

    #[test]
    fn test_source_files_are_plain_text() {
        for name in ["server.py", "main.c", "lib.h", "main.rs"] {
            assert_eq!(mime_type(Path::new(name)), mime::TEXT_PLAIN, "{name}");
        }
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(mime_type(Path::new("PHOTO.JPG")), mime::IMAGE_JPEG);
    }

    #[test]
    fn test_unknown_and_missing_extension() {
        assert_eq!(mime_type(Path::new("archive.xyz")), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(mime_type(Path::new("Makefile")), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_extra_types() {
        assert_eq!(mime_type(Path::new("favicon.ico")).essence_str(), "image/x-icon");
    }
}
