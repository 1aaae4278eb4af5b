//! # Request-target
//! src/http/uri.rs
//!
//! Descompone el request-target en path y query string y normaliza el path
//! para que nunca salga del document root.

/// Separa el target en (path, query string).
///
/// Primero se descarta el fragmento (`#...`) y después se separa la query
/// (`?...`). La query es vacía si no hay `?`.
///
/// # Ejemplo
/// ```
/// use origin_http::http::uri::split_target;
///
/// assert_eq!(split_target("/a.html?x=1#top"), ("/a.html", "x=1"));
/// assert_eq!(split_target("/a.html"), ("/a.html", ""));
/// ```
pub fn split_target(raw: &str) -> (&str, &str) {
    let without_fragment = raw.split_once('#').map_or(raw, |(before, _)| before);
    without_fragment.split_once('?').unwrap_or((without_fragment, ""))
}

/// Normaliza un path a una forma absoluta sin segmentos `.` ni `..`.
///
/// `..` en la raíz se descarta, así que el resultado siempre empieza con `/`
/// y nunca apunta por encima de ella. Las barras repetidas se colapsan. Una
/// barra final en el original se conserva (`/docs/` sigue siendo `/docs/`).
///
/// # Ejemplo
/// ```
/// use origin_http::http::uri::normalize_path;
///
/// assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
/// assert_eq!(normalize_path("/../../etc/passwd"), "/etc/passwd");
/// ```
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }

    let trailing_slash = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if normalized.is_empty() || trailing_slash {
        normalized.push('/');
    }

    normalized
}
