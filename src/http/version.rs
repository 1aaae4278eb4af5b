//! # Versión HTTP y disposición de la conexión
//! src/http/version.rs
//!
//! La versión del request decide dos cosas: el formato de la status line
//! (HTTP/0.9 no tiene headers) y si la conexión sigue abierta después de
//! responder.
//!
//! | Versión  | Disposición por defecto | `Connection` la cambia |
//! |----------|-------------------------|------------------------|
//! | HTTP/0.9 | close                   | no                     |
//! | HTTP/1.0 | close                   | sí                     |
//! | HTTP/1.1 | keep-alive              | sí                     |

use super::request::ParseError;

/// Versiones de HTTP que el servidor entiende
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http09,
    Http10,
    Http11,
}

impl Version {
    /// Valida el token de versión de una request line de tres partes.
    ///
    /// Gramática: `HTTP/<major>.<minor>` con enteros, `major >= 1`.
    /// `major > 1` es 505; una 1.x distinta de 1.0/1.1 también es 505.
    ///
    /// # Ejemplo
    /// ```
    /// use origin_http::http::Version;
    ///
    /// assert_eq!(Version::parse_token("HTTP/1.1").unwrap(), Version::Http11);
    /// assert!(Version::parse_token("HTTP/2.0").is_err());
    /// ```
    pub fn parse_token(token: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedVersion(token.to_string());

        let number = token.strip_prefix("HTTP/").ok_or_else(malformed)?;
        let (major, minor) = number.split_once('.').ok_or_else(malformed)?;
        let major: u32 = major.parse().map_err(|_| malformed())?;
        let minor: u32 = minor.parse().map_err(|_| malformed())?;

        match (major, minor) {
            (0, _) => Err(malformed()),
            (1, 0) => Ok(Version::Http10),
            (1, 1) => Ok(Version::Http11),
            _ => Err(ParseError::UnsupportedVersion(token.to_string())),
        }
    }

    /// Interpreta la versión configurada (`"1.0"`, `"1.1"` o `"HTTP/1.x"`)
    pub fn from_config(value: &str) -> Option<Self> {
        match value.trim().trim_start_matches("HTTP/") {
            "1.0" => Some(Version::Http10),
            "1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    /// Token tal como va en la status line y en `SERVER_PROTOCOL`
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http09 => "HTTP/0.9",
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }

    /// HTTP/0.9 no tiene headers: ni en el request ni en la respuesta
    pub fn has_headers(&self) -> bool {
        !matches!(self, Version::Http09)
    }

    /// Disposición antes de mirar el header `Connection`
    pub fn default_disposition(&self) -> Disposition {
        match self {
            Version::Http11 => Disposition::KeepAlive,
            Version::Http09 | Version::Http10 => Disposition::Close,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qué pasa con la conexión después de la respuesta actual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Close,
    KeepAlive,
}

impl Disposition {
    /// Valor de un header `Connection`; cualquier otro token no cambia nada
    pub fn from_header(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("close") {
            Some(Disposition::Close)
        } else if value.eq_ignore_ascii_case("keep-alive") {
            Some(Disposition::KeepAlive)
        } else {
            None
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Disposition::Close)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Close => "close",
            Disposition::KeepAlive => "keep-alive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_versions() {
        assert_eq!(Version::parse_token("HTTP/1.0").unwrap(), Version::Http10);
        assert_eq!(Version::parse_token("HTTP/1.1").unwrap(), Version::Http11);
    }

    #[test]
    fn test_major_above_one_is_unsupported() {
        for token in ["HTTP/2.0", "HTTP/3.0", "HTTP/10.1"] {
            assert!(matches!(
                Version::parse_token(token),
                Err(ParseError::UnsupportedVersion(_))
            ));
        }
    }

    #[test]
    fn test_unknown_minor_is_unsupported() {
        assert!(matches!(
            Version::parse_token("HTTP/1.2"),
            Err(ParseError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_malformed_versions() {
        for token in ["HTTP/1", "HTTP/x.y", "HTTP/0.9", "FTP/1.0", "HTTP/1.-1", "http/1.1"] {
            assert!(
                matches!(Version::parse_token(token), Err(ParseError::MalformedVersion(_))),
                "{token} debería ser malformada"
            );
        }
    }

    #[test]
    fn test_default_disposition() {
        assert_eq!(Version::Http09.default_disposition(), Disposition::Close);
        assert_eq!(Version::Http10.default_disposition(), Disposition::Close);
        assert_eq!(Version::Http11.default_disposition(), Disposition::KeepAlive);
    }

    #[test]
    fn test_connection_header_values() {
        assert_eq!(Disposition::from_header("close"), Some(Disposition::Close));
        assert_eq!(Disposition::from_header("Keep-Alive"), Some(Disposition::KeepAlive));
        assert_eq!(Disposition::from_header("upgrade"), None);
    }

    #[test]
    fn test_from_config() {
        assert_eq!(Version::from_config("1.0"), Some(Version::Http10));
        assert_eq!(Version::from_config("HTTP/1.1"), Some(Version::Http11));
        assert_eq!(Version::from_config("2.0"), None);
    }
}
