//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos que el servidor puede emitir. La tabla de reason phrases es fija:
//! el cliente siempre recibe la misma frase para el mismo código.
//!
//! - **2xx**: 200 OK
//! - **4xx**: 400, 403, 404, 414
//! - **5xx**: 500, 505

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 400 Bad Request - Request line, método o versión malformados
    BadRequest = 400,

    /// 403 Forbidden - Directorio sin archivo índice
    Forbidden = 403,

    /// 404 Not Found - Recurso inexistente bajo el document root
    NotFound = 404,

    /// 414 URI Too Long - La request line excede el buffer configurado
    UriTooLong = 414,

    /// 500 Internal Server Error - Falla del script CGI o del sistema de archivos
    InternalServerError = 500,

    /// 505 HTTP Version Not Supported - HTTP/2 o superior
    VersionNotSupported = 505,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use origin_http::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use origin_http::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::UriTooLong => "Request-URI Too Long",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::VersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
