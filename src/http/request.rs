//! # Parsing de Requests HTTP/0.9, 1.0 y 1.1
//! src/http/request.rs
//!
//! Lee requests de a uno desde un stream con buffer. Cada llamada a
//! [`RequestReader::next_request`] recorre la máquina de estados:
//!
//! ```text
//! AwaitingRequestLine → ReadingHeaders → (ReadingBody) → Dispatching
//! ```
//!
//! y termina en uno de tres resultados:
//!
//! - `Incoming::Request`: request válido, pendiente de resolver el path
//! - `Incoming::Rejected`: error de protocolo (400/414/505), la conexión se cierra
//! - `Incoming::Closed`: el peer cerró sin mandar nada más
//!
//! ## Formato
//!
//! ```text
//! GET /path?query HTTP/1.1\r\n       ← 3 tokens: HTTP/1.x
//! Header-Name: Header-Value\r\n
//! \r\n
//! <body si es POST con Content-Length>
//!
//! GET /path\r\n                      ← 2 tokens: HTTP/0.9, sin headers
//! ```

use std::io::{BufRead, Read};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use super::uri::{normalize_path, split_target};
use super::version::{Disposition, Version};
use super::StatusCode;
use crate::error::ConnectionError;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// POST - Enviar datos a un recurso (a un script CGI, típicamente)
    POST,
}

impl FromStr for Method {
    type Err = ParseError;

    /// Los métodos son case-sensitive: `get` no es `GET`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl Method {
    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

/// Errores de protocolo del cliente. Todos fuerzan el cierre de la conexión.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// La request line no cabe en el buffer configurado
    #[error("request line exceeds {limit} bytes")]
    UriTooLong { limit: usize },

    /// Cantidad de tokens distinta de 2 o 3
    #[error("malformed request line with {tokens} tokens")]
    MalformedRequestLine { tokens: usize },

    /// Método fuera de GET/HEAD/POST
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// HTTP/0.9 solo admite GET
    #[error("HTTP/0.9 only supports GET, got {0}")]
    Http09Method(String),

    /// El token de versión no respeta `HTTP/<major>.<minor>`
    #[error("malformed HTTP version: {0}")]
    MalformedVersion(String),

    /// Versión bien formada pero no soportada (HTTP/2.0, HTTP/1.2, ...)
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),
}

impl ParseError {
    /// Código de estado con el que se responde este error
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::UriTooLong { .. } => StatusCode::UriTooLong,
            ParseError::UnsupportedVersion(_) => StatusCode::VersionNotSupported,
            ParseError::MalformedRequestLine { .. }
            | ParseError::UnsupportedMethod(_)
            | ParseError::Http09Method(_)
            | ParseError::MalformedVersion(_) => StatusCode::BadRequest,
        }
    }
}

/// Representa un request parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Request line tal cual llegó (sin CRLF), para el access log
    request_line: String,

    /// Target original, antes de separar query y normalizar
    raw_target: String,

    /// Path normalizado, sin query ni fragmento
    path: String,

    query_string: String,

    version: Version,

    /// Headers en el orden en que llegaron
    headers: Vec<(String, String)>,

    content_length: usize,

    content_type: String,

    disposition: Disposition,

    /// Solo presente para POST con `Content-Length > 0`
    body: Option<Vec<u8>>,
}

impl Request {
    fn new(method: Method, request_line: String, raw_target: &str, version: Version) -> Self {
        let (path, query_string) = split_target(raw_target);

        Self {
            method,
            path: normalize_path(path),
            query_string: query_string.to_string(),
            raw_target: raw_target.to_string(),
            request_line,
            version,
            headers: Vec::new(),
            content_length: 0,
            content_type: String::new(),
            disposition: version.default_disposition(),
            body: None,
        }
    }

    /// Aplica los headers que el servidor interpreta.
    ///
    /// Un `Content-Length` que no es un entero no negativo se ignora, igual
    /// que un `Connection` con un token desconocido.
    fn apply_headers(&mut self, headers: Vec<(String, String)>) {
        for (name, value) in &headers {
            if name.eq_ignore_ascii_case("connection") {
                if let Some(disposition) = Disposition::from_header(value) {
                    self.disposition = disposition;
                }
            } else if name.eq_ignore_ascii_case("content-length") {
                match value.parse::<usize>() {
                    Ok(length) => self.content_length = length,
                    Err(_) => debug!(value = %value, "Content-Length inválido ignorado"),
                }
            } else if name.eq_ignore_ascii_case("content-type") {
                self.content_type = value.clone();
            }
        }
        self.headers = headers;
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    pub fn raw_target(&self) -> &str {
        &self.raw_target
    }

    /// Path normalizado (empieza siempre con `/`)
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Busca un header sin distinguir mayúsculas; si se repite gana el último
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Body del request; vacío si no hubo
    pub fn body(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Request rechazado antes de resolver el path
#[derive(Debug, Clone)]
pub struct Rejection {
    pub error: ParseError,

    /// Versión con la que se formatea la respuesta de error
    pub version: Version,

    pub request_line: String,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        self.error.status()
    }
}

/// Resultado de un ciclo de parsing
#[derive(Debug)]
pub enum Incoming {
    Request(Request),
    Rejected(Rejection),
    Closed,
}

/// Una línea leída con tope de longitud
enum Line {
    Eof,
    TooLong,
    Complete(String),
}

/// Lee requests sucesivos de una misma conexión
pub struct RequestReader<R> {
    reader: R,

    /// Máximo de bytes por línea (request line y headers)
    line_limit: usize,

    /// Versión para responder cuando la del request no se pudo determinar
    fallback_version: Version,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(reader: R, line_limit: usize, fallback_version: Version) -> Self {
        Self {
            reader,
            line_limit,
            fallback_version,
        }
    }

    /// Acceso al reader de abajo, sin pasar por el parser
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Lee el próximo request de la conexión.
    ///
    /// # Errores
    ///
    /// Solo fallas de transporte: I/O del socket o un body más corto que su
    /// `Content-Length`. Los errores de protocolo vuelven como
    /// `Incoming::Rejected`.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use origin_http::http::request::{Incoming, RequestReader};
    /// use origin_http::http::Version;
    ///
    /// let raw: &[u8] = b"GET /index.html?x=1 HTTP/1.1\r\nHost: a\r\n\r\n";
    /// let mut reader = RequestReader::new(raw, 1024, Version::Http10);
    ///
    /// match reader.next_request().unwrap() {
    ///     Incoming::Request(request) => {
    ///         assert_eq!(request.path(), "/index.html");
    ///         assert_eq!(request.query_string(), "x=1");
    ///     }
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// ```
    pub fn next_request(&mut self) -> Result<Incoming, ConnectionError> {
        // AwaitingRequestLine
        let line = match self.read_line()? {
            Line::Eof => return Ok(Incoming::Closed),
            Line::TooLong => {
                // El resto de la línea queda sin leer: la conexión ya no está sincronizada
                let error = ParseError::UriTooLong { limit: self.line_limit };
                return Ok(self.reject(error, self.fallback_version, String::new()));
            }
            Line::Complete(line) => line,
        };

        let request_line = line.trim_end_matches(['\r', '\n']).to_string();
        let tokens: Vec<&str> = request_line.split_whitespace().collect();

        match tokens.as_slice() {
            [method, target, version] => {
                // ReadingHeaders: se consumen aunque el request se rechace
                let headers = self.read_headers()?;

                // Método antes que versión: `BADMETHOD / HTTP/2.0` es un 400.
                // La respuesta usa la versión del request si se pudo parsear.
                let parsed_version = Version::parse_token(version);
                let method = match method.parse::<Method>() {
                    Ok(method) => method,
                    Err(error) => {
                        let version = parsed_version.unwrap_or(self.fallback_version);
                        return Ok(self.reject(error, version, request_line));
                    }
                };
                let version = match parsed_version {
                    Ok(version) => version,
                    Err(error) => {
                        return Ok(self.reject(error, self.fallback_version, request_line));
                    }
                };

                let mut request = Request::new(method, request_line.clone(), target, version);
                request.apply_headers(headers);

                // ReadingBody
                if method == Method::POST && request.content_length > 0 {
                    request.body = Some(self.read_body(request.content_length)?);
                }

                Ok(Incoming::Request(request))
            }
            [method, target] => {
                if *method != "GET" {
                    let error = ParseError::Http09Method(method.to_string());
                    return Ok(self.reject(error, Version::Http09, request_line));
                }
                let request = Request::new(Method::GET, request_line.clone(), target, Version::Http09);
                Ok(Incoming::Request(request))
            }
            other => {
                let error = ParseError::MalformedRequestLine { tokens: other.len() };
                Ok(self.reject(error, self.fallback_version, request_line))
            }
        }
    }

    fn reject(&self, error: ParseError, version: Version, request_line: String) -> Incoming {
        debug!(%error, "request rechazado");
        Incoming::Rejected(Rejection {
            error,
            version,
            request_line,
        })
    }

    /// Lee headers hasta la línea vacía (o EOF).
    ///
    /// Una línea sin `:` o demasiado larga se descarta y se sigue leyendo.
    fn read_headers(&mut self) -> Result<Vec<(String, String)>, ConnectionError> {
        let mut headers = Vec::new();

        loop {
            let line = match self.read_line()? {
                Line::Eof => break,
                Line::TooLong => {
                    self.discard_line()?;
                    debug!(limit = self.line_limit, "header demasiado largo ignorado");
                    continue;
                }
                Line::Complete(line) => line,
            };

            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                None => debug!(line = %line, "header malformado ignorado"),
            }
        }

        Ok(headers)
    }

    /// Lee exactamente `length` bytes de body
    fn read_body(&mut self, length: usize) -> Result<Vec<u8>, ConnectionError> {
        // No se reserva lo que anuncia el cliente: el body real puede ser más corto
        let mut body = Vec::with_capacity(length.min(self.line_limit));
        (&mut self.reader).take(length as u64).read_to_end(&mut body)?;

        if body.len() < length {
            return Err(ConnectionError::TruncatedBody {
                expected: length,
                received: body.len(),
            });
        }
        Ok(body)
    }

    fn read_line(&mut self) -> Result<Line, ConnectionError> {
        let mut buffer = Vec::new();
        let read = (&mut self.reader)
            .take(self.line_limit as u64 + 1)
            .read_until(b'\n', &mut buffer)?;

        if read == 0 {
            return Ok(Line::Eof);
        }
        if buffer.len() > self.line_limit {
            return Ok(Line::TooLong);
        }
        Ok(Line::Complete(String::from_utf8_lossy(&buffer).into_owned()))
    }

    /// Consume lo que queda de una línea demasiado larga
    fn discard_line(&mut self) -> Result<(), ConnectionError> {
        while let Line::TooLong = self.read_line()? {}
        Ok(())
    }
}
