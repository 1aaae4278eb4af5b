//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Una `Response` se arma con el builder y se serializa con
//! [`Response::write_to`], que aplica el framing de la versión negociada.
//!
//! ## HTTP/1.0 y HTTP/1.1
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Connection: keep-alive\r\n
//! Content-Length: 13\r\n
//! Content-Type: text/html\r\n
//! Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n
//! Server: origin-http/0.1.0\r\n
//! \r\n
//! <html>...
//! ```
//!
//! ## HTTP/0.9
//!
//! ```text
//! 200 OK\r\n
//! <html>...
//! ```
//!
//! Sin headers ni línea vacía: el body sigue inmediatamente.

use std::fs::File;
use std::io::{self, Write};

use super::version::{Disposition, Version};
use super::{date, StatusCode};

/// Cuerpo de una respuesta
#[derive(Debug)]
pub enum Body {
    Empty,

    /// Bytes en memoria
    Bytes(Vec<u8>),

    /// Archivo abierto que se copia tal cual al socket
    File(File),

    /// Salida de un script CGI: continúa el bloque de headers, así que no
    /// se escribe la línea vacía antes de ella
    Passthrough(Vec<u8>),
}

/// Representa una respuesta HTTP completa
#[derive(Debug)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Headers en orden de emisión (sin `Connection`, que agrega `write_to`)
    headers: Vec<(String, String)>,

    body: Body,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    ///
    /// # Ejemplo
    /// ```
    /// use origin_http::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::Ok);
    /// assert_eq!(response.status(), StatusCode::Ok);
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Respuesta de error: sin body y con `Content-Length: 0`
    ///
    /// # Ejemplo
    /// ```
    /// use origin_http::http::{Response, StatusCode, Version, Disposition};
    ///
    /// let mut out = Vec::new();
    /// Response::error(StatusCode::NotFound)
    ///     .write_to(&mut out, Version::Http10, Disposition::Close, false)
    ///     .unwrap();
    /// assert_eq!(
    ///     out,
    ///     b"HTTP/1.0 404 Not Found\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
    /// );
    /// ```
    pub fn error(status: StatusCode) -> Self {
        Self::new(status).with_header("Content-Length", "0")
    }

    /// Agrega un header a la respuesta
    ///
    /// Si el header ya existe, se sobrescribe en su posición original.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Agrega `Date` (hora actual) y `Server`
    pub fn with_origin_headers(self, server_software: &str) -> Self {
        self.with_header("Date", &date::now())
            .with_header("Server", server_software)
    }

    /// Establece el cuerpo desde bytes y calcula `Content-Length`
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.add_header("Content-Length", &body.len().to_string());
        self.body = Body::Bytes(body);
        self
    }

    /// Establece el cuerpo desde un archivo abierto de `length` bytes
    pub fn with_file(mut self, file: File, length: u64) -> Self {
        self.add_header("Content-Length", &length.to_string());
        self.body = Body::File(file);
        self
    }

    /// Salida de un CGI, que termina ella misma el bloque de headers
    pub fn with_passthrough(mut self, output: Vec<u8>) -> Self {
        self.body = Body::Passthrough(output);
        self
    }

    /// Escribe la respuesta completa y hace flush.
    ///
    /// - HTTP/0.9: solo `<code> <reason>\r\n` y el body.
    /// - HTTP/1.x: status line, `Connection`, headers, línea vacía y body.
    ///
    /// Con `head_only` se omite el body (HEAD) pero no los headers.
    pub fn write_to<W: Write>(
        self,
        writer: &mut W,
        version: Version,
        disposition: Disposition,
        head_only: bool,
    ) -> io::Result<()> {
        if version.has_headers() {
            write!(writer, "{} {}\r\n", version, self.status)?;
            write!(writer, "Connection: {}\r\n", disposition.as_str())?;
            for (name, value) in &self.headers {
                write!(writer, "{name}: {value}\r\n")?;
            }
            if !matches!(self.body, Body::Passthrough(_)) {
                writer.write_all(b"\r\n")?;
            }
        } else {
            write!(writer, "{}\r\n", self.status)?;
        }

        if !head_only {
            match self.body {
                Body::Empty => {}
                Body::Bytes(bytes) | Body::Passthrough(bytes) => writer.write_all(&bytes)?,
                Body::File(mut file) => {
                    io::copy(&mut file, writer)?;
                }
            }
        }

        writer.flush()
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &Body {
        &self.body
    }
}
