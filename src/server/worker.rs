//! # Worker de conexión
//! src/server/worker.rs
//!
//! Un worker atiende una sola conexión, request por request, hasta que la
//! disposición diga `close` o el peer se vaya:
//!
//! ```text
//! AwaitingRequestLine ─► ReadingHeaders ─► (ReadingBody) ─► Dispatching
//!        ▲                                                     │
//!        └──────────────── keep-alive ◄────────────────────────┤
//!                                                close ────────┴─► Closed
//! ```
//!
//! El socket se cierra en cualquier salida (drop), también con error.
//!
//! Una conexión ociosa (sin bytes de un request nuevo) no frena el apagado:
//! mientras espera se consulta el flag cada `IDLE_POLL` y, si se pidió el
//! apagado, se cierra. Un request que ya empezó a llegar se atiende completo.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn};

use crate::cgi::{self, CgiEnvironment, ServerInfo};
use crate::config::{Config, SERVER_SOFTWARE};
use crate::error::ConnectionError;
use crate::http::mime::mime_type;
use crate::http::{Body, Disposition, Incoming, Method, Rejection, Request, RequestReader, Response, StatusCode};
use crate::logging;
use crate::router::{Router, Target};

use super::reaper::Lease;
use super::shutdown::ShutdownHandle;

/// Tope de bytes que se descartan antes de cerrar una conexión rechazada
const LINGER_LIMIT: u64 = 1 << 20;

/// Tiempo que se espera al cliente al cerrar una conexión rechazada
const LINGER_TIMEOUT: Duration = Duration::from_millis(500);

/// Cada cuánto una conexión ociosa revisa si se pidió el apagado
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Lo que todos los workers comparten, de solo lectura
#[derive(Debug)]
pub(crate) struct Context {
    pub config: Arc<Config>,
    pub router: Router,

    /// Puerto real del listener (con `port: 0` lo elige el sistema)
    pub server_port: u16,

    pub shutdown: ShutdownHandle,
}

impl Context {
    pub fn new(config: Arc<Config>, server_port: u16, shutdown: ShutdownHandle) -> Self {
        let router = Router::new(&config);
        Self {
            config,
            router,
            server_port,
            shutdown,
        }
    }

    fn server_info(&self) -> ServerInfo<'_> {
        ServerInfo {
            server_name: &self.config.server_name,
            server_software: SERVER_SOFTWARE,
            server_port: self.server_port,
        }
    }
}

/// Punto de entrada del thread de conexión
pub(crate) fn serve(stream: TcpStream, peer: SocketAddr, context: &Context, lease: Lease) {
    let span = info_span!("conn", worker = lease.id(), %peer);
    let _enter = span.enter();

    debug!("connection opened");
    match handle_connection(stream, peer, context) {
        Ok(()) => debug!("connection closed"),
        Err(e) if e.is_disconnect() => info!("client disconnected"),
        Err(e) => warn!(error = %e, "connection abandoned"),
    }
    // `lease` se suelta acá: el reaper ya puede recuperar el thread
}

fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: &Context,
) -> Result<(), ConnectionError> {
    let config = &context.config;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut requests = RequestReader::new(
        BufReader::new(stream),
        config.request_buffer_size,
        config.default_version(),
    );

    loop {
        if !await_request(requests.get_mut(), writer.get_ref(), &context.shutdown)? {
            debug!("idle connection closed for shutdown");
            return Ok(());
        }

        match requests.next_request()? {
            Incoming::Closed => return Ok(()),
            Incoming::Rejected(rejection) => {
                reject(&mut writer, &rejection)?;
                if config.logging {
                    logging::request_line(peer, &rejection.request_line, rejection.status());
                }
                linger(writer.get_ref());
                return Ok(());
            }
            Incoming::Request(request) => {
                let disposition = request.disposition();
                let response = respond(&request, peer, context);
                let status = response.status();

                // La salida de un CGI se manda siempre: el script ya vio
                // REQUEST_METHOD=HEAD y decide qué escribir
                let head_only = request.method() == Method::HEAD
                    && !matches!(response.body(), Body::Passthrough(_));
                response.write_to(&mut writer, request.version(), disposition, head_only)?;

                if config.logging {
                    logging::request_line(peer, request.request_line(), status);
                }
                if disposition.is_close() {
                    return Ok(());
                }
            }
        }
    }
}

/// Espera hasta que haya bytes para leer (o EOF). Retorna `false` si se
/// pidió el apagado antes de que llegara nada.
///
/// El timeout de lectura solo vale mientras no hay nada en el buffer; el
/// request en sí se lee sin timeout.
fn await_request<R: BufRead>(
    reader: &mut R,
    socket: &TcpStream,
    shutdown: &ShutdownHandle,
) -> io::Result<bool> {
    socket.set_read_timeout(Some(IDLE_POLL))?;
    let ready = loop {
        match reader.fill_buf() {
            Ok(_) => break true,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                if shutdown.is_triggered() {
                    break false;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    };
    socket.set_read_timeout(None)?;
    Ok(ready)
}

/// Responde un request que no llegó a resolverse; la conexión siempre se cierra
fn reject<W: io::Write>(writer: &mut W, rejection: &Rejection) -> io::Result<()> {
    debug!(error = %rejection.error, "request rejected");
    Response::error(rejection.status()).write_to(writer, rejection.version, Disposition::Close, false)
}

/// Cierre en dos pasos para un stream desincronizado: FIN primero y después
/// se descarta lo que el cliente siga mandando. Cerrar con datos sin leer
/// manda un RST que puede pisar la respuesta en el cliente.
fn linger(socket: &TcpStream) {
    if socket.shutdown(Shutdown::Write).is_err() {
        return;
    }
    if socket.set_read_timeout(Some(LINGER_TIMEOUT)).is_err() {
        return;
    }
    let _ = io::copy(&mut socket.take(LINGER_LIMIT), &mut io::sink());
}

/// Resuelve el path y produce la respuesta
fn respond(request: &Request, peer: SocketAddr, context: &Context) -> Response {
    match context.router.route(request.path()) {
        // POST sobre un archivo estático se responde como GET
        Target::StaticFile(path) => serve_file(&path),
        Target::CgiScript { path, script_name } => {
            run_script(request, &path, &script_name, peer, context)
        }
        other => {
            debug!(path = request.path(), status = %other.status(), "not served");
            Response::error(other.status())
        }
    }
}

fn serve_file(path: &Path) -> Response {
    let opened = File::open(path).and_then(|file| {
        let length = file.metadata()?.len();
        Ok((file, length))
    });

    match opened {
        Ok((file, length)) => Response::new(StatusCode::Ok)
            .with_file(file, length)
            .with_header("Content-Type", mime_type(path).as_ref())
            .with_origin_headers(SERVER_SOFTWARE),
        // Borrado o sin permisos entre la resolución y la apertura
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open file");
            match e.kind() {
                io::ErrorKind::NotFound => Response::error(StatusCode::NotFound),
                io::ErrorKind::PermissionDenied => Response::error(StatusCode::Forbidden),
                _ => Response::error(StatusCode::InternalServerError),
            }
        }
    }
}

fn run_script(
    request: &Request,
    path: &Path,
    script_name: &str,
    peer: SocketAddr,
    context: &Context,
) -> Response {
    let env = CgiEnvironment::new(request, path, script_name, peer, context.server_info());

    match cgi::run(path, &env, request.body()) {
        Ok(output) => Response::new(StatusCode::Ok)
            .with_origin_headers(SERVER_SOFTWARE)
            .with_passthrough(output),
        Err(e) => {
            error!(
                script = script_name,
                error = %e,
                stderr = e.stderr().unwrap_or_default(),
                "CGI script failed"
            );
            Response::error(StatusCode::InternalServerError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::reaper::Reaper;
    use std::fs;
    use std::io::Write;
    use std::net::TcpListener;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    static NEXT_ROOT: AtomicUsize = AtomicUsize::new(0);

    fn ephemeral_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").expect("bind")
    }

    fn document_root() -> std::path::PathBuf {
        let root = std::env::temp_dir().join(format!(
            "origin-http-worker-{}-{}",
            std::process::id(),
            NEXT_ROOT.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(root.join("cgi-bin")).unwrap();
        fs::write(root.join("index.html"), "<h1>hola</h1>").unwrap();
        fs::write(root.join("main.c"), "int main(void) { return 0; }\n").unwrap();
        let script = root.join("cgi-bin/env.sh");
        fs::write(&script, "#!/bin/sh\nprintf 'Content-Type: text/plain\\r\\n\\r\\n%s %s' \"$REQUEST_METHOD\" \"$SERVER_PORT\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        root
    }

    /// Atiende una conexión con `serve` y devuelve todo lo que recibió el cliente
    fn exchange(config: Config, raw: &[u8]) -> String {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        let context = Context::new(Arc::new(config), addr.port(), ShutdownHandle::new(addr));
        let reaper = Reaper::start().unwrap();
        let lease = reaper.lease(1);

        let t = thread::spawn(move || {
            let (stream, peer) = listener.accept().unwrap();
            serve(stream, peer, &context, lease);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        t.join().unwrap();
        reaper.finish();
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn config() -> Config {
        Config {
            document_root: document_root(),
            logging: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_static_get() {
        let text = exchange(config(), b"GET /index.html HTTP/1.0\r\n\r\n");

        assert!(text.starts_with("HTTP/1.0 200 OK\r\nConnection: close\r\n"), "{text}");
        assert!(text.contains("Content-Length: 13\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("Date: "));
        assert!(text.contains(&format!("Server: {SERVER_SOFTWARE}\r\n")));
        assert!(text.ends_with("\r\n\r\n<h1>hola</h1>"));
    }

    #[test]
    fn test_source_file_as_text() {
        let text = exchange(config(), b"GET /main.c HTTP/1.0\r\n\r\n");
        assert!(text.contains("Content-Type: text/plain\r\n"), "{text}");
    }

    #[test]
    fn test_head_omits_body() {
        let text = exchange(config(), b"HEAD /index.html HTTP/1.0\r\n\r\n");

        assert!(text.contains("Content-Length: 13\r\n"), "{text}");
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("<h1>"));
    }

    #[test]
    fn test_post_to_static_file_served_as_get() {
        let text = exchange(config(), b"POST /index.html HTTP/1.0\r\nContent-Length: 3\r\n\r\nabc");

        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"), "{text}");
        assert!(text.ends_with("<h1>hola</h1>"));
    }

    #[test]
    fn test_keep_alive_serves_several_requests() {
        let text = exchange(
            config(),
            b"GET /index.html HTTP/1.1\r\n\r\nGET /missing HTTP/1.1\r\n\r\nGET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n",
        );

        assert_eq!(text.matches("HTTP/1.1 200 OK\r\n").count(), 2, "{text}");
        assert_eq!(text.matches("HTTP/1.1 404 Not Found\r\n").count(), 1);
        assert_eq!(text.matches("Connection: keep-alive\r\n").count(), 2);
        assert!(text.contains("Connection: close\r\n"));
    }

    #[test]
    fn test_rejection_closes_connection() {
        // El segundo request nunca se atiende
        let text = exchange(config(), b"BADMETHOD / HTTP/1.1\r\n\r\nGET /index.html HTTP/1.1\r\n\r\n");

        assert_eq!(
            text,
            "HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn test_http09_request() {
        let text = exchange(config(), b"GET /index.html\r\n");
        assert_eq!(text, "200 OK\r\n<h1>hola</h1>");
    }

    #[test]
    fn test_cgi_output_is_passed_through() {
        let text = exchange(config(), b"GET /cgi-bin/env.sh HTTP/1.0\r\n\r\n");

        assert!(text.starts_with("HTTP/1.0 200 OK\r\nConnection: close\r\nDate: "), "{text}");
        assert!(text.contains("Content-Type: text/plain\r\n\r\n"));
        assert!(!text.contains("Content-Length"));

        // SERVER_PORT es el puerto real del listener
        let body = text.rsplit("\r\n\r\n").next().unwrap();
        let port = body.strip_prefix("GET ").unwrap();
        assert!(port.parse::<u16>().unwrap() > 0);
    }

    #[test]
    fn test_idle_connection_closes_on_shutdown() {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        // El wake-up apunta a un puerto sin listener: acá solo importa el flag
        let wake = ephemeral_listener().local_addr().unwrap();
        let shutdown = ShutdownHandle::new(wake);
        let context = Context::new(Arc::new(config()), addr.port(), shutdown.clone());
        let reaper = Reaper::start().unwrap();
        let lease = reaper.lease(1);

        let t = thread::spawn(move || {
            let (stream, peer) = listener.accept().unwrap();
            serve(stream, peer, &context, lease);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(b"GET /index.html HTTP/1.1\r\n\r\n").unwrap();
        let mut status = [0u8; 17];
        client.read_exact(&mut status).unwrap();
        assert_eq!(&status, b"HTTP/1.1 200 OK\r\n");

        // Keep-alive sin otro request: el worker sale sin que el cliente cierre
        shutdown.trigger();
        t.join().unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.ends_with(b"<h1>hola</h1>"));
        assert_eq!(reaper.finish(), 1);
    }

    #[test]
    fn test_truncated_body_gets_no_response() {
        let text = exchange(
            config(),
            b"POST /cgi-bin/env.sh HTTP/1.0\r\nContent-Length: 100\r\n\r\nshort",
        );
        assert_eq!(text, "");
    }
}
