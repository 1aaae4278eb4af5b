//! # Resolución de Paths
//! src/router/mod.rs
//!
//! Mapea el path ya normalizado del request a lo que hay en disco bajo el
//! document root.
//!
//! ```text
//! path → ¿CGI? → ¿directorio? → ¿archivo? → ¿archivo sin `/` final? → Target
//! ```
//!
//! El chequeo de CGI va antes que el de archivos estáticos y se hace sin la
//! barra final: un script bajo el prefijo CGI nunca se sirve como texto.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::http::StatusCode;

/// Resultado de resolver un path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Archivo regular que se sirve tal cual
    StaticFile(PathBuf),

    /// Script bajo el prefijo CGI
    CgiScript {
        path: PathBuf,

        /// Nombre base del script, para `SCRIPT_NAME`
        script_name: String,
    },

    /// Directorio sin archivo índice: nunca se listan
    Forbidden,

    NotFound,

    /// El sistema de archivos falló por otro motivo
    Error(StatusCode),
}

impl Target {
    /// Código de estado que corresponde a este destino
    pub fn status(&self) -> StatusCode {
        match self {
            Target::StaticFile(_) | Target::CgiScript { .. } => StatusCode::Ok,
            Target::Forbidden => StatusCode::Forbidden,
            Target::NotFound => StatusCode::NotFound,
            Target::Error(status) => *status,
        }
    }
}

/// Qué hay en un path del disco
enum Entry {
    File,
    Dir,
    Missing,
    Failed(io::Error),
}

fn probe(path: &Path) -> Entry {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Entry::File,
        Ok(meta) if meta.is_dir() => Entry::Dir,
        // Sockets, fifos, dispositivos: no se sirven
        Ok(_) => Entry::Missing,
        // ENOTDIR: `archivo.txt/` con barra final
        Err(e) if e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ENOTDIR) => {
            Entry::Missing
        }
        Err(e) => Entry::Failed(e),
    }
}

/// Resuelve paths contra un document root
#[derive(Debug, Clone)]
pub struct Router {
    document_root: PathBuf,
    index_files: Vec<String>,
    cgi_prefix: String,
}

impl Router {
    /// Crea un router para el document root de la configuración.
    ///
    /// El root se vuelve absoluto si existe, para que los scripts CGI reciban
    /// paths absolutos.
    pub fn new(config: &Config) -> Self {
        let document_root = fs::canonicalize(&config.document_root)
            .unwrap_or_else(|_| config.document_root.clone());

        Self {
            document_root,
            index_files: config.index_files.clone(),
            cgi_prefix: config.cgi_prefix.clone(),
        }
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }

    /// Clasifica un path ya normalizado (ver [`crate::http::uri::normalize_path`])
    ///
    /// # Ejemplo
    /// ```no_run
    /// use origin_http::config::Config;
    /// use origin_http::router::{Router, Target};
    ///
    /// let router = Router::new(&Config::default());
    /// assert_eq!(router.route("/missing.html"), Target::NotFound);
    /// ```
    pub fn route(&self, path: &str) -> Target {
        // `/cgi-bin/x.sh/` es el mismo script que `/cgi-bin/x.sh`
        let script_path = path.strip_suffix('/').unwrap_or(path);
        if script_path.starts_with(&self.cgi_prefix) {
            let script = self.on_disk(script_path);
            if let Entry::File = probe(&script) {
                let script_name = script
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                return Target::CgiScript {
                    path: script,
                    script_name,
                };
            }
        }

        let mut candidate = self.on_disk(path);
        match probe(&candidate) {
            Entry::Dir => {
                let index = self
                    .index_files
                    .iter()
                    .map(|name| candidate.join(name))
                    .find(|index| matches!(probe(index), Entry::File));
                match index {
                    Some(index) => candidate = index,
                    None => return Target::Forbidden,
                }
            }
            Entry::Failed(e) => return Self::failure(e),
            Entry::File | Entry::Missing => {}
        }

        match probe(&candidate) {
            Entry::File => return Target::StaticFile(candidate),
            Entry::Failed(e) => return Self::failure(e),
            Entry::Dir | Entry::Missing => {}
        }

        // `/archivo.txt/` → `/archivo.txt`
        if let Some(trimmed) = path.strip_suffix('/').filter(|p| !p.is_empty()) {
            let candidate = self.on_disk(trimmed);
            if let Entry::File = probe(&candidate) {
                return Target::StaticFile(candidate);
            }
        }

        Target::NotFound
    }

    /// `<root><path>`: el path normalizado es absoluto, así que no se usa `join`
    fn on_disk(&self, path: &str) -> PathBuf {
        let mut on_disk = self.document_root.clone().into_os_string();
        on_disk.push(path);
        PathBuf::from(on_disk)
    }

    fn failure(error: io::Error) -> Target {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Target::Error(StatusCode::Forbidden),
            _ => Target::Error(StatusCode::InternalServerError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::uri::{normalize_path, split_target};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_ROOT: AtomicUsize = AtomicUsize::new(0);

    /// Document root temporario:
    ///
    /// ```text
    /// index.html
    /// page.txt
    /// docs/index.htm
    /// empty/
    /// cgi-bin/run.sh
    /// ```
    fn fixture() -> (PathBuf, Router) {
        let root = std::env::temp_dir().join(format!(
            "origin-http-router-{}-{}",
            std::process::id(),
            NEXT_ROOT.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::create_dir_all(root.join("cgi-bin")).unwrap();
        fs::write(root.join("index.html"), "root index").unwrap();
        fs::write(root.join("page.txt"), "page").unwrap();
        fs::write(root.join("docs/index.htm"), "docs index").unwrap();
        fs::write(root.join("cgi-bin/run.sh"), "#!/bin/sh\necho hi\n").unwrap();

        let config = Config {
            document_root: root.clone(),
            ..Config::default()
        };
        let router = Router::new(&config);
        let root = router.document_root().to_path_buf();
        (root, router)
    }

    /// Mismo camino que recorre un request: split, normalización y route
    fn resolve(router: &Router, raw_target: &str) -> Target {
        let (path, _) = split_target(raw_target);
        router.route(&normalize_path(path))
    }

    #[test]
    fn test_static_file() {
        let (root, router) = fixture();
        assert_eq!(router.route("/page.txt"), Target::StaticFile(root.join("page.txt")));
    }

    #[test]
    fn test_root_uses_first_index() {
        let (root, router) = fixture();
        assert_eq!(router.route("/"), Target::StaticFile(root.join("index.html")));
    }

    #[test]
    fn test_index_files_in_order() {
        let (root, router) = fixture();
        // docs/ no tiene index.html: se usa el segundo candidato
        assert_eq!(router.route("/docs"), Target::StaticFile(root.join("docs/index.htm")));
        assert_eq!(router.route("/docs/"), Target::StaticFile(root.join("docs/index.htm")));
    }

    #[test]
    fn test_directory_without_index_is_forbidden() {
        let (_, router) = fixture();
        assert_eq!(router.route("/empty"), Target::Forbidden);
        assert_eq!(router.route("/empty").status(), StatusCode::Forbidden);
    }

    #[test]
    fn test_missing_file() {
        let (_, router) = fixture();
        assert_eq!(router.route("/missing"), Target::NotFound);
        assert_eq!(router.route("/missing").status(), StatusCode::NotFound);
    }

    #[test]
    fn test_trailing_slash_on_file() {
        let (root, router) = fixture();
        assert_eq!(router.route("/page.txt/"), Target::StaticFile(root.join("page.txt")));
    }

    #[test]
    fn test_cgi_script() {
        let (root, router) = fixture();
        assert_eq!(
            router.route("/cgi-bin/run.sh"),
            Target::CgiScript {
                path: root.join("cgi-bin/run.sh"),
                script_name: "run.sh".to_string(),
            }
        );
    }

    #[test]
    fn test_cgi_script_with_trailing_slash() {
        let (root, router) = fixture();
        let script = Target::CgiScript {
            path: root.join("cgi-bin/run.sh"),
            script_name: "run.sh".to_string(),
        };

        // Nunca cae en el reintento de archivo estático
        assert_eq!(router.route("/cgi-bin/run.sh/"), script);
        assert_eq!(resolve(&router, "/cgi-bin/run.sh//"), script);
        assert_eq!(resolve(&router, "/cgi-bin/run.sh/."), script);
    }

    #[test]
    fn test_missing_cgi_script_falls_through() {
        let (_, router) = fixture();
        assert_eq!(router.route("/cgi-bin/nope.sh"), Target::NotFound);
        // El directorio en sí no es un script: no hay índice, 403
        assert_eq!(router.route("/cgi-bin/"), Target::Forbidden);
    }

    #[test]
    fn test_query_and_fragment_do_not_reach_disk() {
        let (root, router) = fixture();
        assert_eq!(
            resolve(&router, "/page.txt?a=1&b=2#frag"),
            Target::StaticFile(root.join("page.txt"))
        );
    }

    #[test]
    fn test_traversal_stays_inside_root() {
        let (root, router) = fixture();
        for target in ["/../../../../etc/passwd", "/docs/../../page.txt", "/cgi-bin/../../../bin/sh"] {
            match resolve(&router, target) {
                Target::StaticFile(path) | Target::CgiScript { path, .. } => {
                    assert!(path.starts_with(&root), "{target} escapó a {}", path.display());
                }
                _ => {}
            }
        }
        assert_eq!(
            resolve(&router, "/docs/../../page.txt"),
            Target::StaticFile(root.join("page.txt"))
        );
    }

    #[test]
    fn test_cgi_prefix_through_dot_segments() {
        let (root, router) = fixture();
        assert_eq!(
            resolve(&router, "/docs/../cgi-bin/./run.sh"),
            Target::CgiScript {
                path: root.join("cgi-bin/run.sh"),
                script_name: "run.sh".to_string(),
            }
        );
    }
}
