//! Fecha para el header `Date` (RFC 1123, siempre en GMT).

/// Fecha y hora actual, p. ej. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn now() -> String {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
