//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::fmt::Write as _;

/// Archive page with one exam row per `(name, year, board)`.
pub fn exam_table(rows: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<html><body><table>");
    for (name, year, board) in rows {
        let slug = name.to_lowercase().replace(' ', "-");
        let _ = write!(
            html,
            r#"<tr><td><a href="/files/{slug}.pdf">{name}</a></td><td>{year}</td><td>IBGE</td><td>{board}</td><td>Superior</td></tr>"#
        );
    }
    html.push_str("</table></body></html>");
    html
}

/// Body returned by the archive past the last result page.
pub const EMPTY_EXAM_PAGE: &str = "<html><body><p>Nenhuma prova encontrada</p></body></html>";

/// PDF-looking payload of `len` bytes.
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len, b'x');
    bytes
}
