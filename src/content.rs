//! Contenu non affichable (PDF, archives, etc.).
//!
//! Quand le moteur rencontre un type MIME qu'il ne sait pas rendre, il peut
//! soit confier la ressource à un programme externe (`content_handlers`),
//! soit afficher la page de repli `UnsupportedContentPage`.

use crate::policy::SubstituteKind;

/// Décision pour une ressource non affichable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDecision {
    /// Télécharger puis ouvrir avec `program`.
    Handoff { program: String },
    /// Afficher la page de repli.
    Deny(SubstituteKind),
}

/// Extrait le nom de fichier d'un en-tête `Content-Disposition`.
///
/// Gère `filename="a.pdf"`, `filename=a.pdf` et la forme RFC 5987
/// `filename*=UTF-8''r%C3%A9sum%C3%A9.pdf` (prioritaire si présente).
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in header.split(';').map(str::trim) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "filename" => plain = Some(unquote(value).to_string()),
            "filename*" => {
                // charset'langue'valeur-encodée
                let encoded = value.rsplit('\'').next().unwrap_or(value);
                extended = Some(percent_decode(unquote(encoded)));
            }
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.is_empty())
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Décodage pourcent minimal ; les octets invalides en UTF-8 sont remplacés.
fn percent_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();
    while let Some(b) = iter.next() {
        if b == b'%' {
            let hi = iter.next();
            let lo = iter.next();
            match (hi.and_then(hex_val), lo.and_then(hex_val)) {
                (Some(h), Some(l)) => bytes.push(h << 4 | l),
                _ => {
                    bytes.push(b'%');
                    bytes.extend(hi);
                    bytes.extend(lo);
                }
            }
        } else {
            bytes.push(b);
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="report.pdf""#).as_deref(),
            Some("report.pdf")
        );
    }

    #[test]
    fn test_bare_filename_with_trailing_param() {
        assert_eq!(
            filename_from_disposition("attachment; filename=data.csv; size=120").as_deref(),
            Some("data.csv")
        );
    }

    #[test]
    fn test_extended_filename_wins() {
        let header = r#"attachment; filename="resume.pdf"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"#;
        assert_eq!(filename_from_disposition(header).as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn test_missing_filename() {
        assert_eq!(filename_from_disposition("inline"), None);
        assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_percent_decode_keeps_invalid_escapes() {
        assert_eq!(percent_decode("100%zz"), "100%zz");
        assert_eq!(percent_decode("a%20b"), "a b");
    }
}
