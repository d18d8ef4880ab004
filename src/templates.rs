//! Fallback HTML pages shown in place of denied or failed content.
//!
//! Each [`SubstituteKind`](crate::policy::SubstituteKind) maps to one template.
//! Templates are plain strings overridable through configuration (see the
//! `*_html` settings). Named placeholders (`{start_url}`, `{url}`,
//! `{content_type}`, `{filename}`) are filled by textual substitution; values
//! are HTML-escaped and the result is never interpreted further.

/// Shown when a navigation is denied or an arbitrary page fails to load.
pub const NOT_FOUND_HTML: &str = r#"<h2>Sorry, can't go there</h2>
<p>This page is not available on this computer.</p>
<p>You can return to the <a href="{start_url}">start page</a>, or wait and you will be returned to the <a href="javascript: history.back();">previous page</a>.</p>
<script>setTimeout('history.back()', 5000);</script>
"#;

/// Shown when the start page itself cannot be reached.
pub const NETWORK_DOWN_HTML: &str = r#"<h2>Network Error</h2>
<p>The start page, {start_url}, cannot be reached. This indicates a network connectivity problem.</p>
<p>Staff, please check the following:</p>
<ul>
<li>Ensure the network connections at the computer and at the switch, hub, or wall panel are secure</li>
<li>Restart the computer</li>
<li>Ensure other systems at your location can access the same URL</li>
</ul>
<p>If you continue to get this error, contact technical support.</p>
"#;

/// Shown when a page presents an invalid certificate in strict mode.
pub const CERTIFICATE_ERROR_HTML: &str = r#"<h1>Certificate Problem</h1>
<p>The URL <strong>{url}</strong> has a problem with its SSL certificate. For your security and protection, you will not be able to access it from this browser.</p>
<p>If this URL is supposed to be reachable, please contact technical support for help.</p>
<p>You may <a href="{start_url}">click here</a> to return to the home screen.</p>
"#;

/// Shown when content cannot be rendered and no external handler applies.
pub const UNSUPPORTED_CONTENT_HTML: &str = r#"<h1>Failed: unrenderable content</h1>
<p>The browser does not know how to handle the content type <strong>{content_type}</strong> of the file <strong>{filename}</strong> supplied by <strong>{url}</strong>.</p>
"#;

/// Fills `{name}` placeholders in `template` with the matching entries of
/// `vars`.
///
/// Substitution is single-pass: inserted values are never rescanned, so a
/// value containing `{url}` stays literal. Placeholders without a matching
/// variable, and braces that do not form a placeholder (CSS, scripts), are
/// copied unchanged.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            let is_ident = !name.is_empty()
                && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
            if !is_ident {
                return None;
            }
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });

        match replaced {
            Some((close, value)) => {
                out.push_str(&escape_html(value));
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
