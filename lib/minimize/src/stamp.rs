//! Banner and checksum footer stamping of rendered code.
use md5::{Digest as _, Md5};

/// Replaced by the checksum of the stamped code in footer text.
pub const HASH_PLACEHOLDER: &str = "[hash]";

/// The footer used when none is configured.
pub const DEFAULT_FOOTER: &str = "/* [hash] */";

/// The platform line terminator.
#[cfg(windows)]
pub const EOL: &str = "\r\n";
#[cfg(not(windows))]
pub const EOL: &str = "\n";

/// Hex encoded MD5 digest of `code`, 32 lowercase characters.
pub fn checksum(code: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Rewrite all line terminators to [`EOL`] and end the banner with exactly one of them.
pub fn normalize_banner(banner: &str) -> String {
    let mut normalized = String::with_capacity(banner.len() + EOL.len());
    let mut chars = banner.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                chars.next_if_eq(&'\n');
                normalized.push_str(EOL);
            }
            '\n' | '\u{2028}' | '\u{2029}' => normalized.push_str(EOL),
            other => normalized.push(other),
        }
    }

    normalized.truncate(normalized.trim_end().len());
    normalized.push_str(EOL);
    normalized
}

/// Prepend `banner` unless it is empty or the code already starts with it.
pub fn prepend_banner(code: String, banner: &str) -> String {
    if banner.is_empty() || code.starts_with(banner) {
        return code;
    }

    let mut stamped = normalize_banner(banner);
    stamped.push_str(&code);
    stamped
}

/// Substitute every placeholder in the template with the checksum of `code`.
///
/// An empty template falls back to [`DEFAULT_FOOTER`].
pub fn render_footer(code: &str, template: &str) -> String {
    let template = if template.is_empty() {
        DEFAULT_FOOTER
    } else {
        template
    };

    if !template.contains(HASH_PLACEHOLDER) {
        return template.to_owned();
    }

    template.replace(HASH_PLACEHOLDER, &checksum(code))
}

/// Append the footer rendered from `template` on a line of its own.
pub fn append_footer(mut code: String, template: &str) -> String {
    let footer = render_footer(&code, template);
    code.push_str(EOL);
    code.push_str(&footer);
    code
}

/// Check that `code` ends with a footer stamped from `template` whose checksum matches.
pub fn verify_footer(code: &str, template: &str) -> bool {
    let template = if template.is_empty() {
        DEFAULT_FOOTER
    } else {
        template
    };

    // Each placeholder grows by the difference to a hex digest.
    let placeholders = template.matches(HASH_PLACEHOLDER).count();
    let footer_len = template.len() + placeholders * (32 - HASH_PLACEHOLDER.len());

    let Some(body_len) = code.len().checked_sub(footer_len + EOL.len()) else {
        return false;
    };

    if !code.is_char_boundary(body_len) || !code[body_len..].starts_with(EOL) {
        return false;
    }

    let (body, rest) = code.split_at(body_len);
    rest[EOL.len()..] == render_footer(body, template)
}
