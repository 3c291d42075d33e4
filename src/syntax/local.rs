use super::SyntaxIssue;

const MAX_LOCAL_LEN: usize = 64;

/// `atext` specials allowed in a dot-atom (RFC 5322 §3.2.3).
const ATEXT_SPECIALS: &[char] = &[
    '!', '#', '$', '%', '&', '\'', '*', '+', '-', '/', '=', '?', '^', '_', '`', '{', '|', '}',
    '~',
];

pub(super) fn check_local(local: &str, issues: &mut Vec<SyntaxIssue>) {
    if local.is_empty() {
        issues.push(SyntaxIssue::EmptyLocal);
        return;
    }
    if local.len() > MAX_LOCAL_LEN {
        issues.push(SyntaxIssue::LocalTooLong { len: local.len() });
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        issues.push(SyntaxIssue::LocalDots);
    }
    if let Some(bad) = local.chars().find(|c| !is_dot_atom_char(*c)) {
        issues.push(SyntaxIssue::LocalChar(bad));
    }
}

fn is_dot_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || ATEXT_SPECIALS.contains(&c)
}
