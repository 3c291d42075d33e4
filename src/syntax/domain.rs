use super::SyntaxIssue;

const MAX_LABEL_LEN: usize = 63;

/// Checks `domain` and returns its IDNA form when the conversion succeeded.
pub(super) fn check_domain(domain: &str, issues: &mut Vec<SyntaxIssue>) -> Option<String> {
    if domain.is_empty() {
        issues.push(SyntaxIssue::EmptyDomain);
        return None;
    }
    if domain.starts_with('[') {
        issues.push(SyntaxIssue::DomainLiteral);
        return None;
    }

    let Ok(ascii) = idna::domain_to_ascii(domain) else {
        issues.push(SyntaxIssue::DomainIdna);
        return None;
    };
    if ascii.is_empty() {
        issues.push(SyntaxIssue::EmptyDomain);
        return None;
    }
    if !ascii.contains('.') {
        issues.push(SyntaxIssue::DomainNoDot);
    }

    for label in ascii.split('.') {
        if label.is_empty() {
            issues.push(SyntaxIssue::EmptyLabel);
            continue;
        }
        if label.len() > MAX_LABEL_LEN {
            issues.push(SyntaxIssue::LabelTooLong {
                label: label.to_string(),
                len: label.len(),
            });
        }
        if label.starts_with('-') || label.ends_with('-') {
            issues.push(SyntaxIssue::LabelHyphen {
                label: label.to_string(),
            });
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            issues.push(SyntaxIssue::LabelChars {
                label: label.to_string(),
            });
        }
    }

    Some(ascii)
}
