/// IDNA-normalise `domain` and validate its shape in one pass over the
/// ASCII form. Problems are pushed into `reasons`; the normalised domain
/// is returned either way (callers only use it when `reasons` stayed
/// empty).
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> String {
    let ascii = match idna::domain_to_ascii(domain) {
        Ok(ascii) if !ascii.is_empty() => ascii,
        Ok(_) => {
            reasons.push("domain is empty".to_string());
            return String::new();
        }
        Err(_) => {
            reasons.push("domain is not valid IDNA".to_string());
            return String::new();
        }
    };

    if ascii.len() > 255 {
        reasons.push(format!("domain exceeds 255 octets ({})", ascii.len()));
    }

    let mut label_count = 0;
    for (index, label) in ascii.split('.').enumerate() {
        label_count += 1;
        if let Some(problem) = label_problem(label) {
            reasons.push(format!("label {} ('{label}'): {problem}", index + 1));
        }
    }
    if label_count < 2 {
        reasons.push("domain needs a dot-separated suffix".to_string());
    }

    ascii
}

fn label_problem(label: &str) -> Option<String> {
    if label.is_empty() {
        return Some("empty".to_string());
    }
    if label.len() > 63 {
        return Some(format!("{} chars, limit is 63", label.len()));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Some("hyphen at edge".to_string());
    }
    label
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        .map(|c| format!("character '{c}' not allowed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(domain: &str) -> Vec<String> {
        let mut reasons = Vec::new();
        check_domain(domain, &mut reasons);
        reasons
    }

    #[test]
    fn plain_ascii_passes_and_lowercases() {
        let mut reasons = Vec::new();
        assert_eq!(check_domain("Example.COM", &mut reasons), "example.com");
        assert!(reasons.is_empty(), "{reasons:?}");
    }

    #[test]
    fn oversized_label_is_flagged() {
        assert!(!problems(&format!("{}.com", "x".repeat(64))).is_empty());
        assert!(problems(&format!("{}.com", "x".repeat(63))).is_empty());
    }

    #[test]
    fn edge_hyphens_rejected() {
        assert!(!problems("-acme.io").is_empty());
        assert!(!problems("acme-.io").is_empty());
        assert!(problems("ac-me.io").is_empty());
    }

    #[test]
    fn consecutive_dots_make_an_empty_label() {
        assert!(!problems("acme..io").is_empty());
    }

    #[test]
    fn single_label_needs_suffix() {
        assert!(!problems("localhost").is_empty());
    }

    #[test]
    fn total_length_capped_at_255() {
        let label = "a".repeat(60);
        let long = [label.as_str(); 5].join(".");
        assert!(long.len() > 255);
        assert!(!problems(&long).is_empty());
    }

    #[test]
    fn unicode_is_punycoded() {
        let mut reasons = Vec::new();
        let ascii = check_domain("münchen.de", &mut reasons);
        assert!(reasons.is_empty(), "{reasons:?}");
        assert!(ascii.starts_with("xn--"));
    }
}
