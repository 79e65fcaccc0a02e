/// Local-part rules: atext ASCII + '.' non initial/terminal, no "..".
pub(crate) fn check_local(local: &str, reasons: &mut Vec<String>) {
    if local.is_empty() || local.len() > 64 {
        reasons.push(format!("local part length {} invalid (1..=64)", local.len()));
        return;
    }
    if local.starts_with('.') || local.ends_with('.') {
        reasons.push("local part cannot start or end with '.'".to_string());
    }
    if local.contains("..") {
        reasons.push("local part cannot contain consecutive dots".to_string());
    }
    for c in local.chars() {
        if !is_atext(c) && c != '.' {
            reasons.push(format!("local part has invalid character '{c}'"));
            break;
        }
    }
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reasons_for(local: &str) -> Vec<String> {
        let mut reasons = Vec::new();
        check_local(local, &mut reasons);
        reasons
    }

    #[test]
    fn dots() {
        assert!(!reasons_for(".abc").is_empty());
        assert!(!reasons_for("abc.").is_empty());
        assert!(!reasons_for("a..b").is_empty());
        assert!(reasons_for("a.b").is_empty());
    }

    #[test]
    fn length_bounds() {
        assert!(!reasons_for("").is_empty());
        assert!(reasons_for(&"a".repeat(64)).is_empty());
        assert!(!reasons_for(&"a".repeat(65)).is_empty());
    }

    #[test]
    fn punctuation() {
        assert!(reasons_for("user+tag").is_empty());
        assert!(reasons_for("a_b-c").is_empty());
        assert!(!reasons_for("a b").is_empty());
        assert!(!reasons_for("a@b").is_empty());
    }
}
