//! Single-quote shell quoting: the injection-safety boundary every adapter
//! relies on before handing a string to a shell (spec §4.1, testable
//! property §8 item 1).

/// Wrap `s` in single quotes, closing/escaping/reopening around any
/// embedded single quote: `it's` -> `'it'\''s'`.
pub fn single_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_quotes_to_empty_pair() {
        assert_eq!(single_quote(""), "''");
    }

    #[test]
    fn plain_string_is_wrapped() {
        assert_eq!(single_quote("hello world"), "'hello world'");
    }

    #[test]
    fn embedded_single_quote_is_closed_escaped_reopened() {
        assert_eq!(single_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn injection_payload_is_neutralized() {
        let payload = "'; rm -rf /; echo '";
        let quoted = single_quote(payload);
        // No unescaped quote boundary allows the shell to see `rm` as a
        // separate command: the payload is entirely inside single quotes
        // except for escaped closures.
        assert_eq!(quoted, "''\\''; rm -rf /; echo '\\'''");
    }

    #[test]
    fn dollar_and_backtick_and_backslash_are_inert_inside_single_quotes() {
        let payload = "$`\"\\";
        assert_eq!(single_quote(payload), "'$`\"\\'");
    }
}

/// Spec §8 testable property 1, run for real against `sh -c`: for every
/// string `s`, `echo <quoted s>` prints `s` followed by a single newline,
/// whatever shell metacharacters `s` contains.
#[cfg(test)]
mod injection_safety {
    use super::single_quote;
    use proptest::prelude::*;
    use std::process::Command;

    proptest! {
        #[test]
        fn echo_of_any_quoted_string_round_trips(s in "[^\\x00]{0,64}") {
            let quoted = single_quote(&s);
            let output = Command::new("sh")
                .arg("-c")
                .arg(format!("echo {quoted}"))
                .output()
                .expect("spawn sh");
            prop_assert!(output.status.success());
            let stdout = String::from_utf8_lossy(&output.stdout);
            prop_assert_eq!(stdout.as_ref(), format!("{s}\n"));
        }
    }

    #[test]
    fn known_injection_payloads_round_trip() {
        for payload in [
            "'; rm -rf /; echo '",
            "$`\"\\",
            "text with $VAR",
            "embedded\nnewline",
        ] {
            let quoted = single_quote(payload);
            let output = Command::new("sh")
                .arg("-c")
                .arg(format!("echo {quoted}"))
                .output()
                .expect("spawn sh");
            assert!(output.status.success());
            let stdout = String::from_utf8_lossy(&output.stdout);
            assert_eq!(stdout, format!("{payload}\n"));
        }
    }
}
