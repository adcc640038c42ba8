//! Converts a structured template (literal fragments + interpolated
//! values) into a single shell command string (spec §4.1).

use crate::value::Value;
use xec_core::XecError;

/// An alternating sequence of literal fragments and interpolated values:
/// `literals.len() == values.len() + 1`.
#[derive(Clone, Default)]
pub struct Template {
    literals: Vec<String>,
    values: Vec<Value>,
}

impl Template {
    /// Build a template from literal fragments and the values between them.
    /// `literals.len()` must equal `values.len() + 1`; violating this is a
    /// caller bug (the façade macro is responsible for assembling the two
    /// in lockstep), so it panics rather than returning a Result.
    pub fn new(literals: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            literals.len(),
            values.len() + 1,
            "template literals must outnumber values by exactly one"
        );
        Self { literals, values }
    }

    /// A template with no interpolants at all.
    pub fn literal(s: impl Into<String>) -> Self {
        Self {
            literals: vec![s.into()],
            values: vec![],
        }
    }

    /// Render with each value single-quoted (the default, injection-safe
    /// mode).
    pub async fn render(&self) -> Result<String, XecError> {
        self.render_with(false).await
    }

    /// Render with each value inserted verbatim, no quoting at all. Opt-in
    /// only -- the interpolator never infers raw mode on its own.
    pub async fn render_raw(&self) -> Result<String, XecError> {
        self.render_with(true).await
    }

    async fn render_with(&self, raw: bool) -> Result<String, XecError> {
        let mut out = String::new();
        for (i, literal) in self.literals.iter().enumerate() {
            out.push_str(literal);
            if let Some(value) = self.values.get(i) {
                let rendered = if raw {
                    value.render_raw().await?
                } else {
                    value.render_quoted().await?
                };
                out.push_str(&rendered);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn literal_only_template_renders_verbatim() {
        let t = Template::literal("echo hi");
        assert_eq!(t.render().await.unwrap(), "echo hi");
    }

    #[tokio::test]
    async fn interpolation_round_trips_through_echo_semantics() {
        // Mirrors spec §8 property 1: echo ${s} produces stdout == s + "\n"
        // for arbitrary s, because the quoting neutralizes shell metachars.
        // Here we just check the *command string* construction; the actual
        // end-to-end echo check lives in xec-process's adapter tests.
        for payload in [
            "'; rm -rf /; echo '",
            "$`\"\\",
            "text with $VAR",
            "embedded\nnewline",
        ] {
            let t = Template::new(
                vec!["echo ".to_string(), "".to_string()],
                vec![Value::Str(payload.to_string())],
            );
            let rendered = t.render().await.unwrap();
            assert!(rendered.starts_with("echo '"));
            assert!(rendered.ends_with('\''));
        }
    }

    #[tokio::test]
    async fn raw_mode_bypasses_quoting_entirely() {
        let t = Template::new(
            vec!["echo ".to_string(), "".to_string()],
            vec![Value::Str("$HOME".to_string())],
        );
        assert_eq!(t.render_raw().await.unwrap(), "echo $HOME");
    }

    #[test]
    #[should_panic(expected = "literals must outnumber values")]
    fn mismatched_arity_panics() {
        let _ = Template::new(vec!["a".into()], vec![Value::Null, Value::Null]);
    }
}
