use std::collections::HashMap;

use crate::error::{CrewError, CrewResult};

/// Replaces `{name}` placeholders with values from `inputs`.
///
/// Names consist of ASCII letters, digits, `_` and `-`. Braces that do not
/// enclose such a name are copied through unchanged.
///
/// # Errors
///
/// Returns [`CrewError::MissingInput`] for a placeholder without a value.
pub fn interpolate(template: &str, inputs: &HashMap<String, String>) -> CrewResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        if let Some(name) = placeholder(after) {
            let value = inputs.get(name).ok_or_else(|| CrewError::MissingInput {
                name: name.to_owned(),
            })?;
            out.push_str(value);
            rest = &after[name.len() + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn placeholder(text: &str) -> Option<&str> {
    let end = text.find('}')?;
    let name = &text[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    valid.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn substitutes_known_names() {
        let out = interpolate(
            "Answer the user question: {topic}",
            &inputs(&[("topic", "what is OTLP?")]),
        )
        .unwrap();
        assert_eq!(out, "Answer the user question: what is OTLP?");
    }

    #[test]
    fn leaves_non_placeholders_alone() {
        let out = interpolate(r#"json {"a": 1} and {} and {x"#, &inputs(&[])).unwrap();
        assert_eq!(out, r#"json {"a": 1} and {} and {x"#);
    }

    #[test]
    fn double_braces_keep_the_outer_pair() {
        let out = interpolate("{{topic}}", &inputs(&[("topic", "t")])).unwrap();
        assert_eq!(out, "{t}");
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = interpolate("about {topic}", &inputs(&[])).expect_err("missing");
        assert!(matches!(err, CrewError::MissingInput { ref name } if name == "topic"));
    }

    #[test]
    fn values_are_not_reinterpolated() {
        let out = interpolate("{a}", &inputs(&[("a", "{b}"), ("b", "nope")])).unwrap();
        assert_eq!(out, "{b}");
    }
}
