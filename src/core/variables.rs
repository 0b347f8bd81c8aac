// src/core/variables.rs

//! Resolution of `${path.to.value}` references against a `Dictionary`.
//!
//! Every token in a string is resolved independently against the same dictionary,
//! in a single left-to-right pass. Substituted text is never scanned again.

use crate::core::dictionary::Dictionary;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

lazy_static! {
    static ref VARIABLE_RE: Regex =
        Regex::new(r"\$\{([^}]*)\}").expect("variable reference regex is valid");
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VariableError {
    #[error("Unterminated variable reference in '{0}'")]
    Unterminated(String),
    #[error("Empty variable reference '${{}}' in '{0}'")]
    EmptyPath(String),
}

/// Lenient resolution: a reference that cannot be resolved is left exactly as written.
pub fn dereference(dic: &Dictionary, text: &str) -> String {
    if !text.contains("${") {
        return text.to_string();
    }
    VARIABLE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let path = caps.get(1).map_or("", |m| m.as_str());
            match dic.lookup(path) {
                Some(value) => value.to_string(),
                None => {
                    log::trace!("Leaving unresolved reference '{}' in place", path);
                    caps.get(0).map_or("", |m| m.as_str()).to_string()
                }
            }
        })
        .into_owned()
}

/// Strict resolution: returns `None` as soon as any reference is absent.
/// A string with no references is returned unchanged.
pub fn dereference_strict(dic: &Dictionary, text: &str) -> Option<String> {
    let all_present = VARIABLE_RE
        .captures_iter(text)
        .all(|caps| caps.get(1).is_some_and(|m| dic.lookup(m.as_str()).is_some()));
    all_present.then(|| dereference(dic, text))
}

/// Rejects references that can never resolve because they are malformed.
pub fn validate_references(text: &str) -> Result<(), VariableError> {
    for caps in VARIABLE_RE.captures_iter(text) {
        if caps.get(1).is_none_or(|m| m.as_str().trim().is_empty()) {
            return Err(VariableError::EmptyPath(text.to_string()));
        }
    }
    let stripped = VARIABLE_RE.replace_all(text, "");
    if stripped.contains("${") {
        return Err(VariableError::Unterminated(text.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dictionary::Value;

    fn dic() -> Dictionary {
        let mut dic = Dictionary::new();
        dic.insert("log", ".log");
        dic.insert("projectDirectory", "/work/api");
        let details: toml::Table = toml::from_str(
            r#"
            name = "api"
            [details]
            port = 8080
            "#,
        )
        .unwrap();
        dic.insert("projectDetails", Value::from(details));
        dic
    }

    #[test]
    fn test_strings_without_tokens_pass_through() {
        let d = dic();
        for s in ["", "npm test", "echo $HOME", "cost is $5 {ok}"] {
            assert_eq!(dereference(&d, s), s);
            assert_eq!(dereference_strict(&d, s).as_deref(), Some(s));
        }
    }

    #[test]
    fn test_resolves_multiple_tokens_in_place() {
        let d = dic();
        let resolved = dereference(&d, "cd ${projectDirectory} && tail ${log} # ${projectDetails.name}");
        assert_eq!(resolved, "cd /work/api && tail .log # api");
    }

    #[test]
    fn test_non_string_values_are_rendered() {
        let d = dic();
        assert_eq!(
            dereference(&d, "--port=${projectDetails.details.port}"),
            "--port=8080"
        );
    }

    #[test]
    fn test_lenient_leaves_missing_reference_verbatim() {
        let d = dic();
        assert_eq!(
            dereference(&d, "echo ${projectDetails.details.missing} ${log}"),
            "echo ${projectDetails.details.missing} .log"
        );
    }

    #[test]
    fn test_strict_reports_absence() {
        let d = dic();
        assert_eq!(dereference_strict(&d, "${projectDetails.details.publish}"), None);
        assert_eq!(
            dereference_strict(&d, "${projectDetails.details.port}").as_deref(),
            Some("8080")
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let mut d = Dictionary::new();
        d.insert("a", "${b}");
        d.insert("b", "loop");
        assert_eq!(dereference(&d, "${a}"), "${b}");
    }

    #[test]
    fn test_resolution_is_idempotent_once_resolved() {
        let d = dic();
        let once = dereference(&d, "tail ${log}");
        assert_eq!(dereference(&d, &once), once);
    }

    #[test]
    fn test_validate_references() {
        assert!(validate_references("${projectDetails.details.port}").is_ok());
        assert!(validate_references("plain").is_ok());
        assert_eq!(
            validate_references("${}"),
            Err(VariableError::EmptyPath("${}".to_string()))
        );
        assert!(matches!(
            validate_references("${projectDetails.details.port"),
            Err(VariableError::Unterminated(_))
        ));
    }
}
