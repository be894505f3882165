//! Parameter placeholders
//!
//! Step configuration strings may reference execution parameters as
//! `{{Name}}`. Names are trimmed; whitespace inside the braces is allowed.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder in '{0}'")]
    Unterminated(String),

    #[error("empty placeholder in '{0}'")]
    EmptyName(String),

    #[error("no value for parameter '{0}'")]
    Missing(String),
}

/// Lists the parameter names referenced by `input`, in order of appearance
pub fn placeholders(input: &str) -> Result<Vec<&str>, TemplateError> {
    let mut names = Vec::new();
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| TemplateError::Unterminated(input.to_string()))?;

        let name = after[..close].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyName(input.to_string()));
        }

        names.push(name);
        rest = &after[close + 2..];
    }

    Ok(names)
}

/// Replaces every placeholder in `input` with its value from `parameters`
pub fn render(input: &str, parameters: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);

        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| TemplateError::Unterminated(input.to_string()))?;

        let name = after[..close].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyName(input.to_string()));
        }

        let value = parameters
            .get(name)
            .ok_or_else(|| TemplateError::Missing(name.to_string()))?;
        out.push_str(value);

        rest = &after[close + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        let names = placeholders("{{ArtifactUri}}/models/{{ ModelPackageArn }}").unwrap();
        assert_eq!(names, vec!["ArtifactUri", "ModelPackageArn"]);

        assert!(placeholders("plain text").unwrap().is_empty());
    }

    #[test]
    fn test_placeholder_errors() {
        assert!(matches!(
            placeholders("s3://bucket/{{Oops"),
            Err(TemplateError::Unterminated(_))
        ));
        assert!(matches!(
            placeholders("s3://bucket/{{ }}"),
            Err(TemplateError::EmptyName(_))
        ));
    }

    #[test]
    fn test_render() {
        let mut params = BTreeMap::new();
        params.insert("ArtifactUri".to_string(), "s3://artifacts".to_string());
        params.insert("ModelPackageArn".to_string(), "arn:1".to_string());

        let rendered = render("{{ArtifactUri}}/models/{{ModelPackageArn}}/out", &params).unwrap();
        assert_eq!(rendered, "s3://artifacts/models/arn:1/out");
    }

    #[test]
    fn test_render_missing() {
        let params = BTreeMap::new();
        assert_eq!(
            render("{{TrainingDataUri}}", &params),
            Err(TemplateError::Missing("TrainingDataUri".to_string()))
        );
    }
}
