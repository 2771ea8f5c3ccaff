//! Legacy lockfile migration.
//!
//! The deprecated lock format is plain text, one pseudo-directive per
//! line:
//!
//! ```text
//! cookbook 'apt', path: '/srv/cookbooks/apt'
//! cookbook 'mysql', git: 'https://example.com/mysql.git', ref: 'v1.3.0'
//! ```
//!
//! Historically this content was executed to populate an options object.
//! Here it is parsed with an explicit small grammar instead: a directive
//! keyword, a quoted name, and a comma-separated `key: 'value'` option
//! list (the old `:key => 'value'` spelling is accepted too). Stored
//! content is never evaluated as code.
//!
//! Any line that does not fit the grammar is fatal for the whole file; a
//! half-migrated lockfile would be worse than none.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::core::{Dependency, SourceOptions};
use crate::errors::Error;
use crate::lockfile::LockfilePayload;

/// Signature that marks content as legacy-format: a line opening with the
/// `cookbook` directive and a quoted name.
static SIGNATURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*cookbook\s+['"]"#).expect("static regex"));

/// Full directive line: `cookbook '<name>'` with an optional option list.
static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*cookbook\s+['"]([^'"]+)['"]\s*(?:,\s*(.+?))?\s*$"#).expect("static regex")
});

/// One option: `key: 'value'`, `key: "value"`, or `:key => 'value'`.
static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?::(\w+)\s*=>|(\w+)\s*:)\s*(?:'([^']*)'|"([^"]*)")\s*$"#)
        .expect("static regex")
});

/// Whether raw lock content carries the legacy signature.
pub fn looks_legacy(content: &str) -> bool {
    SIGNATURE_RE.is_match(content)
}

/// Convert legacy content into the structured payload shape.
///
/// `declared` is the spec's current dependency set: where the spec
/// declares a `path` for a cookbook, that path wins over the one stored
/// in the legacy file, since the spec is the fresher statement of intent.
///
/// The produced `sha` is the empty string so the migrated lockfile can
/// never be mistaken for in sync.
pub fn parse(content: &str, declared: &[Dependency]) -> Result<LockfilePayload> {
    let mut sources = BTreeMap::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let captures = DIRECTIVE_RE.captures(line).ok_or(Error::LegacyParse {
            line: line_no,
            message: format!("expected `cookbook '<name>', <options...>`, got `{}`", line.trim()),
        })?;

        let name = captures[1].to_string();
        let mut options = match captures.get(2) {
            Some(rest) => parse_options(rest.as_str(), line_no)?,
            None => SourceOptions::default(),
        };

        if options.path.is_some() {
            if let Some(declared_path) = declared
                .iter()
                .find(|dep| dep.name() == name)
                .and_then(|dep| dep.options().path.clone())
            {
                options.path = Some(declared_path);
            }
        }

        // Same name twice: last line wins, matching the table semantics.
        sources.insert(name, options);
    }

    Ok(LockfilePayload {
        sha: Some(String::new()),
        sources,
    })
}

fn parse_options(rest: &str, line_no: usize) -> Result<SourceOptions> {
    let mut options = SourceOptions::default();

    for token in split_options(rest) {
        let captures = OPTION_RE.captures(&token).ok_or(Error::LegacyParse {
            line: line_no,
            message: format!("malformed option `{}`", token.trim()),
        })?;

        let key = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let value = captures
            .get(3)
            .or_else(|| captures.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        match key {
            "path" => options.path = Some(value),
            "git" => options.git = Some(value),
            "ref" => options.git_ref = Some(value),
            "site" => options.site = Some(value),
            other => {
                return Err(Error::LegacyParse {
                    line: line_no,
                    message: format!("unrecognized option key `{}`", other),
                }
                .into())
            }
        }
    }

    Ok(options)
}

/// Split an option list on commas, ignoring commas inside quotes.
fn split_options(rest: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in rest.chars() {
        match (ch, quote) {
            ('\'' | '"', None) => {
                quote = Some(ch);
                current.push(ch);
            }
            (_, Some(q)) if ch == q => {
                quote = None;
                current.push(ch);
            }
            (',', None) => {
                tokens.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::VersionReq;

    fn declared_with_path(name: &str, path: &str) -> Dependency {
        Dependency::new(
            name,
            VersionReq::STAR,
            SourceOptions {
                path: Some(path.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn detects_legacy_signature() {
        assert!(looks_legacy("cookbook 'apt'\n"));
        assert!(looks_legacy("\n  cookbook \"apt\", path: '/x'\n"));
        assert!(!looks_legacy(r#"{"sha": null, "sources": {}}"#));
        assert!(!looks_legacy("# a comment about cookbooks\n"));
    }

    #[test]
    fn parses_bare_directive() {
        let payload = parse("cookbook 'apt'\n", &[]).unwrap();
        assert_eq!(payload.sources.len(), 1);
        assert!(payload.sources["apt"].is_empty());
    }

    #[test]
    fn parses_options_in_both_spellings() {
        let payload = parse(
            "cookbook 'apt', path: '/srv/apt'\ncookbook 'mysql', :git => 'https://example.com/mysql.git', :ref => 'v1.3.0'\n",
            &[],
        )
        .unwrap();

        assert_eq!(payload.sources["apt"].path.as_deref(), Some("/srv/apt"));
        let mysql = &payload.sources["mysql"];
        assert_eq!(mysql.git.as_deref(), Some("https://example.com/mysql.git"));
        assert_eq!(mysql.git_ref.as_deref(), Some("v1.3.0"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let payload = parse("\ncookbook 'apt'\n\n\ncookbook 'mysql'\n\n", &[]).unwrap();
        assert_eq!(payload.sources.len(), 2);
    }

    #[test]
    fn commas_inside_quoted_values_do_not_split() {
        let payload = parse("cookbook 'apt', path: '/srv/a,b/apt'\n", &[]).unwrap();
        assert_eq!(payload.sources["apt"].path.as_deref(), Some("/srv/a,b/apt"));
    }

    #[test]
    fn declared_path_wins_over_stored_path() {
        let declared = vec![declared_with_path("apt", "/new")];
        let payload = parse("cookbook 'apt', path: '/old'\n", &declared).unwrap();
        assert_eq!(payload.sources["apt"].path.as_deref(), Some("/new"));
    }

    #[test]
    fn stored_path_kept_when_spec_declares_none() {
        let declared = vec![Dependency::new(
            "apt",
            VersionReq::STAR,
            SourceOptions::default(),
        )];
        let payload = parse("cookbook 'apt', path: '/old'\n", &declared).unwrap();
        assert_eq!(payload.sources["apt"].path.as_deref(), Some("/old"));
    }

    #[test]
    fn unrecognized_key_is_fatal() {
        let err = parse("cookbook 'apt', shallow: 'true'\n", &[]).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::LegacyParse { line, message }) => {
                assert_eq!(*line, 1);
                assert!(message.contains("shallow"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn malformed_line_is_fatal_for_the_whole_file() {
        let err = parse("cookbook 'apt'\nnot a directive\n", &[]).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::LegacyParse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unquoted_option_value_is_fatal() {
        // The old format could hold arbitrary expressions; anything but a
        // quoted literal is rejected rather than evaluated.
        let err = parse("cookbook 'apt', path: File.dirname('/x')\n", &[]).unwrap_err();
        assert!(err.downcast_ref::<Error>().is_some());
    }

    #[test]
    fn produced_sha_forces_recompute() {
        let payload = parse("cookbook 'apt'\n", &[]).unwrap();
        assert_eq!(payload.sha.as_deref(), Some(""));
    }
}
