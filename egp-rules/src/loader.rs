use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::RuleError;
use crate::rule::RevocationRule;

/// Loads revocation rules from a YAML/JSON file or a directory of them.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<RevocationRule>, RuleError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RuleError::NotFound(path.to_path_buf()));
    }

    let mut rules = if path.is_dir() {
        load_from_directory(path)?
    } else {
        load_from_file(path)?
    };

    deduplicate(&rules)?;
    rules.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));

    Ok(rules)
}

fn load_from_directory(path: &Path) -> Result<Vec<RevocationRule>, RuleError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|err| RuleError::unreadable(path, err))? {
        let entry = entry.map_err(|err| RuleError::unreadable(path, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| RuleError::unreadable(&entry.path(), err))?;
        if file_type.is_dir() {
            continue;
        }
        let candidate = entry.path();
        if let Some(ext) = candidate.extension().and_then(|value| value.to_str()) {
            if matches!(ext, "json" | "yaml" | "yml") {
                entries.push(candidate);
            }
        }
    }
    entries.sort();

    let mut rules = Vec::new();
    for file in entries {
        rules.append(&mut load_from_file(&file)?);
    }
    Ok(rules)
}

fn load_from_file(path: &Path) -> Result<Vec<RevocationRule>, RuleError> {
    let raw = fs::read_to_string(path).map_err(|err| RuleError::unreadable(path, err))?;
    parse_rules(&raw, path)
}

fn parse_rules(raw: &str, path: &Path) -> Result<Vec<RevocationRule>, RuleError> {
    if let Ok(doc) = serde_yaml::from_str::<RuleDocument>(raw) {
        return Ok(doc.rules);
    }
    if let Ok(list) = serde_yaml::from_str::<Vec<RevocationRule>>(raw) {
        return Ok(list);
    }
    match serde_yaml::from_str::<RevocationRule>(raw) {
        Ok(rule) => Ok(vec![rule]),
        Err(err) => Err(RuleError::Malformed {
            path: path.to_path_buf(),
            message: format!("expected a rules document, a list or a single rule ({err})"),
        }),
    }
}

fn deduplicate(rules: &[RevocationRule]) -> Result<(), RuleError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            return Err(RuleError::DuplicateRule {
                id: rule.id.clone(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    rules: Vec<RevocationRule>,
}
