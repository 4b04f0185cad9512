//! Stored template collections.
//!
//! Every `*.json` file in the templates directory holds a JSON object of named
//! request templates. The collection is named after the lower-cased file stem.
//! Endpoints bind either all collections (`*`) or a list of names.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while loading or combining template collections.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read template directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("load template-file [{file}] failed: {reason}")]
    File { file: String, reason: String },

    #[error("cannot load multiple templates with the same name. Existing: [{existing}], other: [{other}]")]
    Duplicate { existing: String, other: String },

    #[error("template collection [{0}] not found")]
    NotFound(String),
}

#[derive(Debug, Clone)]
struct TemplateCollection {
    file_name: String,
    templates: Map<String, Value>,
}

/// All template collections found in one directory.
#[derive(Debug, Clone, Default)]
pub struct TemplateCollections {
    collections: BTreeMap<String, TemplateCollection>,
}

/// True for files that belong to a template directory.
pub fn is_template_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

impl TemplateCollections {
    /// Load every template file in `dir`. A missing directory yields no collections.
    pub fn load_from_dir(dir: &Path) -> Result<Self, TemplateError> {
        let mut result = Self::default();
        if !dir.exists() {
            return Ok(result);
        }

        let entries = fs::read_dir(dir).map_err(|source| TemplateError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_template_file(p))
            .collect();
        files.sort();

        for file in files {
            result.add_file(&file)?;
        }
        Ok(result)
    }

    fn add_file(&mut self, path: &Path) -> Result<(), TemplateError> {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let content = fs::read(path).map_err(|e| TemplateError::File {
            file: file_name.clone(),
            reason: e.to_string(),
        })?;
        let templates = match serde_json::from_slice::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(TemplateError::File {
                    file: file_name,
                    reason: "expected a JSON object".to_string(),
                })
            }
            Err(e) => {
                return Err(TemplateError::File {
                    file: file_name,
                    reason: e.to_string(),
                })
            }
        };

        self.insert(name, file_name, templates)
    }

    fn insert(
        &mut self,
        name: String,
        file_name: String,
        templates: Map<String, Value>,
    ) -> Result<(), TemplateError> {
        if let Some(existing) = self.collections.get(&name) {
            return Err(TemplateError::Duplicate {
                existing: existing.file_name.clone(),
                other: file_name,
            });
        }
        self.collections.insert(
            name,
            TemplateCollection {
                file_name,
                templates,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Combine collections named by `names`.
    ///
    /// `*` selects every collection; otherwise names are separated by `|`, `;`,
    /// `,` or spaces. On duplicate template keys the first collection wins.
    pub fn combined(&self, names: &str) -> Result<Value, TemplateError> {
        let names = names.trim();
        let mut combined = Map::new();

        if names == "*" {
            for coll in self.collections.values() {
                merge(&mut combined, &coll.templates);
            }
            return Ok(Value::Object(combined));
        }

        for name in names
            .to_lowercase()
            .split(['|', ';', ',', ' '])
            .filter(|n| !n.is_empty())
        {
            let coll = self
                .collections
                .get(name)
                .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
            merge(&mut combined, &coll.templates);
        }
        Ok(Value::Object(combined))
    }

    /// Log the loaded collections and their template names.
    pub fn dump(&self) {
        tracing::info!(count = self.collections.len(), "Template collections loaded");
        for (name, coll) in &self.collections {
            tracing::debug!(
                collection = %name,
                templates = ?coll.templates.keys().collect::<Vec<_>>(),
                "Template collection"
            );
        }
    }
}

fn merge(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (key, value) in from {
        into.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_and_combine_all() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "es.json", r#"{"search": {"q": 1}, "count": {}}"#);
        write(dir.path(), "solr.json", r#"{"select": {}, "search": {"q": 2}}"#);
        write(dir.path(), "notes.txt", "ignored");

        let colls = TemplateCollections::load_from_dir(dir.path()).unwrap();
        assert_eq!(colls.len(), 2);

        let all = colls.combined("*").unwrap();
        assert_eq!(all["search"], json!({"q": 1}));
        assert!(all.get("select").is_some());
        assert!(all.get("count").is_some());
    }

    #[test]
    fn test_combine_named() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "es.json", r#"{"search": {"q": 1}}"#);
        write(dir.path(), "solr.json", r#"{"select": {}, "search": {"q": 2}}"#);
        let colls = TemplateCollections::load_from_dir(dir.path()).unwrap();

        let solr_first = colls.combined("SOLR, es").unwrap();
        assert_eq!(solr_first["search"], json!({"q": 2}));

        let only_es = colls.combined("es").unwrap();
        assert!(only_es.get("select").is_none());

        assert!(matches!(colls.combined("es|nope"), Err(TemplateError::NotFound(n)) if n == "nope"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut colls = TemplateCollections::default();
        colls
            .insert("es".into(), "es.json".into(), Map::new())
            .unwrap();
        let err = colls
            .insert("es".into(), "ES.json".into(), Map::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Duplicate { .. }));
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", "[1, 2]");
        let err = TemplateCollections::load_from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let colls = TemplateCollections::load_from_dir(Path::new("/nonexistent/templates")).unwrap();
        assert!(colls.is_empty());
        assert_eq!(colls.combined("*").unwrap(), json!({}));
    }
}
