//! Internationalization (i18n) support
//!
//! UI strings and month names ship embedded for `pt-BR` and `en`. A site can
//! override or add languages with YAML files in its `languages/` directory.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const EMBEDDED: &[(&str, &str)] = &[
    ("pt-BR", include_str!("languages/pt-BR.yml")),
    ("en", include_str!("languages/en.yml")),
];

type Table = HashMap<String, serde_yaml::Value>;

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, Table>,
}

impl I18n {
    /// Create a handler with the embedded languages loaded
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, content) in EMBEDDED {
            match serde_yaml::from_str::<Table>(content) {
                Ok(table) => {
                    translations.insert(lang.to_string(), table);
                }
                Err(e) => tracing::warn!("Embedded language {} is invalid: {}", lang, e),
            }
        }

        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Merge language files (`<lang>.yml`) from a directory over the embedded ones
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }

            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read language file {:?}", path))?;

            match serde_yaml::from_str::<Table>(&content) {
                Ok(table) => {
                    self.translations
                        .entry(lang.to_string())
                        .or_default()
                        .extend(table);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key; nested keys use dots (`months.short`)
    pub fn get(&self, key: &str) -> String {
        self.lookup(key)
            .map(yaml_value_to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Abbreviated month name, `month` in `1..=12`
    pub fn month_short(&self, month: u32) -> String {
        self.month_name("months.short", month)
            .unwrap_or_else(|| format!("{:02}", month))
    }

    /// Full month name, falling back to the abbreviation
    pub fn month_long(&self, month: u32) -> String {
        self.month_name("months.long", month)
            .unwrap_or_else(|| self.month_short(month))
    }

    fn month_name(&self, key: &str, month: u32) -> Option<String> {
        self.lookup(key)
            .and_then(|v| v.as_sequence())
            .and_then(|months| months.get(month.checked_sub(1)? as usize))
            .map(yaml_value_to_string)
    }

    /// All string translations of the current language (with English
    /// fallback), flattened to dot-notation keys
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        if let Some(table) = self.translations.get(&self.language) {
            flatten(table, &mut result);
        }
        if self.language != "en" {
            if let Some(en) = self.translations.get("en") {
                let mut fallback = HashMap::new();
                flatten(en, &mut fallback);
                for (k, v) in fallback {
                    result.entry(k).or_insert(v);
                }
            }
        }
        result
    }

    fn lookup(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.translations
            .get(&self.language)
            .and_then(|t| get_nested_value(t, key))
            .or_else(|| {
                self.translations
                    .get("en")
                    .and_then(|t| get_nested_value(t, key))
            })
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("pt-BR")
    }
}

fn get_nested_value<'a>(data: &'a Table, key: &str) -> Option<&'a serde_yaml::Value> {
    let mut parts = key.split('.');
    let mut current = data.get(parts.next()?)?;
    for part in parts {
        current = current.as_mapping()?.get(part)?;
    }
    Some(current)
}

fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

fn flatten(entries: &HashMap<String, serde_yaml::Value>, result: &mut HashMap<String, String>) {
    for (key, value) in entries {
        flatten_value(key.clone(), value, result);
    }
}

fn flatten_value(key: String, value: &serde_yaml::Value, result: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                if let Some(k) = k.as_str() {
                    flatten_value(format!("{}.{}", key, k), v, result);
                }
            }
        }
        serde_yaml::Value::Sequence(_) => {}
        other => {
            result.insert(key, yaml_value_to_string(other));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_portuguese() {
        let i18n = I18n::new("pt-BR");
        assert_eq!(i18n.get("load_more"), "Carregar mais posts");
        assert_eq!(i18n.get("exit_preview"), "Sair do modo Preview");
        assert_eq!(i18n.month_short(3), "mar");
        assert_eq!(i18n.month_short(12), "dez");
        assert_eq!(i18n.month_long(3), "março");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let i18n = I18n::new("fr");
        assert_eq!(i18n.get("loading"), "Loading...");
        assert_eq!(i18n.month_short(1), "Jan");
        assert_eq!(i18n.get("missing.key"), "missing.key");
        assert_eq!(i18n.month_short(13), "13");
    }

    #[test]
    fn test_load_languages_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pt-BR.yml"), "load_more: Mais posts\n").unwrap();

        let mut i18n = I18n::new("pt-BR");
        i18n.load_languages(dir.path()).unwrap();
        assert_eq!(i18n.get("load_more"), "Mais posts");
        assert_eq!(i18n.get("loading"), "Carregando...");
    }

    #[test]
    fn test_get_all_translations() {
        let all = I18n::new("pt-BR").get_all_translations();
        assert_eq!(all.get("next_post"), Some(&"Próximo post".to_string()));
        assert!(!all.contains_key("months.short"));
    }

    #[test]
    fn test_get_all_translations_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pt-BR.yml"),
            "post:\n  edited:\n    note: editado\n  count: 2\n",
        )
        .unwrap();

        let mut i18n = I18n::new("pt-BR");
        i18n.load_languages(dir.path()).unwrap();
        let all = i18n.get_all_translations();
        assert_eq!(all.get("post.edited.note"), Some(&"editado".to_string()));
        assert_eq!(all.get("post.count"), Some(&"2".to_string()));
        assert_eq!(all.get("load_more"), Some(&"Carregar mais posts".to_string()));
    }
}
