//! Internationalization (i18n) of interface strings

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Built-in strings; `languages/<lang>.yml` files override them
const BUILTIN: &[(&str, &[(&str, &str)])] = &[
    (
        "en",
        &[
            ("load_more", "Load more posts"),
            ("loading", "Loading..."),
            ("load_failed", "Could not load more posts. Try again."),
            ("reading_time", "%d min"),
            ("not_found_title", "Post not found"),
            ("not_found_message", "The post you are looking for does not exist."),
            ("back_home", "Back to home"),
        ],
    ),
    (
        "pt-br",
        &[
            ("load_more", "Carregar mais posts"),
            ("loading", "Carregando..."),
            ("load_failed", "Não foi possível carregar mais posts. Tente novamente."),
            ("reading_time", "%d min"),
            ("not_found_title", "Post não encontrado"),
            ("not_found_message", "O post que você procura não existe."),
            ("back_home", "Voltar para o início"),
        ],
    ),
];

/// Internationalization handler
pub struct I18n {
    /// Current language, lowercase
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler with the built-in tables
    pub fn new(language: &str) -> Self {
        let translations = BUILTIN
            .iter()
            .map(|(lang, entries)| {
                let table = entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (lang.to_string(), table)
            })
            .collect();

        Self {
            language: normalize_tag(language),
            translations,
        }
    }

    /// Load language files from a directory
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

            let lang = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(normalize_tag)
                .unwrap_or_else(|| "en".to_string());

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                Ok(data) => {
                    let mut flat = HashMap::new();
                    flatten_translations(&data, "", &mut flat);
                    self.translations.entry(lang).or_default().extend(flat);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key
    ///
    /// Falls back to the base language (`pt` for `pt-br`), then English,
    /// then the key itself.
    pub fn get(&self, key: &str) -> String {
        self.fallback_chain()
            .iter()
            .find_map(|lang| self.translations.get(lang)?.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: u32) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// Get all translations for the current language, with fallbacks merged in
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for lang in self.fallback_chain() {
            if let Some(table) = self.translations.get(&lang) {
                for (k, v) in table {
                    result.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        result
    }

    fn fallback_chain(&self) -> Vec<String> {
        let mut chain = vec![self.language.clone()];
        if let Some((base, _)) = self.language.split_once('-') {
            chain.push(base.to_string());
        }
        if !chain.iter().any(|l| l == "en") {
            chain.push("en".to_string());
        }
        chain
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Flatten translations into a HashMap with dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::String(s) => {
                result.insert(full_key, s.clone());
            }
            serde_yaml::Value::Number(n) => {
                result.insert(full_key, n.to_string());
            }
            serde_yaml::Value::Bool(b) => {
                result.insert(full_key, b.to_string());
            }
            serde_yaml::Value::Mapping(map) => {
                let nested: HashMap<String, serde_yaml::Value> = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
                    .collect();
                flatten_translations(&nested, &full_key, result);
            }
            _ => {}
        }
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("en")
    }
}
