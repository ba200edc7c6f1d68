// src/common/i18n.rs

use std::collections::HashMap;

const DEFAULT_LOCALE: &str = "en";

/// Catálogo de mensagens de erro por idioma (código -> mensagem).
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    /// Carrega os catálogos embutidos no binário.
    pub fn embedded() -> anyhow::Result<Self> {
        let mut store = Self::default();
        store.load("en", include_str!("../../locales/en.json"))?;
        store.load("pt", include_str!("../../locales/pt.json"))?;
        Ok(store)
    }

    pub fn load(&mut self, locale: &str, raw_json: &str) -> anyhow::Result<()> {
        let catalog: HashMap<String, String> = serde_json::from_str(raw_json)?;
        self.catalogs.insert(locale.to_string(), catalog);
        Ok(())
    }

    /// Idioma pedido -> inglês -> o próprio código.
    pub fn translate(&self, locale: &str, code: &str) -> String {
        [locale, DEFAULT_LOCALE]
            .iter()
            .filter_map(|lang| self.catalogs.get(*lang))
            .find_map(|catalog| catalog.get(code))
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_share_the_same_codes() {
        let store = I18nStore::embedded().unwrap();
        let en = &store.catalogs["en"];
        let pt = &store.catalogs["pt"];

        let mut missing: Vec<&String> = en.keys().filter(|k| !pt.contains_key(*k)).collect();
        missing.sort();
        assert!(missing.is_empty(), "faltando em pt: {missing:?}");
    }

    #[test]
    fn falls_back_to_english_then_code() {
        let store = I18nStore::embedded().unwrap();

        assert_eq!(store.translate("de", "name_required"), "Name is required.");
        assert_eq!(store.translate("pt", "name_required"), "O nome é obrigatório.");
        assert_eq!(store.translate("pt", "no_such_code"), "no_such_code");
    }
}
