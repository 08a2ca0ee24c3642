//! Keyword sets driving request classification
//!
//! The sets ship with the Portuguese vocabulary of the deployed platform but
//! are plain configuration: a config file can replace any of them without a
//! code change. Matching is substring containment over the lowercased input.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Temporal, price, weather, and site terms that require fresh web data
const WEB_SEARCH_DEFAULTS: &[&str] = &[
    "pesquisar",
    "buscar",
    "notícias",
    "atual",
    "recente",
    "hoje",
    "agora",
    "últimas",
    "novidades",
    "tendências",
    "preços",
    "cotação",
    "mercado",
    "tempo",
    "clima",
    "previsão",
    "eventos",
    "acontecimentos",
    "quanto custa",
    "quanto está",
    "google",
    "youtube",
];

/// Writing and invention requests
const CREATIVE_DEFAULTS: &[&str] = &[
    "criar",
    "escrever",
    "redigir",
    "poema",
    "poesia",
    "conto",
    "narrativa",
    "roteiro",
    "slogan",
    "paródia",
    "imagine",
    "inventar",
];

/// Programming and IT support vocabulary
const TECHNICAL_DEFAULTS: &[&str] = &[
    "código",
    "programação",
    "programar",
    "algoritmo",
    "javascript",
    "python",
    "html",
    "css",
    "sql",
    "api",
    "banco de dados",
    "servidor",
    "software",
    "hardware",
    "instalar",
    "configurar",
    "debug",
    "planilha",
];

/// School-subject and deep-explanation terms that mark a heavyweight request
const COMPLEX_DEFAULTS: &[&str] = &[
    "explicar detalhadamente",
    "explique detalhadamente",
    "explicação detalhada",
    "demonstração",
    "demonstrar",
    "prova",
    "provar",
    "análise",
    "analisar",
    "síntese",
    "sintetizar",
    "comparar",
    "comparação",
    "processo complexo",
    "teorema",
    "fórmula",
    "cálculo",
    "calcular",
    "derivada",
    "derivar",
    "integral",
    "integrar",
    "limite",
    "continuidade",
    "estatística",
    "probabilidade",
    "vetores",
    "matriz",
    "logaritmo",
    "exponencial",
    "equação",
    "equações",
    "gráfico",
    "gráficos",
    "função",
    "funções",
    "geometria",
    "trigonometria",
    "álgebra",
    "física",
    "química",
    "biologia",
    "história",
    "filosofia",
    "literatura",
    "redação",
];

static DEFAULT_KEYWORDS: Lazy<KeywordConfig> = Lazy::new(|| KeywordConfig {
    web_search: owned(WEB_SEARCH_DEFAULTS),
    creative: owned(CREATIVE_DEFAULTS),
    technical: owned(TECHNICAL_DEFAULTS),
    complex: owned(COMPLEX_DEFAULTS),
});

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Classifier vocabulary, one list per signal
///
/// Lists are stored lowercase; callers must lowercase the probe text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Terms that require fresh web data
    #[serde(default)]
    pub web_search: Vec<String>,
    /// Terms marking creative-writing requests
    #[serde(default)]
    pub creative: Vec<String>,
    /// Terms marking programming/IT requests
    #[serde(default)]
    pub technical: Vec<String>,
    /// Terms marking analytically heavy requests
    #[serde(default)]
    pub complex: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        DEFAULT_KEYWORDS.clone()
    }
}

impl KeywordConfig {
    /// True when the lowercased text contains any web-search term
    pub fn matches_web_search(&self, lower_text: &str) -> bool {
        hit(&self.web_search, lower_text)
    }

    /// True when the lowercased text contains any creative term
    pub fn matches_creative(&self, lower_text: &str) -> bool {
        hit(&self.creative, lower_text)
    }

    /// True when the lowercased text contains any technical term
    pub fn matches_technical(&self, lower_text: &str) -> bool {
        hit(&self.technical, lower_text)
    }

    /// True when the lowercased text contains any complex term
    pub fn matches_complex(&self, lower_text: &str) -> bool {
        hit(&self.complex, lower_text)
    }

    /// Merge with another keyword config (other takes precedence)
    pub fn merge(&mut self, other: KeywordConfig) {
        if !other.web_search.is_empty() {
            self.web_search = other.web_search;
        }
        if !other.creative.is_empty() {
            self.creative = other.creative;
        }
        if !other.technical.is_empty() {
            self.technical = other.technical;
        }
        if !other.complex.is_empty() {
            self.complex = other.complex;
        }
    }
}

fn hit(set: &[String], text: &str) -> bool {
    set.iter().any(|kw| text.contains(kw.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sets_match_expected_terms() {
        let kw = KeywordConfig::default();
        assert!(kw.matches_web_search("buscar notícias de hoje"));
        assert!(kw.matches_complex("calcular a derivada de x²"));
        assert!(kw.matches_creative("escrever um poema"));
        assert!(kw.matches_technical("erro no código python"));
        assert!(!kw.matches_web_search("oi"));
    }

    #[test]
    fn merge_keeps_defaults_for_empty_lists() {
        let mut kw = KeywordConfig::default();
        let replacement = KeywordConfig {
            web_search: vec!["latest".to_string()],
            creative: vec![],
            technical: vec![],
            complex: vec![],
        };
        kw.merge(replacement);
        assert!(kw.matches_web_search("latest news"));
        assert!(!kw.matches_web_search("buscar"));
        assert!(kw.matches_complex("análise"));
    }
}
