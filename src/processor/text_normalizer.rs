use anyhow::Result;
use regex::Regex;
use unidecode::unidecode;

use crate::config::NormalizerConfig;

/// Reduces a product name to the words that identify the product.
pub struct TextNormalizer {
    stop_words: Option<Regex>,
}

impl TextNormalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        // Stop words go through the same folding as names so "grãos" still
        // matches once accents are gone. Phrases match across any whitespace.
        let mut alternatives: Vec<String> = config
            .stop_words
            .iter()
            .map(|word| {
                strip_symbols(&remove_digits(&transliterate(word)))
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .filter(|word| !word.is_empty())
            .collect();

        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        alternatives.dedup();

        let stop_words = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|")))?)
        };

        Ok(TextNormalizer { stop_words })
    }

    pub fn normalize(&self, name: &str) -> String {
        let mut cleaned = strip_symbols(&remove_digits(&transliterate(name)));

        // Removing one stop word can join the halves of a phrase, so repeat
        // until nothing matches.
        if let Some(ref stop_words) = self.stop_words {
            loop {
                let next = stop_words.replace_all(&cleaned, "").into_owned();
                if next == cleaned {
                    break;
                }
                cleaned = next;
            }
        }

        collapse_whitespace(&cleaned)
    }
}

/// Lower-case and transliterate to ASCII.
pub fn transliterate(text: &str) -> String {
    unidecode(&text.to_lowercase()).to_lowercase()
}

/// Search terms are sent to retailers without accents or symbols.
pub fn clean_search_term(term: &str) -> String {
    collapse_whitespace(&strip_symbols(&transliterate(term)))
}

fn remove_digits(text: &str) -> String {
    text.chars().filter(|c| !c.is_numeric()).collect()
}

fn strip_symbols(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(&NormalizerConfig::default()).unwrap()
    }

    #[test]
    fn test_strips_accents_digits_and_filler() {
        let n = normalizer();

        assert_eq!(n.normalize("Arroz Tradicional 1kg"), "arroz");
        assert_eq!(n.normalize("arroz 1 kg"), "arroz");
        assert_eq!(n.normalize("Feijão Carioca Pacote 1kg"), "feijao carioca");
        assert_eq!(n.normalize("Café Pilão Torrado 500g"), "cafe pilao torrado");
        assert_eq!(n.normalize("Pão na Chapa com Manteiga"), "pao manteiga");
        assert_eq!(n.normalize("Grãos de Bico 500 gramas"), "de bico");
    }

    #[test]
    fn test_punctuation_becomes_separator() {
        let n = normalizer();

        assert_eq!(n.normalize("Leite UHT Integral - 1,5L"), "leite uht integral");
        assert_eq!(n.normalize("Refri. Guaraná (2L)"), "refri guarana");
        assert_eq!(n.normalize("azeite_extra/virgem"), "azeite extra virgem");
    }

    #[test]
    fn test_stop_words_only_match_whole_words() {
        let n = normalizer();

        // "g" and "l" are stop words but must not eat letters inside words
        assert_eq!(n.normalize("Gelatina Limão"), "gelatina limao");
        assert_eq!(n.normalize("Comida Completa"), "comida completa");
    }

    #[test]
    fn test_phrase_split_by_another_stop_word() {
        let n = normalizer();

        assert_eq!(n.normalize("Pão na com chapa"), "pao");
    }

    #[test]
    fn test_degenerate_input_yields_empty() {
        let n = normalizer();

        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("    \t "), "");
        assert_eq!(n.normalize("!!! --- ??? %%"), "");
        assert_eq!(n.normalize("500g"), "");
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        let samples = [
            "Arroz Tradicional Tio João 5kg",
            "Pão na com chapa",
            "ÓLEO DE SOJA Soya 900ml",
            "Açúcar Refinado União 1kg",
            "Straße Œuvre Ærø",
            "  Suco   de   Laranja (1L)  ",
        ];

        for sample in samples {
            let once = n.normalize(sample);
            assert_eq!(n.normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_custom_vocabulary() {
        let config = NormalizerConfig {
            stop_words: vec!["caixa".to_string(), "lata".to_string()],
        };
        let n = TextNormalizer::new(&config).unwrap();

        assert_eq!(n.normalize("Leite Caixa com Tampa"), "leite com tampa");
        assert_eq!(n.normalize("Milho Lata 200g"), "milho g");

        let empty = TextNormalizer::new(&NormalizerConfig { stop_words: vec![] }).unwrap();
        assert_eq!(empty.normalize("Arroz Pacote 1kg"), "arroz pacote kg");
    }

    #[test]
    fn test_transliterate_special_letters() {
        assert_eq!(transliterate("Ação Ñandú"), "acao nandu");
        assert_eq!(transliterate("Straße"), "strasse");
        assert_eq!(transliterate("nº 1"), "no 1");
    }

    #[test]
    fn test_letters_without_decomposition_become_ascii() {
        let n = normalizer();

        assert_eq!(n.normalize("Dıyarbakır Çay"), "diyarbakir cay");
        assert_eq!(n.normalize("Ħalva Łódź Øl"), "halva lodz ol");

        for name in ["Ŋoni Ŧest ĸ", "ŉ Þorn Đak", "Ðe Ĳssel"] {
            let normalized = n.normalize(name);
            assert!(normalized.is_ascii(), "{:?} -> {:?}", name, normalized);
            assert!(!normalized.is_empty());
        }
    }

    #[test]
    fn test_clean_search_term_keeps_digits() {
        assert_eq!(clean_search_term("  Feijão  5kg! "), "feijao 5kg");
        assert_eq!(clean_search_term("café-torrado"), "cafe torrado");
    }
}
