use anyhow::Result;
use regex::Regex;
use std::collections::HashMap;

use crate::config::QuantityConfig;
use crate::models::Quantity;

/// Pulls the first weight/volume token out of a product name.
pub struct QuantityExtractor {
    pattern: Regex,
    factors: HashMap<String, f64>,
}

impl QuantityExtractor {
    pub fn new(config: &QuantityConfig) -> Result<Self> {
        let factors: HashMap<String, f64> = config
            .units
            .iter()
            .map(|(unit, factor)| (unit.trim().to_lowercase(), *factor))
            .collect();

        // Longest unit first so "kg" is never read as "k" + "g"
        let mut units: Vec<&String> = factors.keys().collect();
        units.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = units
            .iter()
            .map(|u| regex::escape(u))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(
            r"(?i)([0-9]+(?:[.,][0-9]+)?)\s?({})",
            alternation
        ))?;

        Ok(QuantityExtractor { pattern, factors })
    }

    /// Grams (or millilitres) for the first match, `Quantity::Unknown` otherwise.
    pub fn extract(&self, name: &str) -> Quantity {
        let Some(captures) = self.pattern.captures(name) else {
            return Quantity::Unknown;
        };

        let amount = match captures[1].replace(',', ".").parse::<f64>() {
            Ok(amount) => amount,
            Err(_) => return Quantity::Unknown,
        };

        match self.factors.get(&captures[2].to_lowercase()) {
            Some(factor) => Quantity::Known(amount * factor),
            None => Quantity::Unknown,
        }
    }
}
