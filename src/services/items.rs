use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_PRICED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][^$\n]*?)\s*\$(\d+(?:\.\d{1,2})?)").unwrap());

const MIN_NAME_CHARS: usize = 3;
const MAX_NAME_CHARS: usize = 100;

/// A priced line entry found in menu text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
}

/// Pulls `(name, price)` pairs out of free text.
pub trait ItemExtractor: Send + Sync {
    fn extract_items(&self, text: &str) -> Vec<MenuItem>;

    /// True when `line` carries a price and so closes an item entry.
    fn is_item_line(&self, line: &str) -> bool {
        line.contains('$')
    }
}

/// Matches a capitalized name followed by a dollar amount on the same line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceLineExtractor;

impl ItemExtractor for PriceLineExtractor {
    fn extract_items(&self, text: &str) -> Vec<MenuItem> {
        RE_PRICED_NAME
            .captures_iter(text)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().trim().trim_end_matches([':', '.', '-']);
                let name = name.trim_end();
                let len = name.chars().count();
                if len <= MIN_NAME_CHARS || len >= MAX_NAME_CHARS {
                    return None;
                }
                let price = caps.get(2)?.as_str().parse().ok()?;
                Some(MenuItem {
                    name: name.to_string(),
                    price,
                })
            })
            .collect()
    }
}
