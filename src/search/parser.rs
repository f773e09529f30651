//! Query understanding: free text to structured search filters
//!
//! Extracts a price bound, a category constraint, and a brand from a raw
//! query, leaving the remainder as cleaned text for the lexical path.
//! Parsing is pure and deterministic; it never fails, unknown tokens simply
//! stay in the cleaned text.

use crate::types::Category;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Category constraint extracted from a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    Single(Category),
    /// Bare "shoes"/"sneakers" means either shoe category
    Shoes,
}

impl CategoryFilter {
    /// Categories admitted by this filter
    pub fn categories(&self) -> &[Category] {
        match self {
            CategoryFilter::Single(c) => std::slice::from_ref(c),
            CategoryFilter::Shoes => &[Category::RunningShoes, Category::TrainingShoes],
        }
    }

    pub fn admits(&self, category: Category) -> bool {
        self.categories().contains(&category)
    }
}

/// Structured search parameters parsed from a query string
#[derive(Debug, Clone, Default)]
pub struct ParsedQuery {
    /// Remaining text with extracted spans removed and whitespace collapsed
    pub cleaned_text: String,
    pub category: Option<CategoryFilter>,
    pub brand: Option<String>,
    pub price_max: Option<Decimal>,
}

impl ParsedQuery {
    /// A query with only free text (no extracted filters)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            cleaned_text: text.into(),
            ..Default::default()
        }
    }

    pub fn has_filters(&self) -> bool {
        self.category.is_some() || self.brand.is_some() || self.price_max.is_some()
    }
}

/// Category keyword table; declaration order is match order, so the more
/// specific phrases come first.
static CATEGORY_KEYWORDS: &[(&str, Category)] = &[
    ("running shoes", Category::RunningShoes),
    ("training shoes", Category::TrainingShoes),
    ("gym shoes", Category::TrainingShoes),
    ("fitness equipment", Category::FitnessEquipment),
    ("fitness gear", Category::FitnessEquipment),
    ("apparel", Category::Apparel),
    ("clothes", Category::Apparel),
    ("clothing", Category::Apparel),
    ("accessories", Category::Accessories),
    ("recovery products", Category::Recovery),
    ("recovery gear", Category::Recovery),
    ("foam roller", Category::Recovery),
    ("massage gun", Category::Recovery),
];

/// Recognized brands (multi-word entries before their prefixes)
static BRANDS: &[&str] = &[
    "New Balance",
    "Under Armour",
    "Hydro Flask",
    "Nike",
    "Reebok",
    "Puma",
    "Bowflex",
    "TRX",
    "Rogue",
    "Concept2",
    "Peloton",
    "Lululemon",
    "Gymshark",
    "Patagonia",
    "Garmin",
    "Therabody",
    "Hyperice",
    "TriggerPoint",
    "Compex",
    "Chirp",
];

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b(?:under|below|less than)\b|<)\s*\$?\s*(\d+(?:\.\d{1,2})?)")
        .expect("price regex must compile")
});

/// Parse a raw query string into structured search parameters
pub fn parse(raw: &str) -> ParsedQuery {
    let mut text = raw.trim().to_lowercase();

    // Strip one layer of surrounding quotes
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = text[1..text.len() - 1].trim().to_string();
        }
    }

    // Price bound: "under $X" / "below $X"
    let mut price_max = None;
    if let Some(captures) = PRICE_RE.captures(&text) {
        if let Some(amount) = captures
            .get(1)
            .and_then(|m| Decimal::from_str(m.as_str()).ok())
        {
            if amount > Decimal::ZERO {
                price_max = Some(amount);
                let span = captures.get(0).expect("whole match");
                text = remove_span(&text, span.start(), span.end());
            }
        }
    }

    // Category keywords, first match by declaration order
    let mut category = None;
    for (keyword, matched) in CATEGORY_KEYWORDS {
        if let Some((start, end)) = find_whole_word(&text, keyword) {
            category = Some(CategoryFilter::Single(*matched));
            text = remove_span(&text, start, end);
            break;
        }
    }

    // Bare "shoes"/"sneakers" admits either shoe category
    if category.is_none() {
        for word in ["shoes", "sneakers"] {
            if let Some((start, end)) = find_whole_word(&text, word) {
                category = Some(CategoryFilter::Shoes);
                text = remove_span(&text, start, end);
                break;
            }
        }
    }

    // Known brands
    let mut brand = None;
    for name in BRANDS {
        if let Some((start, end)) = find_whole_word(&text, &name.to_lowercase()) {
            brand = Some(name.to_string());
            text = remove_span(&text, start, end);
            break;
        }
    }

    ParsedQuery {
        cleaned_text: collapse_whitespace(&text),
        category,
        brand,
        price_max,
    }
}

/// Find `phrase` in `text` as a whole-word substring: the characters on
/// either side of the match must not be alphanumeric.
fn find_whole_word(text: &str, phrase: &str) -> Option<(usize, usize)> {
    if phrase.is_empty() {
        return None;
    }

    for (start, _) in text.match_indices(phrase) {
        let end = start + phrase.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        let after_ok = text[end..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        if before_ok && after_ok {
            return Some((start, end));
        }
    }

    None
}

fn remove_span(text: &str, start: usize, end: usize) -> String {
    format!("{} {}", &text[..start], &text[end..])
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_is_deterministic_and_trim_insensitive() {
        let a = parse("running shoes under $150");
        let b = parse("running shoes under $150");
        let c = parse("running shoes under $150   ");
        assert_eq!(a.cleaned_text, b.cleaned_text);
        assert_eq!(a.price_max, b.price_max);
        assert_eq!(a.cleaned_text, c.cleaned_text);
        assert_eq!(a.price_max, c.price_max);
    }

    #[test]
    fn test_price_extraction() {
        let parsed = parse("running shoes under $150");
        assert_eq!(parsed.price_max, Some(dec!(150)));
        assert_eq!(
            parsed.category,
            Some(CategoryFilter::Single(Category::RunningShoes))
        );
        assert!(!parsed.cleaned_text.contains("under"));
        assert!(!parsed.cleaned_text.contains("150"));
        assert!(!parsed.cleaned_text.contains("running shoes"));
    }

    #[test]
    fn test_price_decimal_and_below() {
        assert_eq!(parse("gear below $49.99").price_max, Some(dec!(49.99)));
        assert_eq!(parse("gear less than 30").price_max, Some(dec!(30)));
        assert_eq!(parse("gear < $25").price_max, Some(dec!(25)));
    }

    #[test]
    fn test_category_first_match_by_declaration_order() {
        // "gym shoes" maps to Training Shoes even though "shoes" alone
        // would match the shoe pair
        let parsed = parse("gym shoes for lifting");
        assert_eq!(
            parsed.category,
            Some(CategoryFilter::Single(Category::TrainingShoes))
        );
        assert_eq!(parsed.cleaned_text, "for lifting");
    }

    #[test]
    fn test_bare_shoes_matches_both_shoe_categories() {
        let parsed = parse("shoes under $150");
        assert_eq!(parsed.category, Some(CategoryFilter::Shoes));
        assert_eq!(parsed.price_max, Some(dec!(150)));
        assert!(parsed
            .category
            .as_ref()
            .unwrap()
            .admits(Category::RunningShoes));
        assert!(parsed
            .category
            .as_ref()
            .unwrap()
            .admits(Category::TrainingShoes));
        assert!(!parsed
            .category
            .as_ref()
            .unwrap()
            .admits(Category::Recovery));
    }

    #[test]
    fn test_whole_word_only() {
        // "snowshoes" must not trigger the shoe filter
        let parsed = parse("snowshoes for winter");
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.cleaned_text, "snowshoes for winter");
    }

    #[test]
    fn test_brand_extraction() {
        let parsed = parse("nike running shoes");
        assert_eq!(parsed.brand, Some("Nike".to_string()));
        assert_eq!(
            parsed.category,
            Some(CategoryFilter::Single(Category::RunningShoes))
        );
        assert_eq!(parsed.cleaned_text, "");
    }

    #[test]
    fn test_multiword_brand() {
        let parsed = parse("new balance trainers");
        assert_eq!(parsed.brand, Some("New Balance".to_string()));
        assert_eq!(parsed.cleaned_text, "trainers");
    }

    #[test]
    fn test_unknown_tokens_stay_in_cleaned_text() {
        let parsed = parse("gear for my first marathon");
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.brand, None);
        assert_eq!(parsed.price_max, None);
        assert_eq!(parsed.cleaned_text, "gear for my first marathon");
    }

    #[test]
    fn test_surrounding_quotes_stripped() {
        let parsed = parse("\"foam roller\"");
        assert_eq!(
            parsed.category,
            Some(CategoryFilter::Single(Category::Recovery))
        );
        assert_eq!(parsed.cleaned_text, "");
    }

    #[test]
    fn test_parse_never_fails_on_degenerate_input() {
        for input in ["", "   ", "$", "under $", "\"\"", "<"] {
            let parsed = parse(input);
            assert!(parsed.price_max.is_none());
        }
    }
}
