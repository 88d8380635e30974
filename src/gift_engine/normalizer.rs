//! Price and free-text normalization helpers

/// Keyword table mapping query fragments to descriptive gift tags.
/// Matching is case-insensitive and accumulative.
const TAG_KEYWORDS: &[(&[&str], &str)] = &[
    (&["romântico", "amor"], "Romântico"),
    (&["tecnológico", "tech"], "Tecnológico"),
    (&["útil", "prático"], "Útil"),
    (&["divertido", "diversão"], "Divertido"),
    (&["experiência", "vivencia"], "Experiência"),
];

const DEFAULT_TAGS: &[&str] = &["Útil", "Qualidade"];

/// Parses a loosely formatted price string ("R$ 1.234,56") into a number.
///
/// Everything except digits, commas and dots is discarded. When a comma is
/// present it is the decimal separator and dots are thousands separators;
/// otherwise a dot is the decimal point. Unparseable input yields 0.0.
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = match cleaned.rfind(',') {
        Some(pos) => {
            let (int_part, dec_part) = cleaned.split_at(pos);
            format!(
                "{}.{}",
                int_part.replace(['.', ','], ""),
                dec_part[1..].replace(['.', ','], "")
            )
        }
        None => cleaned,
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// Derives descriptive tags from a free-text search query.
pub fn tags_from_query(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut tags: Vec<String> = TAG_KEYWORDS
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, tag)| tag.to_string())
        .collect();

    if tags.is_empty() {
        tags = DEFAULT_TAGS.iter().map(|t| t.to_string()).collect();
    }

    tags
}

/// Truncates a string to at most `max` characters without splitting a char.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_brazilian_price_format() {
        assert_eq!(parse_price("R$ 1.234,56"), 1234.56);
        assert_eq!(parse_price("R$ 29,90"), 29.90);
        assert_eq!(parse_price("1234"), 1234.0);
    }

    #[test]
    fn parses_dot_decimal_when_no_comma() {
        assert_eq!(parse_price("29.90"), 29.90);
    }

    #[test]
    fn unparseable_prices_become_zero() {
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("abc"), 0.0);
        assert_eq!(parse_price("R$ "), 0.0);
    }

    #[test]
    fn query_keywords_map_to_tags() {
        assert_eq!(tags_from_query("presente romântico"), vec!["Romântico"]);
        assert_eq!(
            tags_from_query("algo tech e divertido"),
            vec!["Tecnológico", "Divertido"]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(tags_from_query("ROMÂNTICO"), vec!["Romântico"]);
    }

    #[test]
    fn unmatched_query_gets_default_tags() {
        assert_eq!(tags_from_query("caneca azul"), vec!["Útil", "Qualidade"]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("relógio", 4), "reló");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
