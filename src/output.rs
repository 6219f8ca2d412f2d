//! Human and JSON renderings of a parsed model.

use crate::profile::Model;

/// Format the hottest entries for human consumption: summary counts, then
/// one row per entry with its share of the maximum inclusive cost.
pub fn format_human(model: &Model, limit: usize) -> String {
    let mut output = model.stats().to_string();
    output.push('\n');

    let entries: Vec<_> = model.entries().collect();
    if entries.is_empty() {
        output.push_str("No entries.\n");
        return output;
    }

    let max_cost = model
        .total_cost(entries[0].0)
        .first()
        .copied()
        .unwrap_or(0)
        .max(1);

    for (id, entry) in entries.iter().take(limit) {
        let total = model.total_cost(*id).first().copied().unwrap_or(0);
        let position = model.position(entry.position);
        let percent = (total as u128 * 100 / max_cost as u128) as u64;
        output.push_str(&format!(
            "{:>4}% {:>14}  {}::{}\n",
            percent, total, position.binary, position.symbol
        ));
    }

    output
}

/// Format the whole model as JSON.
pub fn format_json(model: &Model) -> String {
    serde_json::to_string_pretty(model).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::parse_str;

    const INPUT: &str = "events: Ir\npositions: line\n\n\
                         fl=(1) a.c\nfn=(1) f\n10 50\ncfn=(2) g\ncalls=3 20\n11 200\n\n\
                         fl=(1)\nfn=(2)\n20 70\n";

    #[test]
    fn test_format_human_lists_hottest_first() {
        let model = parse_str(INPUT).unwrap();
        let text = format_human(&model, 20);
        assert!(text.contains("Entries:"));
        let f_at = text.find("::f").unwrap();
        let g_at = text.find("::g").unwrap();
        assert!(f_at < g_at);
        assert!(text.contains("100%"));
    }

    #[test]
    fn test_format_human_respects_limit() {
        let model = parse_str(INPUT).unwrap();
        let text = format_human(&model, 1);
        assert!(text.contains("::f"));
        assert!(!text.contains("::g"));
    }

    #[test]
    fn test_format_human_empty_model() {
        let model = parse_str("").unwrap();
        assert!(format_human(&model, 20).contains("No entries."));
    }

    #[test]
    fn test_format_json_is_valid() {
        let model = parse_str(INPUT).unwrap();
        let value: serde_json::Value = serde_json::from_str(&format_json(&model)).unwrap();
        assert_eq!(value["events"][0], "Ir");
    }
}
