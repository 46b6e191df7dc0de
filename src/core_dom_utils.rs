use std::collections::HashMap;

pub(crate) fn has_class(attrs: &HashMap<String, String>, class_name: &str) -> bool {
    attrs
        .get("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

pub(crate) fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

/// `backgroundColor` -> `background-color`. Names already in kebab-case pass
/// through unchanged.
pub(crate) fn js_prop_to_css_name(prop: &str) -> String {
    let mut out = String::new();
    for ch in prop.trim().chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub(crate) fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    for decl in style_attr.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        if let Some(pos) = out.iter().position(|(existing, _)| existing == &name) {
            out[pos].1 = value;
        } else {
            out.push((name, value));
        }
    }

    out
}

pub(crate) fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    let mut out = String::new();
    for (idx, (name, value)) in decls.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push(';');
    }
    out
}

/// Largest length `parse_css_px` returns; bigger values are clamped to it.
const MAX_CSS_PX: i64 = 1 << 40;

/// Parses a non-negative CSS length in `px` (or unitless `0`) into whole
/// pixels. Other units are not resolved.
pub(crate) fn parse_css_px(value: &str) -> Option<i64> {
    let value = value.trim().to_ascii_lowercase();
    if value == "0" {
        return Some(0);
    }
    let number = value.strip_suffix("px")?.trim();
    let parsed = number.parse::<f64>().ok()?;
    if !parsed.is_finite() || parsed < 0.0 {
        return None;
    }
    Some((parsed.round() as i64).min(MAX_CSS_PX))
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}

pub(crate) fn escape_html_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_declarations_keep_last_duplicate_in_first_position() {
        let decls = parse_style_declarations(Some("display:block; color: red;DISPLAY: none"));
        assert_eq!(
            decls,
            vec![
                ("display".to_string(), "none".to_string()),
                ("color".to_string(), "red".to_string()),
            ]
        );
        assert_eq!(
            serialize_style_declarations(&decls),
            "display: none; color: red;"
        );
    }

    #[test]
    fn malformed_declarations_are_skipped() {
        let decls = parse_style_declarations(Some(";;color;:red; width: 10px"));
        assert_eq!(decls, vec![("width".to_string(), "10px".to_string())]);
    }

    #[test]
    fn css_px_lengths() {
        assert_eq!(parse_css_px("120px"), Some(120));
        assert_eq!(parse_css_px(" 12.6PX "), Some(13));
        assert_eq!(parse_css_px("0"), Some(0));
        assert_eq!(parse_css_px("50%"), None);
        assert_eq!(parse_css_px("-4px"), None);
        assert_eq!(parse_css_px("auto"), None);
        assert_eq!(parse_css_px("1e300px"), Some(MAX_CSS_PX));
    }

    #[test]
    fn camel_case_props_become_kebab_case() {
        assert_eq!(js_prop_to_css_name("backgroundColor"), "background-color");
        assert_eq!(js_prop_to_css_name("display"), "display");
        assert_eq!(js_prop_to_css_name("font-size"), "font-size");
    }

    #[test]
    fn escaping_covers_quotes_only_in_attributes() {
        assert_eq!(escape_html_text("a<b & 'c'"), "a&lt;b &amp; 'c'");
        assert_eq!(
            escape_html_attr("\"x\" & 'y'"),
            "&quot;x&quot; &amp; &#x27;y&#x27;"
        );
    }

    #[test]
    fn truncation_marks_cut_text() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
