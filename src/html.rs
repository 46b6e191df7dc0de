use std::collections::HashMap;

use crate::dom::Dom;
use crate::{Error, Result};

/// Elements whose body is kept verbatim up to the matching end tag.
const RAW_TEXT_TAGS: [&str; 3] = ["script", "style", "textarea"];

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();

    let mut stack = vec![dom.root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            if let Some(end) = find_subslice(bytes, i + 4, b"-->") {
                i = end + 3;
            } else {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if RAW_TEXT_TAGS.contains(&tag.as_str()) && !self_closing {
                let close = find_case_insensitive_raw_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        let body = if tag == "textarea" {
                            decode_html_character_references(body)
                        } else {
                            body.to_string()
                        };
                        dom.create_text(node, body);
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;

            // Stray end tags are ignored; otherwise close everything up to
            // and including the matching open element.
            let open_pos = stack
                .iter()
                .skip(1)
                .rposition(|node| dom.tag_name(*node) == Some(tag.as_str()));
            if let Some(pos) = open_pos {
                stack.truncate(pos + 1);
            }
            continue;
        }

        if starts_with_at(bytes, i, b"<!") {
            i = parse_declaration_tag(html, i)?;
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let decoded = decode_html_character_references(text);
            if !decoded.is_empty() {
                dom.create_text(parent, decoded);
            }
        }
    }

    Ok(dom)
}

fn decode_html_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint =
            if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                value.parse::<u32>().ok()?
            };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "copy" => Some('©'),
            "hellip" => Some('…'),
            "rsquo" => Some('’'),
            "lsquo" => Some('‘'),
            "ldquo" => Some('“'),
            "rdquo" => Some('”'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let decoded = tail.find(';').and_then(|semi| {
            let raw = &tail[..semi];
            let ch = match raw.strip_prefix('#') {
                Some(numeric) => decode_numeric(numeric),
                None => decode_named(raw),
            }?;
            Some((ch, semi + 1))
        });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, HashMap<String, String>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs = HashMap::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}>")));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
            self_closing = true;
            i += 2;
            break;
        }

        if !is_attr_name_char(bytes[i]) {
            // Skip junk such as a stray '/' or quote between attributes.
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        // Duplicate attributes: the first occurrence wins.
        attrs.entry(name).or_insert(value);
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_declaration_tag(html: &str, at: usize) -> Result<usize> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'>' => return Ok(i + 1),
                _ => {}
            },
        }
        i += 1;
    }

    Err(Error::HtmlParse("unclosed declaration tag".into()))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
        *i += 1;
        return Ok(decode_html_character_references(value));
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>'))
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
    Ok(decode_html_character_references(value))
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window == needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn find_case_insensitive_raw_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let tag_end = j + tag.len();
            if tag_end <= bytes.len() && bytes[j..tag_end].eq_ignore_ascii_case(tag) {
                if tag_end >= bytes.len() || !bytes[tag_end].is_ascii_alphanumeric() {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_markup_builds_the_expected_tree() -> Result<()> {
        let dom = parse_html(
            r#"<!DOCTYPE html>
            <html><body>
              <form method="POST" action="/lists/new">
                <input name="text" id="id_text" class="form-control input-lg" autofocus>
                <div class="form-group has-error"><span class="help-block">Oops</span></div>
              </form>
            </body></html>"#,
        )?;
        let input = dom.query_selector("form > input")?;
        assert!(input.is_some());
        let input = input.ok_or_else(|| Error::SelectorNotFound("form > input".into()))?;
        assert_eq!(dom.attr(input, "autofocus").as_deref(), Some(""));
        assert_eq!(dom.attr(input, "class").as_deref(), Some("form-control input-lg"));
        let help = dom.query_selector("form .has-error > .help-block")?;
        assert_eq!(help.map(|node| dom.text_content(node)).as_deref(), Some("Oops"));
        Ok(())
    }

    #[test]
    fn void_and_self_closing_tags_do_not_swallow_siblings() -> Result<()> {
        let dom = parse_html(r#"<div><input name="text"><br/><span>x</span></div>"#)?;
        assert!(dom.query_selector("div > span")?.is_some());
        assert!(dom.query_selector("input span")?.is_none());
        Ok(())
    }

    #[test]
    fn character_references_are_decoded_in_text_and_attributes() -> Result<()> {
        let dom = parse_html(
            r#"<p title="You&#x27;ve &amp; me">You can&#39;t &lt;b&gt; &bogus; &amp</p>"#,
        )?;
        let p = dom
            .query_selector("p")?
            .ok_or_else(|| Error::SelectorNotFound("p".into()))?;
        assert_eq!(dom.attr(p, "title").as_deref(), Some("You've & me"));
        assert_eq!(dom.text_content(p), "You can't <b> &bogus; &amp");
        Ok(())
    }

    #[test]
    fn script_and_style_bodies_stay_raw() -> Result<()> {
        let dom = parse_html(
            "<script>if (a < b) { x = '</div>'; }</script><style>p > a {}</style><p>after</p>",
        )?;
        let script = dom
            .query_selector("script")?
            .ok_or_else(|| Error::SelectorNotFound("script".into()))?;
        assert_eq!(dom.text_content(script), "if (a < b) { x = '</div>'; }");
        assert!(dom.query_selector("body p, p")?.is_some());
        assert!(dom.query_selector("div")?.is_none());
        Ok(())
    }

    #[test]
    fn stray_end_tags_are_ignored() -> Result<()> {
        let dom = parse_html("<div id='a'></span><p id='b'></p></div>")?;
        assert!(dom.query_selector("#a > #b")?.is_some());
        Ok(())
    }

    #[test]
    fn comments_and_lone_angle_brackets() -> Result<()> {
        let dom = parse_html("<p>1 < 2<!-- <div> --></p>")?;
        assert!(dom.query_selector("div")?.is_none());
        let p = dom
            .query_selector("p")?
            .ok_or_else(|| Error::SelectorNotFound("p".into()))?;
        assert_eq!(dom.text_content(p), "1 < 2");
        Ok(())
    }

    #[test]
    fn malformed_markup_is_rejected() {
        for html in ["<div", "<!-- open", "<p title='x>", "<script>never closed", "</div"] {
            assert!(
                matches!(parse_html(html), Err(Error::HtmlParse(_))),
                "markup should be rejected: {html:?}"
            );
        }
    }
}
