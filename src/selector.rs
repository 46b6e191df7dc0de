use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
    Includes { key: String, value: String },
}

impl SelectorAttrCondition {
    pub(crate) fn matches(&self, actual: Option<&String>) -> bool {
        match (self, actual) {
            (Self::Exists { .. }, actual) => actual.is_some(),
            (_, None) => false,
            (Self::Eq { value, .. }, Some(actual)) => actual == value,
            (Self::StartsWith { value, .. }, Some(actual)) => {
                !value.is_empty() && actual.starts_with(value.as_str())
            }
            (Self::EndsWith { value, .. }, Some(actual)) => {
                !value.is_empty() && actual.ends_with(value.as_str())
            }
            (Self::Contains { value, .. }, Some(actual)) => {
                !value.is_empty() && actual.contains(value.as_str())
            }
            (Self::Includes { value, .. }, Some(actual)) => {
                actual.split_whitespace().any(|token| token == value)
            }
        }
    }

    pub(crate) fn key(&self) -> &str {
        match self {
            Self::Exists { key }
            | Self::Eq { key, .. }
            | Self::StartsWith { key, .. }
            | Self::EndsWith { key, .. }
            | Self::Contains { key, .. }
            | Self::Includes { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorPseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Not(Vec<Vec<SelectorPart>>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
    pub(crate) pseudo_classes: Vec<SelectorPseudoClass>,
}

impl SelectorStep {
    pub(crate) fn id_only(&self) -> Option<&str> {
        if !self.universal
            && self.tag.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudo_classes.is_empty()
        {
            self.id.as_deref()
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && !self.universal
            && self.pseudo_classes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to previous (left) selector part.
    pub(crate) combinator: Option<SelectorCombinator>,
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let groups = split_selector_groups(selector)?;
    let mut parsed = Vec::with_capacity(groups.len());
    for group in groups {
        parsed.push(parse_selector_chain(&group)?);
    }
    Ok(parsed)
}

fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let tokens = tokenize_selector(selector)?;
    let mut steps = Vec::new();
    let mut pending_combinator: Option<SelectorCombinator> = None;

    for token in tokens {
        let combinator = match token.as_str() {
            ">" => Some(SelectorCombinator::Child),
            "+" => Some(SelectorCombinator::AdjacentSibling),
            "~" => Some(SelectorCombinator::GeneralSibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if pending_combinator.is_some() || steps.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending_combinator = Some(combinator);
            continue;
        }

        let step = parse_selector_step(&token)?;
        let combinator = if steps.is_empty() {
            None
        } else {
            Some(
                pending_combinator
                    .take()
                    .unwrap_or(SelectorCombinator::Descendant),
            )
        };
        steps.push(SelectorPart { step, combinator });
    }

    if steps.is_empty() || pending_combinator.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    Ok(steps)
}

/// Tracks bracket/paren nesting and quoted strings so separators inside
/// `[name="a, b"]` or `:not(a > b)` are not treated as top level.
#[derive(Debug, Default)]
struct NestingState {
    bracket_depth: usize,
    paren_depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl NestingState {
    fn feed(&mut self, ch: char) -> std::result::Result<(), ()> {
        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == q {
                self.quote = None;
            }
            return Ok(());
        }
        match ch {
            '"' | '\'' if self.bracket_depth > 0 || self.paren_depth > 0 => self.quote = Some(ch),
            '[' => self.bracket_depth += 1,
            ']' => self.bracket_depth = self.bracket_depth.checked_sub(1).ok_or(())?,
            '(' => self.paren_depth += 1,
            ')' => self.paren_depth = self.paren_depth.checked_sub(1).ok_or(())?,
            _ => {}
        }
        Ok(())
    }

    fn at_top_level(&self) -> bool {
        self.quote.is_none() && self.bracket_depth == 0 && self.paren_depth == 0
    }

    fn is_balanced(&self) -> bool {
        self.at_top_level()
    }
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut state = NestingState::default();

    for ch in selector.chars() {
        if ch == ',' && state.at_top_level() {
            let trimmed = current.trim();
            if trimmed.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            groups.push(trimmed.to_string());
            current.clear();
            continue;
        }
        state
            .feed(ch)
            .map_err(|_| Error::UnsupportedSelector(selector.into()))?;
        current.push(ch);
    }

    if !state.is_balanced() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = NestingState::default();

    for ch in selector.chars() {
        if state.at_top_level() {
            match ch {
                '>' | '+' | '~' => {
                    if !current.trim().is_empty() {
                        tokens.push(current.trim().to_string());
                    }
                    current.clear();
                    tokens.push(ch.to_string());
                    continue;
                }
                ch if ch.is_ascii_whitespace() => {
                    if !current.trim().is_empty() {
                        tokens.push(current.trim().to_string());
                    }
                    current.clear();
                    continue;
                }
                _ => {}
            }
        }
        state
            .feed(ch)
            .map_err(|_| Error::UnsupportedSelector(selector.into()))?;
        current.push(ch);
    }

    if !state.is_balanced() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    Ok(tokens)
}

fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }

    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = SelectorStep::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || i != 0 {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let Some((id, next)) = parse_selector_ident(part, i + 1) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                if step.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            b'.' => {
                let Some((class_name, next)) = parse_selector_ident(part, i + 1) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.classes.push(class_name);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_selector_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            b':' => {
                let Some((pseudo, next)) = parse_selector_pseudo(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.pseudo_classes.push(pseudo);
                i = next;
            }
            _ => {
                if i != 0 {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let Some((tag, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    if step.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }
    Ok(step)
}

fn parse_selector_pseudo(part: &str, start: usize) -> Option<(SelectorPseudoClass, usize)> {
    if part.as_bytes().get(start)? != &b':' {
        return None;
    }
    let start = start + 1;
    let tail = part.get(start..)?;

    if let Some(rest) = tail.strip_prefix("not(") {
        let close_pos = find_matching_paren(rest)?;
        let body = rest[..close_pos].trim();
        if body.is_empty() {
            return None;
        }
        let inners = parse_selector_groups(body).ok()?;
        let next = start + "not(".len() + close_pos + 1;
        if let Some(ch) = part.as_bytes().get(next) {
            if !is_selector_continuation(ch) {
                return None;
            }
        }
        return Some((SelectorPseudoClass::Not(inners), next));
    }

    let (name, next) = parse_selector_ident(part, start)?;
    let pseudo = match name.as_str() {
        "first-child" => SelectorPseudoClass::FirstChild,
        "last-child" => SelectorPseudoClass::LastChild,
        "only-child" => SelectorPseudoClass::OnlyChild,
        "empty" => SelectorPseudoClass::Empty,
        _ => return None,
    };
    Some((pseudo, next))
}

fn find_matching_paren(body: &str) -> Option<usize> {
    let mut paren_depth = 1usize;
    let mut bracket_depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (idx, b) in body.bytes().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
                continue;
            }
            if b == b'\\' {
                escaped = true;
                continue;
            }
            if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'\'' | b'"' => quote = Some(b),
            b'[' => bracket_depth += 1,
            b']' => bracket_depth = bracket_depth.checked_sub(1)?,
            b'(' if bracket_depth == 0 => paren_depth += 1,
            b')' if bracket_depth == 0 => {
                paren_depth = paren_depth.checked_sub(1)?;
                if paren_depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_selector_continuation(next: &u8) -> bool {
    matches!(next, b'.' | b'#' | b'[' | b':')
}

fn parse_selector_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_selector_ident_char(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_selector_ident_char(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn is_selector_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_selector_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

fn skip_selector_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn parse_selector_attr_condition(
    src: &str,
    open_bracket: usize,
) -> Result<(SelectorAttrCondition, usize)> {
    let bytes = src.as_bytes();
    let mut i = open_bracket + 1;

    skip_selector_ws(bytes, &mut i);
    let key_start = i;
    while i < bytes.len() && is_selector_attr_name_char(bytes[i]) {
        i += 1;
    }
    if key_start == i {
        return Err(Error::UnsupportedSelector(src.into()));
    }
    let key = src
        .get(key_start..i)
        .ok_or_else(|| Error::UnsupportedSelector(src.into()))?
        .to_ascii_lowercase();

    skip_selector_ws(bytes, &mut i);
    if i >= bytes.len() {
        return Err(Error::UnsupportedSelector(src.into()));
    }
    if bytes[i] == b']' {
        return Ok((SelectorAttrCondition::Exists { key }, i + 1));
    }

    let (op, next) = match (bytes[i], bytes.get(i + 1)) {
        (b'=', _) => (b'=', i + 1),
        (b'^' | b'$' | b'*' | b'~', Some(b'=')) => (bytes[i], i + 2),
        _ => return Err(Error::UnsupportedSelector(src.into())),
    };

    i = next;
    skip_selector_ws(bytes, &mut i);
    let (value, after_value) = parse_selector_attr_value(src, i)?;
    i = after_value;
    skip_selector_ws(bytes, &mut i);
    if i >= bytes.len() || bytes[i] != b']' {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let cond = match op {
        b'=' => SelectorAttrCondition::Eq { key, value },
        b'^' => SelectorAttrCondition::StartsWith { key, value },
        b'$' => SelectorAttrCondition::EndsWith { key, value },
        b'*' => SelectorAttrCondition::Contains { key, value },
        _ => SelectorAttrCondition::Includes { key, value },
    };
    Ok((cond, i + 1))
}

fn parse_selector_attr_value(src: &str, start: usize) -> Result<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    if bytes[start] == b'"' || bytes[start] == b'\'' {
        let quote = bytes[start];
        let mut i = start + 1;
        while i < bytes.len() {
            if bytes[i] == b'\\' {
                i = (i + 2).min(bytes.len());
                continue;
            }
            if bytes[i] == quote {
                let raw = src
                    .get(start + 1..i)
                    .ok_or_else(|| Error::UnsupportedSelector(src.into()))?;
                return Ok((unescape_selector_string(raw), i + 1));
            }
            i += 1;
        }
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let mut i = start;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b']' {
        i += 1;
    }
    let raw = src
        .get(start..i)
        .ok_or_else(|| Error::UnsupportedSelector(src.into()))?;
    Ok((raw.to_string(), i))
}

fn unescape_selector_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
            continue;
        }
        out.push(ch);
    }
    out
}
