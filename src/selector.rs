use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrMatcher {
    Exists { key: String },
    Equals { key: String, value: String },
    Prefix { key: String, value: String },
    Suffix { key: String, value: String },
    Substring { key: String, value: String },
    Word { key: String, value: String },
    DashPrefix { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrMatcher>,
}

impl Compound {
    pub(crate) fn id_only(&self) -> Option<&str> {
        if !self.universal && self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
        {
            self.id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) compound: Compound,
    // Relation to the previous (left) compound in the chain.
    pub(crate) combinator: Option<Combinator>,
}

pub(crate) fn parse_selector_list(selector: &str) -> Result<Vec<Vec<Link>>> {
    let groups = split_selector_groups(selector)?;
    let mut parsed = Vec::with_capacity(groups.len());
    for group in groups {
        parsed.push(parse_complex_selector(&group)?);
    }
    Ok(parsed)
}

pub(crate) fn parse_complex_selector(selector: &str) -> Result<Vec<Link>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let tokens = tokenize_selector(selector)?;
    let mut links = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokens {
        if token == ">" || token == "+" || token == "~" {
            if pending.is_some() || links.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending = Some(match token.as_str() {
                ">" => Combinator::Child,
                "+" => Combinator::NextSibling,
                "~" => Combinator::SubsequentSibling,
                _ => unreachable!(),
            });
            continue;
        }

        let compound = parse_compound(&token)?;
        let combinator = if links.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        links.push(Link {
            compound,
            combinator,
        });
    }

    if links.is_empty() || pending.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    Ok(links)
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            ',' if bracket_depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 {
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
    let mut bracket_depth = 0usize;

    for ch in selector.chars() {
        match ch {
            '[' => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            '>' | '+' | '~' if bracket_depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(ch.to_string());
            }
            ch if ch.is_ascii_whitespace() && bracket_depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    Ok(tokens)
}

fn parse_compound(part: &str) -> Result<Compound> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }

    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut compound = Compound::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if compound.universal {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                compound.universal = true;
                i += 1;
            }
            b'#' => {
                i += 1;
                let Some((id, next)) = parse_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                if compound.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            b'.' => {
                i += 1;
                let Some((class_name, next)) = parse_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                compound.classes.push(class_name);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_attr_matcher(part, i)?;
                compound.attrs.push(attr);
                i = next;
            }
            // Pseudo-classes and pseudo-elements are out of scope.
            b':' => {
                return Err(Error::UnsupportedSelector(part.into()));
            }
            _ => {
                if compound.tag.is_some()
                    || compound.id.is_some()
                    || !compound.classes.is_empty()
                    || compound.universal
                {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let Some((tag, next)) = parse_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                compound.tag = Some(tag);
                i = next;
            }
        }
    }

    if compound.tag.is_none()
        && compound.id.is_none()
        && compound.classes.is_empty()
        && compound.attrs.is_empty()
        && !compound.universal
    {
        return Err(Error::UnsupportedSelector(part.into()));
    }
    Ok(compound)
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_ident_char(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_attr_key_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

enum AttrOp {
    Equals,
    Prefix,
    Suffix,
    Substring,
    Word,
    DashPrefix,
}

fn parse_attr_matcher(src: &str, open_bracket: usize) -> Result<(AttrMatcher, usize)> {
    let bytes = src.as_bytes();
    let mut i = open_bracket + 1;

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let key_start = i;
    while i < bytes.len() && is_attr_key_char(bytes[i]) {
        i += 1;
    }
    if key_start == i {
        return Err(Error::UnsupportedSelector(src.into()));
    }
    let key = src
        .get(key_start..i)
        .ok_or_else(|| Error::UnsupportedSelector(src.into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    if bytes[i] == b']' {
        return Ok((AttrMatcher::Exists { key }, i + 1));
    }

    let (op, next) = match bytes.get(i) {
        Some(b'=') => (AttrOp::Equals, i + 1),
        Some(b'^') if bytes.get(i + 1) == Some(&b'=') => (AttrOp::Prefix, i + 2),
        Some(b'$') if bytes.get(i + 1) == Some(&b'=') => (AttrOp::Suffix, i + 2),
        Some(b'*') if bytes.get(i + 1) == Some(&b'=') => (AttrOp::Substring, i + 2),
        Some(b'~') if bytes.get(i + 1) == Some(&b'=') => (AttrOp::Word, i + 2),
        Some(b'|') if bytes.get(i + 1) == Some(&b'=') => (AttrOp::DashPrefix, i + 2),
        _ => return Err(Error::UnsupportedSelector(src.into())),
    };

    i = next;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let (value, after_value) = parse_attr_value(src, i)?;

    i = after_value;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b']' {
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let matcher = match op {
        AttrOp::Equals => AttrMatcher::Equals { key, value },
        AttrOp::Prefix => AttrMatcher::Prefix { key, value },
        AttrOp::Suffix => AttrMatcher::Suffix { key, value },
        AttrOp::Substring => AttrMatcher::Substring { key, value },
        AttrOp::Word => AttrMatcher::Word { key, value },
        AttrOp::DashPrefix => AttrMatcher::DashPrefix { key, value },
    };

    Ok((matcher, i + 1))
}

fn parse_attr_value(src: &str, start: usize) -> Result<(String, usize)> {
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
                return Ok((unescape_attr_value(raw), i + 1));
            }
            i += 1;
        }
        return Err(Error::UnsupportedSelector(src.into()));
    }

    let value_start = start;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() || bytes[i] == b']' {
            break;
        }
        if bytes[i] == b'\\' {
            i = (i + 2).min(bytes.len());
            continue;
        }
        i += 1;
    }
    if i == value_start {
        return Ok((String::new(), i));
    }
    let raw = src
        .get(value_start..i)
        .ok_or_else(|| Error::UnsupportedSelector(src.into()))?;
    Ok((unescape_attr_value(raw), i))
}

// Backslash drops and the next char is taken literally.
fn unescape_attr_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        out.push(ch);
    }
    out
}
