use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
}

impl SelectorStep {
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
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
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

pub(crate) fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    let tokens = tokenize_selector(selector)?;
    let mut parts = Vec::new();
    let mut pending_combinator: Option<SelectorCombinator> = None;

    for token in tokens {
        if token == ">" {
            if pending_combinator.is_some() || parts.is_empty() {
                return Err(Error::UnsupportedSelector(selector.into()));
            }
            pending_combinator = Some(SelectorCombinator::Child);
            continue;
        }

        let step = parse_selector_step(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(
                pending_combinator
                    .take()
                    .unwrap_or(SelectorCombinator::Descendant),
            )
        };
        parts.push(SelectorPart { step, combinator });
    }

    if parts.is_empty() || pending_combinator.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }

    Ok(parts)
}

fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(open_quote) = quote {
            current.push(ch);
            if ch == open_quote {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' if in_brackets => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                in_brackets = true;
                current.push(ch);
            }
            ']' => {
                in_brackets = false;
                current.push(ch);
            }
            ',' if !in_brackets => {
                if current.trim().is_empty() {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                groups.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }

    if quote.is_some() || in_brackets || current.trim().is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    groups.push(current);
    Ok(groups)
}

fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(open_quote) = quote {
            current.push(ch);
            if ch == open_quote {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' if in_brackets => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                in_brackets = true;
                current.push(ch);
            }
            ']' => {
                if !in_brackets {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                in_brackets = false;
                current.push(ch);
            }
            '>' if !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            _ if ch.is_ascii_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if quote.is_some() || in_brackets {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_selector_step(token: &str) -> Result<SelectorStep> {
    let mut step = SelectorStep::default();
    let chars = token.chars().collect::<Vec<_>>();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                step.universal = true;
                i += 1;
            }
            '#' => {
                let (name, next) = read_simple_name(&chars, i + 1);
                if name.is_empty() {
                    return Err(Error::UnsupportedSelector(token.into()));
                }
                step.id = Some(name);
                i = next;
            }
            '.' => {
                let (name, next) = read_simple_name(&chars, i + 1);
                if name.is_empty() {
                    return Err(Error::UnsupportedSelector(token.into()));
                }
                step.classes.push(name);
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|ch| *ch == ']')
                    .map(|offset| i + offset)
                    .ok_or_else(|| Error::UnsupportedSelector(token.into()))?;
                let inner = chars[i + 1..close].iter().collect::<String>();
                step.attrs.push(parse_attr_condition(&inner, token)?);
                i = close + 1;
            }
            ch if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' => {
                let (name, next) = read_simple_name(&chars, i);
                step.tag = Some(name.to_ascii_lowercase());
                i = next;
            }
            _ => return Err(Error::UnsupportedSelector(token.into())),
        }
    }

    if !step.universal
        && step.tag.is_none()
        && step.id.is_none()
        && step.classes.is_empty()
        && step.attrs.is_empty()
    {
        return Err(Error::UnsupportedSelector(token.into()));
    }

    Ok(step)
}

fn read_simple_name(chars: &[char], from: usize) -> (String, usize) {
    let mut i = from;
    let mut name = String::new();
    while i < chars.len() {
        let ch = chars[i];
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            name.push(ch);
            i += 1;
        } else {
            break;
        }
    }
    (name, i)
}

fn parse_attr_condition(inner: &str, token: &str) -> Result<SelectorAttrCondition> {
    let inner = inner.trim();
    let Some((raw_key, raw_value)) = inner.split_once('=') else {
        if inner.is_empty() {
            return Err(Error::UnsupportedSelector(token.into()));
        }
        return Ok(SelectorAttrCondition::Exists {
            key: inner.to_ascii_lowercase(),
        });
    };

    let key = raw_key.trim().to_ascii_lowercase();
    if key.is_empty() {
        return Err(Error::UnsupportedSelector(token.into()));
    }

    let raw_value = raw_value.trim();
    let value = if (raw_value.starts_with('\'') && raw_value.ends_with('\'') && raw_value.len() >= 2)
        || (raw_value.starts_with('"') && raw_value.ends_with('"') && raw_value.len() >= 2)
    {
        raw_value[1..raw_value.len() - 1].to_string()
    } else {
        raw_value.to_string()
    };

    Ok(SelectorAttrCondition::Eq { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_step_with_attributes_parses() -> Result<()> {
        let parts = parse_selector_chain("span.option[cookieName='Scale'][cookieValue='2']")?;
        assert_eq!(parts.len(), 1);
        let step = &parts[0].step;
        assert_eq!(step.tag.as_deref(), Some("span"));
        assert_eq!(step.classes, vec!["option".to_string()]);
        assert_eq!(
            step.attrs,
            vec![
                SelectorAttrCondition::Eq {
                    key: "cookiename".into(),
                    value: "Scale".into()
                },
                SelectorAttrCondition::Eq {
                    key: "cookievalue".into(),
                    value: "2".into()
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn combinators_attach_to_the_right_hand_part() -> Result<()> {
        let parts = parse_selector_chain("#panel > span input")?;
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].combinator, None);
        assert_eq!(parts[1].combinator, Some(SelectorCombinator::Child));
        assert_eq!(parts[2].combinator, Some(SelectorCombinator::Descendant));
        Ok(())
    }

    #[test]
    fn groups_split_on_commas_outside_brackets() -> Result<()> {
        let groups = parse_selector_groups("[cookieValue='a,b'], .other")?;
        assert_eq!(groups.len(), 2);
        Ok(())
    }

    #[test]
    fn quoted_values_keep_spaces_and_brackets() -> Result<()> {
        let parts = parse_selector_chain("[data-label='a > b']")?;
        assert_eq!(
            parts[0].step.attrs,
            vec![SelectorAttrCondition::Eq {
                key: "data-label".into(),
                value: "a > b".into()
            }]
        );
        Ok(())
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        for bad in ["", "  ", ">", "#", ".", "[", "[cookieName", "a,,b", "a >"] {
            parse_selector_chain(bad).expect_err(bad);
        }
    }
}
