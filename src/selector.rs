//! Parent-path selectors.
//!
//! Grammar, evaluated from the document root:
//!
//! ```text
//! selector  := step ("/" step)*
//! step      := ("." | "*" | tag) predicate* | "{" token "}"
//! predicate := "[@" attr "]" | "[@" attr "=" quoted "]"
//! ```
//!
//! A bare `{token}` step narrows the previous step to elements whose
//! name attribute equals the bound value. Placeholders may also appear inside
//! predicate values. An unbound placeholder never matches.
//!
//! Resolution order: literal, then `*/` wildcard ancestor, then each
//! candidate substitution (literal, wildcard) in declared order.

use crate::xml::{Element, Node};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const ROOT_SELECTOR: &str = "./";

/// Attributes that identify an element by name.
const NAME_ATTRIBUTES: [&str; 2] = ["android:name", "name"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").expect("placeholder pattern"));

#[derive(Debug, Error)]
#[error("invalid selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Has(String),
    Equals(String, String),
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    This,
    Any,
    Tag(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    test: Test,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    steps: Vec<Step>,
}

/// Outcome of looking up a directive's parent. `Unresolved` is a skip, not
/// a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentLookup {
    Resolved(Vec<usize>),
    Unresolved,
}

/// Candidate values for one placeholder token, tried in order.
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    pub token: &'a str,
    pub candidates: &'a [&'a str],
}

fn split_segments(raw: &str) -> Result<Vec<&str>, String> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1).ok_or("unbalanced ']'")?,
            (None, '/') if depth == 0 => {
                segments.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth > 0 || quote.is_some() {
        return Err("unterminated predicate".to_string());
    }
    segments.push(&raw[start..]);
    Ok(segments)
}

fn parse_predicate(inner: &str) -> Result<Predicate, String> {
    let attr_expr = inner
        .strip_prefix('@')
        .ok_or_else(|| format!("unsupported predicate [{inner}]"))?;
    let Some((attr, value)) = attr_expr.split_once('=') else {
        return Ok(Predicate::Has(attr_expr.trim().to_string()));
    };
    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| format!("predicate value must be quoted: {value}"))?;
    Ok(Predicate::Equals(attr.trim().to_string(), unquoted.to_string()))
}

fn parse_step(segment: &str) -> Result<Step, String> {
    let (head, mut rest) = match segment.find('[') {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };
    let test = match head {
        "." => Test::This,
        "*" => Test::Any,
        "" => return Err(format!("missing tag in step '{segment}'")),
        tag => Test::Tag(tag.to_string()),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let body = rest
            .strip_prefix('[')
            .ok_or_else(|| format!("unexpected text '{rest}'"))?;
        let end = closing_bracket(body).ok_or("unterminated predicate")?;
        predicates.push(parse_predicate(&body[..end])?);
        rest = &body[end + 1..];
    }
    Ok(Step { test, predicates })
}

fn closing_bracket(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_bare_placeholder(segment: &str) -> bool {
    PLACEHOLDER
        .find(segment)
        .is_some_and(|m| m.start() == 0 && m.end() == segment.len())
}

fn bound(value: &str) -> bool {
    !PLACEHOLDER.is_match(value)
}

impl Predicate {
    fn matches(&self, el: &Element) -> bool {
        match self {
            Predicate::Has(attr) => el.attributes.contains_key(attr),
            Predicate::Equals(attr, value) => bound(value) && el.attr(attr) == Some(value),
            Predicate::Named(value) => {
                bound(value) && NAME_ATTRIBUTES.iter().any(|n| el.attr(n) == Some(value))
            }
        }
    }

    fn bind(&self, placeholder: &str, value: &str) -> Predicate {
        match self {
            Predicate::Has(attr) => Predicate::Has(attr.clone()),
            Predicate::Equals(attr, v) => Predicate::Equals(attr.clone(), v.replace(placeholder, value)),
            Predicate::Named(v) => Predicate::Named(v.replace(placeholder, value)),
        }
    }

    fn has_placeholder(&self) -> bool {
        match self {
            Predicate::Has(_) => false,
            Predicate::Equals(_, v) | Predicate::Named(v) => !bound(v),
        }
    }
}

impl Step {
    fn matches(&self, el: &Element) -> bool {
        let test = match &self.test {
            Test::This | Test::Any => true,
            Test::Tag(tag) => &el.name == tag,
        };
        test && self.predicates.iter().all(|p| p.matches(el))
    }
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let error = |message: String| SelectorError {
            selector: raw.to_string(),
            message,
        };

        let mut steps: Vec<Step> = Vec::new();
        for segment in split_segments(raw.trim()).map_err(error)? {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if is_bare_placeholder(segment) {
                let previous = steps
                    .last_mut()
                    .ok_or_else(|| error(format!("placeholder {segment} has no step to narrow")))?;
                previous.predicates.push(Predicate::Named(segment.to_string()));
                continue;
            }
            steps.push(parse_step(segment).map_err(error)?);
        }
        Ok(Selector { steps })
    }

    /// Direct child `tag` of the context element.
    pub fn child(tag: &str) -> Self {
        Selector {
            steps: vec![Step {
                test: Test::Tag(tag.to_string()),
                predicates: Vec::new(),
            }],
        }
    }

    /// Adds `[@attr='value']` to the last step.
    pub fn with_attr_equals(mut self, attr: &str, value: &str) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.predicates
                .push(Predicate::Equals(attr.to_string(), value.to_string()));
        }
        self
    }

    pub fn wildcard_ancestor(&self) -> Self {
        let mut steps = vec![Step {
            test: Test::Any,
            predicates: Vec::new(),
        }];
        steps.extend(self.steps.iter().cloned());
        Selector { steps }
    }

    pub fn has_placeholder(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.predicates.iter().any(Predicate::has_placeholder))
    }

    pub fn bind(&self, token: &str, value: &str) -> Self {
        let placeholder = format!("{{{token}}}");
        Selector {
            steps: self
                .steps
                .iter()
                .map(|s| Step {
                    test: s.test.clone(),
                    predicates: s.predicates.iter().map(|p| p.bind(&placeholder, value)).collect(),
                })
                .collect(),
        }
    }

    /// Paths (child indices) of every match, in document order.
    pub fn find_all(&self, root: &Element) -> Vec<Vec<usize>> {
        let mut current: Vec<Vec<usize>> = vec![Vec::new()];
        for step in &self.steps {
            let mut next = Vec::new();
            for path in current {
                let Some(el) = root.element_at(&path) else {
                    continue;
                };
                if step.test == Test::This {
                    if step.matches(el) {
                        next.push(path);
                    }
                    continue;
                }
                for (index, node) in el.children.iter().enumerate() {
                    if let Node::Element(child) = node {
                        if step.matches(child) {
                            let mut child_path = path.clone();
                            child_path.push(index);
                            next.push(child_path);
                        }
                    }
                }
            }
            current = next;
        }
        current
    }

    pub fn find(&self, root: &Element) -> Option<Vec<usize>> {
        self.find_all(root).into_iter().next()
    }

    fn locate(&self, root: &Element) -> Option<Vec<usize>> {
        self.find(root)
            .or_else(|| self.wildcard_ancestor().find(root))
    }
}

pub fn resolve_parent(
    root: &Element,
    raw: &str,
    substitution: Option<Substitution<'_>>,
) -> Result<ParentLookup, SelectorError> {
    let selector = Selector::parse(raw)?;
    if let Some(path) = selector.locate(root) {
        return Ok(ParentLookup::Resolved(path));
    }
    if let Some(sub) = substitution {
        if selector.has_placeholder() {
            for candidate in sub.candidates {
                if let Some(path) = selector.bind(sub.token, candidate).locate(root) {
                    return Ok(ParentLookup::Resolved(path));
                }
            }
        }
    }
    Ok(ParentLookup::Unresolved)
}
