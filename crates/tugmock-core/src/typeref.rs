//! Type-reference parsing.
//!
//! Declarations carry their type references as raw source text (`[String: Box<T>]?`,
//! `(Int) async throws -> Void`, `A & B`). Qualification needs to walk that text structurally,
//! rewriting each nominal reference while preserving everything around it, so we parse it into a
//! small [`TypeRef`] tree.
//!
//! ## Grammar
//!
//! ```text
//! type        := attribute* composition
//! composition := postfix ('&' postfix)*
//! postfix     := primary ('?' | '!')* '...'?
//! primary     := paren | collection | nominal
//! paren       := '(' (element (',' element)*)? ')' ('async'? ('throws' | 'rethrows')? '->' type)?
//! element     := (label ':')? type
//! collection  := '[' type (':' type)? ']'
//! nominal     := component ('.' component)*
//! component   := identifier ('<' type (',' type)* '>')?
//! ```
//!
//! Text that does not parse is kept as an opaque reference rather than rejected; resolution
//! degrades gracefully and must never fail on unusual input.

use std::fmt;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

/// Keywords that decorate a type without changing its identity.
const KEYWORD_ATTRIBUTES: &[&str] = &[
    "inout",
    "some",
    "any",
    "__owned",
    "__shared",
    "borrowing",
    "consuming",
    "sending",
];

// ============================================================================
// Type Reference Tree
// ============================================================================

/// A parsed type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Leading decoration such as `@escaping` or `inout`.
    pub attributes: Vec<String>,
    pub kind: TypeKind,
    /// Trailing optional markers, in source order (`?`, `!`, `??`).
    pub optionals: String,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Dotted path, each component with its own generic arguments: `Outer<T>.Inner`.
    Nominal(Vec<NominalComponent>),
    Array(Box<TypeRef>),
    Dictionary(Box<TypeRef>, Box<TypeRef>),
    Tuple(Vec<TupleElement>),
    Function(FunctionType),
    Composition(Vec<TypeRef>),
    /// Unparseable text, kept verbatim.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NominalComponent {
    pub name: String,
    pub generic_args: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    pub label: Option<String>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub params: Vec<TupleElement>,
    pub is_async: bool,
    /// `throws` or `rethrows`.
    pub throws: Option<String>,
    pub ret: Box<TypeRef>,
}

impl TypeRef {
    fn bare(kind: TypeKind) -> Self {
        TypeRef {
            attributes: Vec::new(),
            kind,
            optionals: String::new(),
            variadic: false,
        }
    }

    /// Parse type text, falling back to an opaque reference when the text is not understood.
    pub fn parse(text: &str) -> TypeRef {
        TypeRef::try_parse(text)
            .unwrap_or_else(|| TypeRef::bare(TypeKind::Opaque(text.trim().to_string())))
    }

    /// Strict parse; `None` on malformed text.
    pub fn try_parse(text: &str) -> Option<TypeRef> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        type_ref.parse(trimmed).ok()
    }

    /// Dotted nominal path without generic arguments, if this is a nominal reference.
    pub fn nominal_path(&self) -> Option<String> {
        match &self.kind {
            TypeKind::Nominal(components) => Some(
                components
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            ),
            _ => None,
        }
    }

    /// Generic arguments of the innermost nominal component.
    pub fn generic_args(&self) -> &[TypeRef] {
        match &self.kind {
            TypeKind::Nominal(components) => components
                .last()
                .map(|c| c.generic_args.as_slice())
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, TypeKind::Function(_))
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.kind, TypeKind::Opaque(_))
    }

    /// Render the reference, replacing every nominal reference with the output of `nominal`.
    ///
    /// `nominal` receives the canonical text of one nominal reference including its generic
    /// arguments (e.g. `Box<T>.Inner`) and returns the replacement. When `strip_iuo` is set a
    /// trailing implicitly-unwrapped marker is dropped.
    pub fn render_with(&self, nominal: &mut dyn FnMut(&str) -> String, strip_iuo: bool) -> String {
        let mut out = String::new();
        for attribute in &self.attributes {
            out.push_str(attribute);
            out.push(' ');
        }

        let body = match &self.kind {
            TypeKind::Nominal(_) => nominal(&self.kind_text()),
            TypeKind::Opaque(text) => text.clone(),
            TypeKind::Array(element) => format!("[{}]", element.render_with(nominal, strip_iuo)),
            TypeKind::Dictionary(key, value) => format!(
                "[{}: {}]",
                key.render_with(nominal, strip_iuo),
                value.render_with(nominal, strip_iuo)
            ),
            TypeKind::Tuple(elements) => {
                format!("({})", render_elements(elements, nominal, strip_iuo))
            }
            TypeKind::Function(function) => {
                let mut text = format!("({})", render_elements(&function.params, nominal, strip_iuo));
                if function.is_async {
                    text.push_str(" async");
                }
                if let Some(throws) = &function.throws {
                    text.push(' ');
                    text.push_str(throws);
                }
                text.push_str(" -> ");
                text.push_str(&function.ret.render_with(nominal, strip_iuo));
                text
            }
            TypeKind::Composition(parts) => parts
                .iter()
                .map(|p| p.render_with(nominal, strip_iuo))
                .collect::<Vec<_>>()
                .join(" & "),
        };

        let mut optionals = self.optionals.as_str();
        if strip_iuo && optionals.ends_with('!') {
            optionals = &optionals[..optionals.len() - 1];
        }
        let needs_parens = !optionals.is_empty()
            && matches!(self.kind, TypeKind::Function(_) | TypeKind::Composition(_));
        if needs_parens {
            out.push('(');
            out.push_str(&body);
            out.push(')');
        } else {
            out.push_str(&body);
        }
        out.push_str(optionals);
        if self.variadic {
            out.push_str("...");
        }
        out
    }

    /// Canonical text of the kind alone, without attributes or optionals.
    fn kind_text(&self) -> String {
        match &self.kind {
            TypeKind::Nominal(components) => components
                .iter()
                .map(|c| {
                    if c.generic_args.is_empty() {
                        c.name.clone()
                    } else {
                        let args: Vec<String> =
                            c.generic_args.iter().map(|a| a.to_string()).collect();
                        format!("{}<{}>", c.name, args.join(", "))
                    }
                })
                .collect::<Vec<_>>()
                .join("."),
            _ => TypeRef {
                attributes: Vec::new(),
                kind: self.kind.clone(),
                optionals: String::new(),
                variadic: false,
            }
            .to_string(),
        }
    }
}

fn render_elements(
    elements: &[TupleElement],
    nominal: &mut dyn FnMut(&str) -> String,
    strip_iuo: bool,
) -> String {
    elements
        .iter()
        .map(|e| match &e.label {
            Some(label) => format!("{}: {}", label, e.ty.render_with(nominal, strip_iuo)),
            None => e.ty.render_with(nominal, strip_iuo),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.render_with(&mut |text: &str| text.to_string(), false);
        f.write_str(&rendered)
    }
}

// ============================================================================
// Text Helpers
// ============================================================================

/// Remove every generic argument group: `Outer<T>.Inner<[U]>` becomes `Outer.Inner`.
pub fn strip_generics(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    let mut prev = '\0';
    for c in name.chars() {
        match c {
            '<' => depth += 1,
            '>' if prev != '-' && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
        prev = c;
    }
    out
}

/// Split on `separator` only where it is not nested inside `<>`, `()` or `[]`.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let mut prev = '\0';
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' if prev != '-' => depth -= 1,
            ')' | ']' => depth -= 1,
            _ if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&text[start..]);
    parts
}

// ============================================================================
// Parser
// ============================================================================

fn ws(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || matches!(c, '_' | '$' | '#' | '%' | '`')
    })
    .parse_next(input)
}

fn type_ref(input: &mut &str) -> ModalResult<TypeRef> {
    ws(input)?;
    let attributes: Vec<String> = repeat(0.., terminated(attribute, ws)).parse_next(input)?;
    let mut ty = composition(input)?;
    if !attributes.is_empty() {
        let mut all = attributes;
        all.append(&mut ty.attributes);
        ty.attributes = all;
    }
    Ok(ty)
}

fn attribute(input: &mut &str) -> ModalResult<String> {
    if opt('@').parse_next(input)?.is_some() {
        let name = identifier(input)?;
        let args: Option<&str> =
            opt(delimited('(', take_while(0.., |c: char| c != ')'), ')')).parse_next(input)?;
        return Ok(match args {
            Some(args) => format!("@{}({})", name, args),
            None => format!("@{}", name),
        });
    }

    let checkpoint = *input;
    let word = identifier(input)?;
    if KEYWORD_ATTRIBUTES.contains(&word) && input.starts_with(char::is_whitespace) {
        Ok(word.to_string())
    } else {
        *input = checkpoint;
        Err(ErrMode::from_input(input))
    }
}

fn composition(input: &mut &str) -> ModalResult<TypeRef> {
    let first = postfix(input)?;
    let rest: Vec<TypeRef> = repeat(0.., preceded((ws, '&', ws), postfix)).parse_next(input)?;
    if rest.is_empty() {
        Ok(first)
    } else {
        let mut parts = vec![first];
        parts.extend(rest);
        Ok(TypeRef::bare(TypeKind::Composition(parts)))
    }
}

fn postfix(input: &mut &str) -> ModalResult<TypeRef> {
    let mut ty = primary(input)?;
    let optionals: &str = take_while(0.., |c: char| c == '?' || c == '!').parse_next(input)?;
    ty.optionals.push_str(optionals);
    if opt("...").parse_next(input)?.is_some() {
        ty.variadic = true;
    }
    Ok(ty)
}

fn primary(input: &mut &str) -> ModalResult<TypeRef> {
    alt((paren_or_function, collection, nominal)).parse_next(input)
}

fn paren_or_function(input: &mut &str) -> ModalResult<TypeRef> {
    let elements = tuple_elements(input)?;

    let checkpoint = *input;
    ws(input)?;
    let is_async = opt(terminated("async", ws)).parse_next(input)?.is_some();
    let throws: Option<&str> =
        opt(terminated(alt(("rethrows", "throws")), ws)).parse_next(input)?;
    if opt("->").parse_next(input)?.is_some() {
        let ret = type_ref(input)?;
        return Ok(TypeRef::bare(TypeKind::Function(FunctionType {
            params: elements,
            is_async,
            throws: throws.map(str::to_string),
            ret: Box::new(ret),
        })));
    }
    *input = checkpoint;

    // A parenthesized single type is just that type.
    if elements.len() == 1 && elements[0].label.is_none() {
        if let Some(element) = elements.into_iter().next() {
            return Ok(element.ty);
        }
        return Err(ErrMode::from_input(input));
    }
    Ok(TypeRef::bare(TypeKind::Tuple(elements)))
}

fn tuple_elements(input: &mut &str) -> ModalResult<Vec<TupleElement>> {
    '('.parse_next(input)?;
    ws(input)?;
    let elements: Vec<TupleElement> =
        separated(0.., tuple_element, (ws, ',', ws)).parse_next(input)?;
    ws(input)?;
    ')'.parse_next(input)?;
    Ok(elements)
}

fn tuple_element(input: &mut &str) -> ModalResult<TupleElement> {
    let label = opt(element_label).parse_next(input)?;
    let ty = type_ref(input)?;
    Ok(TupleElement { label, ty })
}

/// `label:` or the parameter form `_ name:` / `label name:`.
fn element_label(input: &mut &str) -> ModalResult<String> {
    let checkpoint = *input;
    let first = identifier(input)?;
    ws(input)?;
    let second: Option<&str> = opt(terminated(identifier, ws)).parse_next(input)?;
    if input.starts_with(':') && !input.starts_with("::") {
        ':'.parse_next(input)?;
        ws(input)?;
        Ok(match second {
            Some(second) => format!("{} {}", first, second),
            None => first.to_string(),
        })
    } else {
        *input = checkpoint;
        Err(ErrMode::from_input(input))
    }
}

fn collection(input: &mut &str) -> ModalResult<TypeRef> {
    '['.parse_next(input)?;
    let key = type_ref(input)?;
    ws(input)?;
    let value = opt(preceded((':', ws), type_ref)).parse_next(input)?;
    ws(input)?;
    ']'.parse_next(input)?;
    Ok(match value {
        Some(value) => TypeRef::bare(TypeKind::Dictionary(Box::new(key), Box::new(value))),
        None => TypeRef::bare(TypeKind::Array(Box::new(key))),
    })
}

fn nominal(input: &mut &str) -> ModalResult<TypeRef> {
    let components: Vec<NominalComponent> = separated(1.., component, '.').parse_next(input)?;
    Ok(TypeRef::bare(TypeKind::Nominal(components)))
}

fn component(input: &mut &str) -> ModalResult<NominalComponent> {
    let name = identifier(input)?;
    let generic_args: Option<Vec<TypeRef>> = opt(delimited(
        ('<', ws),
        separated(0.., type_ref, (ws, ',', ws)),
        (ws, '>'),
    ))
    .parse_next(input)?;
    Ok(NominalComponent {
        name: name.to_string(),
        generic_args: generic_args.unwrap_or_default(),
    })
}

// ============================================================================
// Tests
// ============================================================================
