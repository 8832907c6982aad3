// src/engine/basic.rs - Built-in markup abbreviation engine
//
// Covers the everyday operators: element names with #id, .class, [attributes]
// and {text}, child `>`, sibling `+`, climb-up `^`, grouping `( )`,
// multiplication `*N` and `$` numbering. A bare `*` repeats the element once
// per wrapped line; `$#` stands for the wrapped text.

use super::{ExpandOptions, ExpansionEngine, ExpansionError, Validation};
use crate::config::WrapConfig;
use crate::context::is_void_element;
use crate::syntax::SyntaxKind;
use log::trace;

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdo", "br", "button", "cite", "code", "del", "dfn", "em", "i", "img",
    "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span", "strong",
    "sub", "sup", "textarea", "time", "u", "var",
];

const LINE_TOKEN: &str = "$#";

/// Deepest `>` / `(` nesting accepted by the parser.
const MAX_DEPTH: usize = 64;
/// Largest `*N` count.
const MAX_REPEAT: usize = 1000;
/// Upper bound on elements one abbreviation may expand to.
const MAX_ELEMENTS: usize = 10_000;

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.iter().any(|e| e.eq_ignore_ascii_case(name))
}

fn default_attributes(name: &str) -> &'static [(&'static str, &'static str)] {
    match name {
        "a" => &[("href", "")],
        "img" => &[("src", ""), ("alt", "")],
        "input" => &[("type", "text")],
        "link" => &[("rel", "stylesheet"), ("href", "")],
        "form" => &[("action", "")],
        "iframe" => &[("src", "")],
        _ => &[],
    }
}

fn implicit_name(parent: Option<&str>) -> &'static str {
    let Some(parent) = parent else {
        return "div";
    };
    match parent.to_ascii_lowercase().as_str() {
        "ul" | "ol" => "li",
        "table" | "tbody" | "thead" | "tfoot" => "tr",
        "tr" => "td",
        "select" | "optgroup" => "option",
        "audio" | "video" => "source",
        p if is_inline(p) => "span",
        _ => "div",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Repeat {
    #[default]
    Once,
    Times(usize),
    /// Bare `*`: one copy per wrapped line
    PerLine,
}

#[derive(Debug, Clone, Default)]
struct Element {
    name: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
    text: Option<String>,
    self_closing: bool,
    repeat: Repeat,
    children: Vec<Node>,
    /// Wrapped content goes here
    insert_here: bool,
}

#[derive(Debug, Clone)]
enum Node {
    Element(Element),
    Text(String),
    Group { items: Vec<Node>, repeat: Repeat },
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '$' | '@')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(abbreviation: &str) -> Self {
        Self {
            chars: abbreviation.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> ExpansionError {
        ExpansionError::Parse {
            message: message.into(),
            position: self.pos,
        }
    }

    fn unexpected(&self) -> ExpansionError {
        match self.peek() {
            Some(c) => self.error(format!("Unexpected character '{c}'")),
            None => self.error("Unexpected end of abbreviation"),
        }
    }

    fn descend(&mut self) -> Result<(), ExpansionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("Abbreviation is nested too deeply"));
        }
        Ok(())
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse(mut self) -> Result<Vec<Node>, ExpansionError> {
        if self.chars.is_empty() {
            return Err(self.error("Empty abbreviation"));
        }
        let nodes = self.parse_level(0)?;
        if self.pos < self.chars.len() {
            return Err(self.unexpected());
        }
        if expansion_size(&nodes) > MAX_ELEMENTS {
            return Err(ExpansionError::Parse {
                message: format!("Abbreviation expands to more than {MAX_ELEMENTS} elements"),
                position: 0,
            });
        }
        Ok(nodes)
    }

    /// Sibling sequences at one nesting level, absorbing climbs that reach it.
    fn parse_level(&mut self, group_depth: usize) -> Result<Vec<Node>, ExpansionError> {
        let mut nodes = Vec::new();
        loop {
            let (items, climbs) = self.parse_sequence(group_depth)?;
            nodes.extend(items);
            if climbs == 0 {
                return Ok(nodes);
            }
        }
    }

    /// Returns the siblings parsed and how many `^` levels remain to climb.
    fn parse_sequence(&mut self, group_depth: usize) -> Result<(Vec<Node>, usize), ExpansionError> {
        let mut items = Vec::new();
        loop {
            let mut node = self.parse_item(group_depth)?;
            match self.peek() {
                Some('>') => {
                    let at = self.pos;
                    self.pos += 1;
                    self.descend()?;
                    let (children, climbs) = self.parse_sequence(group_depth)?;
                    self.depth -= 1;
                    attach_children(&mut node, children).ok_or(ExpansionError::Parse {
                        message: "Text cannot have children".to_string(),
                        position: at,
                    })?;
                    items.push(node);
                    match climbs {
                        0 => return Ok((items, 0)),
                        1 => continue,
                        n => return Ok((items, n - 1)),
                    }
                }
                Some('+') => {
                    self.pos += 1;
                    items.push(node);
                }
                Some('^') => {
                    let mut climbs = 0;
                    while self.peek() == Some('^') {
                        self.pos += 1;
                        climbs += 1;
                    }
                    items.push(node);
                    return Ok((items, climbs));
                }
                Some(')') if group_depth > 0 => {
                    items.push(node);
                    return Ok((items, 0));
                }
                None => {
                    items.push(node);
                    return Ok((items, 0));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_item(&mut self, group_depth: usize) -> Result<Node, ExpansionError> {
        let start = self.pos;

        if self.peek() == Some('(') {
            self.pos += 1;
            self.descend()?;
            let items = self.parse_level(group_depth + 1)?;
            self.depth -= 1;
            if self.peek() != Some(')') {
                return Err(self.error("Unclosed group"));
            }
            self.pos += 1;
            let repeat = self.parse_repeat()?;
            return Ok(Node::Group { items, repeat });
        }

        let mut el = Element::default();
        let name = self.take_while(is_name_char);
        if !name.is_empty() {
            el.name = Some(name);
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.take_while(is_name_char);
                    if id.is_empty() {
                        return Err(self.error("Expected id name"));
                    }
                    el.id = Some(id);
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.take_while(is_name_char);
                    if class.is_empty() {
                        return Err(self.error("Expected class name"));
                    }
                    el.classes.push(class);
                }
                Some('[') => {
                    self.pos += 1;
                    self.parse_attributes(&mut el)?;
                }
                Some('{') => {
                    self.pos += 1;
                    let text = self.parse_text()?;
                    el.text.get_or_insert_with(String::new).push_str(&text);
                }
                Some('*') => el.repeat = self.parse_repeat()?,
                Some('/') => {
                    self.pos += 1;
                    el.self_closing = true;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }

        let text_only = el.name.is_none()
            && el.id.is_none()
            && el.classes.is_empty()
            && el.attributes.is_empty()
            && !el.self_closing
            && el.repeat == Repeat::Once;
        match el.text.take() {
            Some(text) if text_only => Ok(Node::Text(text)),
            text => {
                el.text = text;
                Ok(Node::Element(el))
            }
        }
    }

    fn parse_repeat(&mut self) -> Result<Repeat, ExpansionError> {
        if self.peek() != Some('*') {
            return Ok(Repeat::Once);
        }
        self.pos += 1;
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(Repeat::PerLine);
        }
        match digits.parse::<usize>() {
            Ok(n) if n > 0 && n <= MAX_REPEAT => Ok(Repeat::Times(n)),
            _ => Err(self.error(format!("Invalid repeat count '{digits}'"))),
        }
    }

    fn parse_attributes(&mut self, el: &mut Element) -> Result<(), ExpansionError> {
        loop {
            self.take_while(char::is_whitespace);
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(());
                }
                None => return Err(self.error("Unclosed attribute set")),
                Some(_) => {}
            }

            let name = self.take_while(|c| !c.is_whitespace() && c != '=' && c != ']');
            if name.is_empty() {
                return Err(self.error("Expected attribute name"));
            }

            let value = if self.peek() == Some('=') {
                self.pos += 1;
                match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let value = self.take_while(|c| c != quote);
                        if self.peek() != Some(quote) {
                            return Err(self.error("Unclosed attribute value"));
                        }
                        self.pos += 1;
                        Some(value)
                    }
                    _ => Some(self.take_while(|c| !c.is_whitespace() && c != ']')),
                }
            } else {
                None
            };
            el.attributes.push((name, value));
        }
    }

    fn parse_text(&mut self) -> Result<String, ExpansionError> {
        let mut depth = 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                _ => {}
            }
            text.push(c);
        }
        Err(self.error("Unclosed text"))
    }
}

/// Nest `children` under `node`; for groups, under their last element.
fn attach_children(node: &mut Node, children: Vec<Node>) -> Option<()> {
    match node {
        Node::Element(el) => {
            el.children.extend(children);
            Some(())
        }
        Node::Group { items, .. } => attach_children(items.last_mut()?, children),
        Node::Text(_) => None,
    }
}

/// Elements rendered for `nodes`, counting a bare `*` as one copy.
fn expansion_size(nodes: &[Node]) -> usize {
    let times = |repeat: Repeat| match repeat {
        Repeat::Times(n) => n,
        Repeat::Once | Repeat::PerLine => 1,
    };
    nodes.iter().fold(0usize, |total, node| {
        let size = match node {
            Node::Text(_) => 0,
            Node::Element(el) => times(el.repeat).saturating_mul(1 + expansion_size(&el.children)),
            Node::Group { items, repeat } => times(*repeat).saturating_mul(expansion_size(items)),
        };
        total.saturating_add(size)
    })
}

fn find_per_line(nodes: &mut [Node]) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        let per_line = matches!(
            node,
            Node::Element(Element {
                repeat: Repeat::PerLine,
                ..
            }) | Node::Group {
                repeat: Repeat::PerLine,
                ..
            }
        );
        if per_line {
            return Some(node);
        }
        let children = match node {
            Node::Element(el) => &mut el.children,
            Node::Group { items, .. } => items,
            Node::Text(_) => continue,
        };
        if let Some(found) = find_per_line(children) {
            return Some(found);
        }
    }
    None
}

/// Mark the deepest last element as the insertion point.
fn mark_target(nodes: &mut [Node]) -> bool {
    for node in nodes.iter_mut().rev() {
        match node {
            Node::Element(el) => {
                if !mark_target(&mut el.children) {
                    el.insert_here = true;
                }
                return true;
            }
            Node::Group { items, .. } => {
                if mark_target(items) {
                    return true;
                }
            }
            Node::Text(_) => {}
        }
    }
    false
}

fn uses_line_token(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Text(text) => text.contains(LINE_TOKEN),
        Node::Group { items, .. } => uses_line_token(items),
        Node::Element(el) => {
            let has = |s: &Option<String>| s.as_deref().is_some_and(|s| s.contains(LINE_TOKEN));
            has(&el.name)
                || has(&el.id)
                || has(&el.text)
                || el.classes.iter().any(|c| c.contains(LINE_TOKEN))
                || el.attributes.iter().any(|(_, v)| has(v))
                || uses_line_token(&el.children)
        }
    })
}

/// Replace `$` runs with `index`, zero padded to the run length. `$#` is
/// left for line substitution.
fn apply_numbering(template: &str, index: usize) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'#') {
            chars.next();
            out.push_str(LINE_TOKEN);
            continue;
        }
        let mut width = 1;
        while chars.peek() == Some(&'$') {
            chars.next();
            width += 1;
        }
        out.push_str(&format!("{index:0width$}"));
    }
    out
}

/// Wrapped text as it goes into the output, with snippet metacharacters
/// escaped. Previews resolve fields too, so they are escaped the same way.
fn escape_snippet(text: &str) -> String {
    text.replace('\\', "\\\\").replace('$', "\\$")
}

/// Rendered output of one node or node list.
#[derive(Debug)]
struct Item {
    lines: Vec<String>,
    /// Can sit on one line next to its siblings
    inline: bool,
}

fn join(items: Vec<Item>) -> Item {
    if items.is_empty() {
        return Item {
            lines: Vec::new(),
            inline: true,
        };
    }
    if items.iter().all(|i| i.inline && i.lines.len() <= 1) {
        let line: String = items.iter().flat_map(|i| i.lines.iter()).map(String::as_str).collect();
        return Item {
            lines: vec![line],
            inline: true,
        };
    }
    Item {
        lines: items.into_iter().flat_map(|i| i.lines).collect(),
        inline: false,
    }
}

struct Renderer<'a> {
    indent: &'a str,
    xml: bool,
    jsx: bool,
    preview: bool,
    lines: Option<&'a [String]>,
    per_line: bool,
    line_token: bool,
    field: usize,
}

impl<'a> Renderer<'a> {
    fn next_field(&mut self) -> String {
        if self.preview {
            return String::new();
        }
        self.field += 1;
        format!("${{{}}}", self.field)
    }

    fn substitute(&self, template: &str, index: usize, line: Option<&str>) -> String {
        let numbered = apply_numbering(template, index);
        if !numbered.contains(LINE_TOKEN) {
            return numbered;
        }
        let value = match (line, self.lines) {
            (Some(line), _) => line.to_string(),
            (None, Some(lines)) => lines.join("\n"),
            (None, None) => String::new(),
        };
        numbered.replace(LINE_TOKEN, &escape_snippet(&value))
    }

    fn repetitions(&self, repeat: Repeat, index: usize, line: Option<&'a str>) -> Vec<(usize, Option<&'a str>)> {
        match (repeat, self.lines) {
            (Repeat::Once, _) => vec![(index, line)],
            (Repeat::Times(n), _) => (1..=n).map(|i| (i, line)).collect(),
            (Repeat::PerLine, Some(lines)) => lines
                .iter()
                .enumerate()
                .map(|(i, l)| (i + 1, Some(l.as_str())))
                .collect(),
            (Repeat::PerLine, None) => vec![(1, line)],
        }
    }

    fn render_items(&mut self, nodes: &[Node], parent: Option<&str>, index: usize, line: Option<&'a str>) -> Vec<Item> {
        let mut items = Vec::new();
        for node in nodes {
            match node {
                Node::Text(text) => items.push(self.text_item(text, index, line)),
                Node::Element(el) => {
                    for (i, l) in self.repetitions(el.repeat, index, line) {
                        items.push(self.render_element(el, parent, i, l));
                    }
                }
                Node::Group { items: group, repeat } => {
                    for (i, l) in self.repetitions(*repeat, index, line) {
                        let rendered = self.render_items(group, parent, i, l);
                        items.push(join(rendered));
                    }
                }
            }
        }
        items
    }

    fn text_item(&self, text: &str, index: usize, line: Option<&str>) -> Item {
        let text = self.substitute(text, index, line);
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        Item {
            inline: lines.len() <= 1,
            lines,
        }
    }

    fn wrapped_content(&self, line: Option<&'a str>) -> Vec<String> {
        match (line, self.lines) {
            (Some(line), _) if self.per_line => vec![escape_snippet(line)],
            (_, Some(lines)) if !self.per_line => lines.iter().map(|l| escape_snippet(l)).collect(),
            _ => Vec::new(),
        }
    }

    fn render_element(&mut self, el: &Element, parent: Option<&str>, index: usize, line: Option<&'a str>) -> Item {
        let name = match &el.name {
            Some(name) => self.substitute(name, index, line),
            None => implicit_name(parent).to_string(),
        };

        let mut attributes: Vec<(String, Option<String>)> = Vec::new();
        if let Some(id) = &el.id {
            attributes.push(("id".to_string(), Some(self.substitute(id, index, line))));
        }
        if !el.classes.is_empty() {
            let classes: Vec<String> = el.classes.iter().map(|c| self.substitute(c, index, line)).collect();
            let key = if self.jsx { "className" } else { "class" };
            attributes.push((key.to_string(), Some(classes.join(" "))));
        }
        for (key, value) in &el.attributes {
            let value = value.as_ref().map(|v| self.substitute(v, index, line));
            attributes.push((key.clone(), value));
        }
        for (key, value) in default_attributes(&name) {
            if !attributes.iter().any(|(k, _)| k == key) {
                attributes.push((key.to_string(), Some(value.to_string())));
            }
        }

        let mut attrs = String::new();
        for (key, value) in &attributes {
            match value {
                Some(value) if value.is_empty() => {
                    let field = self.next_field();
                    attrs.push_str(&format!(" {key}=\"{field}\""));
                }
                Some(value) => attrs.push_str(&format!(" {key}=\"{value}\"")),
                None if self.xml => attrs.push_str(&format!(" {key}=\"{key}\"")),
                None => attrs.push_str(&format!(" {key}")),
            }
        }

        let inline = is_inline(&name);
        if el.self_closing || (!self.xml && is_void_element(&name)) {
            let tag = if self.xml || self.jsx {
                format!("<{name}{attrs} />")
            } else {
                format!("<{name}{attrs}>")
            };
            return Item {
                lines: vec![tag],
                inline,
            };
        }

        let mut items = Vec::new();
        if let Some(text) = &el.text {
            items.push(self.text_item(text, index, line));
        }
        items.extend(self.render_items(&el.children, Some(&name), index, line));
        if el.insert_here && !self.line_token {
            let wrapped = self.wrapped_content(line);
            if !wrapped.is_empty() {
                items.push(Item {
                    inline: wrapped.len() <= 1,
                    lines: wrapped,
                });
            }
        }
        let content = join(items);

        let open = format!("<{name}{attrs}>");
        let close = format!("</{name}>");
        if content.lines.is_empty() {
            let field = self.next_field();
            return Item {
                lines: vec![format!("{open}{field}{close}")],
                inline,
            };
        }
        if content.inline {
            return Item {
                lines: vec![format!("{open}{}{close}", content.lines.concat())],
                inline,
            };
        }

        let mut lines = Vec::with_capacity(content.lines.len() + 2);
        lines.push(open);
        for line in content.lines {
            if line.is_empty() {
                lines.push(line);
            } else {
                lines.push(format!("{}{line}", self.indent));
            }
        }
        lines.push(close);
        Item {
            lines,
            inline: false,
        }
    }
}

/// Reference engine for HTML/XML abbreviations.
#[derive(Debug, Clone)]
pub struct BasicEngine {
    indent: String,
    xml_syntaxes: Vec<String>,
}

impl BasicEngine {
    pub fn new(indent: &str) -> Self {
        Self {
            indent: indent.to_string(),
            xml_syntaxes: WrapConfig::default().xml_syntaxes,
        }
    }

    pub fn from_config(config: &WrapConfig) -> Self {
        Self {
            indent: config.indent.clone(),
            xml_syntaxes: config.xml_syntaxes.clone(),
        }
    }

    fn check_syntax(&self, abbreviation: &str, options: &ExpandOptions) -> Result<(), ExpansionError> {
        match options.kind {
            SyntaxKind::Markup => Ok(()),
            SyntaxKind::Stylesheet => Err(ExpansionError::Unsupported(format!(
                "'{abbreviation}' in {} stylesheet",
                options.syntax
            ))),
        }
    }
}

impl Default for BasicEngine {
    fn default() -> Self {
        Self::new("\t")
    }
}

impl ExpansionEngine for BasicEngine {
    fn expand(&self, abbreviation: &str, options: &ExpandOptions) -> Result<String, ExpansionError> {
        self.check_syntax(abbreviation, options)?;
        let mut nodes = Parser::new(abbreviation.trim()).parse()?;

        let lines = options.text_lines.as_deref().filter(|l| !l.is_empty());
        let mut per_line = false;
        if lines.is_some() {
            match find_per_line(&mut nodes) {
                Some(Node::Element(el)) => {
                    per_line = true;
                    if !mark_target(&mut el.children) {
                        el.insert_here = true;
                    }
                }
                Some(Node::Group { items, .. }) => {
                    per_line = true;
                    mark_target(items);
                }
                Some(Node::Text(_)) | None => {
                    mark_target(&mut nodes);
                }
            }
        }

        let mut renderer = Renderer {
            indent: &self.indent,
            xml: self.xml_syntaxes.iter().any(|s| s == &options.syntax),
            jsx: options.syntax == "jsx",
            preview: options.preview,
            lines,
            per_line,
            line_token: uses_line_token(&nodes),
            field: 0,
        };
        let items = renderer.render_items(&nodes, None, 1, None);
        let output = join(items).lines.join("\n");
        trace!("expanded '{}' into {} chars", abbreviation, output.len());
        Ok(output)
    }

    fn validate(&self, abbreviation: &str, options: &ExpandOptions) -> Validation {
        if let Err(err) = self.check_syntax(abbreviation, options) {
            return Validation::invalid(err);
        }
        match Parser::new(abbreviation.trim()).parse() {
            Ok(_) => Validation::ok(),
            Err(err) => Validation::invalid(err),
        }
    }
}
