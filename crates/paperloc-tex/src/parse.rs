//! A small TeX reader that turns source text into a navigable node tree.
//!
//! The reader understands just enough structure to locate commands and the
//! text between them: control words and control symbols with attached
//! `{required}` / `[optional]` arguments, `\begin{..}..\end{..}` environments,
//! brace groups, inline and display math, comments, and runs of plain text.
//! It performs no macro expansion.
//!
//! Nodes live in an arena owned by [`TexDocument`] and are addressed by
//! [`NodeId`]. Every node records its parent id, so callers can walk up and
//! sideways without holding references into the tree.

use std::collections::HashSet;
use std::ops::Range;

use thiserror::Error;

/// Index of a node inside a [`TexDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether an argument was written in braces or brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The whole document.
    Root,
    /// `\name` or a control symbol such as `\%`. Arguments hang off `args`.
    Command { name: String },
    /// `\begin{name} .. \end{name}`. Arguments after `\begin{name}` hang off
    /// `args`, the body off `children`.
    Environment { name: String },
    /// One `{..}` or `[..]` argument of a command or environment.
    Argument(ArgKind),
    /// A bare `{..}` group.
    Group,
    /// `$..$`, `\(..\)` (inline) or `$$..$$`, `\[..\]` (display).
    Math { display: bool },
    Text(String),
    /// Comment text after `%`, without the line break.
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    args: Vec<NodeId>,
    children: Vec<NodeId>,
    span: Range<usize>,
    inner: Range<usize>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unclosed group")]
    UnclosedGroup,
    #[error("unclosed optional argument")]
    UnclosedArgument,
    #[error("unclosed environment `{0}`")]
    UnclosedEnvironment(String),
    #[error("unclosed math")]
    UnclosedMath,
    #[error("unexpected `}}`")]
    UnexpectedCloseBrace,
    #[error("`\\end{{{0}}}` without matching `\\begin`")]
    UnexpectedEnd(String),
    #[error("`\\end{{{found}}}` closes `\\begin{{{expected}}}`")]
    MismatchedEnd { expected: String, found: String },
    #[error("missing environment name")]
    MissingEnvironmentName,
    #[error("nesting deeper than {} levels", MAX_NESTING)]
    TooDeep,
}

/// Deepest group, argument or environment nesting the reader accepts.
pub const MAX_NESTING: usize = 256;

/// Failure to read TeX source into a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte offset into the source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// A parsed TeX document. Immutable once built.
#[derive(Debug, Clone)]
pub struct TexDocument {
    source: String,
    nodes: Vec<NodeData>,
}

/// Parse TeX source into a [`TexDocument`].
pub fn parse(source: &str) -> Result<TexDocument, ParseError> {
    let mut parser = Parser {
        src: source,
        pos: 0,
        nodes: Vec::new(),
        depth: 0,
        last_close_bracket: source.rfind(']'),
        failed_brackets: HashSet::new(),
    };
    let root = parser.push(NodeKind::Root, None, 0);
    let end = parser.parse_content(root, &Until::Eof, 0)?;
    parser.nodes[root.0].span = 0..source.len();
    parser.nodes[root.0].inner = 0..end;
    Ok(TexDocument {
        source: source.to_string(),
        nodes: parser.nodes,
    })
}

impl TexDocument {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The full source this document was parsed from.
    pub fn source_text(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Arguments of a command or environment, in source order.
    pub fn args(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].args
    }

    /// Content nodes: the body of a group, argument, environment, math node
    /// or the root. Commands have no children.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Byte range of the node including its delimiters.
    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.nodes[id.0].span.clone()
    }

    /// Raw source of the node including its delimiters.
    pub fn source(&self, id: NodeId) -> &str {
        &self.source[self.nodes[id.0].span.clone()]
    }

    /// Raw source between the node's delimiters (the body of a group,
    /// argument, environment or math node).
    pub fn inner_source(&self, id: NodeId) -> &str {
        &self.source[self.nodes[id.0].inner.clone()]
    }

    pub fn command_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Command { name } => Some(name),
            _ => None,
        }
    }

    pub fn environment_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Environment { name } => Some(name),
            _ => None,
        }
    }

    pub fn arg_kind(&self, id: NodeId) -> Option<ArgKind> {
        match self.nodes[id.0].kind {
            NodeKind::Argument(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, at) = self.position_among_siblings(id)?;
        siblings.get(at + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (siblings, at) = self.position_among_siblings(id)?;
        at.checked_sub(1).map(|i| siblings[i])
    }

    fn position_among_siblings(&self, id: NodeId) -> Option<(&[NodeId], usize)> {
        let parent = self.parent(id)?;
        let data = &self.nodes[parent.0];
        let siblings: &[NodeId] = if data.args.contains(&id) {
            &data.args
        } else {
            &data.children
        };
        let at = siblings.iter().position(|&s| s == id)?;
        Some((siblings, at))
    }

    /// Every node under `id` (excluding `id` itself) in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        push_reversed(&mut stack, self, id);
        while let Some(next) = stack.pop() {
            out.push(next);
            push_reversed(&mut stack, self, next);
        }
        out
    }

    /// All nodes matching `pred`, in document order.
    pub fn find_all<F>(&self, mut pred: F) -> Vec<NodeId>
    where
        F: FnMut(NodeId, &NodeKind) -> bool,
    {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| pred(id, self.kind(id)))
            .collect()
    }

    /// All commands named `name` (without the backslash), in document order.
    pub fn find_commands(&self, name: &str) -> Vec<NodeId> {
        self.find_all(|_, kind| matches!(kind, NodeKind::Command { name: n } if n == name))
    }

    /// True if any ancestor of `id` satisfies `pred`.
    pub fn has_ancestor<F>(&self, id: NodeId, mut pred: F) -> bool
    where
        F: FnMut(NodeId, &NodeKind) -> bool,
    {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if pred(p, self.kind(p)) {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// The node's value when it flattens to a single plain string.
    ///
    /// Text yields itself. A command with exactly one required argument
    /// yields that argument's string. Containers yield their content when it
    /// is empty or a single text node. Anything else has no string.
    pub fn string(&self, id: NodeId) -> Option<&str> {
        let data = &self.nodes[id.0];
        match &data.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Comment(_) => None,
            NodeKind::Command { .. } => match data.args.as_slice() {
                [only] if self.arg_kind(*only) == Some(ArgKind::Required) => {
                    self.plain_content(*only)
                }
                _ => None,
            },
            NodeKind::Root
            | NodeKind::Environment { .. }
            | NodeKind::Argument(_)
            | NodeKind::Group
            | NodeKind::Math { .. } => self.plain_content(id),
        }
    }

    fn plain_content(&self, id: NodeId) -> Option<&str> {
        match self.nodes[id.0].children.as_slice() {
            [] => Some(""),
            [only] => match &self.nodes[only.0].kind {
                NodeKind::Text(text) => Some(text),
                _ => None,
            },
            _ => None,
        }
    }
}

fn push_reversed(stack: &mut Vec<NodeId>, doc: &TexDocument, id: NodeId) {
    let data = &doc.nodes[id.0];
    stack.extend(data.children.iter().rev());
    stack.extend(data.args.iter().rev());
}

/// What ends the content currently being read.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Until {
    Eof,
    Brace,
    Bracket,
    End(String),
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    nodes: Vec<NodeData>,
    depth: usize,
    /// Offset of the last `]` in the source; a `[` after it cannot close.
    last_close_bracket: Option<usize>,
    /// Offsets of `[` already known not to open an optional argument.
    failed_brackets: HashSet<usize>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>, start: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            args: Vec::new(),
            children: Vec::new(),
            span: start..start,
            inner: start..start,
        });
        id
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind, start: usize) -> NodeId {
        let id = self.push(kind, Some(parent), start);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push_arg(&mut self, owner: NodeId, kind: ArgKind, start: usize) -> NodeId {
        let id = self.push(NodeKind::Argument(kind), Some(owner), start);
        self.nodes[owner.0].args.push(id);
        id
    }

    fn finish(&mut self, id: NodeId, inner: Range<usize>) {
        let data = &mut self.nodes[id.0];
        data.span.end = self.pos;
        data.inner = inner;
    }

    fn error(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        let before = &self.src[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        ParseError {
            kind,
            offset,
            line,
            column,
        }
    }

    /// Read nodes into `parent` until `until` is reached. Returns the offset
    /// where the terminator starts; the terminator itself is left unread,
    /// except for `\end{..}` which is consumed.
    fn parse_content(
        &mut self,
        parent: NodeId,
        until: &Until,
        opened_at: usize,
    ) -> Result<usize, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(ParseErrorKind::TooDeep, opened_at));
        }
        self.depth += 1;
        let result = self.read_content(parent, until, opened_at);
        self.depth -= 1;
        result
    }

    fn read_content(
        &mut self,
        parent: NodeId,
        until: &Until,
        opened_at: usize,
    ) -> Result<usize, ParseError> {
        loop {
            let Some(byte) = self.peek() else {
                return match until {
                    Until::Eof => Ok(self.pos),
                    Until::Brace => Err(self.error(ParseErrorKind::UnclosedGroup, opened_at)),
                    Until::Bracket => {
                        Err(self.error(ParseErrorKind::UnclosedArgument, opened_at))
                    }
                    Until::End(name) => Err(self.error(
                        ParseErrorKind::UnclosedEnvironment(name.clone()),
                        opened_at,
                    )),
                };
            };
            match byte {
                b'}' if *until == Until::Brace => return Ok(self.pos),
                b'}' => return Err(self.error(ParseErrorKind::UnexpectedCloseBrace, self.pos)),
                b']' if *until == Until::Bracket => return Ok(self.pos),
                b'{' => {
                    let start = self.pos;
                    let group = self.push_child(parent, NodeKind::Group, start);
                    self.parse_braced(group)?;
                }
                b'$' => self.parse_dollar_math(parent)?,
                b'%' => self.parse_comment(parent),
                b'\\' => {
                    if let Some(end_at) = self.parse_backslash(parent, until)? {
                        return Ok(end_at);
                    }
                }
                _ => self.parse_text(parent, *until == Until::Bracket),
            }
        }
    }

    /// Read `{..}` into an already-created node.
    fn parse_braced(&mut self, node: NodeId) -> Result<(), ParseError> {
        let open = self.pos;
        self.pos += 1;
        let close = self.parse_content(node, &Until::Brace, open)?;
        self.pos = close + 1;
        self.finish(node, open + 1..close);
        Ok(())
    }

    /// Read the arguments directly following a command or `\begin{..}`.
    ///
    /// With `skip_space`, blanks and at most one newline may separate the
    /// command from its first argument, as TeX skips them after a control
    /// word. They are given back when no argument follows.
    fn parse_args(&mut self, owner: NodeId, skip_space: bool) -> Result<(), ParseError> {
        let resume = self.pos;
        if skip_space {
            self.pos = self.after_control_word_space();
        }
        loop {
            match self.peek() {
                Some(b'{') => {
                    let arg = self.push_arg(owner, ArgKind::Required, self.pos);
                    self.parse_braced(arg)?;
                }
                Some(b'[') => {
                    if !self.try_optional_arg(owner)? {
                        break;
                    }
                }
                _ => break,
            }
        }
        if self.nodes[owner.0].args.is_empty() {
            self.pos = resume;
        }
        Ok(())
    }

    /// Offset after blanks and at most one line break; never crosses a
    /// paragraph break.
    fn after_control_word_space(&self) -> usize {
        let bytes = self.src.as_bytes();
        let blanks = |mut i: usize| {
            while matches!(bytes.get(i), Some(b' ' | b'\t' | b'\r')) {
                i += 1;
            }
            i
        };
        let mut i = blanks(self.pos);
        if bytes.get(i) == Some(&b'\n') {
            i = blanks(i + 1);
            if bytes.get(i) == Some(&b'\n') {
                return self.pos;
            }
        }
        i
    }

    /// A `[` that never closes is plain text, not an argument; roll back.
    ///
    /// Whether a `[` closes depends only on the source after it, so each
    /// failed offset is remembered and never read as an argument again.
    fn try_optional_arg(&mut self, owner: NodeId) -> Result<bool, ParseError> {
        if self.failed_brackets.contains(&self.pos)
            || self.last_close_bracket.is_none_or(|last| last < self.pos)
        {
            return Ok(false);
        }
        let saved_pos = self.pos;
        let saved_len = self.nodes.len();
        let open = self.pos;
        let arg = self.push_arg(owner, ArgKind::Optional, open);
        self.pos += 1;
        match self.parse_content(arg, &Until::Bracket, open) {
            Ok(close) => {
                self.pos = close + 1;
                self.finish(arg, open + 1..close);
                Ok(true)
            }
            Err(e) if e.kind == ParseErrorKind::TooDeep => Err(e),
            Err(_) => {
                self.failed_brackets.insert(saved_pos);
                self.pos = saved_pos;
                self.nodes.truncate(saved_len);
                self.nodes[owner.0].args.pop();
                Ok(false)
            }
        }
    }

    /// Handle everything introduced by a backslash. Returns the offset of
    /// `\end` when it closes the environment being read.
    fn parse_backslash(
        &mut self,
        parent: NodeId,
        until: &Until,
    ) -> Result<Option<usize>, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let Some(name) = self.read_command_name() else {
            self.push_child(parent, NodeKind::Text("\\".to_string()), start);
            self.finish_leaf(parent);
            return Ok(None);
        };
        match name.as_str() {
            "begin" => {
                self.parse_environment(parent, start)?;
                Ok(None)
            }
            "end" => {
                let found = self.read_environment_name(start)?;
                match until {
                    Until::End(expected) if *expected == found => Ok(Some(start)),
                    Until::End(expected) => Err(self.error(
                        ParseErrorKind::MismatchedEnd {
                            expected: expected.clone(),
                            found,
                        },
                        start,
                    )),
                    _ => Err(self.error(ParseErrorKind::UnexpectedEnd(found), start)),
                }
            }
            "(" => {
                self.parse_math(parent, start, b"\\)", false)?;
                Ok(None)
            }
            "[" => {
                self.parse_math(parent, start, b"\\]", true)?;
                Ok(None)
            }
            _ => {
                let takes_args = !is_escaped_special(&name);
                let node = self.push_child(parent, NodeKind::Command { name: name.clone() }, start);
                if takes_args {
                    let control_word = name.bytes().all(|b| b.is_ascii_alphabetic());
                    self.parse_args(node, control_word)?;
                }
                let end = self.pos;
                self.finish(node, end..end);
                Ok(None)
            }
        }
    }

    /// Close the span of the node just pushed under `parent`.
    fn finish_leaf(&mut self, parent: NodeId) {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            let start = self.nodes[last.0].span.start;
            self.finish(last, start..self.pos);
        }
    }

    fn read_command_name(&mut self) -> Option<String> {
        let rest = &self.src[self.pos..];
        let letters = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        if letters > 0 {
            self.pos += letters;
            return Some(rest[..letters].to_string());
        }
        let symbol = rest.chars().next()?;
        self.pos += symbol.len_utf8();
        Some(symbol.to_string())
    }

    fn read_environment_name(&mut self, command_start: usize) -> Result<String, ParseError> {
        if self.peek() != Some(b'{') {
            return Err(self.error(ParseErrorKind::MissingEnvironmentName, command_start));
        }
        let name_start = self.pos + 1;
        let Some(len) = self.src[name_start..].find('}') else {
            return Err(self.error(ParseErrorKind::UnclosedGroup, self.pos));
        };
        let name = self.src[name_start..name_start + len].trim();
        if name.is_empty() {
            return Err(self.error(ParseErrorKind::MissingEnvironmentName, command_start));
        }
        self.pos = name_start + len + 1;
        Ok(name.to_string())
    }

    fn parse_environment(&mut self, parent: NodeId, start: usize) -> Result<(), ParseError> {
        let name = self.read_environment_name(start)?;
        let node = self.push_child(
            parent,
            NodeKind::Environment { name: name.clone() },
            start,
        );
        self.parse_args(node, false)?;
        let body_start = self.pos;
        let body_end = self.parse_content(node, &Until::End(name), start)?;
        self.finish(node, body_start..body_end);
        Ok(())
    }

    fn parse_dollar_math(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let start = self.pos;
        if self.src[start..].starts_with("$$") {
            self.pos += 2;
            self.parse_math(parent, start, b"$$", true)
        } else {
            self.pos += 1;
            self.parse_math(parent, start, b"$", false)
        }
    }

    /// Math content is kept verbatim as a single text child.
    fn parse_math(
        &mut self,
        parent: NodeId,
        start: usize,
        close: &[u8],
        display: bool,
    ) -> Result<(), ParseError> {
        let bytes = self.src.as_bytes();
        let inner_start = self.pos;
        let mut i = inner_start;
        let inner_end = loop {
            if i >= bytes.len() {
                return Err(self.error(ParseErrorKind::UnclosedMath, start));
            }
            if bytes[i..].starts_with(close) {
                break i;
            }
            i += if bytes[i] == b'\\' { 2 } else { 1 };
        };
        let node = self.push_child(parent, NodeKind::Math { display }, start);
        if inner_end > inner_start {
            let text = self.src[inner_start..inner_end].to_string();
            let child = self.push_child(node, NodeKind::Text(text), inner_start);
            self.nodes[child.0].span = inner_start..inner_end;
            self.nodes[child.0].inner = inner_start..inner_end;
        }
        self.pos = inner_end + close.len();
        self.finish(node, inner_start..inner_end);
        Ok(())
    }

    fn parse_comment(&mut self, parent: NodeId) {
        let start = self.pos;
        let end = self.src[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.src.len());
        let text = self.src[start + 1..end].to_string();
        self.push_child(parent, NodeKind::Comment(text), start);
        self.pos = end;
        self.finish_leaf(parent);
    }

    fn parse_text(&mut self, parent: NodeId, in_bracket: bool) {
        let start = self.pos;
        let len = self.src[start..]
            .bytes()
            .take_while(|&b| !matches!(b, b'\\' | b'{' | b'}' | b'$' | b'%') && !(in_bracket && b == b']'))
            .count();
        self.pos = start + len;
        let text = self.src[start..self.pos].to_string();
        self.push_child(parent, NodeKind::Text(text), start);
        self.finish_leaf(parent);
    }
}

/// Escaped special characters never take arguments: `\{x}` is a literal
/// brace followed by a group.
fn is_escaped_special(name: &str) -> bool {
    matches!(
        name,
        "%" | "{" | "}" | "$" | "&" | "#" | "_" | " " | "\n" | "\t" | "~" | "^"
    )
}
