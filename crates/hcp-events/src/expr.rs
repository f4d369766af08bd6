//! Expression language for selections, category definitions and variables,
//! evaluated column-wise over an [`EventBatch`].
//!
//! Grammar, loosest binding first: `||`, `&&`, comparisons
//! (`== != < <= > >=`), `+ -`, `* /`, prefix `-` and `!`. Calls to `abs`,
//! `sqrt`, `log`, `exp`, `pow`, `min` and `max` are built in. Truth is `> 0`.
//!
//! Column names may contain dots (`Jet.pt`). A jagged column can be indexed
//! per event with `Jet.pt[:,0]` or `Jet.pt[0]`; events with too few objects
//! get the caller's null value. An expression touching an unindexed jagged
//! column is evaluated once per object, with per-event inputs broadcast.

use std::fmt;

use crate::batch::EventBatch;
use crate::column::{Column, JaggedCol};
use crate::error::{EventsError, Result};

fn syntax(msg: impl Into<String>) -> EventsError {
    EventsError::Expression(msg.into())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div => 5,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        let flag = |t: bool| if t { 1.0 } else { 0.0 };
        match self {
            BinOp::Or => flag(a > 0.0 || b > 0.0),
            BinOp::And => flag(a > 0.0 && b > 0.0),
            BinOp::Eq => flag((a - b).abs() < f64::EPSILON),
            BinOp::Ne => flag((a - b).abs() >= f64::EPSILON),
            BinOp::Lt => flag(a < b),
            BinOp::Le => flag(a <= b),
            BinOp::Gt => flag(a > b),
            BinOp::Ge => flag(a >= b),
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
        }
    }
}

/// Prefix operators bind tighter than any binary one.
const PREFIX_PRECEDENCE: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        if matches!(self, Func::Pow | Func::Min | Func::Max) { 2 } else { 1 }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Func::Abs => args[0].abs(),
            Func::Sqrt => args[0].sqrt(),
            Func::Log => args[0].ln(),
            Func::Exp => args[0].exp(),
            Func::Pow => args[0].powf(args[1]),
            Func::Min => args[0].min(args[1]),
            Func::Max => args[0].max(args[1]),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    /// Slot in `CompiledExpr::required_columns`.
    Input(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

impl Node {
    fn eval(&self, inputs: &[f64]) -> f64 {
        match self {
            Node::Const(v) => *v,
            Node::Input(slot) => inputs[*slot],
            Node::Neg(inner) => -inner.eval(inputs),
            Node::Not(inner) => {
                if inner.eval(inputs) > 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Node::Binary(op, lhs, rhs) => op.apply(lhs.eval(inputs), rhs.eval(inputs)),
            Node::Call(func, args) => {
                let vals: Vec<f64> = args.iter().map(|a| a.eval(inputs)).collect();
                func.apply(&vals)
            }
        }
    }
}

/// A column referenced by an expression, optionally indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Column name.
    pub name: String,
    /// Object index for jagged columns (`Jet.pt[:,0]` → `Some(0)`).
    pub index: Option<usize>,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(i) = self.index {
            write!(f, "[:,{i}]")?;
        }
        Ok(())
    }
}

/// Values produced by evaluating an expression over a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValues {
    /// One value per event.
    PerEvent(Vec<f64>),
    /// One value per object of a jagged collection.
    PerObject(JaggedCol),
}

/// A parsed expression ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    root: Node,
    /// Columns read by the expression, in order of first appearance.
    pub required_columns: Vec<ColumnRef>,
}

impl CompiledExpr {
    /// Parse `input`.
    pub fn compile(input: &str) -> Result<Self> {
        let tokens = lex(input)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, columns: Vec::new() };
        let root = parser.expr(0)?;
        if let Some(tok) = parser.peek() {
            return Err(syntax(format!("unexpected {tok} after expression in '{input}'")));
        }
        Ok(Self { source: input.to_string(), root, required_columns: parser.columns })
    }

    /// Source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct column names, in order of first appearance.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.required_columns.len());
        for c in &self.required_columns {
            if !names.contains(&c.name.as_str()) {
                names.push(&c.name);
            }
        }
        names
    }

    /// Value for one row; `inputs` follows `required_columns`.
    pub fn eval_row(&self, inputs: &[f64]) -> f64 {
        self.root.eval(inputs)
    }

    /// Evaluate over a batch. `null` stands in for indexed objects an event
    /// does not have.
    pub fn eval_batch(&self, batch: &EventBatch, null: f64) -> Result<ExprValues> {
        enum Source<'b> {
            Event(Vec<f64>),
            Object(&'b JaggedCol),
        }

        let n = batch.len();
        let mut sources = Vec::with_capacity(self.required_columns.len());
        for col in &self.required_columns {
            let source = match (batch.column(&col.name)?, col.index) {
                (Column::Scalar(v), None) => Source::Event(v.clone()),
                (Column::Jagged(j), Some(k)) => {
                    Source::Event((0..n).map(|ev| j.get(ev, k, null)).collect())
                }
                (Column::Jagged(j), None) => Source::Object(j),
                (Column::Scalar(_), Some(_)) => {
                    return Err(syntax(format!(
                        "'{}' is not a collection and cannot be indexed in '{}'",
                        col.name, self.source
                    )));
                }
            };
            sources.push(source);
        }

        let mut collections = sources.iter().filter_map(|s| match s {
            Source::Object(j) => Some(*j),
            Source::Event(_) => None,
        });
        let mut row = vec![0.0; sources.len()];

        let Some(layout) = collections.next() else {
            let values = (0..n)
                .map(|ev| {
                    for (slot, s) in row.iter_mut().zip(&sources) {
                        if let Source::Event(v) = s {
                            *slot = v[ev];
                        }
                    }
                    self.root.eval(&row)
                })
                .collect();
            return Ok(ExprValues::PerEvent(values));
        };
        if collections.any(|j| j.offsets != layout.offsets) {
            return Err(EventsError::Shape(format!(
                "collections in '{}' differ in object counts",
                self.source
            )));
        }

        let mut flat = Vec::with_capacity(layout.flat.len());
        for ev in 0..n {
            for obj in layout.offsets[ev]..layout.offsets[ev + 1] {
                for (slot, s) in row.iter_mut().zip(&sources) {
                    *slot = match s {
                        Source::Event(v) => v[ev],
                        Source::Object(j) => j.flat[obj],
                    };
                }
                flat.push(self.root.eval(&row));
            }
        }
        Ok(ExprValues::PerObject(JaggedCol { flat, offsets: layout.offsets.clone() }))
    }

    /// Per-event boolean mask. Fails for expressions yielding one value per object.
    pub fn eval_mask(&self, batch: &EventBatch) -> Result<Vec<bool>> {
        match self.eval_batch(batch, f64::NAN)? {
            ExprValues::PerEvent(v) => Ok(v.into_iter().map(|x| x > 0.0).collect()),
            ExprValues::PerObject(j) if j.n_entries() == 0 => Ok(Vec::new()),
            ExprValues::PerObject(_) => Err(syntax(format!(
                "'{}' gives one value per object; index the collection for an event mask",
                self.source
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Index(usize),
    Op(BinOp),
    Bang,
    Open,
    Close,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(v) => write!(f, "number {v}"),
            Token::Name(n) => write!(f, "name '{n}'"),
            Token::Index(i) => write!(f, "index [{i}]"),
            Token::Op(op) => write!(f, "operator {op:?}"),
            Token::Bang => f.write_str("'!'"),
            Token::Open => f.write_str("'('"),
            Token::Close => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        let next = bytes.get(pos + 1).copied();
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let two = match (b, next) {
            (b'|', Some(b'|')) => Some(BinOp::Or),
            (b'&', Some(b'&')) => Some(BinOp::And),
            (b'=', Some(b'=')) => Some(BinOp::Eq),
            (b'!', Some(b'=')) => Some(BinOp::Ne),
            (b'<', Some(b'=')) => Some(BinOp::Le),
            (b'>', Some(b'=')) => Some(BinOp::Ge),
            _ => None,
        };
        if let Some(op) = two {
            tokens.push(Token::Op(op));
            pos += 2;
            continue;
        }

        let start = pos;
        let token = match b {
            b'+' => Token::Op(BinOp::Add),
            b'-' => Token::Op(BinOp::Sub),
            b'*' => Token::Op(BinOp::Mul),
            b'/' => Token::Op(BinOp::Div),
            b'<' => Token::Op(BinOp::Lt),
            b'>' => Token::Op(BinOp::Gt),
            b'!' => Token::Bang,
            b'(' => Token::Open,
            b')' => Token::Close,
            b',' => Token::Comma,
            b'[' => {
                if !matches!(tokens.last(), Some(Token::Name(_))) {
                    return Err(syntax(format!("'[' must follow a column name in '{input}'")));
                }
                let len = input[pos..]
                    .find(']')
                    .ok_or_else(|| syntax(format!("unclosed '[' in '{input}'")))?;
                let inner = input[pos + 1..pos + len].trim();
                let index = inner.strip_prefix(":,").unwrap_or(inner).trim();
                let index = index
                    .parse()
                    .map_err(|_| syntax(format!("bad index '[{inner}]' in '{input}'")))?;
                pos += len + 1;
                tokens.push(Token::Index(index));
                continue;
            }
            b'0'..=b'9' | b'.' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                    pos += 1;
                }
                if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
                    pos += 1;
                    if pos < bytes.len() && matches!(bytes[pos], b'+' | b'-') {
                        pos += 1;
                    }
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text = &input[start..pos];
                let value = text.parse().map_err(|_| syntax(format!("bad number '{text}'")))?;
                tokens.push(Token::Number(value));
                continue;
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'_' | b'.'))
                {
                    pos += 1;
                }
                let name = &input[start..pos];
                if name.ends_with('.') {
                    return Err(syntax(format!("column name '{name}' ends with '.'")));
                }
                tokens.push(Token::Name(name.to_string()));
                continue;
            }
            _ => {
                let c = input[pos..].chars().next().unwrap_or('?');
                return Err(syntax(format!("unexpected character '{c}' in '{input}'")));
            }
        };
        tokens.push(token);
        pos += 1;
    }
    Ok(tokens)
}

/// Precedence-climbing parser over the token stream.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    columns: Vec<ColumnRef>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += usize::from(tok.is_some());
        tok
    }

    fn eat(&mut self, want: &Token) -> Result<()> {
        match self.bump() {
            Some(ref t) if t == want => Ok(()),
            Some(t) => Err(syntax(format!("expected {want}, found {t}"))),
            None => Err(syntax(format!("expected {want}, found end of input"))),
        }
    }

    fn expr(&mut self, min_precedence: u8) -> Result<Node> {
        let mut lhs = self.prefix()?;
        while let Some(&Token::Op(op)) = self.peek() {
            let p = op.precedence();
            if p < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(p + 1)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Node> {
        match self.bump() {
            Some(Token::Op(BinOp::Sub)) => Ok(Node::Neg(Box::new(self.expr(PREFIX_PRECEDENCE)?))),
            Some(Token::Bang) => Ok(Node::Not(Box::new(self.expr(PREFIX_PRECEDENCE)?))),
            Some(Token::Number(v)) => Ok(Node::Const(v)),
            Some(Token::Open) => {
                let inner = self.expr(0)?;
                self.eat(&Token::Close)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek() == Some(&Token::Open) => self.call(name),
            Some(Token::Name(name)) => {
                let index = match self.peek() {
                    Some(&Token::Index(k)) => {
                        self.pos += 1;
                        Some(k)
                    }
                    _ => None,
                };
                Ok(Node::Input(self.slot(ColumnRef { name, index })))
            }
            Some(t) => Err(syntax(format!("expected a value, found {t}"))),
            None => Err(syntax("expression ends early")),
        }
    }

    fn call(&mut self, name: String) -> Result<Node> {
        let func = Func::lookup(&name).ok_or_else(|| syntax(format!("unknown function '{name}'")))?;
        self.eat(&Token::Open)?;
        let mut args = vec![self.expr(0)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expr(0)?);
        }
        self.eat(&Token::Close)?;
        if args.len() != func.arity() {
            return Err(syntax(format!(
                "{name}() takes {} argument(s), got {}",
                func.arity(),
                args.len()
            )));
        }
        Ok(Node::Call(func, args))
    }

    fn slot(&mut self, col: ColumnRef) -> usize {
        match self.columns.iter().position(|c| *c == col) {
            Some(i) => i,
            None => {
                self.columns.push(col);
                self.columns.len() - 1
            }
        }
    }
}
