//! Abstract syntax tree for the graph store's Cypher dialect

use crate::graph::{NodeTableDef, PropertyValue, RelTableDef};
use std::fmt;

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `CREATE NODE TABLE [IF NOT EXISTS] ...`
    CreateNodeTable {
        def: NodeTableDef,
        if_not_exists: bool,
    },
    /// `CREATE REL TABLE [IF NOT EXISTS] ...`
    CreateRelTable {
        def: RelTableDef,
        if_not_exists: bool,
    },
    /// `CREATE pattern, ...` without a preceding MATCH
    Create(Vec<PathPattern>),
    /// `MATCH pattern, ... [WHERE ...] (CREATE ... | RETURN ...)`
    Match {
        patterns: Vec<PathPattern>,
        conditions: Vec<Condition>,
        action: MatchAction,
    },
    /// `CALL procedure() RETURN *`
    Call { procedure: String },
}

impl Statement {
    /// Check if this statement only reads
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Statement::Call { .. }
                | Statement::Match {
                    action: MatchAction::Return(_),
                    ..
                }
        )
    }
}

/// What a MATCH statement does with its bindings
#[derive(Debug, Clone, PartialEq)]
pub enum MatchAction {
    Create(Vec<PathPattern>),
    Return(ReturnClause),
}

/// A chain of node patterns connected by outgoing relationship patterns
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub hops: Vec<(RelPattern, NodePattern)>,
}

/// `(variable:Table {prop: value})`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub table: Option<String>,
    pub properties: Vec<(String, Expression)>,
}

/// `-[variable:TABLE {prop: value}]->`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelPattern {
    pub variable: Option<String>,
    pub table: Option<String>,
    pub properties: Vec<(String, Expression)>,
}

/// A value position: either an inline literal or a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(PropertyValue),
    Parameter(String),
}

/// `variable.property OP value`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub variable: String,
    pub property: String,
    pub op: CompareOp,
    pub value: Expression,
}

/// Comparison operators allowed in WHERE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "=" => Some(CompareOp::Eq),
            "<>" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }
}

/// RETURN clause
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnClause {
    /// `None` means `RETURN *`
    pub items: Option<Vec<ReturnItem>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expression: ReturnExpression,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// Column name in the result: the alias if given, otherwise the source text
    pub fn column_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expression.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnExpression {
    Variable(String),
    Property { variable: String, property: String },
    CountStar,
}

impl fmt::Display for ReturnExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnExpression::Variable(v) => write!(f, "{}", v),
            ReturnExpression::Property { variable, property } => write!(f, "{}.{}", variable, property),
            ReturnExpression::CountStar => write!(f, "count(*)"),
        }
    }
}
