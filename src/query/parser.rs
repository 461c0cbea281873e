//! Cypher parser using Pest

use crate::graph::{ColumnDef, ColumnKind, NodeTableDef, PropertyValue, RelTableDef};
use crate::query::ast::*;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/cypher.pest"]
struct CypherParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] pest::error::Error<Rule>),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse one or more `;`-separated statements
pub fn parse_statements(input: &str) -> ParseResult<Vec<Statement>> {
    let pairs = CypherParser::parse(Rule::statements, input)?;

    let mut statements = Vec::new();
    for pair in pairs {
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::statement {
                statements.push(parse_statement(inner)?);
            }
        }
    }
    Ok(statements)
}

fn parse_statement(pair: Pair) -> ParseResult<Statement> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::create_node_table => parse_create_node_table(inner),
        Rule::create_rel_table => parse_create_rel_table(inner),
        Rule::call_stmt => parse_call(inner),
        Rule::match_stmt => parse_match(inner),
        Rule::create_stmt => {
            let patterns = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::pattern_list)
                .ok_or_else(|| semantic("CREATE without pattern"))?;
            Ok(Statement::Create(parse_pattern_list(patterns)?))
        }
        other => Err(semantic(format!("Unexpected statement {:?}", other))),
    }
}

fn parse_create_node_table(pair: Pair) -> ParseResult<Statement> {
    let mut if_not_exists = false;
    let mut name = None;
    let mut columns = Vec::new();
    let mut primary_key: Vec<String> = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::if_not_exists => if_not_exists = true,
            Rule::identifier => name = Some(inner.as_str().to_string()),
            Rule::table_element => {
                let element = first_inner(inner)?;
                match element.as_rule() {
                    Rule::primary_key_def => {
                        if !primary_key.is_empty() {
                            return Err(semantic("Multiple PRIMARY KEY clauses"));
                        }
                        primary_key = identifiers(element);
                    }
                    _ => columns.push(parse_column_def(element)?),
                }
            }
            _ => {}
        }
    }

    Ok(Statement::CreateNodeTable {
        def: NodeTableDef {
            name: name.ok_or_else(|| semantic("Missing table name"))?,
            columns,
            primary_key,
        },
        if_not_exists,
    })
}

fn parse_create_rel_table(pair: Pair) -> ParseResult<Statement> {
    let mut if_not_exists = false;
    let mut name = None;
    let mut from = None;
    let mut to = None;
    let mut columns = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::if_not_exists => if_not_exists = true,
            Rule::identifier => name = Some(inner.as_str().to_string()),
            Rule::from_table => from = Some(inner.as_str().trim().to_string()),
            Rule::to_table => to = Some(inner.as_str().trim().to_string()),
            Rule::column_def => columns.push(parse_column_def(inner)?),
            _ => {}
        }
    }

    Ok(Statement::CreateRelTable {
        def: RelTableDef {
            name: name.ok_or_else(|| semantic("Missing table name"))?,
            from: from.ok_or_else(|| semantic("Missing FROM table"))?,
            to: to.ok_or_else(|| semantic("Missing TO table"))?,
            columns,
        },
        if_not_exists,
    })
}

fn parse_column_def(pair: Pair) -> ParseResult<ColumnDef> {
    let mut name = None;
    let mut kind = None;
    let mut default = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => name = Some(inner.as_str().to_string()),
            Rule::data_type => {
                kind = Some(
                    ColumnKind::parse(inner.as_str())
                        .ok_or_else(|| semantic(format!("Unknown data type {}", inner.as_str())))?,
                );
            }
            Rule::default_clause => {
                for value in inner.into_inner() {
                    match value.as_rule() {
                        Rule::literal => default = Some(parse_literal(value)?),
                        // A bare word default is taken as text
                        Rule::identifier => default = Some(PropertyValue::from(value.as_str())),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let mut column = ColumnDef::new(
        name.ok_or_else(|| semantic("Missing column name"))?,
        kind.ok_or_else(|| semantic("Missing column type"))?,
    );
    column.default = default;
    Ok(column)
}

fn parse_call(pair: Pair) -> ParseResult<Statement> {
    let procedure = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| semantic("Missing procedure name"))?;
    Ok(Statement::Call { procedure })
}

fn parse_match(pair: Pair) -> ParseResult<Statement> {
    let mut patterns = Vec::new();
    let mut conditions = Vec::new();
    let mut action = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::pattern_list => patterns = parse_pattern_list(inner)?,
            Rule::where_clause => {
                for condition in inner.into_inner() {
                    if condition.as_rule() == Rule::condition {
                        conditions.push(parse_condition(condition)?);
                    }
                }
            }
            Rule::create_clause => {
                let list = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::pattern_list)
                    .ok_or_else(|| semantic("CREATE without pattern"))?;
                action = Some(MatchAction::Create(parse_pattern_list(list)?));
            }
            Rule::return_clause => action = Some(MatchAction::Return(parse_return(inner)?)),
            _ => {}
        }
    }

    Ok(Statement::Match {
        patterns,
        conditions,
        action: action.ok_or_else(|| semantic("MATCH requires CREATE or RETURN"))?,
    })
}

fn parse_condition(pair: Pair) -> ParseResult<Condition> {
    let mut reference = None;
    let mut op = None;
    let mut value = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::property_ref => reference = Some(parse_property_ref(inner)?),
            Rule::comparison_op => {
                op = Some(
                    CompareOp::parse(inner.as_str())
                        .ok_or_else(|| semantic(format!("Unknown operator {}", inner.as_str())))?,
                )
            }
            Rule::value => value = Some(parse_value(inner)?),
            _ => {}
        }
    }

    let (variable, property) = reference.ok_or_else(|| semantic("Missing property reference"))?;
    Ok(Condition {
        variable,
        property,
        op: op.ok_or_else(|| semantic("Missing operator"))?,
        value: value.ok_or_else(|| semantic("Missing value"))?,
    })
}

fn parse_return(pair: Pair) -> ParseResult<ReturnClause> {
    let mut items = None;
    let mut limit = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::return_items => {
                let mut parsed = Vec::new();
                for item in inner.into_inner() {
                    match item.as_rule() {
                        Rule::return_all => {}
                        Rule::return_item => parsed.push(parse_return_item(item)?),
                        _ => {}
                    }
                }
                if !parsed.is_empty() {
                    items = Some(parsed);
                }
            }
            Rule::limit_clause => {
                let text = first_inner(inner)?.as_str().to_string();
                limit = Some(
                    text.parse::<usize>()
                        .map_err(|_| semantic(format!("Invalid LIMIT {}", text)))?,
                );
            }
            _ => {}
        }
    }

    Ok(ReturnClause { items, limit })
}

fn parse_return_item(pair: Pair) -> ParseResult<ReturnItem> {
    let mut expression = None;
    let mut alias = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::return_expr => {
                let expr = first_inner(inner)?;
                expression = Some(match expr.as_rule() {
                    Rule::count_star => ReturnExpression::CountStar,
                    Rule::property_ref => {
                        let (variable, property) = parse_property_ref(expr)?;
                        ReturnExpression::Property { variable, property }
                    }
                    _ => ReturnExpression::Variable(expr.as_str().to_string()),
                });
            }
            Rule::identifier => alias = Some(inner.as_str().to_string()),
            _ => {}
        }
    }

    Ok(ReturnItem {
        expression: expression.ok_or_else(|| semantic("Missing return expression"))?,
        alias,
    })
}

fn parse_pattern_list(pair: Pair) -> ParseResult<Vec<PathPattern>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::path)
        .map(parse_path)
        .collect()
}

fn parse_path(pair: Pair) -> ParseResult<PathPattern> {
    let mut inner = pair.into_inner();
    let start = parse_node_pattern(inner.next().ok_or_else(|| semantic("Empty pattern"))?)?;

    let mut hops = Vec::new();
    while let Some(rel) = inner.next() {
        let node = inner
            .next()
            .ok_or_else(|| semantic("Relationship pattern without target node"))?;
        hops.push((parse_rel_pattern(rel)?, parse_node_pattern(node)?));
    }
    Ok(PathPattern { start, hops })
}

fn parse_node_pattern(pair: Pair) -> ParseResult<NodePattern> {
    let mut pattern = NodePattern::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => pattern.variable = Some(inner.as_str().to_string()),
            Rule::label => pattern.table = Some(inner.as_str().to_string()),
            Rule::properties => pattern.properties = parse_properties(inner)?,
            _ => {}
        }
    }
    Ok(pattern)
}

fn parse_rel_pattern(pair: Pair) -> ParseResult<RelPattern> {
    let mut pattern = RelPattern::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => pattern.variable = Some(inner.as_str().to_string()),
            Rule::label => pattern.table = Some(inner.as_str().to_string()),
            Rule::properties => pattern.properties = parse_properties(inner)?,
            _ => {}
        }
    }
    Ok(pattern)
}

fn parse_properties(pair: Pair) -> ParseResult<Vec<(String, Expression)>> {
    let mut properties = Vec::new();
    for property in pair.into_inner() {
        let mut key = None;
        let mut value = None;
        for inner in property.into_inner() {
            match inner.as_rule() {
                Rule::identifier => key = Some(inner.as_str().to_string()),
                Rule::value => value = Some(parse_value(inner)?),
                _ => {}
            }
        }
        properties.push((
            key.ok_or_else(|| semantic("Missing property name"))?,
            value.ok_or_else(|| semantic("Missing property value"))?,
        ));
    }
    Ok(properties)
}

fn parse_property_ref(pair: Pair) -> ParseResult<(String, String)> {
    let mut parts = pair.into_inner().map(|p| p.as_str().to_string());
    match (parts.next(), parts.next()) {
        (Some(variable), Some(property)) => Ok((variable, property)),
        _ => Err(semantic("Malformed property reference")),
    }
}

fn parse_value(pair: Pair) -> ParseResult<Expression> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::parameter => {
            let name = first_inner(inner)?.as_str().to_string();
            Ok(Expression::Parameter(name))
        }
        _ => Ok(Expression::Literal(parse_literal(inner)?)),
    }
}

fn parse_literal(pair: Pair) -> ParseResult<PropertyValue> {
    let inner = first_inner(pair)?;
    let text = inner.as_str();
    match inner.as_rule() {
        Rule::string => {
            let raw = inner.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(PropertyValue::String(unescape(raw)))
        }
        Rule::integer => text
            .parse::<i64>()
            .map(PropertyValue::Integer)
            .map_err(|_| semantic(format!("Integer out of range: {}", text))),
        Rule::float => text
            .parse::<f64>()
            .map(PropertyValue::Float)
            .map_err(|_| semantic(format!("Invalid float: {}", text))),
        Rule::boolean => Ok(PropertyValue::Boolean(text.eq_ignore_ascii_case("true"))),
        Rule::null => Ok(PropertyValue::Null),
        other => Err(semantic(format!("Unexpected literal {:?}", other))),
    }
}

/// Resolve backslash escapes inside a quoted string
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn identifiers(pair: Pair) -> Vec<String> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn first_inner(pair: Pair) -> ParseResult<Pair> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| semantic(format!("Empty {:?}", rule)))
}

fn semantic(message: impl Into<String>) -> ParseError {
    ParseError::SemanticError(message.into())
}
