//! Rendering property lists and match conditions as statement fragments

use crate::schema::{MatchCondition, Property, TableProperty};

/// Quote `value` as a single-quoted string literal, backslash-escaping
/// backslashes and single quotes
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// `name TYPE [DEFAULT value], ...` in declaration order
pub fn render_properties_for_schema(properties: &[TableProperty]) -> String {
    properties
        .iter()
        .map(|p| match &p.default {
            Some(default) => format!("{} {} DEFAULT {}", p.name, p.data_type, default),
            None => format!("{} {}", p.name, p.data_type),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `name: 'value', ...`, optionally wrapped in braces.
///
/// An absent list renders as empty text even when `wrap` is set; an empty
/// list renders as `{}` when wrapped.
pub fn render_properties_for_value(properties: Option<&[Property]>, wrap: bool) -> String {
    let Some(properties) = properties else {
        return String::new();
    };
    let body = properties
        .iter()
        .map(|p| format!("{}: {}", p.name, quote_literal(&p.value)))
        .collect::<Vec<_>>()
        .join(", ");
    if wrap {
        format!("{{{}}}", body)
    } else {
        body
    }
}

pub(crate) fn render_conditions<'a>(
    alias: &'a str,
    conditions: &'a [MatchCondition],
) -> impl Iterator<Item = String> + 'a {
    conditions
        .iter()
        .map(move |c| format!("{}.{} {} {}", alias, c.property, c.op, quote_literal(&c.value)))
}

/// All `from` conditions, then all `to` conditions, joined with `AND`
pub fn render_match_condition(
    from_alias: &str,
    to_alias: &str,
    from_conditions: &[MatchCondition],
    to_conditions: &[MatchCondition],
) -> String {
    render_conditions(from_alias, from_conditions)
        .chain(render_conditions(to_alias, to_conditions))
        .collect::<Vec<_>>()
        .join(" AND ")
}
