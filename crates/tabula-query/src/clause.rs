//! Parses WHERE and HAVING clauses into predicate trees.
//!
//! A clause is split on top-level `AND` first, then each segment on `OR`,
//! giving `And([Or([..]), Or([..])])`. `a = 1 AND b = 2 OR c = 3` therefore
//! reads as `a = 1 AND (b = 2 OR c = 3)`. Keywords nested in parentheses do
//! not split, and neither does the `AND` of a `BETWEEN`.
//!
//! Each disjunct is tried against the recognizers below in order; the first
//! that accepts it wins. A disjunct nobody accepts becomes
//! [`Predicate::Unmatched`].

use sqlparser::tokenizer::Token;

use crate::aggregate::AggregateFunc;
use crate::lexer::{identifier, is_keyword, literal, literal_text, render, starts_with_keywords};
use crate::predicate::{CompareOp, LikePattern, Predicate, Subquery};

type Recognizer = fn(&[Token]) -> Option<Predicate>;

/// Disjunct shapes, in priority order.
const RECOGNIZERS: &[(&str, Recognizer)] = &[
    ("in-subquery", in_subquery),
    ("in-list", in_list),
    ("like", like),
    ("between", between),
    ("null-check", null_check),
    ("comparison", comparison),
];

/// Parses a clause (without its WHERE/HAVING keyword).
pub(crate) fn parse_clause(tokens: &[Token]) -> Predicate {
    let groups = split_top_level(tokens, "and")
        .into_iter()
        .map(|segment| {
            Predicate::Or(
                split_top_level(segment, "or")
                    .into_iter()
                    .map(parse_disjunct)
                    .collect(),
            )
        })
        .collect();
    Predicate::And(groups)
}

fn parse_disjunct(tokens: &[Token]) -> Predicate {
    if let Some(inner) = unwrap_parens(tokens) {
        return parse_clause(inner);
    }
    for (name, recognize) in RECOGNIZERS {
        if let Some(predicate) = recognize(tokens) {
            tracing::trace!(shape = *name, "clause recognized");
            return predicate;
        }
    }
    let text = render(tokens);
    tracing::warn!(clause = %text, "unmatched predicate clause, treating as false");
    Predicate::Unmatched(text)
}

// ============================================================================
// Splitting
// ============================================================================

/// Splits on a keyword at parenthesis depth zero.
///
/// When splitting on `AND`, the first `AND` after a `BETWEEN` belongs to
/// that `BETWEEN`.
fn split_top_level<'t>(tokens: &'t [Token], keyword: &str) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut pending_between = false;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ if is_keyword(token, "between") => pending_between = true,
            _ if is_keyword(token, keyword) => {
                if keyword.eq_ignore_ascii_case("and") && pending_between {
                    pending_between = false;
                } else {
                    parts.push(&tokens[start..i]);
                    start = i + 1;
                }
            }
            _ if is_keyword(token, "and") => pending_between = false,
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// The contents of a slice wholly wrapped in one pair of parentheses.
fn unwrap_parens(tokens: &[Token]) -> Option<&[Token]> {
    let [Token::LParen, inner @ .., Token::RParen] = tokens else {
        return None;
    };
    let mut depth = 0usize;
    for token in inner {
        match token {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => return None,
            Token::RParen => depth -= 1,
            _ => {}
        }
    }
    (depth == 0 && !inner.is_empty()).then_some(inner)
}

/// Splits on commas at parenthesis depth zero.
pub(crate) fn split_commas(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

// ============================================================================
// Field References
// ============================================================================

/// Reads a field reference at the start of `tokens`.
///
/// Accepts `name`, `alias.name`, and an aggregate call such as `SUM(v)`.
/// A call is returned as its [`AggregateFunc::call_name`]; the statement
/// parser later maps it onto the SELECT list's output column. Returns the
/// field name and the number of tokens consumed.
pub(crate) fn field_ref(tokens: &[Token]) -> Option<(String, usize)> {
    match tokens {
        [Token::Word(func), Token::LParen, rest @ ..] if func.quote_style.is_none() => {
            let func = AggregateFunc::from_name(&func.value)?;
            let close = rest.iter().position(|t| *t == Token::RParen)?;
            let arg = match &rest[..close] {
                [Token::Mul] => "*".to_string(),
                inner => match field_ref(inner)? {
                    (name, used) if used == inner.len() => name,
                    _ => return None,
                },
            };
            Some((func.call_name(&arg), close + 3))
        }
        [Token::Word(qualifier), Token::Period, Token::Word(name), ..] => {
            Some((format!("{}.{}", qualifier.value, name.value), 3))
        }
        [Token::Word(name), ..] if !is_reserved(&tokens[0]) => Some((name.value.clone(), 1)),
        _ => None,
    }
}

fn is_reserved(token: &Token) -> bool {
    ["not", "in", "like", "between", "is", "null", "and", "or", "select"]
        .iter()
        .any(|kw| is_keyword(token, kw))
}

/// Splits an optional leading `NOT`.
fn negation(tokens: &[Token]) -> (bool, &[Token]) {
    match tokens {
        [first, rest @ ..] if is_keyword(first, "not") => (true, rest),
        _ => (false, tokens),
    }
}

// ============================================================================
// Recognizers
// ============================================================================

fn in_subquery(tokens: &[Token]) -> Option<Predicate> {
    let (field, used) = field_ref(tokens)?;
    let (negated, rest) = negation(&tokens[used..]);
    let [in_kw, rest @ ..] = rest else {
        return None;
    };
    if !is_keyword(in_kw, "in") {
        return None;
    }
    let inner = unwrap_parens(rest)?;
    if !is_keyword(inner.first()?, "select") {
        return None;
    }

    let (sub_field, used) = field_ref(&inner[1..])?;
    let rest = &inner[1 + used..];
    let [from_kw, table, rest @ ..] = rest else {
        return None;
    };
    if !is_keyword(from_kw, "from") {
        return None;
    }
    let table = identifier(table)?;
    let filter = match rest {
        [] => None,
        [where_kw, cond @ ..] if is_keyword(where_kw, "where") && !cond.is_empty() => {
            Some(parse_clause(cond))
        }
        _ => return None,
    };

    Some(Predicate::InSubquery {
        field,
        subquery: Box::new(Subquery::new(table, sub_field, filter)),
        negated,
    })
}

fn in_list(tokens: &[Token]) -> Option<Predicate> {
    let (field, used) = field_ref(tokens)?;
    let (negated, rest) = negation(&tokens[used..]);
    let [in_kw, list @ ..] = rest else {
        return None;
    };
    if !is_keyword(in_kw, "in") {
        return None;
    }
    let [Token::LParen, items @ .., Token::RParen] = list else {
        return None;
    };
    let values = if items.is_empty() {
        Vec::new()
    } else {
        split_commas(items)
            .into_iter()
            .map(literal)
            .collect::<Option<Vec<_>>>()?
    };
    Some(Predicate::InList {
        field,
        values,
        negated,
    })
}

fn like(tokens: &[Token]) -> Option<Predicate> {
    let (field, used) = field_ref(tokens)?;
    let (negated, rest) = negation(&tokens[used..]);
    let [like_kw, pattern @ ..] = rest else {
        return None;
    };
    if !is_keyword(like_kw, "like") {
        return None;
    }
    Some(Predicate::Like {
        field,
        pattern: LikePattern::new(literal_text(pattern)?),
        negated,
    })
}

fn between(tokens: &[Token]) -> Option<Predicate> {
    let (field, used) = field_ref(tokens)?;
    let (negated, rest) = negation(&tokens[used..]);
    let [between_kw, bounds @ ..] = rest else {
        return None;
    };
    if !is_keyword(between_kw, "between") {
        return None;
    }
    let split = bounds.iter().position(|t| is_keyword(t, "and"))?;
    Some(Predicate::Between {
        field,
        low: literal(&bounds[..split])?,
        high: literal(&bounds[split + 1..])?,
        negated,
    })
}

fn null_check(tokens: &[Token]) -> Option<Predicate> {
    let (field, used) = field_ref(tokens)?;
    let rest = &tokens[used..];
    let negated = if starts_with_keywords(rest, &["is", "null"]) && rest.len() == 2 {
        false
    } else if starts_with_keywords(rest, &["is", "not", "null"]) && rest.len() == 3 {
        true
    } else {
        return None;
    };
    Some(Predicate::NullCheck { field, negated })
}

fn comparison(tokens: &[Token]) -> Option<Predicate> {
    let (field, used) = field_ref(tokens)?;
    let [op, value @ ..] = &tokens[used..] else {
        return None;
    };
    let op = match op {
        Token::Eq | Token::DoubleEq => CompareOp::Eq,
        Token::Neq => CompareOp::NotEq,
        Token::Lt => CompareOp::Lt,
        Token::Gt => CompareOp::Gt,
        Token::LtEq => CompareOp::LtEq,
        Token::GtEq => CompareOp::GtEq,
        _ => return None,
    };
    Some(Predicate::Comparison {
        field,
        op,
        value: literal(value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use tabula_types::Value;

    fn parse(sql: &str) -> Predicate {
        parse_clause(&tokenize(sql).unwrap())
    }

    /// The single disjunct of a one-condition clause.
    fn single(sql: &str) -> Predicate {
        match parse(sql) {
            Predicate::And(mut groups) if groups.len() == 1 => match groups.remove(0) {
                Predicate::Or(mut disjuncts) if disjuncts.len() == 1 => disjuncts.remove(0),
                other => panic!("expected one disjunct, got {other:?}"),
            },
            other => panic!("expected one group, got {other:?}"),
        }
    }

    fn group_sizes(predicate: &Predicate) -> Vec<usize> {
        match predicate {
            Predicate::And(groups) => groups
                .iter()
                .map(|g| match g {
                    Predicate::Or(d) => d.len(),
                    _ => 0,
                })
                .collect(),
            _ => vec![],
        }
    }

    #[test]
    fn and_splits_before_or() {
        let predicate = parse("a = 1 AND b = 2 OR c = 3");
        assert_eq!(group_sizes(&predicate), vec![1, 2]);
    }

    #[test]
    fn or_first_still_groups_by_and() {
        let predicate = parse("a = 1 OR b = 2 AND c = 3");
        assert_eq!(group_sizes(&predicate), vec![2, 1]);
    }

    #[test]
    fn comparison_operators() {
        for (sql, op) in [
            ("age = 30", CompareOp::Eq),
            ("age == 30", CompareOp::Eq),
            ("age != 30", CompareOp::NotEq),
            ("age <> 30", CompareOp::NotEq),
            ("age < 30", CompareOp::Lt),
            ("age > 30", CompareOp::Gt),
            ("age <= 30", CompareOp::LtEq),
            ("age >= 30", CompareOp::GtEq),
        ] {
            assert_eq!(
                single(sql),
                Predicate::Comparison {
                    field: "age".to_string(),
                    op,
                    value: Value::from(30),
                },
                "{sql}"
            );
        }
    }

    #[test]
    fn comparison_literal_quotes_are_stripped() {
        assert_eq!(
            single("name = 'alice'"),
            Predicate::Comparison {
                field: "name".to_string(),
                op: CompareOp::Eq,
                value: Value::from("alice"),
            }
        );
        assert_eq!(
            single("u.name = \"bob\""),
            Predicate::Comparison {
                field: "u.name".to_string(),
                op: CompareOp::Eq,
                value: Value::from("bob"),
            }
        );
    }

    #[test]
    fn like_and_not_like() {
        assert!(matches!(
            single("name LIKE 'A%'"),
            Predicate::Like { ref pattern, negated: false, .. } if pattern.as_str() == "A%"
        ));
        assert!(matches!(
            single("name NOT LIKE \"A%\""),
            Predicate::Like { negated: true, .. }
        ));
    }

    #[test]
    fn in_list_and_not_in() {
        assert_eq!(
            single("status IN ('a', 'b', 3)"),
            Predicate::InList {
                field: "status".to_string(),
                values: vec![Value::from("a"), Value::from("b"), Value::from(3)],
                negated: false,
            }
        );
        assert!(matches!(
            single("status NOT IN (1)"),
            Predicate::InList { negated: true, .. }
        ));
    }

    #[test]
    fn between_keeps_its_and() {
        let predicate = parse("age BETWEEN 20 AND 30 AND name = 'x'");
        assert_eq!(group_sizes(&predicate), vec![1, 1]);
        assert_eq!(
            single("age NOT BETWEEN 20 AND 30"),
            Predicate::Between {
                field: "age".to_string(),
                low: Value::from(20),
                high: Value::from(30),
                negated: true,
            }
        );
    }

    #[test]
    fn null_checks() {
        assert_eq!(
            single("email IS NULL"),
            Predicate::NullCheck {
                field: "email".to_string(),
                negated: false,
            }
        );
        assert_eq!(
            single("email IS NOT NULL"),
            Predicate::NullCheck {
                field: "email".to_string(),
                negated: true,
            }
        );
    }

    #[test]
    fn in_subquery_keeps_inner_where() {
        let predicate = single("id IN (SELECT user_id FROM orders WHERE total > 10 AND paid = true)");
        let Predicate::InSubquery {
            field,
            subquery,
            negated,
        } = predicate
        else {
            panic!("expected subquery");
        };
        assert_eq!(field, "id");
        assert!(!negated);
        assert_eq!(subquery.table, "orders");
        assert_eq!(subquery.field, "user_id");
        assert!(matches!(subquery.filter, Some(Predicate::And(ref g)) if g.len() == 2));
    }

    #[test]
    fn not_in_subquery() {
        assert!(matches!(
            single("id NOT IN (SELECT user_id FROM banned)"),
            Predicate::InSubquery { negated: true, .. }
        ));
    }

    #[test]
    fn parenthesized_disjunct_recurses() {
        let predicate = single("(a = 1 AND b = 2)");
        assert_eq!(group_sizes(&predicate), vec![1, 1]);
    }

    #[test]
    fn aggregate_reference_names_the_call() {
        assert!(matches!(
            single("SUM(v) > 4"),
            Predicate::Comparison { ref field, .. } if field == "sum(v)"
        ));
        assert!(matches!(
            single("count(*) >= 2"),
            Predicate::Comparison { ref field, .. } if field == "count(*)"
        ));
        assert!(matches!(single("SUM(a b) > 4"), Predicate::Unmatched(_)));
    }

    #[test]
    fn unmatched_disjunct() {
        assert!(matches!(single("age ~ 3"), Predicate::Unmatched(_)));
        assert!(matches!(single("age IS"), Predicate::Unmatched(_)));
        assert!(matches!(single("= 3"), Predicate::Unmatched(_)));
    }
}
