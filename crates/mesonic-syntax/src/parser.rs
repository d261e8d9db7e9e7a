#![allow(clippy::result_large_err)]

use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::errors::ParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct MesonParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Parse a Meson build script into a syntax tree.
pub fn parse(source: &str, filename: &str) -> Result<SyntaxTree, ParseError> {
    let pairs = MesonParser::parse(Rule::build_definition, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, (p + 1).min(source.len().max(1))),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::syntax(format!("{e}"), Span::new(start, end), source, filename)
    })?;

    let root_pair = pairs.into_iter().next().unwrap();
    let mut builder = TreeBuilder::new();
    let mut statements = Vec::new();
    for pair in root_pair.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        statements.push(build_statement(&mut builder, pair));
    }
    let root = builder.push(
        NodeKind::BuildDefinition { statements },
        Span::new(0, source.len()),
    );
    Ok(builder.finish(root, source.to_owned()))
}

// ---------------------------------------------------------------
// Statement builders
// ---------------------------------------------------------------

fn build_statement(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    match pair.as_rule() {
        Rule::assignment_statement => build_assignment(b, pair),
        Rule::expression_statement => {
            // Unwrapped: the statement is just its expression.
            match pair.into_inner().next() {
                Some(inner) => build_expression(b, inner),
                None => error_node(b, span, "empty statement"),
            }
        }
        Rule::selection_statement => build_selection(b, pair),
        Rule::iteration_statement => build_iteration(b, pair),
        Rule::break_statement => b.push(NodeKind::BreakNode, span),
        Rule::continue_statement => b.push(NodeKind::ContinueNode, span),
        other => error_node(b, span, format!("unexpected statement rule {other:?}")),
    }
}

fn build_assignment(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let (Some(lhs_pair), Some(op_pair), Some(rhs_pair)) =
        (inner.next(), inner.next(), inner.next())
    else {
        return error_node(b, span, "malformed assignment");
    };
    let lhs = build_expression(b, lhs_pair);
    let op = match op_pair.as_str() {
        "+=" => AssignmentOp::AddAssign,
        _ => AssignmentOp::Assign,
    };
    let rhs = build_expression(b, rhs_pair);
    b.push(NodeKind::AssignmentStatement { lhs, op, rhs }, span)
}

fn build_selection(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut conditions = Vec::new();
    let mut blocks: Vec<Vec<NodeId>> = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::kw_if | Rule::kw_elif | Rule::kw_endif => {}
            Rule::kw_else => blocks.push(Vec::new()),
            Rule::conditional_expression => {
                conditions.push(build_expression(b, inner));
                blocks.push(Vec::new());
            }
            _ => {
                let stmt = build_statement(b, inner);
                if let Some(block) = blocks.last_mut() {
                    block.push(stmt);
                }
            }
        }
    }
    b.push(NodeKind::SelectionStatement { conditions, blocks }, span)
}

fn build_iteration(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut variables = Vec::new();
    let mut iterable = None;
    let mut body = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::kw_foreach | Rule::kw_endforeach => {}
            Rule::id_expression => variables.push(build_id(b, inner)),
            Rule::conditional_expression => iterable = Some(build_expression(b, inner)),
            _ => body.push(build_statement(b, inner)),
        }
    }
    let iterable = match iterable {
        Some(id) => id,
        None => error_node(b, span, "foreach without an iterable"),
    };
    b.push(
        NodeKind::IterationStatement {
            variables,
            iterable,
            body,
        },
        span,
    )
}

// ---------------------------------------------------------------
// Expression builders
// ---------------------------------------------------------------

fn build_expression(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    match pair.as_rule() {
        Rule::conditional_expression => build_conditional(b, pair),
        Rule::or_expression | Rule::and_expression => build_binary_chain(b, pair),
        Rule::comparison_expression => build_binary_chain(b, pair),
        Rule::additive_expression | Rule::multiplicative_expression => build_binary_chain(b, pair),
        Rule::unary_expression => build_unary(b, pair),
        Rule::postfix_expression => build_postfix(b, pair),
        Rule::paren_expression => match pair.into_inner().next() {
            Some(inner) => build_expression(b, inner),
            None => error_node(b, span, "empty parentheses"),
        },
        Rule::boolean_literal => b.push(
            NodeKind::BooleanLiteral {
                value: pair.as_str() == "true",
            },
            span,
        ),
        Rule::integer_literal => build_integer(b, pair),
        Rule::string_literal => {
            let raw = pair.as_str();
            b.push(
                NodeKind::StringLiteral {
                    value: raw[1..raw.len() - 1].to_owned(),
                },
                span,
            )
        }
        Rule::array_literal => {
            let elements = pair
                .into_inner()
                .map(|p| build_expression(b, p))
                .collect();
            b.push(NodeKind::ArrayLiteral { elements }, span)
        }
        Rule::dictionary_literal => {
            let items = pair
                .into_inner()
                .map(|p| build_key_value(b, p))
                .collect();
            b.push(NodeKind::DictionaryLiteral { items }, span)
        }
        Rule::id_expression => build_id(b, pair),
        other => error_node(b, span, format!("unexpected expression rule {other:?}")),
    }
}

fn build_conditional(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner: Vec<_> = pair.into_inner().collect();
    if inner.len() == 1 {
        return build_expression(b, inner.remove(0));
    }
    let mut it = inner.into_iter();
    let (Some(c), Some(t), Some(f)) = (it.next(), it.next(), it.next()) else {
        return error_node(b, span, "malformed conditional expression");
    };
    let condition = build_expression(b, c);
    let if_true = build_expression(b, t);
    let if_false = build_expression(b, f);
    b.push(
        NodeKind::ConditionalExpression {
            condition,
            if_true,
            if_false,
        },
        span,
    )
}

/// Folds `lhs (op rhs)*` pairs into left-associated binary nodes. Layers
/// with a single operand collapse to that operand.
fn build_binary_chain(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let Some(first) = inner.next() else {
        return error_node(b, span, "empty expression");
    };
    let mut lhs = build_expression(b, first);
    while let Some(op_pair) = inner.next() {
        let op = match binary_op_from(op_pair.as_str()) {
            Some(op) => op,
            None => {
                return error_node(
                    b,
                    span,
                    format!("unknown operator '{}'", op_pair.as_str()),
                )
            }
        };
        let Some(rhs_pair) = inner.next() else {
            return error_node(b, span, "operator without right operand");
        };
        let rhs = build_expression(b, rhs_pair);
        let node_span = Span::new(b.span(lhs).start, b.span(rhs).end);
        lhs = b.push(NodeKind::BinaryExpression { lhs, op, rhs }, node_span);
    }
    lhs
}

fn binary_op_from(text: &str) -> Option<BinaryOp> {
    // `not in` may carry interior whitespace in the matched text.
    if text.starts_with("not") {
        return Some(BinaryOp::NotIn);
    }
    match text {
        "or" => Some(BinaryOp::Or),
        "and" => Some(BinaryOp::And),
        "==" => Some(BinaryOp::Eq),
        "!=" => Some(BinaryOp::Ne),
        "<" => Some(BinaryOp::Lt),
        "<=" => Some(BinaryOp::Le),
        ">" => Some(BinaryOp::Gt),
        ">=" => Some(BinaryOp::Ge),
        "in" => Some(BinaryOp::In),
        "+" => Some(BinaryOp::Add),
        "-" => Some(BinaryOp::Sub),
        "*" => Some(BinaryOp::Mul),
        "/" => Some(BinaryOp::Div),
        "%" => Some(BinaryOp::Mod),
        _ => None,
    }
}

fn build_unary(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner: Vec<_> = pair.into_inner().collect();
    if inner.len() == 1 {
        return build_expression(b, inner.remove(0));
    }
    let mut it = inner.into_iter();
    let (Some(op_pair), Some(operand_pair)) = (it.next(), it.next()) else {
        return error_node(b, span, "malformed unary expression");
    };
    let op = if op_pair.as_str() == "not" {
        UnaryOp::Not
    } else {
        UnaryOp::Neg
    };
    let operand = build_expression(b, operand_pair);
    b.push(NodeKind::UnaryExpression { op, operand }, span)
}

fn build_postfix(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let Some(first) = inner.next() else {
        return error_node(b, span, "empty postfix expression");
    };
    let mut node = build_expression(b, first);
    for suffix in inner {
        let suffix_span = span_from(&suffix);
        let node_span = Span::new(b.span(node).start, suffix_span.end);
        match suffix.as_rule() {
            Rule::call_suffix => {
                let args = match suffix.into_inner().next() {
                    Some(parens) => build_argument_list(b, parens),
                    None => error_node(b, suffix_span, "malformed call"),
                };
                // Only bare identifiers are callable functions.
                node = if matches!(b.kind(node), NodeKind::IdExpression { .. }) {
                    b.push(NodeKind::FunctionExpression { name: node, args }, node_span)
                } else {
                    error_node(b, node_span, "call target is not an identifier")
                };
            }
            Rule::method_suffix => {
                let mut parts = suffix.into_inner();
                let (Some(name_pair), Some(parens)) = (parts.next(), parts.next()) else {
                    node = error_node(b, node_span, "malformed method call");
                    continue;
                };
                let name = build_id(b, name_pair);
                let args = build_argument_list(b, parens);
                node = b.push(
                    NodeKind::MethodExpression {
                        object: node,
                        name,
                        args,
                    },
                    node_span,
                );
            }
            Rule::subscript_suffix => {
                let index = match suffix.into_inner().next() {
                    Some(p) => build_expression(b, p),
                    None => error_node(b, suffix_span, "empty subscript"),
                };
                node = b.push(
                    NodeKind::SubscriptExpression {
                        outer: node,
                        inner: index,
                    },
                    node_span,
                );
            }
            _ => {}
        }
    }
    node
}

fn build_argument_list(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    // Span covers the parentheses so whole-call rewrites stay clean.
    let span = span_from(&pair);
    let arguments = pair
        .into_inner()
        .map(|p| match p.as_rule() {
            Rule::keyword_item => build_keyword_item(b, p),
            _ => build_expression(b, p),
        })
        .collect();
    b.push(NodeKind::ArgumentList { arguments }, span)
}

fn build_keyword_item(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let (Some(name_pair), Some(value_pair)) = (inner.next(), inner.next()) else {
        return error_node(b, span, "malformed keyword argument");
    };
    let name = build_id(b, name_pair);
    let value = build_expression(b, value_pair);
    b.push(NodeKind::KeywordItem { name, value }, span)
}

fn build_key_value(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let (Some(key_pair), Some(value_pair)) = (inner.next(), inner.next()) else {
        return error_node(b, span, "malformed dictionary entry");
    };
    let key = build_expression(b, key_pair);
    let value = build_expression(b, value_pair);
    b.push(NodeKind::KeyValueItem { key, value }, span)
}

fn build_id(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    b.push(
        NodeKind::IdExpression {
            name: pair.as_str().to_owned(),
        },
        span,
    )
}

fn build_integer(b: &mut TreeBuilder, pair: Pair<'_>) -> NodeId {
    let span = span_from(&pair);
    let text = pair.as_str();
    let (base, digits, radix) = if let Some(rest) = text.strip_prefix("0x") {
        (IntegerBase::Hexadecimal, rest, 16)
    } else if let Some(rest) = text.strip_prefix("0o") {
        (IntegerBase::Octal, rest, 8)
    } else if let Some(rest) = text.strip_prefix("0b") {
        (IntegerBase::Binary, rest, 2)
    } else {
        (IntegerBase::Decimal, text, 10)
    };
    match u64::from_str_radix(digits, radix) {
        Ok(value) => b.push(NodeKind::IntegerLiteral { value, base }, span),
        Err(_) => error_node(b, span, format!("integer literal '{text}' out of range")),
    }
}

fn error_node(b: &mut TreeBuilder, span: Span, message: impl Into<String>) -> NodeId {
    b.push(
        NodeKind::ErrorNode {
            message: message.into(),
        },
        span,
    )
}
