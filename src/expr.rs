// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Part of the WEFT project (Workgraph Engine For Tensors).

//! Arithmetic operator expression language.
//!
//! Expressions are plain infix arithmetic over operand references written as
//! `{i}`, e.g. `({0} + {1}) / 2`. The engine parses them once when the
//! operator node is created; evaluation happens per scalar at run time.

use chumsky::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to the operator's i-th operand tensor.
    Operand(usize),
    Literal(f64),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

fn parser() -> impl Parser<char, Expr, Error = Simple<char>> {
    recursive(|expr| {
        let number = text::int(10)
            .then(just('.').ignore_then(text::digits(10)).or_not())
            .try_map(|(whole, frac): (String, Option<String>), span| {
                let text = match frac {
                    Some(frac) => format!("{whole}.{frac}"),
                    None => whole,
                };
                text.parse::<f64>()
                    .map(Expr::Literal)
                    .map_err(|_| Simple::custom(span, "number out of range"))
            });

        let operand = text::int(10)
            .delimited_by(just('{'), just('}'))
            .try_map(|s: String, span| {
                s.parse::<usize>()
                    .map(Expr::Operand)
                    .map_err(|_| Simple::custom(span, "operand index out of range"))
            });

        let atom = choice((
            number,
            operand,
            expr.delimited_by(just('('), just(')')),
        ))
        .padded()
        .boxed();

        let unary = just('-')
            .padded()
            .repeated()
            .then(atom)
            .foldr(|_, e| Expr::Neg(Box::new(e)));

        let product = unary
            .clone()
            .then(
                (choice((just('*').to(BinOp::Mul), just('/').to(BinOp::Div)))
                    .padded()
                    .then(unary))
                .repeated(),
            )
            .foldl(|l, (op, r)| Expr::Binary {
                op,
                left: Box::new(l),
                right: Box::new(r),
            });

        product
            .clone()
            .then(
                (choice((just('+').to(BinOp::Add), just('-').to(BinOp::Sub)))
                    .padded()
                    .then(product))
                .repeated(),
            )
            .foldl(|l, (op, r)| Expr::Binary {
                op,
                left: Box::new(l),
                right: Box::new(r),
            })
    })
}

/// Parses one expression, returning a rendered error message on failure.
pub fn parse(src: &str) -> Result<Expr, String> {
    parser().then_ignore(end()).parse(src).map_err(|errs| {
        errs.into_iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    })
}

impl Expr {
    /// Highest operand index referenced, if any operand appears at all.
    pub fn max_operand(&self) -> Option<usize> {
        match self {
            Expr::Operand(i) => Some(*i),
            Expr::Literal(_) => None,
            Expr::Neg(inner) => inner.max_operand(),
            Expr::Binary { left, right, .. } => match (left.max_operand(), right.max_operand()) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
        }
    }

    /// Evaluates with `fetch` supplying the value of each operand reference.
    pub fn eval(&self, fetch: &dyn Fn(usize) -> f64) -> f64 {
        match self {
            Expr::Operand(i) => fetch(*i),
            Expr::Literal(v) => *v,
            Expr::Neg(inner) => -inner.eval(fetch),
            Expr::Binary { op, left, right } => {
                let l = left.eval(fetch);
                let r = right.eval(fetch);
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, operands: &[f64]) -> f64 {
        parse(src).unwrap().eval(&|i| operands[i])
    }

    #[test]
    fn precedence_and_parens() {
        assert_eq!(eval("1 + 2 * 3", &[]), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[]), 9.0);
        assert_eq!(eval("8 / 2 / 2", &[]), 2.0);
    }

    #[test]
    fn operand_references() {
        assert_eq!(eval("({0} + {1}) / 2", &[3.0, 5.0]), 4.0);
        let expr = parse("{2} * {0}").unwrap();
        assert_eq!(expr.max_operand(), Some(2));
        assert_eq!(parse("1.5 * 2").unwrap().max_operand(), None);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval("-{0} + 1", &[2.0]), -1.0);
        assert_eq!(eval("--3", &[]), 3.0);
    }

    #[test]
    fn fractional_literals() {
        assert_eq!(eval("0.25 * {0}", &[8.0]), 2.0);
    }

    #[test]
    fn malformed_expressions_fail() {
        assert!(parse("1 +").is_err());
        assert!(parse("{a}").is_err());
        assert!(parse("1 ** 2").is_err());
        assert!(parse("").is_err());
    }
}
