// SPDX-License-Identifier: Apache-2.0

//! Boolean expressions attached to cell pins, with a parser for Liberty-style
//! formula strings.
//!
//! Variables are numbered by the owning cell: inputs first, then inouts, then
//! the two state variables of sequential cells.

use std::fmt;

use crate::logic::truth_table::TruthTable;

/// Deepest operator nesting accepted by the parser, the encoder and the
/// binary index. The root operator sits at depth 0.
pub const MAX_EXPR_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Zero,
    One,
    Literal { var: u32, negated: bool },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Xor(Vec<Expr>),
}

impl Expr {
    pub fn posi_literal(var: u32) -> Self {
        Expr::Literal {
            var,
            negated: false,
        }
    }

    pub fn nega_literal(var: u32) -> Self {
        Expr::Literal { var, negated: true }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Zero)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::One)
    }

    /// Parses `formula`, mapping every pin name through `resolve`.
    pub fn parse(formula: &str, resolve: impl Fn(&str) -> Option<u32>) -> Result<Expr, String> {
        let tokens = tokenize(formula)?;
        let mut parser = Parser {
            tokens: &tokens,
            resolve: &resolve,
            depth: 0,
        };
        let expr = parser.parse_or()?;
        if !parser.tokens.is_empty() {
            return Err(format!(
                "unexpected tokens at end of '{}': {:?}",
                formula, parser.tokens
            ));
        }
        Ok(expr)
    }

    /// Logical complement, pushed down to the literals.
    pub fn negate(&self) -> Expr {
        match self {
            Expr::Zero => Expr::One,
            Expr::One => Expr::Zero,
            Expr::Literal { var, negated } => Expr::Literal {
                var: *var,
                negated: !negated,
            },
            Expr::And(children) => Expr::Or(children.iter().map(Expr::negate).collect()),
            Expr::Or(children) => Expr::And(children.iter().map(Expr::negate).collect()),
            Expr::Xor(children) => match children.split_first() {
                None => Expr::One,
                Some((first, rest)) => {
                    let mut v = Vec::with_capacity(children.len());
                    v.push(first.negate());
                    v.extend(rest.iter().cloned());
                    Expr::Xor(v)
                }
            },
        }
    }

    /// Highest variable index referenced, if any.
    pub fn max_var(&self) -> Option<u32> {
        match self {
            Expr::Zero | Expr::One => None,
            Expr::Literal { var, .. } => Some(*var),
            Expr::And(c) | Expr::Or(c) | Expr::Xor(c) => c.iter().filter_map(Expr::max_var).max(),
        }
    }

    pub fn literal_count(&self) -> usize {
        match self {
            Expr::Zero | Expr::One => 0,
            Expr::Literal { .. } => 1,
            Expr::And(c) | Expr::Or(c) | Expr::Xor(c) => c.iter().map(Expr::literal_count).sum(),
        }
    }

    /// Depth of the deepest node, counting the root as 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((e, d)) = stack.pop() {
            deepest = deepest.max(d);
            if let Expr::And(c) | Expr::Or(c) | Expr::Xor(c) = e {
                stack.extend(c.iter().map(|child| (child, d + 1)));
            }
        }
        deepest
    }

    /// Evaluates the expression over `input_count` variables.
    pub fn to_truth_table(&self, input_count: usize) -> Result<TruthTable, String> {
        let depth = self.depth();
        if depth > MAX_EXPR_DEPTH {
            return Err(format!(
                "expression nesting {} exceeds the limit of {}",
                depth, MAX_EXPR_DEPTH
            ));
        }
        self.eval(input_count)
    }

    fn eval(&self, input_count: usize) -> Result<TruthTable, String> {
        match self {
            Expr::Zero => Ok(TruthTable::const0(input_count)),
            Expr::One => Ok(TruthTable::const1(input_count)),
            Expr::Literal { var, negated } => {
                let v = *var as usize;
                if v >= input_count {
                    return Err(format!(
                        "variable {} out of range for {} inputs",
                        var, input_count
                    ));
                }
                Ok(TruthTable::literal(input_count, v, *negated))
            }
            Expr::And(c) => fold(c, input_count, TruthTable::const1(input_count), TruthTable::and),
            Expr::Or(c) => fold(c, input_count, TruthTable::const0(input_count), TruthTable::or),
            Expr::Xor(c) => fold(c, input_count, TruthTable::const0(input_count), TruthTable::xor),
        }
    }
}

fn fold(
    children: &[Expr],
    input_count: usize,
    init: TruthTable,
    op: fn(&TruthTable, &TruthTable) -> TruthTable,
) -> Result<TruthTable, String> {
    let mut acc = init;
    for child in children {
        acc = op(&acc, &child.eval(input_count)?);
    }
    Ok(acc)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sep, children) = match self {
            Expr::Zero => return write!(f, "0"),
            Expr::One => return write!(f, "1"),
            Expr::Literal { var, negated } => {
                return write!(f, "{}V_{}", if *negated { "!" } else { "" }, var);
            }
            Expr::And(c) => (" * ", c),
            Expr::Or(c) => (" + ", c),
            Expr::Xor(c) => (" ^ ", c),
        };
        write!(f, "( ")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", sep)?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, " )")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    LParen,
    RParen,
    And,
    Or,
    Xor,
    Not,
    PostNot,
    Const(bool),
}

fn tokenize(s: &str) -> Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        let tok = match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
                continue;
            }
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '*' | '&' => Tok::And,
            '+' | '|' => Tok::Or,
            '^' => Tok::Xor,
            '!' | '~' => Tok::Not,
            '\'' => Tok::PostNot,
            '1' => Tok::Const(true),
            '0' => Tok::Const(false),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c2) = chars.peek() {
                    if c2.is_ascii_alphanumeric() || c2 == '_' || c2 == '[' || c2 == ']' {
                        ident.push(c2);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Tok::Ident(ident));
                continue;
            }
            _ => return Err(format!("unexpected character in formula: '{}'", c)),
        };
        chars.next();
        tokens.push(tok);
    }
    Ok(tokens)
}

struct Parser<'a, F: Fn(&str) -> Option<u32>> {
    tokens: &'a [Tok],
    resolve: &'a F,
    /// Open parentheses around the current position.
    depth: usize,
}

impl<'a, F: Fn(&str) -> Option<u32>> Parser<'a, F> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.first()
    }

    fn bump(&mut self) {
        self.tokens = &self.tokens[1..];
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.parse_xor()?];
        while let Some(Tok::Or) = self.peek() {
            self.bump();
            terms.push(self.parse_xor()?);
        }
        Ok(flatten(terms, Op::Or))
    }

    fn parse_xor(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.parse_and()?];
        while let Some(Tok::Xor) = self.peek() {
            self.bump();
            terms.push(self.parse_and()?);
        }
        Ok(flatten(terms, Op::Xor))
    }

    // Juxtaposed operands ("A B") are an implicit AND.
    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut terms = vec![self.parse_not()?];
        loop {
            match self.peek() {
                Some(Tok::And) => {
                    self.bump();
                    terms.push(self.parse_not()?);
                }
                Some(Tok::Ident(_)) | Some(Tok::LParen) | Some(Tok::Not) | Some(Tok::Const(_)) => {
                    terms.push(self.parse_not()?);
                }
                _ => break,
            }
        }
        Ok(flatten(terms, Op::And))
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        let mut negated = false;
        while let Some(Tok::Not) = self.peek() {
            self.bump();
            negated = !negated;
        }
        let mut e = self.parse_atom()?;
        if negated {
            e = e.negate();
        }
        while let Some(Tok::PostNot) = self.peek() {
            self.bump();
            e = e.negate();
        }
        Ok(e)
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Tok::Ident(name)) => {
                self.bump();
                let var = (self.resolve)(&name).ok_or_else(|| format!("unknown pin '{}'", name))?;
                Ok(Expr::posi_literal(var))
            }
            Some(Tok::Const(b)) => {
                self.bump();
                Ok(if b { Expr::One } else { Expr::Zero })
            }
            Some(Tok::LParen) => {
                self.bump();
                if self.depth == MAX_EXPR_DEPTH {
                    return Err(format!(
                        "parentheses nested deeper than {}",
                        MAX_EXPR_DEPTH
                    ));
                }
                self.depth += 1;
                let e = self.parse_or()?;
                self.depth -= 1;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.bump();
                        Ok(e)
                    }
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(tok) => Err(format!("unexpected token: {:?}", tok)),
            None => Err("unexpected end of formula".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    And,
    Or,
    Xor,
}

/// Collapses single-operand lists and merges nested operators of the same kind.
fn flatten(mut terms: Vec<Expr>, op: Op) -> Expr {
    if terms.len() == 1 {
        return terms.remove(0);
    }
    let mut out = Vec::with_capacity(terms.len());
    for t in terms {
        match (op, t) {
            (Op::And, Expr::And(c)) | (Op::Or, Expr::Or(c)) | (Op::Xor, Expr::Xor(c)) => {
                out.extend(c)
            }
            (_, t) => out.push(t),
        }
    }
    match op {
        Op::And => Expr::And(out),
        Op::Or => Expr::Or(out),
        Op::Xor => Expr::Xor(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ab(name: &str) -> Option<u32> {
        match name {
            "A" => Some(0),
            "B" => Some(1),
            "C" => Some(2),
            _ => None,
        }
    }

    #[test]
    fn test_parse_and_flattens() {
        let e = Expr::parse("A * (B * C)", ab).unwrap();
        assert_eq!(
            e,
            Expr::And(vec![
                Expr::posi_literal(0),
                Expr::posi_literal(1),
                Expr::posi_literal(2)
            ])
        );
    }

    #[test]
    fn test_parse_negations_push_down() {
        let e = Expr::parse("!(A + B')", ab).unwrap();
        assert_eq!(
            e,
            Expr::And(vec![Expr::nega_literal(0), Expr::posi_literal(1)])
        );
    }

    #[test]
    fn test_parse_unknown_pin() {
        let err = Expr::parse("A * Z", ab).unwrap_err();
        assert!(err.contains("unknown pin 'Z'"), "{}", err);
    }

    #[test]
    fn test_parse_nesting_limit() {
        let ok = format!("{}A{}", "(".repeat(MAX_EXPR_DEPTH), ")".repeat(MAX_EXPR_DEPTH));
        assert_eq!(Expr::parse(&ok, ab).unwrap(), Expr::posi_literal(0));
        let deep = format!(
            "{}A{}",
            "(".repeat(MAX_EXPR_DEPTH + 1),
            ")".repeat(MAX_EXPR_DEPTH + 1)
        );
        let err = Expr::parse(&deep, ab).unwrap_err();
        assert!(err.contains("nested deeper"), "{}", err);
        // Long runs of prefix negation do not recurse.
        let nots = format!("{}A", "!".repeat(10_001));
        assert_eq!(Expr::parse(&nots, ab).unwrap(), Expr::nega_literal(0));
    }

    #[test]
    fn test_truth_table_depth_limit() {
        let mut e = Expr::posi_literal(0);
        for _ in 0..=MAX_EXPR_DEPTH {
            e = Expr::Or(vec![e]);
        }
        assert_eq!(e.depth(), MAX_EXPR_DEPTH + 1);
        assert!(e.to_truth_table(1).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expr::parse("(A * )", ab).is_err());
        assert!(Expr::parse("(A + B", ab).is_err());
        assert!(Expr::parse("A $ B", ab).is_err());
        assert!(Expr::parse("", ab).is_err());
    }

    #[test_case("A * B", "8"; "and2")]
    #[test_case("A & B", "8"; "and2 ampersand")]
    #[test_case("A B", "8"; "and2 juxtaposed")]
    #[test_case("!(A * B)", "7"; "nand2")]
    #[test_case("A + B", "e"; "or2")]
    #[test_case("A | !B", "b"; "or2 negated input")]
    #[test_case("A ^ B", "6"; "xor2")]
    #[test_case("(A ^ B)'", "9"; "xnor2 postfix")]
    #[test_case("~A", "5"; "tilde")]
    #[test_case("1", "f"; "const1")]
    #[test_case("0", "0"; "const0")]
    fn test_truth_tables(formula: &str, hex: &str) {
        let e = Expr::parse(formula, ab).unwrap();
        assert_eq!(e.to_truth_table(2).unwrap().to_hex(), hex);
    }

    #[test]
    fn test_negate_matches_complement() {
        let e = Expr::parse("(A ^ B) + !C * A", ab).unwrap();
        let t = e.to_truth_table(3).unwrap();
        assert_eq!(e.negate().to_truth_table(3).unwrap(), t.complement());
    }

    #[test]
    fn test_out_of_range_variable() {
        let e = Expr::Or(vec![Expr::posi_literal(0), Expr::posi_literal(4)]);
        assert_eq!(e.max_var(), Some(4));
        assert!(e.to_truth_table(2).is_err());
    }

    #[test]
    fn test_display() {
        let e = Expr::parse("A * !B + C", ab).unwrap();
        assert_eq!(e.to_string(), "( ( V_0 * !V_1 ) + V_2 )");
    }
}
