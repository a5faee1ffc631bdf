//! Parser for the predicate grammar:
//!
//! ```text
//! or         := and ("or" and)*
//! and        := not ("and" not)*
//! not        := "not" not | primary
//! primary    := "(" or ")" | comparison
//! comparison := field op literal | literal op field
//! op         := "==" | "!=" | "<=" | ">=" | "<" | ">"
//! literal    := number | 'string' | "string" | true | false | True | False
//! ```
//!
//! Before parsing, the source is scanned for constructs that would call into or modify the host
//! (calls, attribute access, subscripts, assignment); those are reported as unsafe rather than
//! as syntax errors.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as pchar, digit1, multispace0, one_of},
    combinator::{all_consuming, map, not, opt, peek, recognize, value, verify},
    error::{Error, ErrorKind},
    multi::fold_many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{
    error::RuleError,
    predicate::{CompareOp, Literal, Predicate},
};

const KEYWORDS: &[&str] = &["and", "or", "not", "true", "false", "True", "False"];

/// Words that only make sense as host-language code.
const FORBIDDEN_WORDS: &[&str] = &["lambda", "import", "exec", "eval", "globals", "locals"];

/// How deeply parentheses and `not` may nest along one path of the expression.
const MAX_NESTING: usize = 64;

/// How many `and`/`or` connectives one predicate may contain. Chains fold into left-deep trees,
/// so this also bounds the depth of the parsed predicate.
const MAX_CONNECTIVES: usize = 256;

pub(crate) fn parse_predicate(source: &str) -> Result<Predicate, RuleError> {
    if source.trim().is_empty() {
        return Err(RuleError::invalid(0, "the predicate is empty"));
    }

    check_safety(source)?;

    match all_consuming(delimited(multispace0, or_expr, multispace0))(source) {
        Ok((_, predicate)) => Ok(predicate),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let offset = source.len() - e.input.len();
            Err(RuleError::invalid(offset, describe(e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(RuleError::invalid(source.len(), "unexpected end")),
    }
}

fn describe(e: Error<&str>) -> String {
    if e.input.is_empty() {
        return "unexpected end of predicate".to_owned();
    }
    match e.code {
        ErrorKind::Eof => format!("unexpected input {:?}", truncate(e.input)),
        ErrorKind::Char if e.input.starts_with(&['\'', '"'][..]) => "unterminated string".to_owned(),
        ErrorKind::Float => format!("number out of range near {:?}", truncate(e.input)),
        _ => format!("expected a comparison near {:?}", truncate(e.input)),
    }
}

fn truncate(input: &str) -> &str {
    match input.char_indices().nth(16) {
        Some((end, _)) => &input[..end],
        None => input,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ============================================================================
// Safety scan
// ============================================================================

/// Rejects constructs outside the grammar that could execute or modify anything if the text
/// were handed to a general expression engine. String literal contents are skipped.
///
/// Predicates nested or chained beyond [`MAX_NESTING`] and [`MAX_CONNECTIVES`] are rejected as
/// invalid here too, before the recursive parser sees them.
fn check_safety(source: &str) -> Result<(), RuleError> {
    let bytes = source.as_bytes();
    // Whether the previous token could be called: a non-keyword word or a string.
    let mut callable = false;
    let mut nesting = Nesting::default();
    let mut connectives = 0;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\'' | b'"' => {
                i = skip_string(bytes, i);
                callable = true;
                continue;
            }
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' => {
                i = skip_number(bytes, i);
                callable = false;
                continue;
            }
            b'(' if callable => return Err(RuleError::unsafe_construct(i, "a function call")),
            b'(' => nesting.open(i)?,
            b')' => nesting.close(),
            b'.' => return Err(RuleError::unsafe_construct(i, "attribute access")),
            b'[' | b']' => return Err(RuleError::unsafe_construct(i, "subscripting")),
            b'@' => return Err(RuleError::unsafe_construct(i, "a variable reference")),
            b'`' => return Err(RuleError::unsafe_construct(i, "a quoted identifier")),
            b';' => return Err(RuleError::unsafe_construct(i, "a statement separator")),
            b':' if bytes.get(i + 1) == Some(&b'=') => {
                return Err(RuleError::unsafe_construct(i, "an assignment"));
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    callable = false;
                    continue;
                }
                let compound = i > 0 && matches!(bytes[i - 1], b'!' | b'<' | b'>');
                if !compound {
                    return Err(RuleError::unsafe_construct(i, "an assignment"));
                }
            }
            _ if is_ident_start(c as char) => {
                let start = i;
                while i < bytes.len() && is_ident_continue(bytes[i] as char) {
                    i += 1;
                }
                let word = &source[start..i];
                if FORBIDDEN_WORDS.contains(&word) || word.contains("__") {
                    return Err(RuleError::unsafe_construct(start, format!("`{word}`")));
                }
                match word {
                    "not" => nesting.negate(start)?,
                    "and" | "or" => {
                        connectives += 1;
                        if connectives > MAX_CONNECTIVES {
                            return Err(RuleError::invalid(
                                start,
                                format!("more than {MAX_CONNECTIVES} `and`/`or` connectives"),
                            ));
                        }
                        nesting.connect();
                    }
                    _ => {}
                }
                callable = !KEYWORDS.contains(&word);
                continue;
            }
            _ => {}
        }
        callable = false;
        i += 1;
    }

    Ok(())
}

/// Tracks how deeply the parser will recurse at the current position: every open parenthesis
/// and every `not` whose operand hasn't ended yet.
#[derive(Default)]
struct Nesting {
    /// Pending `not`s outside each open parenthesis.
    levels: Vec<usize>,
    /// Depth contributed by the open parentheses and the `not`s outside them.
    outer: usize,
    /// Pending `not`s at the current level.
    nots: usize,
}

impl Nesting {
    fn open(&mut self, offset: usize) -> Result<(), RuleError> {
        self.levels.push(self.nots);
        self.outer += self.nots + 1;
        self.nots = 0;
        self.check(offset)
    }

    /// A closing parenthesis ends the operand of the `not`s in front of it. Unbalanced ones are
    /// left to the parser to report.
    fn close(&mut self) {
        if let Some(nots) = self.levels.pop() {
            self.outer -= nots + 1;
        }
        self.nots = 0;
    }

    fn negate(&mut self, offset: usize) -> Result<(), RuleError> {
        self.nots += 1;
        self.check(offset)
    }

    /// `not` binds tighter than the connectives, so its operand has ended at `and`/`or`.
    fn connect(&mut self) {
        self.nots = 0;
    }

    fn check(&self, offset: usize) -> Result<(), RuleError> {
        if self.outer + self.nots > MAX_NESTING {
            return Err(RuleError::invalid(
                offset,
                format!("nesting deeper than {MAX_NESTING} levels"),
            ));
        }
        Ok(())
    }
}

/// Returns the index just past the number starting at `start`, including a fraction and an
/// exponent when they are followed by digits.
fn skip_number(bytes: &[u8], start: usize) -> usize {
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let is_digit_at = |i: usize| bytes.get(i).map_or(false, u8::is_ascii_digit);

    let mut i = digits(start);
    if bytes.get(i) == Some(&b'.') && is_digit_at(i + 1) {
        i = digits(i + 1);
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(i + 1), Some(b'+' | b'-')));
        if is_digit_at(i + 1 + sign) {
            i = digits(i + 1 + sign);
        }
    }
    i
}

/// Returns the index just past the string literal starting at `start`, or the end of input if
/// it is unterminated.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

// ============================================================================
// Grammar
// ============================================================================

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    preceded(multispace0, inner)
}

/// Matches `word` only if it isn't the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag(word), not(peek(take_while1(is_ident_continue)))))
}

fn or_expr(input: &str) -> IResult<&str, Predicate> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        preceded(keyword("or"), and_expr),
        move || first.clone(),
        |left, right| Predicate::Or(Box::new(left), Box::new(right)),
    )(input)
}

fn and_expr(input: &str) -> IResult<&str, Predicate> {
    let (input, first) = not_expr(input)?;
    fold_many0(
        preceded(keyword("and"), not_expr),
        move || first.clone(),
        |left, right| Predicate::And(Box::new(left), Box::new(right)),
    )(input)
}

fn not_expr(input: &str) -> IResult<&str, Predicate> {
    alt((
        map(preceded(keyword("not"), not_expr), |inner| {
            Predicate::Not(Box::new(inner))
        }),
        primary,
    ))(input)
}

fn primary(input: &str) -> IResult<&str, Predicate> {
    alt((
        delimited(ws(pchar('(')), or_expr, ws(pchar(')'))),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Predicate> {
    alt((
        map(
            tuple((ws(field), ws(compare_op), ws(literal))),
            |(field, op, literal)| Predicate::Comparison {
                field: field.to_owned(),
                op,
                literal,
            },
        ),
        map(
            tuple((ws(literal), ws(compare_op), ws(field))),
            |(literal, op, field)| Predicate::Comparison {
                field: field.to_owned(),
                op: op.flip(),
                literal,
            },
        ),
    ))(input)
}

fn field(input: &str) -> IResult<&str, &str> {
    verify(
        recognize(pair(
            take_while1(is_ident_start),
            take_while(is_ident_continue),
        )),
        |word: &str| !KEYWORDS.contains(&word),
    )(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(number, Literal::Number),
        map(string, Literal::String),
        value(Literal::Bool(true), alt((keyword("true"), keyword("True")))),
        value(Literal::Bool(false), alt((keyword("false"), keyword("False")))),
    ))(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    let (rest, text) = number_text(input)?;
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok((rest, n)),
        _ => Err(nom::Err::Failure(Error::new(input, ErrorKind::Float))),
    }
}

fn number_text(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(pchar('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

/// A single- or double-quoted string. A backslash escapes the next character; `\n` and `\t`
/// stand for newline and tab.
fn string(input: &str) -> IResult<&str, String> {
    let (body, quote) = one_of::<_, _, Error<&str>>("'\"")(input)?;
    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&body[i + c.len_utf8()..], text)),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c => text.push(c),
        }
    }
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(field: &str, op: CompareOp, literal: Literal) -> Predicate {
        Predicate::Comparison {
            field: field.to_owned(),
            op,
            literal,
        }
    }

    #[test]
    fn parses_simple_comparison() {
        assert_eq!(
            parse_predicate("type == 'pet'").unwrap(),
            cmp("type", CompareOp::Eq, Literal::String("pet".into()))
        );
    }

    #[test]
    fn reversed_comparison_is_normalized() {
        assert_eq!(
            parse_predicate("3 <= age").unwrap(),
            cmp("age", CompareOp::Ge, Literal::Number(3.0))
        );
    }

    #[test]
    fn not_binds_tighter_than_and_tighter_than_or() {
        let parsed = parse_predicate("not a == 1 and b == 2 or c == 3").unwrap();
        let expected = Predicate::Or(
            Box::new(Predicate::And(
                Box::new(Predicate::Not(Box::new(cmp(
                    "a",
                    CompareOp::Eq,
                    Literal::Number(1.0),
                )))),
                Box::new(cmp("b", CompareOp::Eq, Literal::Number(2.0))),
            )),
            Box::new(cmp("c", CompareOp::Eq, Literal::Number(3.0))),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parentheses_group() {
        let parsed = parse_predicate("(a == 1 or b == 2) and c == 3").unwrap();
        assert!(matches!(parsed, Predicate::And(..)));
        let parsed = parse_predicate("not(a == 1)").unwrap();
        assert!(matches!(parsed, Predicate::Not(..)));
    }

    #[test]
    fn keywords_need_word_boundaries() {
        assert_eq!(
            parse_predicate("notes == 'x' or order == 1").unwrap(),
            Predicate::Or(
                Box::new(cmp("notes", CompareOp::Eq, Literal::String("x".into()))),
                Box::new(cmp("order", CompareOp::Eq, Literal::Number(1.0))),
            )
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse_predicate(r#"name == 'it\'s' or name == "a\"b\\c""#).unwrap(),
            Predicate::Or(
                Box::new(cmp("name", CompareOp::Eq, Literal::String("it's".into()))),
                Box::new(cmp("name", CompareOp::Eq, Literal::String("a\"b\\c".into()))),
            )
        );
        assert_eq!(
            parse_predicate("role == ''").unwrap(),
            cmp("role", CompareOp::Eq, Literal::String(String::new()))
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            parse_predicate("x > -1.5e2").unwrap(),
            cmp("x", CompareOp::Gt, Literal::Number(-150.0))
        );
    }

    #[test]
    fn empty_and_malformed_predicates_are_invalid() {
        for source in [
            "",
            "   ",
            "type ==",
            "== 'pet'",
            "type == 'pet' and",
            "(type == 'pet'",
            "type == 'pet')",
            "type == pet",
            "1 == 2",
            "type == 'pet",
            "age > 1e999",
            "type == 'pet' extra",
            "flag",
        ] {
            let result = parse_predicate(source);
            assert!(
                matches!(result, Err(RuleError::InvalidPredicate { .. })),
                "{source:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn invalid_offset_points_at_the_problem() {
        let err = parse_predicate("type == 'pet' extra").unwrap_err();
        assert!(matches!(err, RuleError::InvalidPredicate { offset: 14, .. }), "{err:?}");
    }

    #[test]
    fn unsafe_constructs_are_rejected() {
        for source in [
            "len(name) > 3",
            "name.startswith('M')",
            "name.str.len() > 3",
            "type == 'pet'.upper()",
            "__import__('os') == 1",
            "name == @value",
            "x = 1",
            "(x := 1) == 1",
            "name[0] == 'M'",
            "lambda == 1",
            "`type` == 'pet'",
            "type == 'pet'; x == 1",
            "'pet'(1) == 1",
        ] {
            let result = parse_predicate(source);
            assert!(
                matches!(result, Err(RuleError::UnsafePredicate { .. })),
                "{source:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn deep_nesting_is_invalid() {
        let parens = format!("{}x == 1{}", "(".repeat(10_000), ")".repeat(10_000));
        let nots = format!("{}x == 1", "not ".repeat(10_000));
        let mixed = format!("{}x == 1{}", "not (".repeat(40), ")".repeat(40));
        for source in [&parens, &nots, &mixed] {
            let result = parse_predicate(source);
            assert!(
                matches!(result, Err(RuleError::InvalidPredicate { .. })),
                "{result:?}"
            );
        }

        let err = parse_predicate(&parens).unwrap_err();
        assert!(matches!(err, RuleError::InvalidPredicate { offset: 64, .. }), "{err:?}");
    }

    #[test]
    fn long_chains_are_invalid() {
        let chain = vec!["x == 1"; 10_000].join(" and ");
        assert!(matches!(
            parse_predicate(&chain),
            Err(RuleError::InvalidPredicate { .. })
        ));
    }

    #[test]
    fn nesting_up_to_the_limit_is_fine() {
        let parens = format!("{}x == 1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse_predicate(&parens).is_ok());

        // Sibling groups don't add up.
        let group = format!("{}x == 1{}", "not (".repeat(16), ")".repeat(16));
        let siblings = vec![group; 8].join(" or ");
        assert!(parse_predicate(&siblings).is_ok());

        let chain = vec!["x == 1"; MAX_CONNECTIVES + 1].join(" or ");
        assert!(parse_predicate(&chain).is_ok());
    }

    #[test]
    fn unsafe_looking_text_inside_strings_is_fine() {
        assert_eq!(
            parse_predicate("name == 'f(x).y[0] = @z'").unwrap(),
            cmp("name", CompareOp::Eq, Literal::String("f(x).y[0] = @z".into()))
        );
    }

    #[test]
    fn decimal_points_in_numbers_are_fine() {
        assert_eq!(
            parse_predicate("x < 2.5").unwrap(),
            cmp("x", CompareOp::Lt, Literal::Number(2.5))
        );
    }
}
