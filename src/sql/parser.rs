// Predicate parser - converts tokens to an expression tree

use super::error::{ParseError, ParseResult};
use super::lexer::Lexer;
use super::token::Token;
use crate::expression::{
    ArithmeticOperator, ComparisonOperator, Expression, ExpressionBuilder, LikePattern, NodeId,
    MAX_NESTING_DEPTH,
};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    builder: ExpressionBuilder,
    /// Open parentheses, IN/ANY lists, NOTs and unary signs around the
    /// current position
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            builder: ExpressionBuilder::new(),
            depth: 0,
        })
    }

    /// Parse the whole input as a single predicate
    pub fn parse(mut self) -> ParseResult<Expression> {
        let root = self.parse_or()?;
        self.expect_token(Token::Eof)?;
        Ok(self.builder.build(root)?)
    }

    /// Run `parse` one nesting level deeper
    fn nested<F>(&mut self, parse: F) -> ParseResult<NodeId>
    where
        F: FnOnce(&mut Self) -> ParseResult<NodeId>,
    {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> ParseResult<NodeId> {
        self.nested(Self::parse_or_chain)
    }

    fn parse_or_chain(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = self.builder.or(left, right)?;
        }

        Ok(left)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = self.builder.and(left, right)?;
        }

        Ok(left)
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> ParseResult<NodeId> {
        if self.match_token(&Token::Not) {
            self.advance();
            let operand = self.nested(Self::parse_not)?;
            Ok(self.builder.not(operand)?)
        } else {
            self.parse_test()
        }
    }

    /// Parse a comparison or one of the IS / BETWEEN / IN / LIKE tests
    fn parse_test(&mut self) -> ParseResult<NodeId> {
        let left = self.parse_additive()?;

        if self.match_token(&Token::Is) {
            self.advance();
            let negated = self.consume(&Token::Not);
            return match self.current_token() {
                Token::Null => {
                    self.advance();
                    let test = self.builder.is_null(left)?;
                    self.negate_if(negated, test)
                }
                Token::True | Token::False => {
                    let value = self.match_token(&Token::True);
                    self.advance();
                    let literal = self.builder.boolean(value);
                    let op = if negated {
                        ComparisonOperator::Ne
                    } else {
                        ComparisonOperator::Eq
                    };
                    Ok(self.builder.compare(op, left, literal)?)
                }
                _ => Err(self.unexpected("NULL, TRUE or FALSE")),
            };
        }

        let negated = self.match_token(&Token::Not)
            && matches!(
                self.peek_token(),
                Token::Between | Token::In | Token::Like
            );
        if negated {
            self.advance();
        }

        let test = match self.current_token() {
            Token::Between => {
                self.advance();
                let low = self.parse_additive()?;
                self.expect_token(Token::And)?;
                let high = self.parse_additive()?;
                self.builder.between(left, low, high)?
            }
            Token::In => {
                self.advance();
                self.expect_token(Token::LeftParen)?;
                let items = self.parse_expression_list()?;
                self.expect_token(Token::RightParen)?;
                self.builder.in_list(left, &items)?
            }
            Token::Like => {
                self.advance();
                let pattern = self.parse_like_pattern()?;
                self.builder.like(left, pattern)?
            }
            _ => match self.comparison_operator() {
                Some(op) => {
                    self.advance();
                    let right = self.parse_additive()?;
                    self.builder.compare(op, left, right)?
                }
                None => return Ok(left),
            },
        };

        self.negate_if(negated, test)
    }

    /// Parse the right-hand side of LIKE. A string literal, with its
    /// optional ESCAPE clause, is compiled here; anything else is compiled
    /// at evaluation time.
    fn parse_like_pattern(&mut self) -> ParseResult<NodeId> {
        let Token::String(like) = self.current_token() else {
            return self.parse_additive();
        };
        self.advance();

        let escape = if self.consume(&Token::Escape) {
            let Token::String(escape) = self.current_token() else {
                return Err(self.unexpected("escape character string"));
            };
            self.advance();
            let mut chars = escape.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => return Err(ParseError::InvalidEscape(escape)),
            }
        } else {
            None
        };

        let pattern = LikePattern::compile(&like, escape)?;
        Ok(self.builder.pattern(pattern))
    }

    /// Parse addition/subtraction expression
    fn parse_additive(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => ArithmeticOperator::Add,
                Token::Minus => ArithmeticOperator::Subtract,
                _ => break,
            };
            self.advance();

            let right = self.parse_multiplicative()?;
            left = self.builder.arithmetic(op, left, right)?;
        }

        Ok(left)
    }

    /// Parse multiplication/division/modulus expression
    fn parse_multiplicative(&mut self) -> ParseResult<NodeId> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => ArithmeticOperator::Multiply,
                Token::Slash => ArithmeticOperator::Divide,
                Token::Percent => ArithmeticOperator::Modulus,
                _ => break,
            };
            self.advance();

            let right = self.parse_unary()?;
            left = self.builder.arithmetic(op, left, right)?;
        }

        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> ParseResult<NodeId> {
        match self.current_token() {
            Token::Plus => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            Token::Minus => {
                self.advance();
                // fold into the literal so i64::MIN is reachable
                if let Token::Number(n) = self.current_token() {
                    self.advance();
                    return self.number(&format!("-{}", n));
                }
                let operand = self.nested(Self::parse_unary)?;
                Ok(self.builder.negate(operand)?)
            }
            _ => self.parse_primary(),
        }
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> ParseResult<NodeId> {
        match self.current_token() {
            Token::Number(n) => {
                self.advance();
                self.number(&n)
            }
            Token::String(s) => {
                self.advance();
                Ok(self.builder.string(s))
            }
            Token::True => {
                self.advance();
                Ok(self.builder.boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(self.builder.boolean(false))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(self.builder.identifier(&name))
            }
            Token::Any => {
                self.advance();
                self.expect_token(Token::LeftParen)?;
                let operands = self.parse_expression_list()?;
                self.expect_token(Token::RightParen)?;
                Ok(self.builder.any(&operands)?)
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect_token(Token::RightParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parse list of expressions
    fn parse_expression_list(&mut self) -> ParseResult<Vec<NodeId>> {
        let mut expressions = vec![];

        loop {
            expressions.push(self.parse_or()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }

        Ok(expressions)
    }

    // Helper methods

    fn number(&mut self, text: &str) -> ParseResult<NodeId> {
        if text.contains(['.', 'e', 'E']) {
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber(text.to_string()))?;
            Ok(self.builder.float(value))
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| ParseError::InvalidNumber(text.to_string()))?;
            Ok(self.builder.integer(value))
        }
    }

    fn negate_if(&mut self, negated: bool, node: NodeId) -> ParseResult<NodeId> {
        if negated {
            Ok(self.builder.not(node)?)
        } else {
            Ok(node)
        }
    }

    fn comparison_operator(&self) -> Option<ComparisonOperator> {
        match self.current_token() {
            Token::Equal => Some(ComparisonOperator::Eq),
            Token::NotEqual => Some(ComparisonOperator::Ne),
            Token::Less => Some(ComparisonOperator::Lt),
            Token::Greater => Some(ComparisonOperator::Gt),
            Token::LessEqual => Some(ComparisonOperator::Le),
            Token::GreaterEqual => Some(ComparisonOperator::Ge),
            _ => None,
        }
    }

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Get the token after the current one
    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    /// Advance past the current token if it matches
    fn consume(&mut self, token: &Token) -> bool {
        let matched = self.match_token(token);
        if matched {
            self.advance();
        }
        matched
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> ParseResult<()> {
        if self.current_token() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            position: self.position,
            expected: expected.to_string(),
            found: self.current_token().to_string(),
        }
    }
}

/// Parse a predicate string into an expression tree
pub fn parse_predicate(input: &str) -> ParseResult<Expression> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExpressionError, MapContext, NodeKind};
    use crate::value::{Numeric, Value};

    fn dump(input: &str) -> String {
        parse_predicate(input).unwrap().to_string()
    }

    fn eval(input: &str, context: &MapContext) -> Value {
        parse_predicate(input).unwrap().evaluate(context).unwrap()
    }

    #[test]
    fn test_parse_comparison() {
        let expr = parse_predicate("age >= 50").unwrap();
        assert_eq!(
            expr.node(expr.root()).kind(),
            &NodeKind::Comparison(ComparisonOperator::Ge)
        );
        let names: Vec<_> = expr.identifiers().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["age"]);
    }

    #[test]
    fn test_long_or_chain() {
        let input = vec!["age > 1"; 3000].join(" or ");
        let expr = parse_predicate(&input).unwrap();
        assert_eq!(expr.chain_operands(expr.root()).len(), 3000);

        let ctx = |age: Value| MapContext::new().with("age", age);
        assert_eq!(expr.evaluate(&ctx(Value::Integer(5))), Ok(Value::Boolean(true)));
        assert_eq!(expr.evaluate(&ctx(Value::Integer(0))), Ok(Value::Boolean(false)));
        assert_eq!(expr.evaluate(&ctx(Value::Null)), Ok(Value::Null));
        assert!(expr.to_string().starts_with("<OR><OR><OR>"));
    }

    #[test]
    fn test_nesting_limit() {
        let parens = format!("{}a = 1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(
            parse_predicate(&parens),
            Err(ParseError::TooDeep { .. })
        ));

        let nots = format!("{}a", "not ".repeat(500));
        assert!(matches!(
            parse_predicate(&nots),
            Err(ParseError::TooDeep { .. })
        ));

        let signs = format!("{}a > 0", "- ".repeat(500));
        assert!(matches!(
            parse_predicate(&signs),
            Err(ParseError::TooDeep { .. })
        ));

        let sum = format!("{} > 0", vec!["1"; 500].join(" + "));
        assert_eq!(
            parse_predicate(&sum).unwrap_err(),
            ParseError::Expression(ExpressionError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH
            })
        );

        let shallow = format!("{}a = 1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_predicate(&shallow).is_ok());
    }

    #[test]
    fn test_boolean_precedence() {
        assert_eq!(
            dump("a OR b AND NOT c"),
            "<OR><a></a><AND><b></b><NOT><c></c></NOT></AND></OR>"
        );
        assert_eq!(
            dump("(a or b) and c"),
            "<AND><OR><a></a><b></b></OR><c></c></AND>"
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(
            dump("x + 2 * y > 3"),
            "<Comparison><+><x></x><*><NumericLiteral></NumericLiteral><y></y></*></+><NumericLiteral></NumericLiteral></Comparison>"
        );
        assert_eq!(dump("-x < 0"), "<Comparison><-><x></x></-><NumericLiteral></NumericLiteral></Comparison>");
    }

    #[test]
    fn test_negated_tests() {
        assert_eq!(
            dump("age not between 50 and 60"),
            "<NOT><BETWEEN><age></age><NumericLiteral></NumericLiteral><NumericLiteral></NumericLiteral></BETWEEN></NOT>"
        );
        assert_eq!(dump("name IS NOT NULL"), "<NOT><NULL><name></name></NULL></NOT>");
        assert_eq!(
            dump("name NOT IN ('a')"),
            "<NOT><IN><name></name><StringLiteral></StringLiteral></IN></NOT>"
        );
        assert_eq!(
            dump("name not like 'b%'"),
            "<NOT><LIKE><name></name><PatternLiteral></PatternLiteral></LIKE></NOT>"
        );
    }

    #[test]
    fn test_is_true_false() {
        let expr = parse_predicate("fired IS FALSE").unwrap();
        let root = expr.node(expr.root());
        assert_eq!(root.kind(), &NodeKind::Comparison(ComparisonOperator::Eq));
        let literal = root.child(1).unwrap();
        assert_eq!(expr.node(literal).kind(), &NodeKind::BooleanLiteral(false));

        let expr = parse_predicate("fired is not true").unwrap();
        assert_eq!(
            expr.node(expr.root()).kind(),
            &NodeKind::Comparison(ComparisonOperator::Ne)
        );
    }

    #[test]
    fn test_like_escape() {
        let expr = parse_predicate("code LIKE '100!%' ESCAPE '!'").unwrap();
        let root = expr.node(expr.root());
        let NodeKind::PatternLiteral(pattern) = expr.node(root.child(1).unwrap()).kind() else {
            panic!("expected a compiled pattern");
        };
        assert_eq!(pattern.escape(), Some('!'));
        assert!(pattern.matches("100%"));
        assert!(!pattern.matches("1000"));

        assert_eq!(
            parse_predicate("code LIKE 'x' ESCAPE '!!'").unwrap_err(),
            ParseError::InvalidEscape("!!".to_string())
        );
    }

    #[test]
    fn test_dynamic_like_pattern() {
        let expr = parse_predicate("name LIKE prefix").unwrap();
        let root = expr.node(expr.root());
        assert!(matches!(
            expr.node(root.child(1).unwrap()).kind(),
            NodeKind::Identifier(_)
        ));
    }

    #[test]
    fn test_numbers() {
        let expr = parse_predicate("-9223372036854775808").unwrap();
        assert_eq!(
            expr.node(expr.root()).kind(),
            &NodeKind::NumericLiteral(Numeric::Integer(i64::MIN))
        );

        let expr = parse_predicate("1.5e2").unwrap();
        assert_eq!(
            expr.node(expr.root()).kind(),
            &NodeKind::NumericLiteral(Numeric::Float(150.0))
        );

        assert_eq!(
            parse_predicate("age > 99999999999999999999").unwrap_err(),
            ParseError::InvalidNumber("99999999999999999999".to_string())
        );
    }

    #[test]
    fn test_in_and_any() {
        assert_eq!(
            dump("any(a, b = 1)"),
            "<ANY><a></a><Comparison><b></b><NumericLiteral></NumericLiteral></Comparison></ANY>"
        );

        let context = MapContext::new().with("gender", "F");
        assert_eq!(
            eval("gender in ('M', 'F')", &context),
            Value::Boolean(true)
        );
        assert_eq!(eval("gender in ('M')", &context), Value::Boolean(false));
    }

    #[test]
    fn test_quoted_identifier_and_comment() {
        let context = MapContext::new().with("order", 3);
        assert_eq!(
            eval("\"order\" = 3 -- keyword as a property name", &context),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_predicate("age >"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_predicate("age > 1 1"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_predicate("age between 1 or 2"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_predicate("x is 3"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_predicate("(a"),
            Err(ParseError::UnexpectedToken { .. })
        ));

        let err = parse_predicate("a = ").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected token at position 2: expected expression, found end of input"
        );
    }

    #[test]
    fn test_evaluate_parsed() {
        let context = MapContext::new()
            .with("age", 54)
            .with("name", "bob")
            .with("salary", Value::Null);
        assert_eq!(eval("age between 50 and 60", &context), Value::Boolean(true));
        assert_eq!(
            eval("age not between 50 and 60", &context),
            Value::Boolean(false)
        );
        assert_eq!(eval("name like '_ob'", &context), Value::Boolean(true));
        assert_eq!(eval("salary > 10", &context), Value::Null);
        assert_eq!(eval("salary is null", &context), Value::Boolean(true));
        assert_eq!(eval("age * 2 = 108", &context), Value::Boolean(true));
        assert_eq!(eval("age / 0.5 = 108", &context), Value::Boolean(true));

        let expr = parse_predicate("age / 0 = 1").unwrap();
        assert_eq!(
            expr.evaluate(&context).unwrap_err(),
            ExpressionError::DivisionByZero
        );
    }
}
