//! The shipped C-like language: tokens, grammar, operators and lowering.

use log::debug;

use crate::emitter::{Handlers, NodeHandler};
use crate::error::CoreError;
use crate::grammar::{Grammar, RuleId};
use crate::lexer::{Pattern, Tokenizer};
use crate::module::Opcode;
use crate::registry::Registry;
use crate::shunting_yard::{BinaryOp, ShuntingYard};
use crate::syntax::Node;

/// Everything needed to turn source text into a lowered module. The
/// registry is owned here so tag kinds never leak between languages.
#[derive(Debug, Clone)]
pub struct Language {
    pub registry: Registry,
    pub tokenizer: Tokenizer,
    pub grammar: Grammar,
    pub root: RuleId,
    pub shunting_yard: ShuntingYard,
    pub handlers: Handlers,
}

impl Language {
    pub fn c_like() -> Self {
        let mut registry = Registry::new();
        let tokenizer = c_like_tokens(&mut registry);
        let (grammar, root) = c_like_grammar(&mut registry);

        let mut shunting_yard = ShuntingYard::new();
        shunting_yard.expression(&mut registry, "Expression");
        for (symbol, precedence) in [("+", 0), ("-", 0), ("*", 5), ("/", 5)] {
            shunting_yard.operator(&mut registry, symbol, BinaryOp::left(precedence));
        }

        let handlers = c_like_handlers(&mut registry);

        Language {
            registry,
            tokenizer,
            grammar,
            root,
            shunting_yard,
            handlers,
        }
    }

    /// Tokenizes, parses and resolves operator precedence.
    pub fn parse(&self, source: &str) -> Result<Node, CoreError> {
        let tokens = self.tokenizer.tokenize(source)?;
        debug!("lexed {} tokens", tokens.len());
        let tree = self.grammar.parse(self.root, source, &tokens)?;
        self.shunting_yard.transform(tree)
    }
}

fn c_like_tokens(registry: &mut Registry) -> Tokenizer {
    let digit = || Pattern::Range('0', '9');
    let letter = || {
        Pattern::Any(vec![
            Pattern::Range('a', 'z'),
            Pattern::Range('A', 'Z'),
            Pattern::Char('_'),
        ])
    };

    let mut tokenizer = Tokenizer::new();
    tokenizer.skip(
        registry,
        "whitespace",
        Pattern::repeat(
            Pattern::Any(vec![
                Pattern::Char(' '),
                Pattern::Char('\t'),
                Pattern::Char('\r'),
                Pattern::Char('\n'),
            ]),
            1,
        ),
    );
    // must come before the `/` operator
    tokenizer.skip(
        registry,
        "comment",
        Pattern::Seq(vec![Pattern::literal("//"), Pattern::RestOfLine]),
    );
    tokenizer.rule(
        registry,
        "number",
        Pattern::Seq(vec![
            Pattern::repeat(digit(), 1),
            Pattern::optional(Pattern::Seq(vec![
                Pattern::Char('.'),
                Pattern::repeat(digit(), 1),
            ])),
        ]),
    );
    tokenizer.rule(
        registry,
        "identifier",
        Pattern::Seq(vec![
            letter(),
            Pattern::repeat(Pattern::Any(vec![letter(), digit()]), 0),
        ]),
    );
    tokenizer.punctuation(
        registry,
        &["+", "-", "*", "/", "(", ")", "{", "}", ",", ";"],
    );
    tokenizer
}

fn c_like_grammar(registry: &mut Registry) -> (Grammar, RuleId) {
    let mut g = Grammar::new();
    let r = registry;

    let open = g.token(r, "(");
    let close = g.token(r, ")");
    let open_brace = g.token(r, "{");
    let close_brace = g.token(r, "}");
    let comma = g.token(r, ",");
    let semicolon = g.token(r, ";");
    let name = g.token_as(r, "Name", "identifier");

    let expression = g.forward();

    let args = g.separated(r, "Args", expression, comma, true);
    let args = g.decorate(1, &[open, args, close]);
    let call = g.sequence(r, "Call", &[name, args]);
    let group = g.decorate(1, &[open, expression, close]);
    let number = g.token_as(r, "Number", "number");
    let add = g.token(r, "+");
    let sub = g.token(r, "-");
    let mul = g.token(r, "*");
    let div = g.token(r, "/");
    let term = g.alternative(&[call, group, number, add, sub, mul, div]);
    let flat = g.repeat(r, "Expression", term, 1);
    g.define(expression, flat);

    let statement = g.decorate(0, &[expression, semicolon]);
    let statements = g.repeat(r, "Statements", statement, 0);
    let body = g.decorate(1, &[open_brace, statements, close_brace]);

    let parameter_type = g.token_as(r, "Type", "identifier");
    let parameter = g.sequence(r, "Parameter", &[parameter_type, name]);
    let parameters = g.separated(r, "Parameters", parameter, comma, true);
    let parameters = g.decorate(1, &[open, parameters, close]);

    let return_type = g.token_as(r, "ReturnType", "identifier");
    let function = g.sequence(r, "Function", &[return_type, name, parameters, body]);
    let root = g.repeat(r, "Functions", function, 0);

    (g, root)
}

fn c_like_handlers(registry: &mut Registry) -> Handlers {
    let mut handlers = Handlers::new();
    let r = registry;

    handlers.insert(r.intern("Functions"), NodeHandler::Children);
    handlers.insert(r.intern("Statements"), NodeHandler::Children);
    handlers.insert(r.intern("Number"), NodeHandler::ConstF32);
    handlers.insert(r.intern("+"), NodeHandler::BinaryOp(Opcode::F32Add));
    handlers.insert(r.intern("-"), NodeHandler::BinaryOp(Opcode::F32Sub));
    handlers.insert(r.intern("*"), NodeHandler::BinaryOp(Opcode::F32Mul));
    handlers.insert(r.intern("/"), NodeHandler::BinaryOp(Opcode::F32Div));
    handlers.insert(
        r.intern("Call"),
        NodeHandler::Call {
            name: r.intern("Name"),
            args: r.intern("Args"),
        },
    );
    handlers.insert(
        r.intern("Function"),
        NodeHandler::Function {
            returns: r.intern("ReturnType"),
            name: r.intern("Name"),
            parameters: r.intern("Parameters"),
            body: r.intern("Statements"),
        },
    );
    handlers.insert(r.intern("Parameters"), NodeHandler::Parameters);
    handlers.insert(
        r.intern("Parameter"),
        NodeHandler::Parameter {
            kind: r.intern("Type"),
            name: r.intern("Name"),
        },
    );
    handlers
}
