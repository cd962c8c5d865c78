//! Lowering of the precedence-resolved syntax tree into function bodies.
//!
//! Lowering happens in two passes over the same tree:
//!
//! 1. [`Emitter::declare`] registers every function definition in the
//!    [`Module`] and remembers, per definition node, which function it
//!    declared. Calls may therefore name functions defined later.
//! 2. [`Emitter::emit`] walks the tree in source order and appends
//!    instructions to the function whose body is being visited.
//!
//! What a node lowers to is decided by the [`NodeHandler`] registered for its
//! tag in a [`Handlers`] table.

use std::collections::HashMap;

use log::{debug, trace};

use crate::error::CoreError;
use crate::module::{Instruction, Module, Opcode, Parameter};
use crate::registry::{Kind, Registry};
use crate::syntax::{Node, NodeId};
use crate::types::{ValueKind, return_kind_from_source};

/// How a node of a given tag is lowered. Field kinds name the tags of the
/// children a handler reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeHandler {
    /// Number literal leaf.
    ConstF32,
    /// Binary operator tree with exactly two operands.
    BinaryOp(Opcode),
    Call {
        name: Kind,
        args: Kind,
    },
    /// Purely structural: lowers each child in order.
    Children,
    Function {
        returns: Kind,
        name: Kind,
        parameters: Kind,
        body: Kind,
    },
    Parameters,
    Parameter {
        kind: Kind,
        name: Kind,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Handlers {
    table: HashMap<Kind, NodeHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: Kind, handler: NodeHandler) {
        self.table.insert(tag, handler);
    }

    pub fn get(&self, tag: Kind) -> Option<&NodeHandler> {
        self.table.get(&tag)
    }
}

pub struct Emitter<'a> {
    registry: &'a Registry,
    handlers: &'a Handlers,
    module: Module,
    /// Function definition node -> index of the function it declared.
    declared: HashMap<NodeId, usize>,
    /// Function whose body is being lowered.
    active: Option<usize>,
}

impl<'a> Emitter<'a> {
    /// Starts from `module`, which may already hold imported functions.
    pub fn new(registry: &'a Registry, handlers: &'a Handlers, module: Module) -> Self {
        Emitter {
            registry,
            handlers,
            module,
            declared: HashMap::new(),
            active: None,
        }
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn handler(&self, node: &Node) -> Result<&'a NodeHandler, CoreError> {
        let handlers = self.handlers;
        handlers.get(node.tag).ok_or_else(|| {
            CoreError::Internal(format!(
                "no emitter registered for `{}` nodes",
                self.registry.name(node.tag)
            ))
        })
    }

    fn field<'n>(&self, node: &'n Node, tag: Kind) -> Result<&'n Node, CoreError> {
        node.child(tag).ok_or_else(|| {
            CoreError::Internal(format!(
                "`{}` node has no `{}` child",
                self.registry.name(node.tag),
                self.registry.name(tag)
            ))
        })
    }

    fn text<'n>(&self, node: &'n Node) -> Result<&'n str, CoreError> {
        node.text().ok_or_else(|| {
            CoreError::Internal(format!(
                "expected a token, found a `{}` tree",
                self.registry.name(node.tag)
            ))
        })
    }

    /// Declare pass: registers every function definition below `node`.
    pub fn declare(&mut self, node: &Node) -> Result<(), CoreError> {
        let handlers = self.handlers;
        if let Some(NodeHandler::Function {
            returns,
            name,
            parameters,
            ..
        }) = handlers.get(node.tag)
        {
            self.declare_function(node, *returns, *name, *parameters)?;
        }
        for child in node.children() {
            self.declare(child)?;
        }
        Ok(())
    }

    fn declare_function(
        &mut self,
        node: &Node,
        returns: Kind,
        name: Kind,
        parameters: Kind,
    ) -> Result<(), CoreError> {
        let name = self.text(self.field(node, name)?)?;

        let returns_node = self.field(node, returns)?;
        let returns_text = self.text(returns_node)?;
        let returns = return_kind_from_source(returns_text).ok_or_else(|| {
            CoreError::UnknownValueKind {
                name: returns_text.to_string(),
                offset: returns_node.start().unwrap_or_default(),
            }
        })?;

        let parameters = self
            .field(node, parameters)?
            .children()
            .iter()
            .map(|p| self.parameter(p))
            .collect::<Result<Vec<_>, _>>()?;

        trace!(
            "declaring `{name}` with {} parameters returning {returns:?}",
            parameters.len()
        );
        let index = self.module.add_function(name, parameters, returns, true)?;
        self.declared.insert(node.id, index);
        Ok(())
    }

    fn parameter(&self, node: &Node) -> Result<Parameter, CoreError> {
        let NodeHandler::Parameter { kind, name } = self.handler(node)? else {
            return Err(CoreError::Internal(format!(
                "expected a parameter, found `{}`",
                self.registry.name(node.tag)
            )));
        };
        let kind_node = self.field(node, *kind)?;
        let kind_text = self.text(kind_node)?;
        let kind = ValueKind::from_source(kind_text).ok_or_else(|| CoreError::UnknownValueKind {
            name: kind_text.to_string(),
            offset: kind_node.start().unwrap_or_default(),
        })?;
        let name = self.text(self.field(node, *name)?)?;
        Ok(Parameter::new(kind, name))
    }

    fn push(&mut self, instruction: Instruction) -> Result<(), CoreError> {
        let Some(index) = self.active else {
            return Err(CoreError::Internal(format!(
                "{instruction:?} emitted outside of a function body"
            )));
        };
        self.module.push_instruction(index, instruction)
    }

    /// Emit pass: lowers `node` and everything below it.
    pub fn emit(&mut self, node: &Node) -> Result<(), CoreError> {
        match self.handler(node)? {
            NodeHandler::ConstF32 => {
                let text = self.text(node)?;
                let value = text.parse::<f32>().map_err(|_| CoreError::InvalidLiteral {
                    text: text.to_string(),
                    offset: node.start().unwrap_or_default(),
                })?;
                self.push(Instruction::ConstF32(value))
            }
            NodeHandler::BinaryOp(opcode) => {
                let [left, right] = node.children() else {
                    return Err(CoreError::Internal(format!(
                        "operator `{}` at byte {} has {} operands",
                        self.registry.name(node.tag),
                        node.start().unwrap_or_default(),
                        node.children().len()
                    )));
                };
                self.emit(left)?;
                self.emit(right)?;
                self.push(Instruction::Op(*opcode))
            }
            NodeHandler::Call { name, args } => {
                let callee = self.text(self.field(node, *name)?)?;
                let args = self.field(node, *args)?.children();
                let Some(function) = self.module.find(callee) else {
                    return Err(CoreError::UnknownFunction(callee.to_string()));
                };
                if function.parameters.len() != args.len() {
                    return Err(CoreError::ArgumentCount {
                        name: callee.to_string(),
                        expected: function.parameters.len(),
                        found: args.len(),
                    });
                }
                for arg in args {
                    self.emit(arg)?;
                }
                self.push(Instruction::Call(callee.to_string()))
            }
            NodeHandler::Children => {
                for child in node.children() {
                    self.emit(child)?;
                }
                Ok(())
            }
            NodeHandler::Function { body, .. } => {
                let index = *self.declared.get(&node.id).ok_or_else(|| {
                    CoreError::Internal(format!(
                        "function node at byte {} was not declared",
                        node.start().unwrap_or_default()
                    ))
                })?;
                let body = self.field(node, *body)?;
                self.active = Some(index);
                let result = self.emit(body);
                self.active = None;
                if let Some(function) = self.module.get(index) {
                    debug!(
                        "lowered `{}` into {} instructions",
                        function.name,
                        function.instructions().len()
                    );
                }
                result
            }
            NodeHandler::Parameters | NodeHandler::Parameter { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::module::FunctionBody;

    fn lower(source: &str) -> Result<Module, CoreError> {
        let language = Language::c_like();
        let tree = language.parse(source)?;
        let mut module = Module::new();
        module.import_function("Print", vec![Parameter::new(ValueKind::F32, "f")], None, "")?;
        let mut emitter = Emitter::new(&language.registry, &language.handlers, module);
        emitter.declare(&tree)?;
        emitter.emit(&tree)?;
        Ok(emitter.finish())
    }

    fn body(module: &Module, name: &str) -> Vec<Instruction> {
        module
            .find(name)
            .expect("function exists")
            .instructions()
            .to_vec()
    }

    #[test]
    fn lowers_expression_in_postfix_order() {
        let module = lower("void Main() { Print(3 + 4 * 2); }").expect("lower");
        assert_eq!(
            body(&module, "Main"),
            [
                Instruction::ConstF32(3.0),
                Instruction::ConstF32(4.0),
                Instruction::ConstF32(2.0),
                Instruction::Op(Opcode::F32Mul),
                Instruction::Op(Opcode::F32Add),
                Instruction::Call("Print".into()),
            ]
        );
    }

    #[test]
    fn declares_signatures() {
        let module = lower("float Mix(int a, float b) { } void Main() { }").expect("lower");
        let mix = module.find("Mix").expect("Mix");
        assert_eq!(mix.returns, Some(ValueKind::F32));
        assert_eq!(
            mix.parameters,
            [
                Parameter::new(ValueKind::I32, "a"),
                Parameter::new(ValueKind::F32, "b"),
            ]
        );
        assert!(matches!(
            mix.body,
            FunctionBody::Local { exported: true, .. }
        ));
        assert_eq!(mix.signature(), "fif");
    }

    #[test]
    fn resolves_forward_references() {
        let module = lower("void Main() { Show(1.5); } void Show(float x) { Print(2); }")
            .expect("lower");
        assert_eq!(
            body(&module, "Main"),
            [Instruction::ConstF32(1.5), Instruction::Call("Show".into())]
        );
        assert_eq!(
            body(&module, "Show"),
            [Instruction::ConstF32(2.0), Instruction::Call("Print".into())]
        );
    }

    #[test]
    fn arguments_are_emitted_in_order() {
        let module = lower("void Pair(float a, float b) { } void Main() { Pair(1, 2 - 3); }")
            .expect("lower");
        assert_eq!(
            body(&module, "Main"),
            [
                Instruction::ConstF32(1.0),
                Instruction::ConstF32(2.0),
                Instruction::ConstF32(3.0),
                Instruction::Op(Opcode::F32Sub),
                Instruction::Call("Pair".into()),
            ]
        );
    }

    #[test]
    fn unknown_callee_is_reported_by_name() {
        let err = lower("void Main() { Missing(1); }").unwrap_err();
        assert!(matches!(err, CoreError::UnknownFunction(name) if name == "Missing"));
    }

    #[test]
    fn argument_count_must_match_parameters() {
        let err = lower("void Main() { Print(); }").unwrap_err();
        assert!(matches!(
            err,
            CoreError::ArgumentCount { ref name, expected: 1, found: 0 } if name == "Print"
        ));

        let err = lower("void Pair(float a, float b) { } void Main() { Pair(1, 2, 3); }")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ArgumentCount { ref name, expected: 2, found: 3 } if name == "Pair"
        ));
    }

    #[test]
    fn unknown_type_names_are_located() {
        let err = lower("double Main() { }").unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnknownValueKind { ref name, offset: 0 } if name == "double"
        ));

        let err = lower("void Main(bool flag) { }").unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnknownValueKind { ref name, offset: 10 } if name == "bool"
        ));
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let err = lower("void Main() { } void Main() { }").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateFunction(name) if name == "Main"));
    }

    #[test]
    fn missing_handler_is_internal() {
        let language = Language::c_like();
        let tree = language.parse("void Main() { }").expect("parse");
        let empty = Handlers::new();
        let mut emitter = Emitter::new(&language.registry, &empty, Module::new());
        let err = emitter.emit(&tree).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn instructions_need_an_active_function() {
        let language = Language::c_like();
        let tree = language.parse("void Main() { Print(1); }").expect("parse");
        let mut emitter = Emitter::new(&language.registry, &language.handlers, Module::new());
        // skipping the declare pass leaves the function unknown
        let err = emitter.emit(&tree).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
