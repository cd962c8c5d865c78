//! Function descriptors and the instruction set they are lowered to.
//!
//! A [`Module`] collects every function of one compilation, imported and
//! local, in declaration order. Earlier passes refer to functions by name
//! only; numeric ids and type indices are filled in by the encoder.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::types::{self, ValueKind};

/// Import module name every imported function is resolved from.
pub const IMPORT_MODULE: &str = "env";

/// The opcodes this compiler emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    End,
    Call,
    F32Const,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
}

impl Opcode {
    pub fn byte(self) -> u8 {
        match self {
            Opcode::End => 0x0b,
            Opcode::Call => 0x10,
            Opcode::F32Const => 0x43,
            Opcode::F32Add => 0x92,
            Opcode::F32Sub => 0x93,
            Opcode::F32Mul => 0x94,
            Opcode::F32Div => 0x95,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Op(Opcode),
    /// Call by name; resolved to a function id at encode time.
    Call(String),
    ConstF32(f32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub kind: ValueKind,
    pub name: String,
}

impl Parameter {
    pub fn new(kind: ValueKind, name: impl Into<String>) -> Self {
        Parameter {
            kind,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Local {
        instructions: Vec<Instruction>,
        exported: bool,
    },
    /// Host-side function; `source` is the body text the host page wraps
    /// into a callable.
    Imported { source: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function index, assigned by the encoder.
    pub id: u32,
    /// Type section index, assigned by the encoder.
    pub type_id: u32,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub returns: Option<ValueKind>,
    pub body: FunctionBody,
}

impl Function {
    pub fn signature(&self) -> String {
        types::signature(self.returns, self.parameters.iter().map(|p| p.kind))
    }

    pub fn is_imported(&self) -> bool {
        matches!(self.body, FunctionBody::Imported { .. })
    }

    pub fn is_exported(&self) -> bool {
        matches!(self.body, FunctionBody::Local { exported: true, .. })
    }

    pub fn instructions(&self) -> &[Instruction] {
        match &self.body {
            FunctionBody::Local { instructions, .. } => instructions,
            FunctionBody::Imported { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    functions: Vec<Function>,
    by_name: HashMap<String, usize>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, function: Function) -> Result<usize, CoreError> {
        if self.by_name.contains_key(&function.name) {
            return Err(CoreError::DuplicateFunction(function.name));
        }
        let index = self.functions.len();
        self.by_name.insert(function.name.clone(), index);
        self.functions.push(function);
        Ok(index)
    }

    pub fn import_function(
        &mut self,
        name: &str,
        parameters: Vec<Parameter>,
        returns: Option<ValueKind>,
        source: &str,
    ) -> Result<usize, CoreError> {
        self.insert(Function {
            id: 0,
            type_id: 0,
            name: name.to_string(),
            parameters,
            returns,
            body: FunctionBody::Imported {
                source: source.to_string(),
            },
        })
    }

    /// Declares a local function with an empty body.
    pub fn add_function(
        &mut self,
        name: &str,
        parameters: Vec<Parameter>,
        returns: Option<ValueKind>,
        exported: bool,
    ) -> Result<usize, CoreError> {
        self.insert(Function {
            id: 0,
            type_id: 0,
            name: name.to_string(),
            parameters,
            returns,
            body: FunctionBody::Local {
                instructions: Vec::new(),
                exported,
            },
        })
    }

    /// Appends an instruction to the local function at `index`.
    pub fn push_instruction(
        &mut self,
        index: usize,
        instruction: Instruction,
    ) -> Result<(), CoreError> {
        match self.functions.get_mut(index).map(|f| &mut f.body) {
            Some(FunctionBody::Local { instructions, .. }) => {
                instructions.push(instruction);
                Ok(())
            }
            Some(FunctionBody::Imported { .. }) => Err(CoreError::Internal(format!(
                "cannot emit into imported function #{index}"
            ))),
            None => Err(CoreError::Internal(format!("no function #{index}"))),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Function> {
        self.by_name.get(name).map(|index| &self.functions[*index])
    }

    pub fn get(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    /// All functions in declaration order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub(crate) fn functions_mut(&mut self) -> &mut [Function] {
        &mut self.functions
    }

    pub fn imports(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_imported())
    }

    pub fn locals(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| !f.is_imported())
    }
}
