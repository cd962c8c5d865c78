//! Binary module encoder.
//!
//! Produces the module header followed by the type, import, function, export
//! and code sections, in that order. Every section is written even when it
//! has no entries.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::map::Entry;
use log::{debug, trace};

use crate::error::CoreError;
use crate::leb128;
use crate::module::{Function, IMPORT_MODULE, Instruction, Module, Opcode};

pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
pub const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

const FUNC_TYPE: u8 = 0x60;
const EXTERNAL_FUNC: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionId {
    Type = 1,
    Import = 2,
    Function = 3,
    Export = 7,
    Code = 10,
}

#[derive(Debug, Default)]
struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    fn unsigned(&mut self, value: u64) {
        leb128::write_unsigned(&mut self.bytes, value);
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn name(&mut self, name: &str) {
        self.unsigned(name.len() as u64);
        self.bytes.extend_from_slice(name.as_bytes());
    }

    /// Length-prefixed copy of another writer's bytes.
    fn sized(&mut self, inner: &Writer) {
        self.unsigned(inner.len());
        self.bytes.extend_from_slice(&inner.bytes);
    }

    fn section(&mut self, id: SectionId, entries: &Vector) {
        let mut payload = Writer::default();
        payload.unsigned(u64::from(entries.count));
        payload.bytes.extend_from_slice(&entries.writer.bytes);
        self.byte(id as u8);
        self.sized(&payload);
    }
}

/// A counted run of entries, written as `count` followed by the entries.
#[derive(Debug, Default)]
struct Vector {
    count: u32,
    writer: Writer,
}

impl Vector {
    fn entry(&mut self) -> &mut Writer {
        self.count += 1;
        &mut self.writer
    }
}

/// Encodes `module`, assigning function ids and type indices on the way.
///
/// Imported functions are numbered first, then local functions, each group in
/// declaration order.
pub fn encode(module: &mut Module) -> Result<Vec<u8>, CoreError> {
    let order = assign_function_ids(module);
    let types = assign_type_ids(module, &order);
    let module = &*module;

    let ids: HashMap<&str, u32> = module
        .functions()
        .iter()
        .map(|f| (f.name.as_str(), f.id))
        .collect();
    let imports: Vec<&Function> = module.imports().collect();
    let locals: Vec<&Function> = module.locals().collect();

    let mut import_entries = Vector::default();
    for function in &imports {
        let entry = import_entries.entry();
        entry.name(IMPORT_MODULE);
        entry.name(&function.name);
        entry.byte(EXTERNAL_FUNC);
        entry.unsigned(u64::from(function.type_id));
    }

    let mut function_entries = Vector::default();
    for function in &locals {
        function_entries.entry().unsigned(u64::from(function.type_id));
    }

    let mut export_entries = Vector::default();
    for function in locals.iter().filter(|f| f.is_exported()) {
        let entry = export_entries.entry();
        entry.name(&function.name);
        entry.byte(EXTERNAL_FUNC);
        entry.unsigned(u64::from(function.id));
    }

    let mut code_entries = Vector::default();
    for function in &locals {
        let body = encode_body(function, &ids)?;
        trace!("function `{}` body is {} bytes", function.name, body.len());
        code_entries.entry().sized(&body);
    }

    let mut wasm = Writer::default();
    wasm.bytes.extend_from_slice(&MAGIC);
    wasm.bytes.extend_from_slice(&VERSION);
    wasm.section(SectionId::Type, &types);
    wasm.section(SectionId::Import, &import_entries);
    wasm.section(SectionId::Function, &function_entries);
    wasm.section(SectionId::Export, &export_entries);
    wasm.section(SectionId::Code, &code_entries);

    debug!(
        "encoded {} imported and {} local functions with {} types into {} bytes",
        imports.len(),
        locals.len(),
        types.count,
        wasm.bytes.len()
    );
    Ok(wasm.bytes)
}

/// Numbers imports before locals and returns function positions in id order.
fn assign_function_ids(module: &mut Module) -> Vec<usize> {
    let functions = module.functions_mut();
    let (imports, locals): (Vec<usize>, Vec<usize>) =
        (0..functions.len()).partition(|i| functions[*i].is_imported());
    let order: Vec<usize> = imports.into_iter().chain(locals).collect();
    for (id, position) in order.iter().enumerate() {
        functions[*position].id = id as u32;
    }
    order
}

/// Gives every function the type index of its signature, appending a type
/// entry the first time a signature is seen.
fn assign_type_ids(module: &mut Module, order: &[usize]) -> Vector {
    let functions = module.functions_mut();
    let mut signatures: IndexMap<String, u32> = IndexMap::new();
    let mut types = Vector::default();

    for position in order {
        let function = &mut functions[*position];
        let type_id = match signatures.entry(function.signature()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let type_id = types.count;
                let entry = types.entry();
                entry.byte(FUNC_TYPE);
                entry.unsigned(function.parameters.len() as u64);
                for parameter in &function.parameters {
                    entry.byte(parameter.kind.byte());
                }
                match function.returns {
                    Some(kind) => {
                        entry.unsigned(1);
                        entry.byte(kind.byte());
                    }
                    None => entry.unsigned(0),
                }
                e.insert(type_id);
                type_id
            }
        };
        function.type_id = type_id;
    }
    types
}

fn encode_body(function: &Function, ids: &HashMap<&str, u32>) -> Result<Writer, CoreError> {
    let mut body = Writer::default();
    // no locals beyond the parameters
    body.unsigned(0);
    for instruction in function.instructions() {
        match instruction {
            Instruction::Op(op) => body.byte(op.byte()),
            Instruction::Call(name) => {
                let id = ids
                    .get(name.as_str())
                    .ok_or_else(|| CoreError::UnknownFunction(name.clone()))?;
                body.byte(Opcode::Call.byte());
                body.unsigned(u64::from(*id));
            }
            Instruction::ConstF32(value) => {
                body.byte(Opcode::F32Const.byte());
                body.f32(*value);
            }
        }
    }
    body.byte(Opcode::End.byte());
    Ok(body)
}
