//! Core of the yard toolchain: a small C-like language compiled to a
//! WebAssembly binary module.
//!
//! The pipeline is:
//!
//!   source text
//!     -> lexer          (tokens)
//!     -> grammar        (combinator parse into a syntax tree)
//!     -> shunting_yard  (operator precedence resolved into binary trees)
//!     -> emitter        (declare + emit passes into a `Module`)
//!     -> encoder        (hand-written binary encoding)
//!     -> harness        (optional HTML page hosting the module)
//!
//! [`Language`] bundles the tables that drive the front half; [`Compiler`]
//! runs the whole pipeline. Tools such as the CLI should depend on this
//! crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: tokens, grammar and syntax trees
// ---------------------------------------------------------------------

pub mod registry;
pub mod lexer;
pub mod syntax;
pub mod grammar;
pub mod shunting_yard;

// ---------------------------------------------------------------------
// Lowering: value kinds, functions and instructions
// ---------------------------------------------------------------------

pub mod types;
pub mod module;
pub mod emitter;

// ---------------------------------------------------------------------
// Back-end: binary encoding, hosting and compiler orchestration
// ---------------------------------------------------------------------

pub mod leb128;
pub mod encoder;
pub mod harness;
pub mod language;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{
    CompilationArtifact, CompileOptions, Compiler, HostImport, compile_html, compile_wasm,
};
pub use diagnostic::Diagnostic;
pub use error::CoreError;
pub use language::Language;
