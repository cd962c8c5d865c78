use log::debug;

use crate::emitter::Emitter;
use crate::encoder::encode;
use crate::error::CoreError;
use crate::harness::render_html;
use crate::language::Language;
use crate::module::{Module, Parameter};
use crate::types::ValueKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Local function the host calls after instantiation.
    pub entry: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            entry: "Main".to_string(),
        }
    }
}

/// A function provided by the host under the `env` import module. `body` is
/// the script text the HTML harness wraps into a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostImport {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub returns: Option<ValueKind>,
    pub body: String,
}

impl HostImport {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        returns: Option<ValueKind>,
        body: impl Into<String>,
    ) -> Self {
        HostImport {
            name: name.into(),
            parameters,
            returns,
            body: body.into(),
        }
    }

    /// `Print(float f)`: appends `f` to the page.
    pub fn print() -> Self {
        HostImport::new(
            "Print",
            vec![Parameter::new(ValueKind::F32, "f")],
            None,
            "\nvar div = document.createElement('div');\ndiv.innerHTML = f;\ndocument.body.appendChild(div);",
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationArtifact {
    pub wasm: Vec<u8>,
    /// Host functions the module imports, in import order.
    pub imports: Vec<HostImport>,
}

#[derive(Debug, Clone)]
pub struct Compiler {
    language: Language,
    options: CompileOptions,
    imports: Vec<HostImport>,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(CompileOptions::default())
    }
}

impl Compiler {
    /// A compiler for the C-like language importing only `Print`.
    pub fn new(options: CompileOptions) -> Self {
        Compiler {
            language: Language::c_like(),
            options,
            imports: vec![HostImport::print()],
        }
    }

    pub fn with_import(mut self, import: HostImport) -> Self {
        self.imports.push(import);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, source: &str) -> Result<CompilationArtifact, CoreError> {
        let tree = self.language.parse(source)?;
        debug!("parsed and resolved operator precedence");

        let mut module = Module::new();
        for import in &self.imports {
            module.import_function(
                &import.name,
                import.parameters.clone(),
                import.returns,
                &import.body,
            )?;
        }

        let mut emitter = Emitter::new(&self.language.registry, &self.language.handlers, module);
        emitter.declare(&tree)?;
        emitter.emit(&tree)?;
        let mut module = emitter.finish();
        debug!("lowered {} local functions", module.locals().count());

        let entry = &self.options.entry;
        if !module.locals().any(|f| &f.name == entry) {
            return Err(CoreError::MissingEntry(entry.clone()));
        }

        let wasm = encode(&mut module)?;
        debug!("encoded {} bytes", wasm.len());

        Ok(CompilationArtifact {
            wasm,
            imports: self.imports.clone(),
        })
    }

    pub fn compile_html(&self, source: &str) -> Result<String, CoreError> {
        let artifact = self.compile(source)?;
        Ok(render_html(&artifact, &self.options.entry))
    }
}

pub fn compile_wasm(source: &str) -> Result<CompilationArtifact, CoreError> {
    Compiler::default().compile(source)
}

pub fn compile_html(source: &str) -> Result<String, CoreError> {
    Compiler::default().compile_html(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmparser::{Parser, Payload, Validator};

    fn run(artifact: &CompilationArtifact, entry: &str) -> Vec<f32> {
        let engine = wasmi::Engine::default();
        let module = wasmi::Module::new(&engine, &artifact.wasm).expect("module");
        let mut linker = wasmi::Linker::<Vec<f32>>::new(&engine);
        linker
            .func_wrap(
                "env",
                "Print",
                |mut caller: wasmi::Caller<'_, Vec<f32>>, value: f32| {
                    caller.data_mut().push(value);
                },
            )
            .expect("link Print");
        let mut store = wasmi::Store::new(&engine, Vec::new());
        let instance = linker
            .instantiate_and_start(&mut store, &module)
            .expect("instantiate");
        let main = instance
            .get_typed_func::<(), ()>(&store, entry)
            .expect("typed func");
        main.call(&mut store, ()).expect("execute entry");
        store.into_data()
    }

    fn printed(source: &str) -> Vec<f32> {
        let artifact = compile_wasm(source).expect("compile should succeed");
        run(&artifact, "Main")
    }

    fn type_count(wasm: &[u8]) -> u32 {
        for payload in Parser::new(0).parse_all(wasm) {
            if let Payload::TypeSection(reader) = payload.expect("payload") {
                return reader.count();
            }
        }
        panic!("module has no type section");
    }

    #[test]
    fn evaluates_with_standard_precedence() {
        assert_eq!(
            printed("void Main() { Print(3 + 4 * 2); Print((3 + 4) * 2); Print(8 - 3 - 2); }"),
            [11.0, 14.0, 3.0]
        );
    }

    #[test]
    fn matches_reference_evaluation() {
        let values = printed(
            "void Main() {
                Print( 4 * (4+3/2+13) );
                Print( 25 );
                Print( 23 + 25*2 - 33/4*5 + 12 );
                Print( 1.5 / 3 - 0.25 * (2 - 6) );
                Print( 100 / 10 / 5 );
            }",
        );
        assert_eq!(
            values,
            [
                4.0f32 * (4.0 + 3.0 / 2.0 + 13.0),
                25.0,
                23.0f32 + 25.0 * 2.0 - 33.0 / 4.0 * 5.0 + 12.0,
                1.5f32 / 3.0 - 0.25 * (2.0 - 6.0),
                100.0f32 / 10.0 / 5.0,
            ]
        );
    }

    #[test]
    fn calls_functions_defined_later() {
        let source = "
            void Main() { Twice(); Print(3); }
            void Twice() { Print(1); Print(2); }
        ";
        assert_eq!(printed(source), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn shared_signatures_produce_one_type() {
        let source = "
            void Main() { A(1); B(2); C(3); }
            void A(float x) { Print(10); }
            void B(float y) { Print(20); }
            void C(float z) { Print(30); }
        ";
        let artifact = compile_wasm(source).expect("compile should succeed");
        // `vf` for Print, A, B and C plus `v` for Main
        assert_eq!(type_count(&artifact.wasm), 2);
        assert_eq!(run(&artifact, "Main"), [10.0, 20.0, 30.0]);
    }

    #[test]
    fn produces_valid_modules() {
        let artifact = compile_wasm(
            "void Main() { Show(1, 2); Print(2 * 3); } void Show(float a, float b) { }",
        )
        .expect("compile should succeed");
        Validator::new()
            .validate_all(&artifact.wasm)
            .expect("module validates");
    }

    #[test]
    fn reports_missing_parenthesis_near_the_problem() {
        let source = "void Main() { Print((1 + 2); }";
        let err = compile_wasm(source).unwrap_err();
        let CoreError::Syntax(diagnostic) = err else {
            panic!("expected a syntax error, got {err:?}");
        };
        assert!(diagnostic.offset >= source.find('2').expect("operand"));
        assert!(diagnostic.to_string().contains("<!>"));
    }

    #[test]
    fn rejects_duplicate_and_unknown_names() {
        let err = compile_wasm("void Main() { } void Main() { }").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateFunction(name) if name == "Main"));

        let err = compile_wasm("void Main() { Missing(); }").unwrap_err();
        assert!(matches!(err, CoreError::UnknownFunction(name) if name == "Missing"));

        let err = compile_wasm("void Main(string s) { }").unwrap_err();
        assert!(matches!(err, CoreError::UnknownValueKind { name, .. } if name == "string"));
    }

    #[test]
    fn mismatched_argument_counts_produce_no_module() {
        let err = compile_wasm("void Main() { Print(); }").unwrap_err();
        assert!(matches!(err, CoreError::ArgumentCount { expected: 1, found: 0, .. }));

        let err = compile_wasm("void Main() { Print(1, 2); }").unwrap_err();
        assert_eq!(err.to_string(), "`Print` takes 1 arguments but 2 were given");
    }

    #[test]
    fn requires_the_entry_function() {
        let err = compile_wasm("void Start() { Print(1); }").unwrap_err();
        assert!(matches!(err, CoreError::MissingEntry(name) if name == "Main"));

        let compiler = Compiler::new(CompileOptions {
            entry: "Start".to_string(),
        });
        assert_eq!(compiler.options().entry, "Start");
        let artifact = compiler
            .compile("void Start() { Print(1); }")
            .expect("compile should succeed");
        assert_eq!(run(&artifact, "Start"), [1.0]);
    }

    #[test]
    fn links_additional_host_imports() {
        let compiler = Compiler::default().with_import(HostImport::new(
            "Add",
            vec![
                Parameter::new(ValueKind::F32, "a"),
                Parameter::new(ValueKind::F32, "b"),
            ],
            Some(ValueKind::F32),
            "return a + b;",
        ));
        let artifact = compiler
            .compile("void Main() { Print(Add(1, 2) * 2); }")
            .expect("compile should succeed");
        assert_eq!(artifact.imports.len(), 2);

        let engine = wasmi::Engine::default();
        let module = wasmi::Module::new(&engine, &artifact.wasm).expect("module");
        let mut linker = wasmi::Linker::<Vec<f32>>::new(&engine);
        linker
            .func_wrap(
                "env",
                "Print",
                |mut caller: wasmi::Caller<'_, Vec<f32>>, value: f32| {
                    caller.data_mut().push(value);
                },
            )
            .expect("link Print");
        linker
            .func_wrap("env", "Add", |a: f32, b: f32| -> f32 { a + b })
            .expect("link Add");
        let mut store = wasmi::Store::new(&engine, Vec::new());
        let instance = linker
            .instantiate_and_start(&mut store, &module)
            .expect("instantiate");
        let main = instance
            .get_typed_func::<(), ()>(&store, "Main")
            .expect("typed func");
        main.call(&mut store, ()).expect("execute main");
        assert_eq!(store.into_data(), [6.0]);
    }

    #[test]
    fn renders_html_harness() {
        let page = compile_html("void Main() { Print(1); }").expect("compile should succeed");
        assert!(page.contains("var wasm = [0x00,0x61,0x73,0x6D,0x01,0x00,0x00,0x00,"));
        assert!(page.contains("Print:(f)=>{"));
        assert!(page.contains("document.body.appendChild(div);"));
        assert!(page.contains("obj.instance.exports.Main();"));
    }
}
