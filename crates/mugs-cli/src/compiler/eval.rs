//! Starlark evaluation logic.
//!
//! Compiling an extension evaluates its module once under the load phase,
//! collects the command values it produced, and freezes the module. Running
//! a command later calls its `execute` function from the frozen module in a
//! fresh evaluator under the execute phase.

use starlark::any::ProvidesStaticType;
use starlark::environment::{FrozenModule, Globals, GlobalsBuilder, Module};
use starlark::eval::Evaluator;
use starlark::syntax::{AstModule, Dialect};
use starlark::values::list::AllocList;
use starlark::values::OwnedFrozenValue;
use starlark::PrintHandler;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::error::CompileError;
use super::stdlib::command::{field, is_command};
use super::stdlib::register_stdlib;
use super::{CompilerConfig, SourceForm, SourceUnit};
use crate::host::HostContext;
use crate::report::Reporter;

/// Module symbol holding a script-form command.
pub(crate) const SCRIPT_SYMBOL: &str = "mugs__command";
const REGISTERED_PREFIX: &str = "mugs__registered_";
const EXPORT_PREFIX: &str = "mugs__export_";

/// Which part of an extension's life is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Module body: commands may be registered and values exported.
    Load,
    /// A command's `execute` function: commands may be registered, values
    /// may not be exported.
    Execute,
}

/// Per-evaluation state reachable from host functions via `eval.extra`.
#[derive(ProvidesStaticType)]
pub(crate) struct EvalState {
    host: Arc<HostContext>,
    phase: Phase,
    registered: RefCell<Vec<String>>,
    exports: RefCell<Vec<(String, String)>>,
    /// Set while a `shared_update()` function runs with the store locked.
    updating: Cell<bool>,
}

/// Clears the in-update flag when the update function returns.
pub(crate) struct UpdateGuard<'a>(&'a Cell<bool>);

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl EvalState {
    pub(crate) fn new(host: Arc<HostContext>, phase: Phase) -> Self {
        Self {
            host,
            phase,
            registered: RefCell::new(Vec::new()),
            exports: RefCell::new(Vec::new()),
            updating: Cell::new(false),
        }
    }

    pub(crate) fn host(&self) -> &Arc<HostContext> {
        &self.host
    }

    /// Marks the shared store as locked by an update function.
    pub(crate) fn begin_update(&self) -> anyhow::Result<UpdateGuard<'_>> {
        self.check_store_access()?;
        self.updating.set(true);
        Ok(UpdateGuard(&self.updating))
    }

    /// Fails while an update function holds the shared store.
    pub(crate) fn check_store_access(&self) -> anyhow::Result<()> {
        if self.updating.get() {
            anyhow::bail!("the shared store cannot be used inside a shared_update() function");
        }
        Ok(())
    }

    /// Reserves a module symbol for a registered command. At load time the
    /// symbol names one of the file's commands; during `execute` it names a
    /// command handed to the live registry once the call returns.
    pub(crate) fn register_symbol(&self) -> anyhow::Result<String> {
        let mut registered = self.registered.borrow_mut();
        let symbol = format!("{}{}", REGISTERED_PREFIX, registered.len());
        registered.push(symbol.clone());
        Ok(symbol)
    }

    /// Reserves a module symbol for an exported value.
    pub(crate) fn export_symbol(&self, key: &str) -> anyhow::Result<String> {
        if self.phase != Phase::Load {
            anyhow::bail!("export() is only available while an extension loads");
        }
        if key.is_empty() {
            anyhow::bail!("export(): 'key' must not be empty");
        }
        let mut exports = self.exports.borrow_mut();
        let symbol = format!("{}{}", EXPORT_PREFIX, exports.len());
        exports.push((key.to_string(), symbol.clone()));
        Ok(symbol)
    }
}

/// Fetches the evaluation state attached to `eval`.
pub(crate) fn eval_state<'a>(eval: &Evaluator<'_, 'a>) -> anyhow::Result<&'a EvalState> {
    eval.extra
        .and_then(|extra| extra.downcast_ref::<EvalState>())
        .ok_or_else(|| anyhow::anyhow!("host context is not available"))
}

/// Routes Starlark `print` to the reporting interface.
struct ReporterPrint<'a>(&'a dyn Reporter);

impl PrintHandler for ReporterPrint<'_> {
    fn println(&self, text: &str) -> anyhow::Result<()> {
        self.0.response(text, &[]);
        Ok(())
    }
}

/// Creates the Starlark dialect configuration.
///
/// - Functions (`def`) and lambdas are enabled
/// - Top-level statements are enabled
/// - `load()` is disabled; includes go through `#load` expansion instead
fn create_dialect() -> Dialect {
    Dialect {
        enable_def: true,
        enable_lambda: true,
        enable_load: false,
        enable_top_level_stmt: true,
        ..Dialect::Standard
    }
}

fn create_globals() -> Globals {
    GlobalsBuilder::standard().with(register_stdlib).build()
}

/// A compiled extension: its frozen module plus the symbols of the commands
/// it produced.
pub struct StarlarkArtifact {
    pub(crate) path: PathBuf,
    pub(crate) module: FrozenModule,
    pub(crate) symbols: Vec<String>,
    pub(crate) timeout_seconds: u64,
}

impl std::fmt::Debug for StarlarkArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarlarkArtifact")
            .field("path", &self.path)
            .field("symbols", &self.symbols)
            .finish_non_exhaustive()
    }
}

/// Splits an interpreter error into a location in the pre-expansion sources
/// and the bare message. The rendered diagnostic would quote expanded line
/// numbers, so it is dropped when a span is available.
fn diagnostic(unit: &SourceUnit, e: &starlark::Error) -> (String, String) {
    match e.span() {
        Some(span) => {
            let begin = span.resolve_span().begin;
            (
                unit.locate(begin.line, begin.column),
                e.without_diagnostic().to_string(),
            )
        }
        None => (unit.path.display().to_string(), e.to_string()),
    }
}

/// Evaluates an extension module synchronously.
pub(crate) fn compile_sync(
    unit: &SourceUnit,
    host: &Arc<HostContext>,
    config: &CompilerConfig,
) -> Result<StarlarkArtifact, CompileError> {
    let filename = unit.path.display().to_string();

    let ast = AstModule::parse(&filename, unit.source.clone(), &create_dialect()).map_err(|e| {
        let (location, message) = diagnostic(unit, &e);
        CompileError::Syntax { location, message }
    })?;

    let module = Module::new();
    let globals = create_globals();
    let state = EvalState::new(Arc::clone(host), Phase::Load);
    let printer = ReporterPrint(&**host.reporter());

    {
        let mut eval = Evaluator::new(&module);
        eval.extra = Some(&state);
        eval.set_print_handler(&printer);

        let value = eval.eval_module(ast, &globals).map_err(|e| {
            let (location, message) = diagnostic(unit, &e);
            CompileError::Runtime { location, message }
        })?;

        if unit.form == SourceForm::Script {
            if !is_command(value) {
                return Err(CompileError::NotACommand {
                    type_name: value.get_type().to_string(),
                });
            }
            module.set(SCRIPT_SYMBOL, value);
        }
    }

    let symbols = match unit.form {
        SourceForm::Script => vec![SCRIPT_SYMBOL.to_string()],
        SourceForm::Declaration => state.registered.take(),
    };
    if symbols.is_empty() {
        return Err(CompileError::NoCommands { location: filename });
    }
    let exports = state.exports.take();

    let frozen = module.freeze().map_err(|e| CompileError::Runtime {
        location: filename.clone(),
        message: e.to_string(),
    })?;

    for (key, symbol) in exports {
        let value = frozen.get(&symbol).map_err(|e| CompileError::Runtime {
            location: filename.clone(),
            message: e.to_string(),
        })?;
        host.exports().publish(&key, value);
    }

    Ok(StarlarkArtifact {
        path: unit.path.clone(),
        module: frozen,
        symbols,
        timeout_seconds: config.timeout_seconds,
    })
}

/// Evaluates an extension module on a blocking thread under a timeout.
pub(crate) async fn compile_with_timeout(
    unit: SourceUnit,
    host: Arc<HostContext>,
    config: CompilerConfig,
) -> Result<StarlarkArtifact, CompileError> {
    let seconds = config.timeout_seconds;
    let location = unit.path.display().to_string();

    let task = tokio::task::spawn_blocking(move || compile_sync(&unit, &host, &config));
    match timeout(Duration::from_secs(seconds), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(CompileError::Runtime {
            location,
            message: format!("task panicked: {}", e),
        }),
        Err(_) => Err(CompileError::Timeout { seconds }),
    }
}

/// Calls a command value's `execute` function with `args`.
///
/// Returns the commands the function registered, frozen so they outlive the
/// call.
pub(crate) fn call_execute(
    command: &OwnedFrozenValue,
    args: &[String],
    host: Arc<HostContext>,
) -> Result<Vec<OwnedFrozenValue>, String> {
    let module = Module::new();
    let state = EvalState::new(host, Phase::Execute);
    let printer = ReporterPrint(&**state.host().reporter());

    {
        let mut eval = Evaluator::new(&module);
        eval.extra = Some(&state);
        eval.set_print_handler(&printer);

        let value = command.owned_value(module.frozen_heap());
        let execute =
            field(value, "execute").ok_or_else(|| "command has no execute function".to_string())?;
        let args = module.heap().alloc(AllocList(args.iter().map(String::as_str)));

        eval.eval_function(execute, &[args], &[])
            .map_err(|e| e.to_string())?;
    }

    let symbols = state.registered.take();
    if symbols.is_empty() {
        return Ok(Vec::new());
    }
    let frozen = module.freeze().map_err(|e| e.to_string())?;
    symbols
        .iter()
        .map(|symbol| frozen.get(symbol).map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::stdlib::tests::test_host;
    use pretty_assertions::assert_eq;

    fn unit(form: SourceForm, source: &str) -> SourceUnit {
        SourceUnit {
            path: PathBuf::from(match form {
                SourceForm::Script => "test.star",
                SourceForm::Declaration => "test.bzl",
            }),
            form,
            source: source.to_string(),
            includes: Vec::new(),
            origins: Vec::new(),
        }
    }

    fn compile(form: SourceForm, source: &str) -> Result<StarlarkArtifact, CompileError> {
        let (_, host) = test_host();
        compile_sync(&unit(form, source), &host, &CompilerConfig::default())
    }

    #[test]
    fn test_script_form() {
        let artifact = compile(
            SourceForm::Script,
            r#"
def _run(args):
    respond("hi " + " ".join(args))

command(name = "greet", aliases = ["hi"], execute = _run)
"#,
        )
        .unwrap();
        assert_eq!(artifact.symbols, vec![SCRIPT_SYMBOL.to_string()]);
    }

    #[test]
    fn test_declaration_form() {
        let artifact = compile(
            SourceForm::Declaration,
            r#"
def _up(args):
    pass

def _down(args):
    pass

register(command(name = "up", execute = _up))
register(command(name = "down", execute = _down))
"#,
        )
        .unwrap();
        assert_eq!(artifact.symbols.len(), 2);
    }

    #[test]
    fn test_declaration_without_commands() {
        let result = compile(SourceForm::Declaration, "x = 1\n");
        assert!(matches!(result, Err(CompileError::NoCommands { .. })));
    }

    #[test]
    fn test_script_not_a_command() {
        let result = compile(SourceForm::Script, "[1, 2, 3]\n");
        match result {
            Err(CompileError::NotACommand { type_name }) => assert_eq!(type_name, "list"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_syntax_error() {
        let result = compile(SourceForm::Script, "def broken(:\n");
        assert!(matches!(result, Err(CompileError::Syntax { .. })));
    }

    #[test]
    fn test_runtime_error() {
        let result = compile(SourceForm::Script, "undefined_variable\n");
        assert!(matches!(result, Err(CompileError::Runtime { .. })));
    }

    #[test]
    fn test_load_statement_rejected() {
        let result = compile(SourceForm::Script, "load('other.star', 'x')\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_exports_are_published() {
        let (_, host) = test_host();
        let source = r#"
def _twice(x):
    return x * 2

export("math.twice", _twice)
command(name = "m", execute = lambda args: None)
"#;
        compile_sync(&unit(SourceForm::Script, source), &host, &CompilerConfig::default()).unwrap();
        assert!(host.exports().lookup("MATH.twice").is_some());
    }

    #[test]
    fn test_call_execute_receives_args() {
        let (reporter, host) = test_host();
        let source = r#"
def _run(args):
    respond("args=" + ",".join(args))

command(name = "echo", execute = _run)
"#;
        let artifact =
            compile_sync(&unit(SourceForm::Script, source), &host, &CompilerConfig::default())
                .unwrap();
        let value = artifact.module.get(SCRIPT_SYMBOL).unwrap();

        let registered =
            call_execute(&value, &["a".to_string(), "b c".to_string()], host).unwrap();
        assert!(registered.is_empty());
        assert_eq!(reporter.responses()[0].text, "args=a,b c");
    }

    #[test]
    fn test_register_at_execute_time_returns_commands() {
        let (_, host) = test_host();
        let source = r#"
def _late(args):
    respond("late")

def _run(args):
    register(command(name = "late", aliases = ["l"], execute = _late))

command(name = "eager", execute = _run)
"#;
        let artifact =
            compile_sync(&unit(SourceForm::Script, source), &host, &CompilerConfig::default())
                .unwrap();
        let value = artifact.module.get(SCRIPT_SYMBOL).unwrap();

        let registered = call_execute(&value, &[], host).unwrap();
        assert_eq!(registered.len(), 1);
        let name = field(registered[0].value(), "name").and_then(|v| v.unpack_str());
        assert_eq!(name, Some("late"));
    }

    #[test]
    fn test_export_at_execute_time_fails() {
        let (_, host) = test_host();
        let source = r#"
def _run(args):
    export("late", 1)

command(name = "eager", execute = _run)
"#;
        let artifact =
            compile_sync(&unit(SourceForm::Script, source), &host, &CompilerConfig::default())
                .unwrap();
        let value = artifact.module.get(SCRIPT_SYMBOL).unwrap();

        let err = call_execute(&value, &[], host).unwrap_err();
        assert!(err.contains("only available while an extension loads"), "{}", err);
    }

    #[tokio::test]
    async fn test_compile_with_timeout() {
        let (_, host) = test_host();
        let source = "command(name = 'fast', execute = lambda args: None)\n";
        let result =
            compile_with_timeout(unit(SourceForm::Script, source), host, CompilerConfig::default())
                .await;
        assert!(result.is_ok());
    }
}
