//! Running a script file as a synthetic top-level module.
use std::{
    collections::BTreeMap,
    fmt, fs, io,
    panic::{AssertUnwindSafe, catch_unwind},
    path::Path,
    rc::Rc,
    sync::Arc,
};

use serde_json::Value as Json;
use tracing::{debug, trace};

use pane_core::{
    assemble::Markers,
    fault::{Fault, Frame, Phase},
    runner::panic_message,
};
use pane_model::{Env, Params};

use crate::{
    capture::capture,
    config::ExecConfig,
    host::Host,
    script::{
        Value, builtins,
        interp::{Interpreter, Runtime},
        parse_with_limit,
        scope::{Scope, ScopeRef},
    },
    sink::ReportSink,
};

/// Module identity marker a script can compare against the sentinel.
pub const NAME_KEY: &str = "__name__";
/// Path of the executed script.
pub const FILE_KEY: &str = "__file__";

/// Frames of the runner's own dispatch path, outermost first.
pub fn harness_frames() -> Vec<Frame> {
    vec![Frame::harness("run_invocation"), Frame::harness("exec_module")]
}

/// Result of a completed script.
#[derive(Debug)]
pub struct Module {
    /// Globals as they stood when the script finished.
    pub namespace: Namespace,
    /// Everything the script printed.
    pub output: String,
    pub markers: Markers,
}

/// A script that did not complete, with output captured up to that point.
#[derive(Debug)]
pub struct ModuleFailure {
    pub fault: Fault,
    /// `None` when the script never started.
    pub output: Option<String>,
}

impl ModuleFailure {
    fn before_start(fault: Fault) -> Self {
        Self {
            fault,
            output: None,
        }
    }
}

/// Frozen globals of a finished module.
///
/// Values are captured when the script completes; rebinding a global later, e.g.
/// from one of the returned functions, does not show here. Functions keep their
/// defining scope alive and stay callable through [`Namespace::call`].
pub struct Namespace {
    values: BTreeMap<String, Value>,
    runtime: Rc<Runtime>,
}

impl Namespace {
    fn snapshot(globals: &ScopeRef, pinned: &[(&str, Value)], runtime: Rc<Runtime>) -> Self {
        let mut values: BTreeMap<String, Value> = globals
            .borrow()
            .entries()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        for (name, value) in pinned {
            values.insert(name.to_string(), value.clone());
        }
        Self { values, runtime }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Call the function bound to `name`.
    ///
    /// Output goes wherever output currently goes on this thread.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, Fault> {
        let Some(callee) = self.values.get(name) else {
            return Err(Fault::new(
                Phase::Execute,
                "NameError",
                format!("name '{name}' is not defined"),
            ));
        };
        Interpreter::new(self.runtime.clone())
            .call_value(callee, args)
            .map_err(|e| e.into_fault(Vec::new()))
    }

    /// JSON view of the data values; functions are skipped.
    pub fn to_json(&self) -> serde_json::Map<String, Json> {
        self.values
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), v.to_json().ok()?)))
            .collect()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .field("file", &self.runtime.file)
            .finish()
    }
}

/// Loads and runs script files.
pub struct ModuleExecutor {
    config: ExecConfig,
    sink: Arc<dyn ReportSink>,
}

impl ModuleExecutor {
    pub fn new(config: ExecConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run `path` as the entry module, with `initial_state` bound as globals.
    ///
    /// `__name__` and `__file__` are pinned: whatever the script assigns to them,
    /// the returned namespace holds the values set up here.
    pub fn execute(
        &self,
        path: &Path,
        initial_state: &Params,
        env: &Env,
    ) -> Result<Module, ModuleFailure> {
        let file = path.display().to_string();
        let source = fs::read_to_string(path)
            .map_err(|e| ModuleFailure::before_start(load_fault(&file, e)))?;
        let program = parse_with_limit(&source, self.config.max_nesting)
            .map_err(|e| ModuleFailure::before_start(e.into_fault(&file, &source)))?;
        debug!(script = %file, statements = program.body.len(), "script parsed");

        let host = Host::new(self.sink.clone(), env.clone());
        let runtime = Rc::new(Runtime::new(
            file.as_str(),
            &source,
            host,
            self.config.max_call_depth,
        ));

        let pinned = [
            (NAME_KEY, Value::str(&self.config.sentinel)),
            (FILE_KEY, Value::str(&file)),
        ];
        let globals = Scope::boundary(&builtins::scope());
        {
            let mut g = globals.borrow_mut();
            for (name, value) in initial_state {
                g.declare(Rc::from(name.as_str()), Value::from_json(value));
            }
            for (name, value) in &pinned {
                g.declare(Rc::from(*name), value.clone());
            }
        }
        trace!(script = %file, seeded = initial_state.len(), "globals seeded");

        let guard = capture(self.config.capture);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            Interpreter::new(runtime.clone()).run_module(&program, &globals)
        }));
        let output = guard.finish();

        match outcome {
            Ok(Ok(())) => {
                let markers = runtime.host.markers();
                let namespace = Namespace::snapshot(&globals, &pinned, runtime);
                debug!(script = %file, names = namespace.len(), "script completed");
                Ok(Module {
                    namespace,
                    output,
                    markers,
                })
            }
            Ok(Err(err)) => {
                debug!(script = %file, kind = %err.kind, "script raised");
                Err(ModuleFailure {
                    fault: err.into_fault(harness_frames()),
                    output: Some(output),
                })
            }
            Err(panic) => Err(ModuleFailure {
                fault: Fault::prepare(
                    "InternalError",
                    format!("interpreter panicked: {}", panic_message(panic.as_ref())),
                ),
                output: Some(output),
            }),
        }
    }
}

fn load_fault(file: &str, err: io::Error) -> Fault {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => "FileNotFoundError",
        io::ErrorKind::InvalidData => "UnicodeDecodeError",
        io::ErrorKind::PermissionDenied => "PermissionError",
        _ => "OSError",
    };
    Fault::prepare(kind, format!("{file}: {err}"))
}
