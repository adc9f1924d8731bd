//! In-process JavaScript variant.
//!
//! Each call builds a fresh `boa_engine` context on its own worker thread and
//! installs only the host functions named in the [`Capabilities`] allow-list.
//! The caller races the worker against a timer; a worker that loses the race
//! is abandoned and stops at the loop-iteration or recursion limit.

use std::{thread, time::Duration};

use boa_engine::{Context, JsResult, JsString, JsValue, NativeFunction, Source};
use boa_gc::{Gc, GcRefCell};
use tokio::{sync::oneshot, time::timeout};
use tracing::debug;

use super::ExecutionResult;

type OutputBuffer = Gc<GcRefCell<Vec<String>>>;

const RECURSION_LIMIT: usize = 512;

/// Host functions a script may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `print(...args)`: appends the space-joined arguments as one output line.
    Print,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Capability::Print => "print",
        }
    }
}

/// Explicit allow-list of host functions installed into a script context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Default for Capabilities {
    fn default() -> Self {
        Self(vec![Capability::Print])
    }
}

impl Capabilities {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    fn install(&self, context: &mut Context, output: &OutputBuffer) -> JsResult<()> {
        for capability in self.iter() {
            match capability {
                Capability::Print => context.register_global_builtin_callable(
                    JsString::from(capability.name()),
                    0,
                    NativeFunction::from_copy_closure_with_captures(print, output.clone()),
                )?,
            }
        }
        Ok(())
    }
}

fn print(_this: &JsValue, args: &[JsValue], output: &OutputBuffer, context: &mut Context) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    output.borrow_mut().push(parts.join(" "));
    Ok(JsValue::undefined())
}

pub(super) async fn run(source: &str, limit: Duration, loop_limit: u64, capabilities: Capabilities) -> ExecutionResult {
    let (tx, rx) = oneshot::channel();
    let source = source.to_owned();

    let spawned = thread::Builder::new().name("kisan-script".into()).spawn(move || {
        let result = evaluate(&source, loop_limit, &capabilities);
        // Receiver is gone once the timeout fired.
        let _ = tx.send(result);
    });
    if let Err(e) = spawned {
        return ExecutionResult::failed(format!("Error: failed to start script worker: {e}"));
    }

    match timeout(limit, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => ExecutionResult::failed("Error: script worker exited unexpectedly"),
        Err(_) => {
            debug!("abandoning script worker after timeout");
            ExecutionResult::timed_out()
        }
    }
}

fn evaluate(source: &str, loop_limit: u64, capabilities: &Capabilities) -> ExecutionResult {
    let mut context = Context::default();
    let limits = context.runtime_limits_mut();
    limits.set_loop_iteration_limit(loop_limit);
    limits.set_recursion_limit(RECURSION_LIMIT);

    let output: OutputBuffer = Gc::new(GcRefCell::new(Vec::new()));
    if let Err(e) = capabilities.install(&mut context, &output) {
        return ExecutionResult::failed(format!("Error: {e}"));
    }

    let value = match context.eval(Source::from_bytes(source.as_bytes())) {
        Ok(value) => value,
        Err(e) => return ExecutionResult::failed(format!("Error: {e}")),
    };

    let printed = output.borrow().join("\n");
    if !printed.is_empty() || value.is_undefined() {
        return ExecutionResult::completed(printed.trim_end());
    }
    match value.to_string(&mut context) {
        Ok(text) => ExecutionResult::completed(text.to_std_string_escaped()),
        Err(e) => ExecutionResult::failed(format!("Error: {e}")),
    }
}
