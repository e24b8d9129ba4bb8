use thiserror::Error;

/// Failure kinds surfaced across the host boundary.
///
/// Every failure a script host can observe collapses into one of three
/// kinds: a compilation failure, a failure while script or native code
/// was running, or an allocation denial from the runtime.
#[derive(Clone, Debug, Error)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("out of memory: {0}")]
    Memory(String),
}

impl ScriptError {
    /// Recover a `ScriptError` from the payload of a completion future.
    pub(crate) fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<ScriptError>() {
            Ok(kind) => kind,
            Err(other) => ScriptError::Runtime(other.to_string()),
        }
    }
}

/// Map an `mlua` failure onto the host-visible kinds.
///
/// Errors raised inside native callbacks travel through the runtime as
/// callback errors; the original cause is what determines the kind, so the
/// chain is unwrapped before matching.
pub(crate) fn classify(err: mlua::Error) -> ScriptError {
    classify_ref(&err)
}

fn classify_ref(err: &mlua::Error) -> ScriptError {
    match err {
        mlua::Error::SyntaxError { message, .. } => ScriptError::Syntax(message.clone()),
        mlua::Error::MemoryError(message) => ScriptError::Memory(message.clone()),
        mlua::Error::CallbackError { cause, .. } => classify_ref(cause),
        other => ScriptError::Runtime(other.to_string()),
    }
}

pub(crate) fn wrong_arguments() -> mlua::Error {
    mlua::Error::RuntimeError("wrong arguments to function".into())
}

pub(crate) fn insufficient_arguments() -> mlua::Error {
    mlua::Error::RuntimeError("insufficient arguments to function".into())
}
