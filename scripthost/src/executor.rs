//! Suspended script call frames and the cooperative executor that drives
//! them.

use crate::error::classify;
use crate::marshal::{push_value, read_value};
use crate::object::push_object;
use crate::script::{ArgRepr, ScriptArg};
use crate::value::Value;
use mlua::{Lua, MultiValue, ThreadStatus};
use promise::{Future, Promise};
use std::collections::VecDeque;

/// Outcome of advancing a thread once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The frame hit a cooperative yield; resume it later.
    Yielded,
    /// The frame completed (or had already completed) and its result slot
    /// is resolved.
    Finished,
}

/// A coroutine rooted at one script function plus the one-shot result
/// slot observing its completion.
///
/// Holding the runtime's thread handle keeps the coroutine alive while it
/// is suspended; dropping the `ScriptThread` before completion releases
/// the coroutine to the garbage collector and breaks the promise.
pub struct ScriptThread<'lua> {
    thread: mlua::Thread<'lua>,
    pending: Option<MultiValue<'lua>>,
    promise: Promise<Value>,
    finished: bool,
}

impl<'lua> ScriptThread<'lua> {
    pub(crate) fn new(
        lua: &'lua Lua,
        function: mlua::Function<'lua>,
        args: Vec<ScriptArg>,
    ) -> mlua::Result<Self> {
        let thread = lua.create_thread(function)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(match arg.0 {
                ArgRepr::Value(value) => push_value(lua, &value)?,
                ArgRepr::Object(cell) => mlua::Value::UserData(push_object(lua, cell)?),
            });
        }
        Ok(Self {
            thread,
            pending: Some(MultiValue::from_vec(values)),
            promise: Promise::new(),
            finished: false,
        })
    }

    /// A one-shot future resolving with the frame's first return value,
    /// or with its failure.
    pub fn future(&mut self) -> Future<Value> {
        self.promise.get_future()
    }

    /// Advance the frame by one resume.
    pub fn run(&mut self) -> RunStatus {
        if self.finished {
            return RunStatus::Finished;
        }
        // The call arguments ride on the first resume only.
        let args = self.pending.take().unwrap_or_else(MultiValue::new);
        match self.thread.resume::<_, MultiValue>(args) {
            Ok(values) => {
                if self.thread.status() == ThreadStatus::Resumable {
                    // Values passed to yield() are discarded.
                    return RunStatus::Yielded;
                }
                self.finished = true;
                let result = values
                    .into_iter()
                    .next()
                    .map(|value| read_value(&value))
                    .unwrap_or(Ok(Value::Nil));
                match result {
                    Ok(value) => self.promise.ok(value),
                    Err(err) => self.promise.err(classify(err).into()),
                };
                RunStatus::Finished
            }
            Err(err) => {
                self.finished = true;
                self.promise.err(classify(err).into());
                RunStatus::Finished
            }
        }
    }
}

/// Single-threaded FIFO driver for suspended call frames.
///
/// `run` resumes threads in readiness order until every one has finished;
/// a yielded thread goes to the tail. There is no preemption: a thread
/// that never yields keeps the executor to itself.
#[derive(Default)]
pub struct CooperativeExecutor<'lua> {
    ready: VecDeque<ScriptThread<'lua>>,
}

impl<'lua> CooperativeExecutor<'lua> {
    pub fn new() -> Self {
        Self {
            ready: VecDeque::new(),
        }
    }

    pub fn add_thread(&mut self, thread: ScriptThread<'lua>) {
        self.ready.push_back(thread);
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Drive every scheduled thread to completion.
    pub fn run(&mut self) {
        log::trace!("executor: draining {} thread(s)", self.ready.len());
        while let Some(mut thread) = self.ready.pop_front() {
            match thread.run() {
                RunStatus::Yielded => self.ready.push_back(thread),
                RunStatus::Finished => {}
            }
        }
    }
}
