//! One-shot completion channels.
//!
//! A [`Promise`] is the producing half of a single-use channel; the
//! consuming half is a [`Future`] that can be awaited. A promise resolves
//! at most once: the first `ok`/`err` wins and every later attempt is
//! ignored. Dropping an unresolved promise resolves it with
//! [`BrokenPromise`] so that a waiter observes an error rather than
//! hanging forever.

use anyhow::Error;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use thiserror::*;

#[derive(Debug, Error)]
#[error("Promise was dropped before completion")]
pub struct BrokenPromise {}

#[derive(Debug)]
struct Core<T> {
    result: Option<anyhow::Result<T>>,
    resolved: bool,
    waker: Option<Waker>,
}

pub struct Promise<T> {
    core: Arc<Mutex<Core<T>>>,
}

#[derive(Debug)]
pub struct Future<T> {
    core: Arc<Mutex<Core<T>>>,
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Mutex::new(Core {
                result: None,
                resolved: false,
                waker: None,
            })),
        }
    }

    pub fn get_future(&mut self) -> Future<T> {
        Future {
            core: Arc::clone(&self.core),
        }
    }

    pub fn ok(&mut self, value: T) -> bool {
        self.result(Ok(value))
    }

    pub fn err(&mut self, err: Error) -> bool {
        self.result(Err(err))
    }

    /// Resolve the promise. Returns false if it was already resolved;
    /// the earlier result is kept.
    pub fn result(&mut self, result: Result<T, Error>) -> bool {
        let mut core = self.core.lock().unwrap();
        if core.resolved {
            return false;
        }
        core.resolved = true;
        core.result.replace(result);
        if let Some(waker) = core.waker.take() {
            waker.wake();
        }
        true
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        let mut core = self.core.lock().unwrap();
        if !core.resolved {
            core.resolved = true;
            core.result.replace(Err(BrokenPromise {}.into()));
            if let Some(waker) = core.waker.take() {
                waker.wake();
            }
        }
    }
}

impl<T: Send + 'static> std::future::Future for Future<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context) -> Poll<Self::Output> {
        let waker = ctx.waker().clone();

        let mut core = self.core.lock().unwrap();
        if let Some(result) = core.result.take() {
            Poll::Ready(result)
        } else {
            core.waker.replace(waker);
            Poll::Pending
        }
    }
}
