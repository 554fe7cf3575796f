//! A asynchronous locating request.
//!
//! Locating a level path may open and decode archives on a slow disc, so the update loop hands
//! it to a worker thread and polls the `Request` once per frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::errors::*;

/// A latch carrying the payload it was set with. It starts as empty; eventually the worker
/// calls `set` and it becomes ready.
pub struct LockLatch<T> {
    m: Mutex<Option<T>>,
    v: Condvar,
}

impl<T> LockLatch<T> {
    fn new() -> Self {
        LockLatch {
            m: Mutex::new(None),
            v: Condvar::new(),
        }
    }

    fn set(&self, value: T) {
        let mut guard = self.m.lock().unwrap();
        *guard = Some(value);
        self.v.notify_all();
    }

    fn is_set(&self) -> bool {
        self.m.lock().unwrap().is_some()
    }

    fn take(&self) -> Option<T> {
        self.m.lock().unwrap().take()
    }

    /// Block until latch is set, and takes its payload.
    fn wait(&self) -> T {
        let mut guard = self.m.lock().unwrap();
        loop {
            if let Some(value) = guard.take() {
                return value;
            }

            guard = self.v.wait(guard).unwrap();
        }
    }
}

/// A asynchronous request. You sould checks the completion status with `poll` method manually.
/// Once the polling returns true, you could fetch the result by `response`.
pub enum Request<T> {
    NotReady(Arc<LockLatch<Result<T>>>),
    Ok(Result<T>),
}

impl<T: Send + 'static> Request<T> {
    /// Runs `func` on a dedicated worker thread.
    pub fn spawn<F>(func: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let latch = Arc::new(LockLatch::new());
        let worker = latch.clone();

        let spawned = thread::Builder::new()
            .name("alive-data-request".to_owned())
            .spawn(move || {
                let rsp = match panic::catch_unwind(AssertUnwindSafe(func)) {
                    Ok(rsp) => rsp,
                    Err(payload) => Err(Error::Request(panic_message(&payload))),
                };

                worker.set(rsp);
            });

        match spawned {
            Ok(_) => Request::NotReady(latch),
            Err(err) => Request::Ok(Err(err.into())),
        }
    }
}

impl<T> Request<T> {
    #[inline]
    pub fn ok(value: T) -> Self {
        Request::Ok(Ok(value))
    }

    #[inline]
    pub fn err(err: Error) -> Self {
        Request::Ok(Err(err))
    }

    /// Attempt to resolve the request to a final state, and returns true if the result is
    /// ready for user.
    pub fn poll(&mut self) -> bool {
        let rsp = match *self {
            Request::Ok(_) => return true,
            Request::NotReady(ref latch) => {
                if !latch.is_set() {
                    return false;
                }

                match latch.take() {
                    Some(rsp) => rsp,
                    None => return false,
                }
            }
        };

        *self = Request::Ok(rsp);
        true
    }

    /// Return the response if exists.
    #[inline]
    pub fn response(&self) -> Option<&Result<T>> {
        if let Request::Ok(ref rsp) = *self {
            Some(rsp)
        } else {
            None
        }
    }

    /// Blocks until the request is resolved.
    pub fn wait(self) -> Result<T> {
        match self {
            Request::Ok(rsp) => rsp,
            Request::NotReady(latch) => latch.wait(),
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(v) = payload.downcast_ref::<&str>() {
        (*v).to_owned()
    } else if let Some(v) = payload.downcast_ref::<String>() {
        v.clone()
    } else {
        "worker panicked".to_owned()
    }
}
