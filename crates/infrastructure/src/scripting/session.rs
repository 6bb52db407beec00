//! Per-run state reachable from native bindings.
//!
//! Native functions are plain `fn` pointers, so the state they act on lives in
//! a thread-local installed for the duration of one run on the worker thread.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use boa_engine::{JsNativeError, JsResult};
use scriptbox_application::{EnvironmentStore, TestRecorder};

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
}

/// State shared between the host and the bindings of one run.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub environment: EnvironmentStore,
    pub recorder: TestRecorder,
    /// Set by the host once it stops waiting; later environment writes are dropped.
    pub abandoned: Arc<AtomicBool>,
}

impl Session {
    /// Installs the session on the current thread until the guard drops.
    pub fn install(self) -> SessionGuard {
        SESSION.with(|slot| *slot.borrow_mut() = Some(self));
        SessionGuard
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}

/// Removes the installed session on drop.
pub(crate) struct SessionGuard;

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION.with(|slot| slot.borrow_mut().take());
    }
}

/// Runs `f` against the installed session.
pub(crate) fn with_session<R>(f: impl FnOnce(&Session) -> R) -> JsResult<R> {
    SESSION.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(f)
            .ok_or_else(|| JsNativeError::error().with_message("no script session installed").into())
    })
}
