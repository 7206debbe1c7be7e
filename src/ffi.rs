//! C interface of the embedder.
//!
//! The host creates an embedder on its platform thread, passes the task runner description to
//! the engine, attaches the engine once it is running, and then calls
//! [`gosub_embedder_poll`] once per iteration of its main loop.

use crate::config::EventLoopConfig;
use crate::engine::logging;
use crate::runner::TaskExecutor;
use crate::{Embedder, EngineError};
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Engine task as it crosses the C boundary: the engine runner it belongs to and an engine
/// private task id. Both are opaque to the embedder.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTask {
    pub runner: *mut c_void,
    pub task: u64,
}

// Never dereferenced here, only handed back to the engine on the platform thread
unsafe impl Send for EngineTask {}

/// Engine's current time in nanoseconds.
pub type CurrentTimeCallback = extern "C" fn() -> u64;

/// Engine's "run task" entry point. Returns false when the engine could not run the task.
pub type RunTaskCallback = unsafe extern "C" fn(engine: *mut c_void, task: *const EngineTask) -> bool;

/// Custom task runner as the engine expects it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TaskRunnerDescription {
    pub struct_size: usize,
    pub user_data: *mut c_void,
    pub runs_task_on_current_thread_callback: extern "C" fn(user_data: *mut c_void) -> bool,
    pub post_task_callback: extern "C" fn(task: EngineTask, target_time_nanos: u64, user_data: *mut c_void),
}

/// Forwards expired tasks to the engine through its C entry point.
struct CEngine {
    run_task: RunTaskCallback,
    /// Engine instance, attached after the engine has started
    engine: AtomicPtr<c_void>,
}

impl TaskExecutor<EngineTask> for CEngine {
    fn run_task(&self, task: &EngineTask) -> Result<(), EngineError> {
        let engine = self.engine.load(Ordering::Acquire);
        if engine.is_null() {
            return Err(EngineError::TaskExecution("no engine attached".into()));
        }

        if unsafe { (self.run_task)(engine, task) } {
            Ok(())
        } else {
            Err(EngineError::TaskExecution(format!("engine rejected task {}", task.task)))
        }
    }
}

struct FfiEmbedder {
    embedder: Embedder<EngineTask>,
    engine: Arc<CEngine>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GosubEmbedderHandle(*mut c_void);

impl GosubEmbedderHandle {
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

unsafe fn embedder_from<'a>(ptr: *mut c_void) -> Result<&'a FfiEmbedder, EngineError> {
    (ptr as *const FfiEmbedder).as_ref().ok_or(EngineError::NullHandle)
}

fn parse_config(config_json: *const c_char) -> Result<EventLoopConfig, EngineError> {
    if config_json.is_null() {
        return Ok(EventLoopConfig::default());
    }
    let json = unsafe { CStr::from_ptr(config_json) }.to_str()?;
    EventLoopConfig::from_json(json)
}

/// Creates an embedder. The calling thread becomes the platform thread.
///
/// `config_json` may be null for the default configuration. Returns a null handle when the
/// configuration is invalid.
///
/// # Safety
///
/// `config_json` must be null or point to a NUL terminated string.
#[no_mangle]
pub unsafe extern "C" fn gosub_embedder_new(
    config_json: *const c_char,
    current_time: CurrentTimeCallback,
    run_task: RunTaskCallback,
) -> GosubEmbedderHandle {
    let config = match parse_config(config_json) {
        Ok(config) => config,
        Err(e) => {
            logging::init(EventLoopConfig::default().log_level);
            log::error!("Cannot create embedder: {}", e);
            return GosubEmbedderHandle(std::ptr::null_mut());
        }
    };
    logging::init(config.log_level);

    let engine = Arc::new(CEngine {
        run_task,
        engine: AtomicPtr::new(std::ptr::null_mut()),
    });
    // extern "C" fn pointers do not implement Fn, so wrap the callback
    let embedder = Embedder::new(Some(config), move || current_time(), engine.clone());

    let boxed = Box::new(FfiEmbedder { embedder, engine });
    GosubEmbedderHandle(Box::into_raw(boxed).cast())
}

/// Attaches the running engine instance passed to the run-task callback.
///
/// # Safety
///
/// `handle` must come from [`gosub_embedder_new`] and not have been freed.
#[no_mangle]
pub unsafe extern "C" fn gosub_embedder_set_engine(handle: GosubEmbedderHandle, engine: *mut c_void) -> bool {
    match embedder_from(handle.0) {
        Ok(ffi) => {
            ffi.engine.engine.store(engine, Ordering::Release);
            true
        }
        Err(e) => {
            log::error!("Cannot attach engine: {}", e);
            false
        }
    }
}

/// Task runner description for both the platform and the render runner. The handle has to
/// outlive the engine using the description.
#[no_mangle]
pub extern "C" fn gosub_embedder_task_runner(handle: GosubEmbedderHandle) -> TaskRunnerDescription {
    TaskRunnerDescription {
        struct_size: std::mem::size_of::<TaskRunnerDescription>(),
        user_data: handle.0,
        runs_task_on_current_thread_callback: runs_task_on_current_thread,
        post_task_callback: post_task,
    }
}

extern "C" fn runs_task_on_current_thread(user_data: *mut c_void) -> bool {
    match unsafe { embedder_from(user_data) } {
        Ok(ffi) => ffi.embedder.runs_tasks_on_current_thread(),
        Err(_) => false,
    }
}

extern "C" fn post_task(task: EngineTask, target_time_nanos: u64, user_data: *mut c_void) {
    match unsafe { embedder_from(user_data) } {
        Ok(ffi) => {
            ffi.embedder.post_task(task, target_time_nanos);
        }
        Err(e) => log::error!("Dropping engine task {}: {}", task.task, e),
    }
}

/// Host tick. Returns the number of engine tasks run, or -1 when the handle is null or the call
/// does not come from the platform thread.
///
/// # Safety
///
/// `handle` must come from [`gosub_embedder_new`] and not have been freed.
#[no_mangle]
pub unsafe extern "C" fn gosub_embedder_poll(handle: GosubEmbedderHandle) -> i64 {
    let res = embedder_from(handle.0).and_then(|ffi| ffi.embedder.try_poll_events());
    match res {
        Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
        Err(_) => -1,
    }
}

/// # Safety
///
/// `handle` must come from [`gosub_embedder_new`] and must not be used afterwards. The engine
/// has to be shut down first.
#[no_mangle]
pub unsafe extern "C" fn gosub_embedder_free(handle: GosubEmbedderHandle) {
    if !handle.0.is_null() {
        let _ = Box::from_raw(handle.0 as *mut FfiEmbedder);
    }
}
