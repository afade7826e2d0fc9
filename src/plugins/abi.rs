//! C ABI shared with `include/model/*.hpp`
//!
//! Plugins are C++ shared libraries. The host never touches a C++ vtable: it
//! calls the C-linkage bridge functions the headers compile into every plugin.
//! Each bridge call returns a status code (0 on success) and writes a message into
//! a caller-owned buffer on failure. Values come back through sink callbacks, so
//! no allocation made on one side of the boundary is freed on the other.
//!
//! In the other direction, plugin algorithms receive Rust structures as a
//! [`HostStructure`] table whose callbacks catch panics and report a status.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::rc::Rc;

use tracing::warn;

use crate::model::{Algorithm, DataStructure};

/// Size of the error buffer handed to bridge functions
pub const ERROR_BUFFER_LEN: usize = 512;

pub const STRUCTURE_CREATE: &str = "raystruct_structure_create";
pub const STRUCTURE_INSERT: &str = "raystruct_structure_insert";
pub const STRUCTURE_REMOVE: &str = "raystruct_structure_remove";
pub const STRUCTURE_ELEMENTS: &str = "raystruct_structure_elements";
pub const STRUCTURE_NAME: &str = "raystruct_structure_name";
pub const STRUCTURE_DESTROY: &str = "raystruct_structure_destroy";

pub const ALGORITHM_CREATE: &str = "raystruct_algorithm_create";
pub const ALGORITHM_EXECUTE: &str = "raystruct_algorithm_execute";
pub const ALGORITHM_DISPLAY: &str = "raystruct_algorithm_display";
pub const ALGORITHM_NAME: &str = "raystruct_algorithm_name";
pub const ALGORITHM_DESTROY: &str = "raystruct_algorithm_destroy";

pub type IntSink = unsafe extern "C" fn(ctx: *mut c_void, data: *const c_int, len: usize);
pub type StrSink = unsafe extern "C" fn(ctx: *mut c_void, data: *const c_char, len: usize);

/// The user's `createDataStructure` / `createAlgorithm`. Never called directly.
pub type CreateFn = unsafe extern "C" fn() -> *mut c_void;
/// Bridge that calls a [`CreateFn`] inside the header's exception guard
pub type GuardedCreateFn = unsafe extern "C" fn(
    factory: CreateFn,
    out: *mut *mut c_void,
    err: *mut c_char,
    cap: usize,
) -> c_int;
pub type DestroyFn = unsafe extern "C" fn(instance: *mut c_void);
pub type NameFn = unsafe extern "C" fn(
    instance: *const c_void,
    ctx: *mut c_void,
    sink: StrSink,
    err: *mut c_char,
    cap: usize,
) -> c_int;

pub type StructureValueFn =
    unsafe extern "C" fn(ds: *mut c_void, value: c_int, err: *mut c_char, cap: usize) -> c_int;
pub type StructureElementsFn = unsafe extern "C" fn(
    ds: *const c_void,
    ctx: *mut c_void,
    sink: IntSink,
    err: *mut c_char,
    cap: usize,
) -> c_int;

pub type AlgorithmExecuteFn = unsafe extern "C" fn(
    algo: *mut c_void,
    host: *const HostStructure,
    display: c_int,
    err: *mut c_char,
    cap: usize,
) -> c_int;
pub type AlgorithmDisplayFn = unsafe extern "C" fn(
    algo: *mut c_void,
    data: *const c_int,
    len: usize,
    err: *mut c_char,
    cap: usize,
) -> c_int;

/// Address of a resolved symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(NonNull<c_void>);

impl RawSymbol {
    /// Wrap a symbol address; `None` for null
    #[must_use]
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Address of a function, for loaders that hand out in-process symbols
    #[must_use]
    pub fn from_fn(f: *const ()) -> Option<Self> {
        Self::new(f.cast_mut().cast())
    }

    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterpret the address as a function pointer.
    ///
    /// # Safety
    /// `F` must be an `extern "C"` function pointer type matching the symbol's
    /// real signature.
    #[must_use]
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*mut c_void>());
        std::mem::transmute_copy(&self.0.as_ptr())
    }
}

/// Bridge functions of a structure plugin
#[derive(Debug, Clone, Copy)]
pub struct StructureApi {
    pub factory: CreateFn,
    pub create: GuardedCreateFn,
    pub insert: StructureValueFn,
    pub remove: StructureValueFn,
    pub elements: StructureElementsFn,
    pub name: NameFn,
    pub destroy: DestroyFn,
}

/// Bridge functions of an algorithm plugin
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmApi {
    pub factory: CreateFn,
    pub create: GuardedCreateFn,
    pub execute: AlgorithmExecuteFn,
    pub display: AlgorithmDisplayFn,
    pub name: NameFn,
    pub destroy: DestroyFn,
}

/// Keeps a cached library's entry aware of instances still using it.
///
/// The cache holds one clone; every plugin-backed instance holds another.
#[derive(Debug, Clone, Default)]
pub struct Lease(Rc<()>);

impl Lease {
    /// Instances alive besides the cache's own handle on the lease
    #[must_use]
    pub fn outstanding(&self) -> usize {
        Rc::strong_count(&self.0) - 1
    }
}

/// Run one bridge call with a fresh error buffer
fn call_bridge(f: impl FnOnce(*mut c_char, usize) -> c_int) -> Result<(), String> {
    let mut buf = [0 as c_char; ERROR_BUFFER_LEN];
    let status = f(buf.as_mut_ptr(), buf.len());
    if status == 0 {
        return Ok(());
    }
    buf[ERROR_BUFFER_LEN - 1] = 0;
    // SAFETY: the buffer is zero-initialized and its last byte forced to NUL
    let message = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy();
    if message.is_empty() {
        Err(format!("plugin call failed with status {status}"))
    } else {
        Err(message.into_owned())
    }
}

unsafe extern "C" fn collect_ints(ctx: *mut c_void, data: *const c_int, len: usize) {
    let out = &mut *ctx.cast::<Vec<i32>>();
    if !data.is_null() && len > 0 {
        out.extend_from_slice(std::slice::from_raw_parts(data, len));
    }
}

unsafe extern "C" fn collect_string(ctx: *mut c_void, data: *const c_char, len: usize) {
    let out = &mut *ctx.cast::<String>();
    if !data.is_null() && len > 0 {
        let bytes = std::slice::from_raw_parts(data.cast::<u8>(), len);
        *out = String::from_utf8_lossy(bytes).into_owned();
    }
}

/// Why a plugin factory produced no instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateFailure {
    /// The factory returned null
    Null,
    /// The factory threw; carries the exception message
    Threw(String),
}

/// Run the plugin's factory through its guarded create bridge
///
/// # Safety
/// Both functions must come from the same loaded library.
unsafe fn construct(
    factory: CreateFn,
    create: GuardedCreateFn,
) -> Result<NonNull<c_void>, CreateFailure> {
    let mut out: *mut c_void = std::ptr::null_mut();
    let slot: *mut *mut c_void = &mut out;
    call_bridge(|err, cap| create(factory, slot, err, cap)).map_err(CreateFailure::Threw)?;
    NonNull::new(out).ok_or(CreateFailure::Null)
}

fn read_name(name: NameFn, instance: *const c_void, fallback: &str) -> String {
    let mut out = String::new();
    let ctx: *mut String = &mut out;
    // SAFETY: `name` was resolved from the library that created `instance`
    let result = call_bridge(|err, cap| unsafe { name(instance, ctx.cast(), collect_string, err, cap) });
    match result {
        Ok(()) if !out.is_empty() => out,
        Ok(()) => fallback.to_string(),
        Err(e) => {
            warn!("Plugin getName failed: {}", e);
            fallback.to_string()
        }
    }
}

/// A [`DataStructure`] living inside a plugin library
pub struct PluginStructure {
    raw: NonNull<c_void>,
    api: StructureApi,
    _lease: Lease,
}

impl PluginStructure {
    /// Call the plugin's factory.
    ///
    /// # Safety
    /// `api` must have been resolved from a library that stays mapped while the
    /// returned lease (a clone of `lease`) is alive.
    pub(crate) unsafe fn create(api: StructureApi, lease: Lease) -> Result<Self, CreateFailure> {
        let raw = construct(api.factory, api.create)?;
        Ok(Self {
            raw,
            api,
            _lease: lease,
        })
    }

    fn value_call(&mut self, f: StructureValueFn, value: i32, what: &str) {
        let raw = self.raw.as_ptr();
        // SAFETY: `raw` came from this library's factory and is still alive
        if let Err(e) = call_bridge(|err, cap| unsafe { f(raw, value, err, cap) }) {
            warn!("Plugin structure {} failed: {}", what, e);
        }
    }
}

impl DataStructure for PluginStructure {
    fn insert(&mut self, value: i32) {
        self.value_call(self.api.insert, value, "insert");
    }

    fn remove(&mut self, value: i32) {
        self.value_call(self.api.remove, value, "remove");
    }

    fn elements(&self) -> Vec<i32> {
        let mut out: Vec<i32> = Vec::new();
        let ctx: *mut Vec<i32> = &mut out;
        let raw = self.raw.as_ptr();
        let elements = self.api.elements;
        // SAFETY: see `value_call`; `ctx` outlives the call
        let result =
            call_bridge(|err, cap| unsafe { elements(raw, ctx.cast(), collect_ints, err, cap) });
        if let Err(e) = result {
            warn!("Plugin structure getElements failed: {}", e);
            return Vec::new();
        }
        out
    }

    fn name(&self) -> String {
        read_name(self.api.name, self.raw.as_ptr(), "Custom Structure")
    }
}

impl Drop for PluginStructure {
    fn drop(&mut self) {
        // SAFETY: the instance is released exactly once, by the library that made it
        unsafe { (self.api.destroy)(self.raw.as_ptr()) }
    }
}

/// An [`Algorithm`] living inside a plugin library
pub struct PluginAlgorithm {
    raw: NonNull<c_void>,
    api: AlgorithmApi,
    _lease: Lease,
}

impl PluginAlgorithm {
    /// Call the plugin's factory.
    ///
    /// # Safety
    /// Same contract as [`PluginStructure::create`].
    pub(crate) unsafe fn create(api: AlgorithmApi, lease: Lease) -> Result<Self, CreateFailure> {
        let raw = construct(api.factory, api.create)?;
        Ok(Self {
            raw,
            api,
            _lease: lease,
        })
    }

    fn run(&mut self, ds: &mut dyn DataStructure, display: bool) {
        // Plugin output goes through C++ iostreams; keep ordering with ours
        let _ = std::io::stdout().flush();

        let mut ctx = HostContext { ds };
        let host = HostStructure::new(&mut ctx);
        let raw = self.raw.as_ptr();
        let execute = self.api.execute;
        // SAFETY: `host` and `ctx` outlive the call; the plugin does not keep them
        let result = call_bridge(|err, cap| unsafe {
            execute(raw, &host, c_int::from(display), err, cap)
        });
        if let Err(e) = result {
            warn!("Plugin algorithm execute failed: {}", e);
        }
    }
}

impl Algorithm for PluginAlgorithm {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        self.run(ds, false);
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        self.run(ds, true);
    }

    fn display(&mut self, elements: &[i32]) {
        let _ = std::io::stdout().flush();
        let raw = self.raw.as_ptr();
        let display = self.api.display;
        // SAFETY: the slice is valid for the duration of the call
        let result = call_bridge(|err, cap| unsafe {
            display(raw, elements.as_ptr(), elements.len(), err, cap)
        });
        if let Err(e) = result {
            warn!("Plugin algorithm display failed: {}", e);
        }
    }

    fn name(&self) -> String {
        read_name(self.api.name, self.raw.as_ptr(), "Custom Algorithm")
    }
}

impl Drop for PluginAlgorithm {
    fn drop(&mut self) {
        // SAFETY: see PluginStructure::drop
        unsafe { (self.api.destroy)(self.raw.as_ptr()) }
    }
}

/// Callback table letting plugin code drive a Rust [`DataStructure`].
///
/// Layout matches `raystruct_host_structure` in `Algorithm.hpp`.
#[repr(C)]
pub struct HostStructure {
    ctx: *mut c_void,
    insert: unsafe extern "C" fn(ctx: *mut c_void, value: c_int) -> c_int,
    remove: unsafe extern "C" fn(ctx: *mut c_void, value: c_int) -> c_int,
    elements: unsafe extern "C" fn(ctx: *mut c_void, out: *mut c_void, sink: IntSink) -> c_int,
    name: unsafe extern "C" fn(ctx: *mut c_void, out: *mut c_void, sink: StrSink) -> c_int,
}

/// Thin pointer target for the host table; `&mut dyn` itself is a fat pointer
pub struct HostContext<'a> {
    pub ds: &'a mut dyn DataStructure,
}

impl HostStructure {
    pub fn new(ctx: &mut HostContext<'_>) -> Self {
        Self {
            ctx: (ctx as *mut HostContext<'_>).cast(),
            insert: host_insert,
            remove: host_remove,
            elements: host_elements,
            name: host_name,
        }
    }

    /// Insert through the table, as plugin code would
    ///
    /// # Safety
    /// The context the table was built from must still be alive.
    #[cfg(test)]
    pub(crate) unsafe fn insert(&self, value: i32) -> i32 {
        (self.insert)(self.ctx, value)
    }

    /// List elements through the table, as plugin code would
    ///
    /// # Safety
    /// The context the table was built from must still be alive.
    #[cfg(test)]
    pub(crate) unsafe fn elements(&self) -> Option<Vec<i32>> {
        let mut out: Vec<i32> = Vec::new();
        let status = (self.elements)(self.ctx, (&mut out as *mut Vec<i32>).cast(), collect_ints);
        (status == 0).then_some(out)
    }
}

/// Run `f` against the host structure, mapping a panic to status 1
unsafe fn with_host(ctx: *mut c_void, f: impl FnOnce(&mut dyn DataStructure)) -> c_int {
    let host = &mut *ctx.cast::<HostContext<'_>>();
    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *host.ds))) {
        Ok(()) => 0,
        Err(_) => {
            warn!("Host structure panicked inside a plugin callback");
            1
        }
    }
}

unsafe extern "C" fn host_insert(ctx: *mut c_void, value: c_int) -> c_int {
    with_host(ctx, |ds| ds.insert(value))
}

unsafe extern "C" fn host_remove(ctx: *mut c_void, value: c_int) -> c_int {
    with_host(ctx, |ds| ds.remove(value))
}

unsafe extern "C" fn host_elements(ctx: *mut c_void, out: *mut c_void, sink: IntSink) -> c_int {
    with_host(ctx, |ds| {
        let values = ds.elements();
        sink(out, values.as_ptr(), values.len());
    })
}

unsafe extern "C" fn host_name(ctx: *mut c_void, out: *mut c_void, sink: StrSink) -> c_int {
    with_host(ctx, |ds| {
        let name = ds.name();
        sink(out, name.as_ptr().cast(), name.len());
    })
}
