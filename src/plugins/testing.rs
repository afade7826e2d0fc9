//! In-process stand-ins for plugin libraries, for unit tests
//!
//! `FakeLoader` hands out the addresses of the `extern "C"` functions below
//! instead of symbols from a real shared library, so the whole
//! factory → cache → loader → instance path runs without a toolchain.

use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::abi::{self, CreateFn, HostStructure, IntSink, RawSymbol, StrSink};
use super::loader::DynamicLoader;

thread_local! {
    static DESTROYED: Cell<usize> = const { Cell::new(0) };
}

/// Plugin objects destroyed on this thread so far
pub fn destroyed() -> usize {
    DESTROYED.with(Cell::get)
}

#[derive(Debug, Default)]
pub struct Calls {
    pub opens: Cell<usize>,
    pub resolves: Cell<usize>,
    pub closes: Cell<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeLoader {
    pub calls: Rc<Calls>,
    pub fail_open: bool,
    pub fail_close: bool,
    pub missing_symbol: Option<&'static str>,
    pub null_factory: bool,
    /// The create bridge reports the factory as having thrown
    pub throwing_factory: bool,
}

#[derive(Debug)]
pub struct FakeHandle(pub PathBuf);

impl DynamicLoader for FakeLoader {
    type Handle = FakeHandle;

    fn open(&self, path: &Path) -> Result<FakeHandle, String> {
        self.calls.opens.set(self.calls.opens.get() + 1);
        if self.fail_open {
            return Err("cannot open shared object file".to_string());
        }
        Ok(FakeHandle(path.to_path_buf()))
    }

    fn resolve_symbol(&self, _handle: &FakeHandle, name: &str) -> Result<RawSymbol, String> {
        self.calls.resolves.set(self.calls.resolves.get() + 1);
        if self.missing_symbol == Some(name) {
            return Err(format!("undefined symbol: {name}"));
        }
        let address = match name {
            "createDataStructure" if self.null_factory => create_null as *const (),
            "createDataStructure" => bag_create as *const (),
            abi::STRUCTURE_CREATE | abi::ALGORITHM_CREATE if self.throwing_factory => {
                create_threw as *const ()
            }
            abi::STRUCTURE_CREATE | abi::ALGORITHM_CREATE => guarded_create as *const (),
            abi::STRUCTURE_INSERT => bag_insert as *const (),
            abi::STRUCTURE_REMOVE => bag_remove as *const (),
            abi::STRUCTURE_ELEMENTS => bag_elements as *const (),
            abi::STRUCTURE_NAME => bag_name as *const (),
            abi::STRUCTURE_DESTROY => bag_destroy as *const (),
            "createAlgorithm" if self.null_factory => create_null as *const (),
            "createAlgorithm" => summer_create as *const (),
            abi::ALGORITHM_EXECUTE => summer_execute as *const (),
            abi::ALGORITHM_DISPLAY => summer_display as *const (),
            abi::ALGORITHM_NAME => summer_name as *const (),
            abi::ALGORITHM_DESTROY => summer_destroy as *const (),
            _ => return Err(format!("undefined symbol: {name}")),
        };
        RawSymbol::from_fn(address).ok_or_else(|| format!("null symbol {name}"))
    }

    fn close(&self, _handle: FakeHandle) -> Result<(), String> {
        self.calls.closes.set(self.calls.closes.get() + 1);
        if self.fail_close {
            return Err("handle busy".to_string());
        }
        Ok(())
    }
}

unsafe fn write_error(err: *mut c_char, cap: usize, message: &str) {
    let len = message.len().min(cap.saturating_sub(1));
    std::ptr::copy_nonoverlapping(message.as_ptr().cast::<c_char>(), err, len);
    *err.add(len) = 0;
}

unsafe extern "C" fn create_null() -> *mut c_void {
    std::ptr::null_mut()
}

unsafe extern "C" fn guarded_create(
    factory: CreateFn,
    out: *mut *mut c_void,
    _err: *mut c_char,
    _cap: usize,
) -> c_int {
    *out = factory();
    0
}

unsafe extern "C" fn create_threw(
    _factory: CreateFn,
    _out: *mut *mut c_void,
    err: *mut c_char,
    cap: usize,
) -> c_int {
    write_error(err, cap, "constructor failed");
    1
}

// "Fake Bag": a Vec<i32> structure

unsafe extern "C" fn bag_create() -> *mut c_void {
    Box::into_raw(Box::new(Vec::<i32>::new())).cast()
}

unsafe extern "C" fn bag_insert(ds: *mut c_void, value: c_int, _err: *mut c_char, _cap: usize) -> c_int {
    (*ds.cast::<Vec<i32>>()).push(value);
    0
}

unsafe extern "C" fn bag_remove(ds: *mut c_void, value: c_int, err: *mut c_char, cap: usize) -> c_int {
    let bag = &mut *ds.cast::<Vec<i32>>();
    match bag.iter().position(|v| *v == value) {
        Some(index) => {
            bag.remove(index);
            0
        }
        None => {
            write_error(err, cap, "value not present");
            1
        }
    }
}

unsafe extern "C" fn bag_elements(
    ds: *const c_void,
    ctx: *mut c_void,
    sink: IntSink,
    _err: *mut c_char,
    _cap: usize,
) -> c_int {
    let bag = &*ds.cast::<Vec<i32>>();
    sink(ctx, bag.as_ptr(), bag.len());
    0
}

unsafe extern "C" fn bag_name(
    _ds: *const c_void,
    ctx: *mut c_void,
    sink: StrSink,
    _err: *mut c_char,
    _cap: usize,
) -> c_int {
    let name = "Fake Bag";
    sink(ctx, name.as_ptr().cast(), name.len());
    0
}

unsafe extern "C" fn bag_destroy(ds: *mut c_void) {
    drop(Box::from_raw(ds.cast::<Vec<i32>>()));
    DESTROYED.with(|d| d.set(d.get() + 1));
}

// "Fake Summer": appends the sum of the structure's elements

unsafe extern "C" fn summer_create() -> *mut c_void {
    Box::into_raw(Box::new(0usize)).cast()
}

unsafe extern "C" fn summer_execute(
    algo: *mut c_void,
    host: *const HostStructure,
    _display: c_int,
    err: *mut c_char,
    cap: usize,
) -> c_int {
    let host = &*host;
    let Some(values) = host.elements() else {
        write_error(err, cap, "host elements failed");
        return 1;
    };
    if host.insert(values.iter().sum()) != 0 {
        write_error(err, cap, "host insert failed");
        return 1;
    }
    *algo.cast::<usize>() += 1;
    0
}

unsafe extern "C" fn summer_display(
    _algo: *mut c_void,
    _data: *const c_int,
    _len: usize,
    _err: *mut c_char,
    _cap: usize,
) -> c_int {
    0
}

unsafe extern "C" fn summer_name(
    _algo: *const c_void,
    ctx: *mut c_void,
    sink: StrSink,
    _err: *mut c_char,
    _cap: usize,
) -> c_int {
    let name = "Fake Summer";
    sink(ctx, name.as_ptr().cast(), name.len());
    0
}

unsafe extern "C" fn summer_destroy(algo: *mut c_void) {
    drop(Box::from_raw(algo.cast::<usize>()));
    DESTROYED.with(|d| d.set(d.get() + 1));
}
