use std::ffi::{c_char, c_void};

pub const DISPATCH_QUEUE_SERIAL: *const c_void = std::ptr::null();

#[link(name = "System", kind = "dylib")]
unsafe extern "C" {
    pub fn dispatch_queue_create(label: *const c_char, attr: *const c_void) -> *mut c_void;
}
