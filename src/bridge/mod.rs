use duckdb::vtab::Value;
use libduckdb_sys::{
    duckdb_free, duckdb_get_bool, duckdb_get_double, duckdb_get_int64, duckdb_get_list_child,
    duckdb_get_list_size, duckdb_get_varchar, duckdb_value,
};
use std::{ffi::CStr, os::raw::c_void};

/// Typed access to the parameter values DuckDB hands to a table function.
///
/// `duckdb::vtab::Value` only exposes its contents through `Display`, so this
/// trait reaches the underlying `duckdb_value` and reads it with the C API.
///
/// # Safety Warning
///
/// [`ValueBridge::get_value_ptr`] relies on `Value` being a plain wrapper
/// around a single `duckdb_value` pointer. That layout is an implementation
/// detail of duckdb-rs and must be re-checked whenever the dependency is
/// upgraded.
pub(crate) trait ValueBridge {
    /// Extracts the raw `duckdb_value` pointer from the `Value` struct.
    ///
    /// # Safety
    ///
    /// The returned pointer is only valid while `self` is alive, and only if
    /// `size_of::<Value>() == size_of::<duckdb_value>()` holds for the
    /// duckdb-rs version in use.
    unsafe fn get_value_ptr(&self) -> duckdb_value;

    /// Returns the value as a boolean
    fn to_bool(&self) -> bool {
        unsafe { duckdb_get_bool(self.get_value_ptr()) }
    }

    /// Returns the value as a int64
    fn to_int64(&self) -> i64 {
        unsafe { duckdb_get_int64(self.get_value_ptr()) }
    }

    /// Returns the value as a double
    fn to_double(&self) -> f64 {
        unsafe { duckdb_get_double(self.get_value_ptr()) }
    }

    /// Returns the value as a String
    fn to_varchar(&self) -> String {
        unsafe {
            let varchar = duckdb_get_varchar(self.get_value_ptr());
            let c_str = CStr::from_ptr(varchar);
            let string = c_str.to_string_lossy().into_owned();
            duckdb_free(varchar as *mut c_void);
            string
        }
    }

    /// Returns the value as a list
    fn to_list(&self) -> Vec<Value> {
        unsafe {
            let size = duckdb_get_list_size(self.get_value_ptr());
            (0..size)
                .map(|index| Value::from(duckdb_get_list_child(self.get_value_ptr(), index)))
                .collect()
        }
    }
}

impl ValueBridge for Value {
    /// # DANGER: memory layout hack
    ///
    /// Reinterprets the `Value` as the single `duckdb_value` field it wraps.
    unsafe fn get_value_ptr(&self) -> duckdb_value {
        *(self as *const Value as *const duckdb_value)
    }
}
