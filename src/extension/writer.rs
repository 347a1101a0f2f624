//! Writers for filling DuckDB output vectors.
use duckdb::core::FlatVector;
use duckdb::core::Inserter;

/// Writes a primitive value directly to a vector using pointer arithmetic.
/// The vector's physical type must match `T`.
pub(super) fn write_primitive<T>(vector: &mut FlatVector, index: usize, value: T) {
    let pointer: *mut T = vector.as_mut_ptr();
    unsafe {
        std::ptr::write(pointer.add(index), value);
    }
}

/// Writes a primitive value, or NULL when absent.
pub(super) fn write_optional<T>(vector: &mut FlatVector, index: usize, value: Option<T>) {
    match value {
        Some(value) => write_primitive(vector, index, value),
        None => vector.set_null(index),
    }
}

/// Writes a string value, or NULL when absent.
pub(super) fn write_varchar(vector: &mut FlatVector, index: usize, value: Option<&String>) {
    match value {
        Some(value) => vector.insert(index, value),
        None => vector.set_null(index),
    }
}
