use std::ffi::{c_char, CStr};
use crate::error::VciError;

#[inline]
pub fn c_str_to_string(src: *const c_char) -> Result<String, VciError> {
    if src.is_null() {
        Err(VciError::InvalidArgument("null pointer".to_string()))
    } else {
        let c_str = unsafe { CStr::from_ptr(src) };
        let s_slice = c_str.to_str().map_err(|e| VciError::InvalidArgument(e.to_string()))?;

        Ok(String::from(s_slice))
    }
}

#[inline]
pub(crate) fn c_bool(value: bool) -> i32 {
    if value { 1 } else { 0 }
}
