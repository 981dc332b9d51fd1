//! Native decoder backed by libopenmpt.
//!
//! Thin binding over the libopenmpt C API. The library is linked from the
//! system (`libopenmpt.so` / `openmpt.lib`); only the handful of entry points
//! the player needs are declared.

use super::{DecoderEngine, DecoderFault, ModuleDecoder};
use crate::error::{DecoderError, PlayerError, Result};
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

#[allow(non_camel_case_types)]
#[repr(C)]
struct openmpt_module {
    _private: [u8; 0],
}

type LogFunc = Option<unsafe extern "C" fn(message: *const c_char, user: *mut c_void)>;
type ErrorFunc = Option<unsafe extern "C" fn(error: c_int, user: *mut c_void) -> c_int>;

const ERROR_OK: c_int = 0;
/// Error callback verdict: keep the error for `openmpt_module_error_get_last`.
const ERROR_FUNC_RESULT_STORE: c_int = 2;

#[link(name = "openmpt")]
extern "C" {
    fn openmpt_get_library_version() -> u32;
    fn openmpt_free_string(text: *const c_char);
    fn openmpt_error_string(error: c_int) -> *const c_char;

    fn openmpt_module_create_from_memory2(
        filedata: *const c_void,
        filesize: usize,
        logfunc: LogFunc,
        loguser: *mut c_void,
        errfunc: ErrorFunc,
        erruser: *mut c_void,
        error: *mut c_int,
        error_message: *mut *const c_char,
        ctls: *const c_void,
    ) -> *mut openmpt_module;
    fn openmpt_module_destroy(module: *mut openmpt_module);

    fn openmpt_module_error_get_last(module: *mut openmpt_module) -> c_int;
    fn openmpt_module_error_clear(module: *mut openmpt_module);

    fn openmpt_module_get_num_channels(module: *mut openmpt_module) -> i32;
    fn openmpt_module_read_float_stereo(
        module: *mut openmpt_module,
        samplerate: i32,
        count: usize,
        left: *mut f32,
        right: *mut f32,
    ) -> usize;
    fn openmpt_module_get_current_pattern(module: *mut openmpt_module) -> i32;
    fn openmpt_module_get_current_row(module: *mut openmpt_module) -> i32;
    fn openmpt_module_get_num_patterns(module: *mut openmpt_module) -> i32;
    fn openmpt_module_get_pattern_num_rows(module: *mut openmpt_module, pattern: i32) -> i32;
    fn openmpt_module_get_duration_seconds(module: *mut openmpt_module) -> f64;
    fn openmpt_module_get_position_seconds(module: *mut openmpt_module) -> f64;
    fn openmpt_module_set_position_seconds(module: *mut openmpt_module, seconds: f64) -> f64;
    fn openmpt_module_set_repeat_count(module: *mut openmpt_module, repeat_count: i32) -> c_int;
    fn openmpt_module_get_metadata_keys(module: *mut openmpt_module) -> *const c_char;
    fn openmpt_module_get_metadata(
        module: *mut openmpt_module,
        key: *const c_char,
    ) -> *const c_char;
    fn openmpt_module_format_pattern_row_channel(
        module: *mut openmpt_module,
        pattern: i32,
        row: i32,
        channel: i32,
        width: usize,
        pad: c_int,
    ) -> *const c_char;
}

/// Oldest library release exposing every entry point above.
const MIN_VERSION: (u32, u32) = (0, 3);

static LIBRARY_VERSION: OnceLock<u32> = OnceLock::new();

/// Copy a library-owned string and free it.
///
/// # Safety
/// `text` must be null or a string returned by libopenmpt that the caller
/// owns.
unsafe fn take_string(text: *const c_char) -> String {
    if text.is_null() {
        return String::new();
    }
    let owned = CStr::from_ptr(text).to_string_lossy().into_owned();
    openmpt_free_string(text);
    owned
}

unsafe extern "C" fn log_to_tracing(message: *const c_char, _user: *mut c_void) {
    if !message.is_null() {
        let message = CStr::from_ptr(message).to_string_lossy();
        tracing::debug!(target: "openmpt", "{message}");
    }
}

unsafe extern "C" fn store_errors(_error: c_int, _user: *mut c_void) -> c_int {
    ERROR_FUNC_RESULT_STORE
}

/// libopenmpt version as `(major, minor, patch)`.
pub fn library_version() -> (u32, u32, u32) {
    let raw = *LIBRARY_VERSION.get_or_init(|| unsafe { openmpt_get_library_version() });
    (raw >> 24, (raw >> 16) & 0xff, raw & 0xffff)
}

/// Process-wide libopenmpt engine.
#[derive(Debug, Clone, Copy)]
pub struct OpenMptEngine {
    version: (u32, u32, u32),
}

impl OpenMptEngine {
    /// Check that the linked library is usable.
    pub fn initialize() -> Result<Self> {
        let version = library_version();
        if (version.0, version.1) < MIN_VERSION {
            return Err(PlayerError::Engine(format!(
                "libopenmpt {}.{}.{} is too old, need {}.{} or newer",
                version.0, version.1, version.2, MIN_VERSION.0, MIN_VERSION.1
            )));
        }
        tracing::debug!(?version, "libopenmpt initialised");
        Ok(Self { version })
    }

    /// Version of the linked library.
    pub fn version(&self) -> (u32, u32, u32) {
        self.version
    }
}

impl DecoderEngine for OpenMptEngine {
    type Decoder = OpenMptModule;

    fn create(&self, bytes: &[u8]) -> std::result::Result<OpenMptModule, DecoderError> {
        if bytes.is_empty() {
            return Err(DecoderError::Empty);
        }

        let mut error: c_int = ERROR_OK;
        let mut message: *const c_char = ptr::null();
        // SAFETY: `bytes` outlives the call; libopenmpt copies what it keeps.
        let raw = unsafe {
            openmpt_module_create_from_memory2(
                bytes.as_ptr().cast(),
                bytes.len(),
                Some(log_to_tracing),
                ptr::null_mut(),
                Some(store_errors),
                ptr::null_mut(),
                &mut error,
                &mut message,
                ptr::null(),
            )
        };
        // SAFETY: the message, if any, is ours to free.
        let message = unsafe { take_string(message) };

        NonNull::new(raw)
            .map(|module| OpenMptModule { module })
            .ok_or_else(|| {
                let reason = if message.is_empty() {
                    // SAFETY: error strings are owned by the caller.
                    unsafe { take_string(openmpt_error_string(error)) }
                } else {
                    message
                };
                DecoderError::Invalid(reason)
            })
    }
}

/// One loaded module.
pub struct OpenMptModule {
    module: NonNull<openmpt_module>,
}

// SAFETY: a module handle may be used from any thread as long as calls are
// not concurrent, which `&mut`/ownership already guarantees.
unsafe impl Send for OpenMptModule {}

impl OpenMptModule {
    fn raw(&self) -> *mut openmpt_module {
        self.module.as_ptr()
    }

    fn take_last_error(&self) -> Option<String> {
        // SAFETY: the handle is live for the lifetime of `self`.
        unsafe {
            let error = openmpt_module_error_get_last(self.raw());
            if error == ERROR_OK {
                return None;
            }
            openmpt_module_error_clear(self.raw());
            Some(take_string(openmpt_error_string(error)))
        }
    }
}

impl ModuleDecoder for OpenMptModule {
    fn num_channels(&self) -> i32 {
        unsafe { openmpt_module_get_num_channels(self.raw()) }
    }

    fn read_float_stereo(
        &mut self,
        sample_rate: u32,
        left: &mut [f32],
        right: &mut [f32],
    ) -> std::result::Result<usize, DecoderFault> {
        let count = left.len().min(right.len());
        let sample_rate = i32::try_from(sample_rate)
            .map_err(|_| DecoderFault(format!("sample rate {sample_rate} out of range")))?;
        // SAFETY: both buffers hold at least `count` floats.
        let frames = unsafe {
            // A stale error from an earlier call must not turn a clean end
            // into a fault.
            openmpt_module_error_clear(self.raw());
            openmpt_module_read_float_stereo(
                self.raw(),
                sample_rate,
                count,
                left.as_mut_ptr(),
                right.as_mut_ptr(),
            )
        };
        if frames == 0 {
            if let Some(reason) = self.take_last_error() {
                return Err(DecoderFault(reason));
            }
        }
        Ok(frames)
    }

    fn current_pattern(&self) -> i32 {
        unsafe { openmpt_module_get_current_pattern(self.raw()) }
    }

    fn current_row(&self) -> i32 {
        unsafe { openmpt_module_get_current_row(self.raw()) }
    }

    fn num_patterns(&self) -> i32 {
        unsafe { openmpt_module_get_num_patterns(self.raw()) }
    }

    fn pattern_num_rows(&self, pattern: i32) -> i32 {
        unsafe { openmpt_module_get_pattern_num_rows(self.raw(), pattern) }
    }

    fn duration_seconds(&self) -> f64 {
        unsafe { openmpt_module_get_duration_seconds(self.raw()) }
    }

    fn position_seconds(&self) -> f64 {
        unsafe { openmpt_module_get_position_seconds(self.raw()) }
    }

    fn set_position_seconds(&mut self, seconds: f64) {
        unsafe {
            openmpt_module_set_position_seconds(self.raw(), seconds);
        }
    }

    fn set_repeat_count(&mut self, repeat_count: i32) {
        unsafe {
            openmpt_module_set_repeat_count(self.raw(), repeat_count);
        }
    }

    fn metadata_keys(&self) -> String {
        unsafe { take_string(openmpt_module_get_metadata_keys(self.raw())) }
    }

    fn metadata(&self, key: &str) -> String {
        let Ok(key) = CString::new(key) else {
            return String::new();
        };
        unsafe { take_string(openmpt_module_get_metadata(self.raw(), key.as_ptr())) }
    }

    fn format_pattern_row_channel(
        &self,
        pattern: i32,
        row: i32,
        channel: i32,
        width: usize,
        pad: bool,
    ) -> String {
        unsafe {
            take_string(openmpt_module_format_pattern_row_channel(
                self.raw(),
                pattern,
                row,
                channel,
                width,
                c_int::from(pad),
            ))
        }
    }
}

impl Drop for OpenMptModule {
    fn drop(&mut self) {
        // SAFETY: the handle came from create and is destroyed only here.
        unsafe { openmpt_module_destroy(self.raw()) }
    }
}
