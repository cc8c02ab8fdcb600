//! libsndfile engine
//!
//! Binds the system libsndfile directly. Enabled with the `libsndfile`
//! feature; the library must be installed where the linker can find it.

use std::ffi::{CStr, CString};
use std::mem;
use std::os::raw::{c_char, c_double, c_float, c_int, c_short, c_void};
use std::ptr::{self, NonNull};

use log::{debug, warn};

use crate::engine::{Catalog, Engine, EngineHandle, ErrorCode, OpenMode, StreamInfo, Whence};
use crate::format::{FormatCode, FormatRecord};
use crate::metadata::Tag;

type SfCount = i64;

#[repr(C)]
struct Sndfile {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Default)]
struct SfInfo {
    frames: SfCount,
    samplerate: c_int,
    channels: c_int,
    format: c_int,
    sections: c_int,
    seekable: c_int,
}

#[repr(C)]
struct SfFormatInfo {
    format: c_int,
    name: *const c_char,
    extension: *const c_char,
}

const SFM_READ: c_int = 0x10;
const SFM_WRITE: c_int = 0x20;

const SF_SEEK_SET: c_int = 0;
const SF_SEEK_CUR: c_int = 1;
const SF_SEEK_END: c_int = 2;

const SFC_GET_SIMPLE_FORMAT_COUNT: c_int = 0x1020;
const SFC_GET_SIMPLE_FORMAT: c_int = 0x1021;
const SFC_GET_FORMAT_INFO: c_int = 0x1028;
const SFC_GET_FORMAT_MAJOR_COUNT: c_int = 0x1030;
const SFC_GET_FORMAT_MAJOR: c_int = 0x1031;
const SFC_GET_FORMAT_SUBTYPE_COUNT: c_int = 0x1032;
const SFC_GET_FORMAT_SUBTYPE: c_int = 0x1033;

#[link(name = "sndfile")]
extern "C" {
    fn sf_open(path: *const c_char, mode: c_int, sfinfo: *mut SfInfo) -> *mut Sndfile;
    fn sf_error(sndfile: *mut Sndfile) -> c_int;
    fn sf_error_number(errnum: c_int) -> *const c_char;
    fn sf_format_check(info: *const SfInfo) -> c_int;
    fn sf_seek(sndfile: *mut Sndfile, frames: SfCount, whence: c_int) -> SfCount;
    fn sf_readf_short(sndfile: *mut Sndfile, ptr: *mut c_short, frames: SfCount) -> SfCount;
    fn sf_readf_int(sndfile: *mut Sndfile, ptr: *mut c_int, frames: SfCount) -> SfCount;
    fn sf_readf_float(sndfile: *mut Sndfile, ptr: *mut c_float, frames: SfCount) -> SfCount;
    fn sf_readf_double(sndfile: *mut Sndfile, ptr: *mut c_double, frames: SfCount) -> SfCount;
    fn sf_writef_short(sndfile: *mut Sndfile, ptr: *const c_short, frames: SfCount) -> SfCount;
    fn sf_writef_int(sndfile: *mut Sndfile, ptr: *const c_int, frames: SfCount) -> SfCount;
    fn sf_writef_float(sndfile: *mut Sndfile, ptr: *const c_float, frames: SfCount) -> SfCount;
    fn sf_writef_double(sndfile: *mut Sndfile, ptr: *const c_double, frames: SfCount) -> SfCount;
    fn sf_get_string(sndfile: *mut Sndfile, str_type: c_int) -> *const c_char;
    fn sf_set_string(sndfile: *mut Sndfile, str_type: c_int, string: *const c_char) -> c_int;
    fn sf_current_byterate(sndfile: *mut Sndfile) -> c_int;
    fn sf_command(sndfile: *mut Sndfile, cmd: c_int, data: *mut c_void, datasize: c_int) -> c_int;
    fn sf_close(sndfile: *mut Sndfile) -> c_int;
    fn sf_version_string() -> *const c_char;
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

fn to_sf_info(info: &StreamInfo) -> Option<SfInfo> {
    Some(SfInfo {
        frames: i64::try_from(info.frames).ok()?,
        samplerate: c_int::try_from(info.sample_rate).ok()?,
        channels: c_int::try_from(info.channels).ok()?,
        format: info.format.value() as c_int,
        sections: 0,
        seekable: info.seekable as c_int,
    })
}

fn from_sf_info(info: &SfInfo) -> StreamInfo {
    StreamInfo {
        frames: info.frames.max(0) as u64,
        sample_rate: info.samplerate.max(0) as u32,
        channels: info.channels.max(0) as usize,
        format: FormatCode::new(info.format as u32),
        seekable: info.seekable != 0,
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The system libsndfile
#[derive(Debug, Default)]
pub struct SndfileEngine;

impl SndfileEngine {
    pub fn new() -> Self {
        SndfileEngine
    }

    fn command_int(&self, cmd: c_int) -> c_int {
        let mut value: c_int = 0;
        // SAFETY: count commands write one c_int into `data`.
        unsafe {
            sf_command(
                ptr::null_mut(),
                cmd,
                &mut value as *mut c_int as *mut c_void,
                mem::size_of::<c_int>() as c_int,
            );
        }
        value
    }

    fn command_format(&self, cmd: c_int, format: c_int) -> Option<FormatRecord> {
        let mut info = SfFormatInfo {
            format,
            name: ptr::null(),
            extension: ptr::null(),
        };
        // SAFETY: format commands fill an SF_FORMAT_INFO with pointers to
        // static strings owned by the library.
        unsafe {
            let status = sf_command(
                ptr::null_mut(),
                cmd,
                &mut info as *mut SfFormatInfo as *mut c_void,
                mem::size_of::<SfFormatInfo>() as c_int,
            );
            if status != 0 {
                return None;
            }
            Some(FormatRecord {
                format: FormatCode::new(info.format as u32),
                name: owned_string(info.name)?,
                extension: owned_string(info.extension),
            })
        }
    }
}

impl Engine for SndfileEngine {
    fn name(&self) -> &'static str {
        "libsndfile"
    }

    fn version(&self) -> String {
        // SAFETY: returns a static string.
        unsafe { owned_string(sf_version_string()) }.unwrap_or_default()
    }

    fn open(
        &self,
        name: &[u8],
        mode: OpenMode,
        info: &mut StreamInfo,
    ) -> Result<Box<dyn EngineHandle>, ErrorCode> {
        let path = CString::new(name).map_err(|_| ErrorCode::SYSTEM)?;
        let mut sf_info = to_sf_info(info).ok_or(ErrorCode::SYSTEM)?;
        let sf_mode = match mode {
            OpenMode::Read => SFM_READ,
            OpenMode::Write => SFM_WRITE,
        };

        // SAFETY: `path` is NUL-terminated and `sf_info` is a valid SF_INFO.
        let raw = unsafe { sf_open(path.as_ptr(), sf_mode, &mut sf_info) };
        match NonNull::new(raw) {
            Some(ptr) => {
                *info = from_sf_info(&sf_info);
                Ok(Box::new(SndfileHandle {
                    ptr: Some(ptr),
                    channels: info.channels,
                }))
            }
            None => {
                // SAFETY: a null handle asks for the global error state.
                let code = unsafe { sf_error(ptr::null_mut()) };
                Err(ErrorCode(code))
            }
        }
    }

    fn error_message(&self, code: ErrorCode) -> String {
        // SAFETY: returns a static string for any code.
        unsafe { owned_string(sf_error_number(code.0)) }.unwrap_or_default()
    }

    fn format_check(&self, info: &StreamInfo) -> bool {
        match to_sf_info(info) {
            // SAFETY: reads the SF_INFO only.
            Some(sf_info) => unsafe { sf_format_check(&sf_info) != 0 },
            None => false,
        }
    }

    fn format_count(&self, catalog: Catalog) -> usize {
        let cmd = match catalog {
            Catalog::Simple => SFC_GET_SIMPLE_FORMAT_COUNT,
            Catalog::Major => SFC_GET_FORMAT_MAJOR_COUNT,
            Catalog::Subtype => SFC_GET_FORMAT_SUBTYPE_COUNT,
        };
        self.command_int(cmd).max(0) as usize
    }

    fn format_entry(&self, catalog: Catalog, index: usize) -> Option<FormatRecord> {
        let cmd = match catalog {
            Catalog::Simple => SFC_GET_SIMPLE_FORMAT,
            Catalog::Major => SFC_GET_FORMAT_MAJOR,
            Catalog::Subtype => SFC_GET_FORMAT_SUBTYPE,
        };
        self.command_format(cmd, c_int::try_from(index).ok()?)
    }

    fn format_info(&self, code: FormatCode) -> Option<FormatRecord> {
        self.command_format(SFC_GET_FORMAT_INFO, code.value() as c_int)
    }
}

// ============================================================================
// Handle
// ============================================================================

struct SndfileHandle {
    ptr: Option<NonNull<Sndfile>>,
    channels: usize,
}

// SAFETY: a SNDFILE is only touched through `&mut self` or `&self` of its
// single owner, never from two threads at once.
unsafe impl Send for SndfileHandle {}

impl SndfileHandle {
    fn raw(&self) -> *mut Sndfile {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Frames that fit in a buffer of `len` samples
    fn capped(&self, len: usize, frames: usize) -> SfCount {
        frames.min(len / self.channels.max(1)) as SfCount
    }
}

macro_rules! transfer {
    ($self:ident, $call:ident, $buffer:ident, $ptr:ident, $frames:expr) => {{
        if $self.ptr.is_none() {
            return 0;
        }
        let frames = $self.capped($buffer.len(), $frames);
        // SAFETY: `frames` is capped to what the buffer holds.
        let count = unsafe { $call($self.raw(), $buffer.$ptr(), frames) };
        count.max(0) as usize
    }};
}

impl EngineHandle for SndfileHandle {
    fn seek(&mut self, frames: i64, whence: Whence) -> i64 {
        if self.ptr.is_none() {
            return -1;
        }
        let whence = match whence {
            Whence::Set => SF_SEEK_SET,
            Whence::Current => SF_SEEK_CUR,
            Whence::End => SF_SEEK_END,
        };
        // SAFETY: handle is open.
        unsafe { sf_seek(self.raw(), frames, whence) }
    }

    fn readf_i16(&mut self, buffer: &mut [i16], frames: usize) -> usize {
        transfer!(self, sf_readf_short, buffer, as_mut_ptr, frames)
    }

    fn readf_i32(&mut self, buffer: &mut [i32], frames: usize) -> usize {
        transfer!(self, sf_readf_int, buffer, as_mut_ptr, frames)
    }

    fn readf_f32(&mut self, buffer: &mut [f32], frames: usize) -> usize {
        transfer!(self, sf_readf_float, buffer, as_mut_ptr, frames)
    }

    fn readf_f64(&mut self, buffer: &mut [f64], frames: usize) -> usize {
        transfer!(self, sf_readf_double, buffer, as_mut_ptr, frames)
    }

    fn writef_i16(&mut self, buffer: &[i16], frames: usize) -> usize {
        transfer!(self, sf_writef_short, buffer, as_ptr, frames)
    }

    fn writef_i32(&mut self, buffer: &[i32], frames: usize) -> usize {
        transfer!(self, sf_writef_int, buffer, as_ptr, frames)
    }

    fn writef_f32(&mut self, buffer: &[f32], frames: usize) -> usize {
        transfer!(self, sf_writef_float, buffer, as_ptr, frames)
    }

    fn writef_f64(&mut self, buffer: &[f64], frames: usize) -> usize {
        transfer!(self, sf_writef_double, buffer, as_ptr, frames)
    }

    fn get_string(&self, tag: Tag) -> Option<Vec<u8>> {
        self.ptr?;
        // SAFETY: the returned string stays valid until the next string
        // call on this handle and is copied right away.
        unsafe {
            let value = sf_get_string(self.raw(), tag.id());
            if value.is_null() {
                None
            } else {
                Some(CStr::from_ptr(value).to_bytes().to_vec())
            }
        }
    }

    fn set_string(&mut self, tag: Tag, value: &[u8]) -> Result<(), ErrorCode> {
        if self.ptr.is_none() {
            return Err(ErrorCode::SYSTEM);
        }
        let value = CString::new(value).map_err(|_| ErrorCode::SYSTEM)?;
        // SAFETY: handle is open and `value` is NUL-terminated.
        match unsafe { sf_set_string(self.raw(), tag.id(), value.as_ptr()) } {
            0 => Ok(()),
            code => Err(ErrorCode(code)),
        }
    }

    fn byte_rate(&self) -> Option<u32> {
        self.ptr?;
        // SAFETY: handle is open.
        let rate = unsafe { sf_current_byterate(self.raw()) };
        u32::try_from(rate).ok().filter(|rate| *rate > 0)
    }

    fn close(&mut self) -> Result<(), ErrorCode> {
        let ptr = match self.ptr.take() {
            Some(ptr) => ptr,
            None => return Ok(()),
        };
        // SAFETY: `ptr` came from sf_open and is closed exactly once.
        match unsafe { sf_close(ptr.as_ptr()) } {
            0 => Ok(()),
            code => {
                warn!("sf_close failed with code {}", code);
                Err(ErrorCode(code))
            }
        }
    }
}

impl Drop for SndfileHandle {
    fn drop(&mut self) {
        if self.ptr.is_some() {
            debug!("closing libsndfile handle on drop");
            let _ = self.close();
        }
    }
}
