//! Declarations of the libcomedi functions used by the driver.

use libc::{c_char, c_int, c_uint};

/// Opaque device handle.
#[repr(C)]
pub struct comedi_t {
    _private: [u8; 0],
}

/// Sample type of `comedi_data_read`/`comedi_data_write`.
pub type lsampl_t = c_uint;

pub const COMEDI_INPUT: c_uint = 0;
pub const COMEDI_OUTPUT: c_uint = 1;
pub const AREF_GROUND: c_uint = 0;

#[link(name = "comedi")]
unsafe extern "C" {
    pub fn comedi_open(filename: *const c_char) -> *mut comedi_t;
    pub fn comedi_close(device: *mut comedi_t) -> c_int;
    pub fn comedi_errno() -> c_int;
    pub fn comedi_strerror(errnum: c_int) -> *const c_char;
    pub fn comedi_dio_config(
        device: *mut comedi_t,
        subdevice: c_uint,
        channel: c_uint,
        direction: c_uint,
    ) -> c_int;
    pub fn comedi_dio_read(
        device: *mut comedi_t,
        subdevice: c_uint,
        channel: c_uint,
        bit: *mut c_uint,
    ) -> c_int;
    pub fn comedi_dio_write(
        device: *mut comedi_t,
        subdevice: c_uint,
        channel: c_uint,
        bit: c_uint,
    ) -> c_int;
    pub fn comedi_data_read(
        device: *mut comedi_t,
        subdevice: c_uint,
        channel: c_uint,
        range: c_uint,
        aref: c_uint,
        data: *mut lsampl_t,
    ) -> c_int;
    pub fn comedi_data_write(
        device: *mut comedi_t,
        subdevice: c_uint,
        channel: c_uint,
        range: c_uint,
        aref: c_uint,
        data: lsampl_t,
    ) -> c_int;
}
