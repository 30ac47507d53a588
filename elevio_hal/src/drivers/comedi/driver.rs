//! Comedi driver implementation.

use super::ffi;
use elevio_common::channel::{Channel, ChannelKind, PortDirection};
use elevio_common::config::IoConfig;
use elevio_common::driver::{AnalogValue, DriverDiagnostics, IoDriver, IoError};
use libc::c_uint;
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::ptr::NonNull;
use tracing::{debug, info, warn};

/// Comedi driver implementing the IoDriver trait.
pub struct ComediDriver {
    /// Open device, `None` until `init()`
    handle: Option<NonNull<ffi::comedi_t>>,
    /// Device node
    device: PathBuf,
    reads: u64,
    writes: u64,
}

// SAFETY: the handle is owned by exactly one driver and only used through
// `&mut self`, so it is never touched from two threads at once.
unsafe impl Send for ComediDriver {}

/// Text of the last libcomedi error.
fn last_error_message() -> String {
    // SAFETY: comedi_errno/comedi_strerror have no preconditions; the
    // returned string is static inside libcomedi.
    unsafe {
        let ptr = ffi::comedi_strerror(ffi::comedi_errno());
        if ptr.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// Last libcomedi error as an `IoError::Hardware`.
fn last_error(context: &str) -> IoError {
    IoError::Hardware(format!("{context}: {}", last_error_message()))
}

impl ComediDriver {
    /// Create a driver; the device is opened by `init()`.
    pub fn new() -> Self {
        Self {
            handle: None,
            device: PathBuf::new(),
            reads: 0,
            writes: 0,
        }
    }

    fn handle(&self) -> Result<*mut ffi::comedi_t, IoError> {
        self.handle
            .map(NonNull::as_ptr)
            .ok_or(IoError::NotInitialized)
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Closing comedi device {:?}", self.device);
            // SAFETY: handle came from comedi_open and is closed once.
            if unsafe { ffi::comedi_close(handle.as_ptr()) } < 0 {
                warn!("{}", last_error("comedi_close"));
            }
        }
    }

    fn dio_write(&mut self, channel: Channel, bit: c_uint) -> Result<(), IoError> {
        let handle = self.handle()?;
        // SAFETY: handle is open.
        let rc = unsafe {
            ffi::comedi_dio_write(
                handle,
                channel.subdevice() as c_uint,
                channel.index() as c_uint,
                bit,
            )
        };
        if rc < 0 {
            return Err(last_error(&format!("comedi_dio_write {channel}")));
        }
        self.writes += 1;
        Ok(())
    }
}

impl Default for ComediDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl IoDriver for ComediDriver {
    fn name(&self) -> &'static str {
        "comedi"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, config: &IoConfig) -> Result<(), IoError> {
        self.close();
        self.device = config.driver.device.clone();

        let path = CString::new(self.device.as_os_str().as_bytes()).map_err(|_| {
            IoError::InitFailed(format!("invalid device path {:?}", self.device))
        })?;

        // SAFETY: path is a valid NUL-terminated string.
        let handle = NonNull::new(unsafe { ffi::comedi_open(path.as_ptr()) }).ok_or_else(|| {
            IoError::InitFailed(format!("comedi_open {:?}: {}", self.device, last_error_message()))
        })?;
        self.handle = Some(handle);

        for port in config.ports.iter().filter(|p| p.kind == ChannelKind::Digital) {
            let direction = match port.direction {
                PortDirection::Input => ffi::COMEDI_INPUT,
                PortDirection::Output => ffi::COMEDI_OUTPUT,
            };
            for channel in port.channels() {
                // SAFETY: handle is open.
                let rc = unsafe {
                    ffi::comedi_dio_config(
                        handle.as_ptr(),
                        channel.subdevice() as c_uint,
                        channel.index() as c_uint,
                        direction,
                    )
                };
                if rc < 0 {
                    let message = last_error_message();
                    self.close();
                    return Err(IoError::InitFailed(format!(
                        "comedi_dio_config {channel}: {message}"
                    )));
                }
            }
            debug!("Configured port '{}' as {}", port.name, port.direction);
        }

        info!("Opened comedi device {:?}", self.device);
        Ok(())
    }

    fn set_bit(&mut self, channel: Channel) -> Result<(), IoError> {
        self.dio_write(channel, 1)
    }

    fn clear_bit(&mut self, channel: Channel) -> Result<(), IoError> {
        self.dio_write(channel, 0)
    }

    fn write_analog(&mut self, channel: Channel, value: AnalogValue) -> Result<(), IoError> {
        let handle = self.handle()?;
        // SAFETY: handle is open.
        let rc = unsafe {
            ffi::comedi_data_write(
                handle,
                channel.subdevice() as c_uint,
                channel.index() as c_uint,
                0,
                ffi::AREF_GROUND,
                value,
            )
        };
        if rc < 0 {
            return Err(last_error(&format!("comedi_data_write {channel}")));
        }
        self.writes += 1;
        Ok(())
    }

    fn read_bit(&mut self, channel: Channel) -> Result<bool, IoError> {
        let handle = self.handle()?;
        let mut bit: c_uint = 0;
        // SAFETY: handle is open and `bit` outlives the call.
        let rc = unsafe {
            ffi::comedi_dio_read(
                handle,
                channel.subdevice() as c_uint,
                channel.index() as c_uint,
                &mut bit,
            )
        };
        if rc < 0 {
            return Err(last_error(&format!("comedi_dio_read {channel}")));
        }
        self.reads += 1;
        Ok(bit != 0)
    }

    fn read_analog(&mut self, channel: Channel) -> Result<AnalogValue, IoError> {
        let handle = self.handle()?;
        let mut data: ffi::lsampl_t = 0;
        // SAFETY: handle is open and `data` outlives the call.
        let rc = unsafe {
            ffi::comedi_data_read(
                handle,
                channel.subdevice() as c_uint,
                channel.index() as c_uint,
                0,
                ffi::AREF_GROUND,
                &mut data,
            )
        };
        if rc < 0 {
            return Err(last_error(&format!("comedi_data_read {channel}")));
        }
        self.reads += 1;
        Ok(data)
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        self.close();
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        Some(DriverDiagnostics {
            reads: self.reads,
            writes: self.writes,
            faults: Vec::new(),
        })
    }
}

impl Drop for ComediDriver {
    fn drop(&mut self) {
        self.close();
    }
}
