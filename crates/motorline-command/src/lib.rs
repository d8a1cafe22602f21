//! Command layer of the motorline ASCII motor-control protocol.
//!
//! Lines reassembled by [`motorline_frame`] are parsed into [`Command`]s and
//! executed against a [`Device`] by the [`Dispatcher`]:
//!
//! ```text
//! p axis pos [vel_ff [current_ff]]     position setpoint
//! q axis pos [vel_lim [current_lim]]   position setpoint with limits
//! v axis vel [current_ff]              velocity setpoint
//! c axis current                       current setpoint
//! t axis goal                          trapezoidal move
//! f axis                               "<pos> <vel>" feedback
//! u axis                               watchdog feed
//! h | i | s                            help, device info, save
//! r name | w name value                property access
//! C / P / S                            binary sub-messages, see [`binary`]
//! ```
//!
//! [`Session`] ties an assembler, a dispatcher, and a response writer together for
//! one byte stream.

pub mod binary;
pub mod command;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod scan;
pub mod session;

pub use binary::{CoupledCommand, DualAxisCurrent, FeedbackFrame};
pub use command::Command;
pub use device::{AxisControl, Device, DeviceIdentity, Endpoint};
pub use dispatcher::{DispatchConfig, Dispatcher, HELP_TEXT};
pub use error::{BinaryError, BinaryKind, CommandError, DeviceError, PropertyError, Result};
pub use session::Session;
