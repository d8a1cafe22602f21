//! Fixed-width binary sub-messages carried inside length-prefixed frames.
//!
//! All values are little-endian `i16` scaled by a fixed multiplier, followed by one
//! XOR checksum byte covering the tag and every value byte.
//!
//! ```text
//! C / P   [tag][v0:2][v1:2][xor]                                     6 bytes
//! S       [tag][sp_t:2][kp_t:2][kd_t:2][sp_g:2][kp_g:2][kd_g:2][xor] 14 bytes
//! ```

use motorline_frame::checksum;

use crate::error::BinaryError;

/// Tag of the per-axis current command.
pub const DUAL_CURRENT_TAG: u8 = b'C';
/// Tag of the coupled position command and of the feedback response.
pub const COUPLED_POSITION_TAG: u8 = b'P';
/// Tag of the coupled position-and-gains command.
pub const COUPLED_GAINS_TAG: u8 = b'S';

/// Size of a `C`/`P` message including tag and checksum.
pub const DUAL_CURRENT_LEN: usize = 6;
/// Size of an `S` message including tag and checksum.
pub const COUPLED_LEN: usize = 14;
/// Size of the binary feedback payload.
pub const FEEDBACK_LEN: usize = 6;

/// 0.01 resolution, ±327.67 range.
pub const CURRENT_MULTIPLIER: f32 = 100.0;
/// 0.001 resolution, ±32.767 range.
pub const POSITION_MULTIPLIER: f32 = 1000.0;
/// 0.01 resolution, ±327.67 range.
pub const GAIN_MULTIPLIER: f32 = 100.0;
/// Extra divisor applied to `P` setpoints after decoding.
pub const COUPLED_POSITION_DIVISOR: f32 = 1000.0;

/// Symmetric bound on feedback angles before coupling.
pub const FEEDBACK_CLAMP: f32 = 30.0;
/// Feedback values are sent in thousandths.
pub const FEEDBACK_MULTIPLIER: f32 = 1000.0;

/// Two current setpoints, one per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualAxisCurrent {
    pub i0: f32,
    pub i1: f32,
}

impl DualAxisCurrent {
    /// Decode a 6-byte message. The tag byte is covered by the checksum but not
    /// otherwise checked.
    pub fn decode(msg: &[u8]) -> Result<Self, BinaryError> {
        verify_message(msg, DUAL_CURRENT_LEN)?;
        Ok(Self {
            i0: scaled(msg, 1, CURRENT_MULTIPLIER),
            i1: scaled(msg, 3, CURRENT_MULTIPLIER),
        })
    }

    /// Encode as a 6-byte message with the given tag.
    pub fn encode(&self, tag: u8) -> [u8; DUAL_CURRENT_LEN] {
        let mut msg = [0u8; DUAL_CURRENT_LEN];
        msg[0] = tag;
        put_i16(&mut msg, 1, quantize(self.i0, CURRENT_MULTIPLIER));
        put_i16(&mut msg, 3, quantize(self.i1, CURRENT_MULTIPLIER));
        seal(&mut msg);
        msg
    }
}

/// Setpoints and PD gains for the coupled theta/gamma pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoupledCommand {
    pub sp_theta: f32,
    pub kp_theta: f32,
    pub kd_theta: f32,
    pub sp_gamma: f32,
    pub kp_gamma: f32,
    pub kd_gamma: f32,
}

impl CoupledCommand {
    /// Decode a 14-byte `S` message.
    pub fn decode(msg: &[u8]) -> Result<Self, BinaryError> {
        verify_message(msg, COUPLED_LEN)?;
        Ok(Self {
            sp_theta: scaled(msg, 1, POSITION_MULTIPLIER),
            kp_theta: scaled(msg, 3, GAIN_MULTIPLIER),
            kd_theta: scaled(msg, 5, GAIN_MULTIPLIER),
            sp_gamma: scaled(msg, 7, POSITION_MULTIPLIER),
            kp_gamma: scaled(msg, 9, GAIN_MULTIPLIER),
            kd_gamma: scaled(msg, 11, GAIN_MULTIPLIER),
        })
    }

    /// Encode as a 14-byte `S` message.
    pub fn encode(&self) -> [u8; COUPLED_LEN] {
        let mut msg = [0u8; COUPLED_LEN];
        msg[0] = COUPLED_GAINS_TAG;
        let values = [
            quantize(self.sp_theta, POSITION_MULTIPLIER),
            quantize(self.kp_theta, GAIN_MULTIPLIER),
            quantize(self.kd_theta, GAIN_MULTIPLIER),
            quantize(self.sp_gamma, POSITION_MULTIPLIER),
            quantize(self.kp_gamma, GAIN_MULTIPLIER),
            quantize(self.kd_gamma, GAIN_MULTIPLIER),
        ];
        for (i, value) in values.into_iter().enumerate() {
            put_i16(&mut msg, 1 + 2 * i, value);
        }
        seal(&mut msg);
        msg
    }
}

/// Coupled angle feedback sent in reply to binary commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackFrame {
    /// Half-sum of the two angles, in thousandths.
    pub theta: i16,
    /// Half-difference of the two angles, in thousandths.
    pub gamma: i16,
}

impl FeedbackFrame {
    /// Build feedback from two axis angles in radians.
    ///
    /// Each angle is clamped to ±30 before coupling so the result always fits `i16`.
    pub fn from_angles(alpha: f32, beta: f32) -> Self {
        let alpha = alpha.clamp(-FEEDBACK_CLAMP, FEEDBACK_CLAMP);
        let beta = beta.clamp(-FEEDBACK_CLAMP, FEEDBACK_CLAMP);
        Self {
            theta: ((alpha / 2.0 + beta / 2.0) * FEEDBACK_MULTIPLIER) as i16,
            gamma: ((alpha / 2.0 - beta / 2.0) * FEEDBACK_MULTIPLIER) as i16,
        }
    }

    /// `P` tag, theta, gamma, checksum.
    pub fn encode(&self) -> [u8; FEEDBACK_LEN] {
        let mut msg = [0u8; FEEDBACK_LEN];
        msg[0] = COUPLED_POSITION_TAG;
        put_i16(&mut msg, 1, self.theta);
        put_i16(&mut msg, 3, self.gamma);
        seal(&mut msg);
        msg
    }

    /// Decode a feedback payload received from a device.
    pub fn decode(payload: &[u8]) -> Result<Self, BinaryError> {
        verify_message(payload, FEEDBACK_LEN)?;
        Ok(Self {
            theta: read_i16(payload, 1),
            gamma: read_i16(payload, 3),
        })
    }

    /// Theta in radians.
    pub fn theta_rad(&self) -> f32 {
        f32::from(self.theta) / FEEDBACK_MULTIPLIER
    }

    /// Gamma in radians.
    pub fn gamma_rad(&self) -> f32 {
        f32::from(self.gamma) / FEEDBACK_MULTIPLIER
    }
}

fn verify_message(msg: &[u8], expected: usize) -> Result<(), BinaryError> {
    if msg.len() != expected {
        return Err(BinaryError::LengthMismatch {
            expected,
            actual: msg.len(),
        });
    }
    let (body, received) = msg.split_at(expected - 1);
    let computed = checksum::compute(body);
    if computed != received[0] {
        return Err(BinaryError::ChecksumMismatch {
            received: received[0],
            computed,
        });
    }
    Ok(())
}

fn read_i16(msg: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([msg[offset], msg[offset + 1]])
}

fn scaled(msg: &[u8], offset: usize, multiplier: f32) -> f32 {
    f32::from(read_i16(msg, offset)) / multiplier
}

fn put_i16(msg: &mut [u8], offset: usize, value: i16) {
    msg[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

// `as` saturates out-of-range values and maps NaN to zero.
fn quantize(value: f32, multiplier: f32) -> i16 {
    (value * multiplier).round() as i16
}

fn seal(msg: &mut [u8]) {
    let last = msg.len() - 1;
    msg[last] = checksum::compute(&msg[..last]);
}
