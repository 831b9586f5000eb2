//! Sortable simulation-time stamps.
//!
//! A time `t` is stamped as `XX.YYYYYY`: `XX` is the two-digit decimal
//! exponent of `t * 1e10` and `YYYYYY` its six leading mantissa digits, so
//! stamps of times in `[1e-10, 1e90)` sort lexically in time order.

use crate::exchange_error::ExchangeError;

/// Scale applied before taking the exponent.
const SCALE_EXPONENT: i32 = 10;
/// Mantissa digits after the leading one.
const FRACTION_DIGITS: i32 = 5;

/// Encode a simulation time.
///
/// ```
/// use mesh_exchange::io::time_string::encode_time;
/// assert_eq!(encode_time(1.0).unwrap(), "10.100000");
/// assert_eq!(encode_time(0.0).unwrap(), "00.000000");
/// ```
pub fn encode_time(t: f64) -> Result<String, ExchangeError> {
    if !t.is_finite() || t < 0.0 {
        return Err(ExchangeError::Precondition(format!(
            "cannot stamp time {t}"
        )));
    }
    let scaled = format!("{:.*e}", FRACTION_DIGITS as usize, t * 10f64.powi(SCALE_EXPONENT));
    let (mantissa, exponent) = scaled
        .split_once('e')
        .ok_or_else(|| ExchangeError::Precondition(format!("cannot stamp time {t}")))?;
    let exponent: i32 = exponent
        .parse()
        .map_err(|_| ExchangeError::Precondition(format!("cannot stamp time {t}")))?;
    if !(0..100).contains(&exponent) {
        return Err(ExchangeError::Precondition(format!(
            "time {t} is outside the stampable range"
        )));
    }
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    Ok(format!("{exponent:02}.{digits}"))
}

/// Decode a stamp produced by [`encode_time`].
pub fn decode_time(stamp: &str) -> Result<f64, ExchangeError> {
    let bad = || ExchangeError::Precondition(format!("malformed time stamp `{stamp}`"));
    let (exponent, digits) = stamp.split_once('.').ok_or_else(bad)?;
    let exponent: i32 = exponent.parse().map_err(|_| bad())?;
    let digits: f64 = digits.parse().map_err(|_| bad())?;
    Ok(digits * 10f64.powi(exponent - SCALE_EXPONENT - FRACTION_DIGITS))
}
