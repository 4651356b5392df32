//! Calendar types: `Date`, `Time`, `DateTime`.
//!
//! Every field carries a per-width "undefined" sentinel (0xFF for 8-bit
//! fields, 0xFFFF for the year, 0x8000 for the UTC deviation). Sentinels are
//! valid on the wire and round-trip as `None`; any other out-of-range value
//! is rejected by [`Date::validate`]/[`Time::validate`].

use crate::error::{AxdrError, Result};

/// Sentinel for 8-bit calendar fields (month, day, day-of-week, hour, ...).
pub const UNDEFINED_U8: u8 = 0xFF;
/// Sentinel for the 16-bit year field.
pub const UNDEFINED_YEAR: u16 = 0xFFFF;
/// Sentinel for the 16-bit UTC deviation field, in minutes.
pub const UNDEFINED_DEVIATION: i16 = i16::MIN; // 0x8000 as i16

/// Calendar date with day-of-week, as carried by A-XDR tag 0x1A.
///
/// `month`/`day`/`day_of_week` are `None` when the wire value was the
/// sentinel (0xFF); `year` is `None` when the wire value was 0xFFFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Date {
    /// Calendar year, or `None` if undefined (wire sentinel 0xFFFF).
    pub year: Option<u16>,
    /// Month 1-12, or `None` if undefined.
    pub month: Option<u8>,
    /// Day of month 1-31, or `None` if undefined.
    pub day: Option<u8>,
    /// ISO day of week, 1 (Monday) - 7 (Sunday), or `None` if undefined.
    pub day_of_week: Option<u8>,
}

impl Date {
    /// Wire size in bytes.
    pub const SIZE: usize = 5;

    /// Reject non-sentinel values outside their valid range.
    pub fn validate(&self) -> Result<()> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(AxdrError::RangeViolation { field: "month", value: i64::from(month) });
            }
        }
        if let Some(day) = self.day {
            if !(1..=31).contains(&day) {
                return Err(AxdrError::RangeViolation { field: "day", value: i64::from(day) });
            }
        }
        if let Some(dow) = self.day_of_week {
            if !(1..=7).contains(&dow) {
                return Err(AxdrError::RangeViolation {
                    field: "day_of_week",
                    value: i64::from(dow),
                });
            }
        }
        Ok(())
    }

    /// Encode into exactly [`Self::SIZE`] bytes.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        out.extend_from_slice(&self.year.unwrap_or(UNDEFINED_YEAR).to_be_bytes());
        out.push(self.month.unwrap_or(UNDEFINED_U8));
        out.push(self.day.unwrap_or(UNDEFINED_U8));
        out.push(self.day_of_week.unwrap_or(UNDEFINED_U8));
        Ok(())
    }

    /// Decode from a 5-byte slice.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(AxdrError::LengthOverflow { needed: Self::SIZE, available: bytes.len() });
        }
        let year_raw = u16::from_be_bytes([bytes[0], bytes[1]]);
        let date = Self {
            year: (year_raw != UNDEFINED_YEAR).then_some(year_raw),
            month: (bytes[2] != UNDEFINED_U8).then_some(bytes[2]),
            day: (bytes[3] != UNDEFINED_U8).then_some(bytes[3]),
            day_of_week: (bytes[4] != UNDEFINED_U8).then_some(bytes[4]),
        };
        date.validate()?;
        Ok(date)
    }
}

/// Time of day, as carried by A-XDR tag 0x1B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    /// Hour 0-23, or `None` if undefined.
    pub hour: Option<u8>,
    /// Minute 0-59, or `None` if undefined.
    pub minute: Option<u8>,
    /// Second 0-59, or `None` if undefined.
    pub second: Option<u8>,
    /// Hundredths of a second 0-99, or `None` if undefined.
    pub hundredths: Option<u8>,
}

impl Time {
    /// Wire size in bytes.
    pub const SIZE: usize = 4;

    /// Reject non-sentinel values outside their valid range.
    pub fn validate(&self) -> Result<()> {
        if let Some(hour) = self.hour {
            if hour > 23 {
                return Err(AxdrError::RangeViolation { field: "hour", value: i64::from(hour) });
            }
        }
        if let Some(minute) = self.minute {
            if minute > 59 {
                return Err(AxdrError::RangeViolation {
                    field: "minute",
                    value: i64::from(minute),
                });
            }
        }
        if let Some(second) = self.second {
            if second > 59 {
                return Err(AxdrError::RangeViolation {
                    field: "second",
                    value: i64::from(second),
                });
            }
        }
        if let Some(hundredths) = self.hundredths {
            if hundredths > 99 {
                return Err(AxdrError::RangeViolation {
                    field: "hundredths",
                    value: i64::from(hundredths),
                });
            }
        }
        Ok(())
    }

    /// Encode into exactly [`Self::SIZE`] bytes.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        out.push(self.hour.unwrap_or(UNDEFINED_U8));
        out.push(self.minute.unwrap_or(UNDEFINED_U8));
        out.push(self.second.unwrap_or(UNDEFINED_U8));
        out.push(self.hundredths.unwrap_or(UNDEFINED_U8));
        Ok(())
    }

    /// Decode from a 4-byte slice.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(AxdrError::LengthOverflow { needed: Self::SIZE, available: bytes.len() });
        }
        let time = Self {
            hour: (bytes[0] != UNDEFINED_U8).then_some(bytes[0]),
            minute: (bytes[1] != UNDEFINED_U8).then_some(bytes[1]),
            second: (bytes[2] != UNDEFINED_U8).then_some(bytes[2]),
            hundredths: (bytes[3] != UNDEFINED_U8).then_some(bytes[3]),
        };
        time.validate()?;
        Ok(time)
    }
}

/// Full timestamp: `Date ‖ Time ‖ deviation ‖ clock-status`, A-XDR tag 0x19.
///
/// `deviation` is minutes offset from UTC in `[-720, 840]`, or `None` if the
/// wire sentinel (0x8000) was present. `clock_status` bit 7 signals DST; the
/// remaining bits are opaque and preserved verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    /// Calendar date portion.
    pub date: Date,
    /// Time-of-day portion.
    pub time: Time,
    /// UTC deviation in minutes, or `None` if undefined.
    pub deviation: Option<i16>,
    /// Raw clock-status byte (bit 7 = DST active).
    pub clock_status: u8,
}

/// Bit in `clock_status` that signals daylight-saving time is in effect.
const DST_BIT: u8 = 0x80;

impl DateTime {
    /// Wire size in bytes (5 + 4 + 2 + 1).
    pub const SIZE: usize = Date::SIZE + Time::SIZE + 3;

    /// Whether the DST flag bit is set in `clock_status`.
    #[must_use]
    pub fn is_dst(&self) -> bool {
        self.clock_status & DST_BIT != 0
    }

    /// Reject a deviation outside `[-720, 840]` (and not the sentinel).
    pub fn validate(&self) -> Result<()> {
        self.date.validate()?;
        self.time.validate()?;
        if let Some(deviation) = self.deviation {
            if !(-720..=840).contains(&deviation) {
                return Err(AxdrError::RangeViolation {
                    field: "deviation",
                    value: i64::from(deviation),
                });
            }
        }
        Ok(())
    }

    /// Encode into exactly [`Self::SIZE`] bytes.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        self.date.encode(out)?;
        self.time.encode(out)?;
        out.extend_from_slice(&self.deviation.unwrap_or(UNDEFINED_DEVIATION).to_be_bytes());
        out.push(self.clock_status);
        Ok(())
    }

    /// Decode from a 12-byte slice.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(AxdrError::LengthOverflow { needed: Self::SIZE, available: bytes.len() });
        }
        let date = Date::decode(&bytes[0..Date::SIZE])?;
        let time = Time::decode(&bytes[Date::SIZE..Date::SIZE + Time::SIZE])?;
        let deviation_raw =
            i16::from_be_bytes([bytes[Date::SIZE + Time::SIZE], bytes[Date::SIZE + Time::SIZE + 1]]);
        let clock_status = bytes[Self::SIZE - 1];
        let dt = Self {
            date,
            time,
            deviation: (deviation_raw != UNDEFINED_DEVIATION).then_some(deviation_raw),
            clock_status,
        };
        dt.validate()?;
        Ok(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S1: `DateTime{2025-05-13 Tue 14:08:00.00, dev=0, status=0}`
    /// encodes to the literal byte sequence given in the spec.
    #[test]
    fn s1_date_time_literal() {
        let dt = DateTime {
            date: Date { year: Some(2025), month: Some(5), day: Some(13), day_of_week: Some(2) },
            time: Time { hour: Some(14), minute: Some(8), second: Some(0), hundredths: Some(0) },
            deviation: Some(0),
            clock_status: 0,
        };

        let mut out = Vec::new();
        dt.encode(&mut out).expect("should encode");

        assert_eq!(
            out,
            vec![0x07, 0xE9, 0x05, 0x0D, 0x02, 0x0E, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00]
        );

        let decoded = DateTime::decode(&out).expect("should decode");
        assert_eq!(decoded, dt);
    }

    #[test]
    fn undefined_sentinels_round_trip() {
        let dt = DateTime::default();
        let mut out = Vec::new();
        dt.encode(&mut out).expect("should encode");
        assert_eq!(out.len(), DateTime::SIZE);
        let decoded = DateTime::decode(&out).expect("should decode");
        assert_eq!(decoded, dt);
        assert_eq!(decoded.date.year, None);
        assert_eq!(decoded.deviation, None);
    }

    #[test]
    fn rejects_out_of_range_month() {
        let date = Date { month: Some(13), ..Date::default() };
        assert!(matches!(date.validate(), Err(AxdrError::RangeViolation { field: "month", .. })));
    }

    #[test]
    fn rejects_out_of_range_hour() {
        let time = Time { hour: Some(24), ..Time::default() };
        assert!(matches!(time.validate(), Err(AxdrError::RangeViolation { field: "hour", .. })));
    }

    #[test]
    fn rejects_out_of_range_deviation() {
        let dt = DateTime { deviation: Some(841), ..DateTime::default() };
        assert!(matches!(
            dt.validate(),
            Err(AxdrError::RangeViolation { field: "deviation", .. })
        ));
    }

    #[test]
    fn dst_bit_detected() {
        let dt = DateTime { clock_status: DST_BIT, ..DateTime::default() };
        assert!(dt.is_dst());
        let dt = DateTime { clock_status: 0, ..DateTime::default() };
        assert!(!dt.is_dst());
    }
}
