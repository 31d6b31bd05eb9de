//! Calendar helpers shared by the record types.
//!
//! Dates travel as `YYYY-MM-DD`, appointment slots as `YYYY-MM-DDTHH:MM`
//! (what a `datetime-local` input produces) and session times as `HH:MM`.

use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime, UtcOffset};

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const SLOT_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
pub const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Current calendar date at the clinic.
pub fn today(offset: UtcOffset) -> Date {
    OffsetDateTime::now_utc().to_offset(offset).date()
}

/// `YYYY-MM` bucket used for income series.
pub fn month_key(d: Date) -> String {
    format!("{:04}-{:02}", d.year(), u8::from(d.month()))
}

pub fn format_date(d: Date) -> String {
    // The format only has numeric components; formatting cannot fail.
    d.format(DATE_FORMAT).unwrap_or_default()
}

macro_rules! serde_format {
    (@option $ty:ty, $format:expr) => {
        pub mod option {
            use serde::{Deserialize, Deserializer, Serializer};

            pub fn serialize<S: Serializer>(value: &Option<$ty>, s: S) -> Result<S::Ok, S::Error> {
                match value {
                    Some(v) => super::serialize(v, s),
                    None => s.serialize_none(),
                }
            }

            /// Blank strings read as `None`.
            pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<$ty>, D::Error> {
                match Option::<String>::deserialize(d)? {
                    Some(raw) if !raw.trim().is_empty() => <$ty>::parse(raw.trim(), $format)
                        .map(Some)
                        .map_err(serde::de::Error::custom),
                    _ => Ok(None),
                }
            }
        }
    };
    ($name:ident, $ty:ty, $format:expr $(, $with_option:ident)?) => {
        pub mod $name {
            use serde::{Deserialize, Deserializer, Serializer};

            pub fn serialize<S: Serializer>(value: &$ty, s: S) -> Result<S::Ok, S::Error> {
                let txt = value.format($format).map_err(serde::ser::Error::custom)?;
                s.serialize_str(&txt)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<$ty, D::Error> {
                let raw = String::deserialize(d)?;
                <$ty>::parse(raw.trim(), $format).map_err(serde::de::Error::custom)
            }

            $(serde_format!(@$with_option $ty, $format);)?
        }
    };
}

// Only plain dates appear as optional fields.
serde_format!(date, time::Date, crate::dates::DATE_FORMAT, option);
serde_format!(slot, time::PrimitiveDateTime, crate::dates::SLOT_FORMAT);
serde_format!(time_of_day, time::Time, crate::dates::TIME_FORMAT);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::{date, datetime};

    #[derive(Serialize, Deserialize)]
    struct Stamp {
        #[serde(with = "crate::dates::date")]
        day: Date,
        #[serde(with = "crate::dates::slot")]
        at: time::PrimitiveDateTime,
        #[serde(default, with = "crate::dates::date::option")]
        until: Option<Date>,
    }

    #[test]
    fn serializes_dates_as_plain_strings() {
        let s = Stamp {
            day: date!(2025 - 03 - 09),
            at: datetime!(2025-03-09 17:45),
            until: None,
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["day"], "2025-03-09");
        assert_eq!(json["at"], "2025-03-09T17:45");
        assert!(json["until"].is_null());
    }

    #[test]
    fn blank_optional_date_reads_as_none() {
        let s: Stamp =
            serde_json::from_str(r#"{"day":"2025-01-01","at":"2025-01-01T09:00","until":""}"#).unwrap();
        assert!(s.until.is_none());
    }

    #[test]
    fn rejects_malformed_dates() {
        let bad = serde_json::from_str::<Stamp>(r#"{"day":"09/03/2025","at":"2025-01-01T09:00"}"#);
        assert!(bad.is_err());
        let ok: Stamp = serde_json::from_str(r#"{"day":" 2025-03-09 ","at":"2025-01-01T09:00"}"#).unwrap();
        assert_eq!(ok.day, date!(2025 - 03 - 09));
    }

    #[test]
    fn month_key_is_zero_padded() {
        assert_eq!(month_key(date!(2025 - 01 - 31)), "2025-01");
        assert_eq!(month_key(date!(2024 - 11 - 02)), "2024-11");
    }
}
