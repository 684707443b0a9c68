//! Date/time converters driven by `Options::date_time_format`.
//!
//! Reading is lenient: RFC 3339 text, integer seconds (or milliseconds under
//! `UnixMilliseconds`) and float seconds are all accepted, with or without a
//! leading tag 0 or 1.

use std::marker::PhantomData;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::options::{DateTimeFormat, Options, UnqualifiedTimeZoneKind};
use crate::reader::Reader;
use crate::shape::{CborType, TypeShape};
use crate::wire::{MajorType, TAG_DATETIME_STRING, TAG_EPOCH_DATETIME};
use crate::writer::Writer;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub struct DateTimeConverter<D>(PhantomData<fn() -> D>);

impl<D> DateTimeConverter<D> {
    pub fn new() -> Self {
        DateTimeConverter(PhantomData)
    }
}

impl<D> Default for DateTimeConverter<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded instant before it is adapted to the target type.
enum Decoded {
    Offset(DateTime<FixedOffset>),
    /// Text without an offset.
    Naive(NaiveDateTime),
}

fn invalid(offset: usize, found: impl Into<String>) -> Error {
    Error::type_mismatch(offset, "date/time", found.into())
}

fn local(offset: usize, naive: &NaiveDateTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(naive)
        .earliest()
        .ok_or_else(|| invalid(offset, format!("nonexistent local time {}", naive)))
}

fn read_decoded(reader: &mut Reader<'_>) -> Result<(usize, Decoded)> {
    let tag = reader.try_read_tag()?;
    let offset = reader.position();
    let millis = tag != Some(TAG_EPOCH_DATETIME)
        && reader.options().date_time_format == DateTimeFormat::UnixMilliseconds;
    let decoded = match reader.peek_major_type()? {
        MajorType::Text if tag != Some(TAG_EPOCH_DATETIME) => {
            let text = reader.read_text_string()?;
            match DateTime::parse_from_rfc3339(&text) {
                Ok(value) => Decoded::Offset(value),
                Err(_) => NaiveDateTime::parse_from_str(&text, NAIVE_FORMAT)
                    .map(Decoded::Naive)
                    .map_err(|e| invalid(offset, format!("\"{}\" ({})", text, e)))?,
            }
        }
        MajorType::Unsigned | MajorType::Negative if tag != Some(TAG_DATETIME_STRING) => {
            let value: i64 = reader.read_int()?;
            let utc = if millis {
                DateTime::from_timestamp_millis(value)
            } else {
                DateTime::from_timestamp(value, 0)
            };
            Decoded::Offset(
                utc.ok_or_else(|| Error::out_of_range(offset, "DateTime"))?
                    .fixed_offset(),
            )
        }
        MajorType::Simple if tag != Some(TAG_DATETIME_STRING) => {
            let seconds = reader.read_f64()?;
            if !seconds.is_finite() {
                return Err(Error::out_of_range(offset, "DateTime"));
            }
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1e9).round() as u32;
            let utc = DateTime::from_timestamp(whole as i64, nanos.min(999_999_999));
            Decoded::Offset(
                utc.ok_or_else(|| Error::out_of_range(offset, "DateTime"))?
                    .fixed_offset(),
            )
        }
        major => return Err(Error::unexpected(offset, "date/time", major)),
    };
    Ok((offset, decoded))
}

/// Sub-second precision below the unit of the format is dropped.
fn write_epoch(writer: &mut Writer<'_>, value: DateTime<Utc>) -> Result<()> {
    match writer.options().date_time_format {
        DateTimeFormat::UnixMilliseconds => writer.write_i64(value.timestamp_millis()),
        _ => writer.write_i64(value.timestamp()),
    }
    Ok(())
}

impl Converter<DateTime<Utc>> for DateTimeConverter<DateTime<Utc>> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<DateTime<Utc>> {
        let kind = reader.options().unqualified_time_zone_kind;
        match read_decoded(reader)? {
            (_, Decoded::Offset(value)) => Ok(value.with_timezone(&Utc)),
            (offset, Decoded::Naive(naive)) => match kind {
                UnqualifiedTimeZoneKind::Local => Ok(local(offset, &naive)?.with_timezone(&Utc)),
                _ => Ok(naive.and_utc()),
            },
        }
    }

    fn write(&self, writer: &mut Writer<'_>, value: &DateTime<Utc>) -> Result<()> {
        match writer.options().date_time_format {
            DateTimeFormat::Iso8601 => {
                writer.write_text_string(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true));
                Ok(())
            }
            _ => write_epoch(writer, *value),
        }
    }
}

impl Converter<DateTime<FixedOffset>> for DateTimeConverter<DateTime<FixedOffset>> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<DateTime<FixedOffset>> {
        let kind = reader.options().unqualified_time_zone_kind;
        match read_decoded(reader)? {
            (_, Decoded::Offset(value)) => Ok(value),
            (offset, Decoded::Naive(naive)) => match kind {
                UnqualifiedTimeZoneKind::Local => Ok(local(offset, &naive)?.fixed_offset()),
                _ => Ok(naive.and_utc().fixed_offset()),
            },
        }
    }

    fn write(&self, writer: &mut Writer<'_>, value: &DateTime<FixedOffset>) -> Result<()> {
        match writer.options().date_time_format {
            DateTimeFormat::Iso8601 => {
                writer.write_text_string(&value.to_rfc3339_opts(SecondsFormat::AutoSi, false));
                Ok(())
            }
            _ => write_epoch(writer, value.with_timezone(&Utc)),
        }
    }
}

/// Wall-clock date/times, qualified through `Options::unqualified_time_zone_kind`.
impl Converter<NaiveDateTime> for DateTimeConverter<NaiveDateTime> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<NaiveDateTime> {
        let kind = reader.options().unqualified_time_zone_kind;
        match read_decoded(reader)? {
            (_, Decoded::Naive(naive)) => Ok(naive),
            (_, Decoded::Offset(value)) => Ok(match kind {
                UnqualifiedTimeZoneKind::Utc => value.naive_utc(),
                UnqualifiedTimeZoneKind::Local => value.with_timezone(&Local).naive_local(),
                UnqualifiedTimeZoneKind::Unspecified => value.naive_local(),
            }),
        }
    }

    fn write(&self, writer: &mut Writer<'_>, value: &NaiveDateTime) -> Result<()> {
        let Options {
            date_time_format,
            unqualified_time_zone_kind,
            ..
        } = *writer.options();
        let offset = writer.as_bytes().len();
        match unqualified_time_zone_kind {
            UnqualifiedTimeZoneKind::Utc => {
                DateTimeConverter::<DateTime<Utc>>::new().write(writer, &value.and_utc())
            }
            UnqualifiedTimeZoneKind::Local => {
                let value = local(offset, value)?.fixed_offset();
                DateTimeConverter::<DateTime<FixedOffset>>::new().write(writer, &value)
            }
            UnqualifiedTimeZoneKind::Unspecified => match date_time_format {
                DateTimeFormat::Iso8601 => {
                    writer.write_text_string(&value.format(NAIVE_FORMAT).to_string());
                    Ok(())
                }
                _ => write_epoch(writer, value.and_utc()),
            },
        }
    }
}

macro_rules! impl_datetime {
    ($($ty:ty),*) => {
        $(
            impl CborType for $ty {
                fn shape() -> TypeShape<Self> {
                    TypeShape::Primitive
                }
            }
        )*
    };
}

impl_datetime!(DateTime<Utc>, DateTime<FixedOffset>, NaiveDateTime);
