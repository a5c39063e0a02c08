//! QTP binary framing and record bodies
//!
//! ```text
//! frame        = compact length | compact type id | body      (length covers type id + body)
//! data body    = compact count  | count × (compact record id | UTF symbol | compact n | n × compact field)
//! subscription = compact count  | count × (compact record id | UTF symbol | i64 time)
//! ```

use codec::{compact_int_size, BufferedInput, BufferedOutput, ProtocolError, ProtocolResult};
use types::{DataRecord, RecordBuffer, SubscriptionRecord};

/// Writes one complete frame
pub fn write_frame(out: &mut BufferedOutput, type_id: i32, body: &[u8]) {
    out.write_compact_int((compact_int_size(type_id) + body.len()) as i32);
    out.write_compact_int(type_id);
    out.write_bytes(body);
}

/// Bytes `write_frame` adds in front of a body of `body_len` bytes
pub fn frame_overhead(type_id: i32, body_len: usize) -> usize {
    let length = compact_int_size(type_id) + body_len;
    compact_int_size(length as i32) + compact_int_size(type_id)
}

pub fn write_data_record(out: &mut BufferedOutput, record: &DataRecord) {
    out.write_compact_int(record.record_id);
    out.write_utf_string(&record.symbol);
    out.write_compact_int(record.fields.len() as i32);
    for &field in &record.fields {
        out.write_compact_int(field);
    }
}

pub fn write_subscription_record(out: &mut BufferedOutput, record: &SubscriptionRecord) {
    out.write_compact_int(record.record_id);
    out.write_utf_string(&record.symbol);
    out.write_i64(record.time);
}

fn read_symbol(input: &mut BufferedInput<'_>) -> ProtocolResult<String> {
    let offset = input.position();
    input
        .read_utf_string()?
        .ok_or_else(|| ProtocolError::invalid_size(-1, offset, "record symbol"))
}

/// Reads a complete data body; trailing bytes are an error
pub fn read_data_records(input: &mut BufferedInput<'_>) -> ProtocolResult<RecordBuffer<DataRecord>> {
    let count = input.read_size("record count")?;
    let mut records = RecordBuffer::new();
    for _ in 0..count {
        let record_id = input.read_compact_int()?;
        let symbol = read_symbol(input)?;
        let n = input.read_size("field count")?;
        let fields = (0..n).map(|_| input.read_compact_int()).collect::<ProtocolResult<Vec<_>>>()?;
        records.push(DataRecord::new(record_id, symbol, fields));
    }
    ensure_consumed(input)?;
    Ok(records)
}

/// Reads a complete subscription body; trailing bytes are an error
pub fn read_subscription_records(
    input: &mut BufferedInput<'_>,
) -> ProtocolResult<RecordBuffer<SubscriptionRecord>> {
    let count = input.read_size("record count")?;
    let mut records = RecordBuffer::new();
    for _ in 0..count {
        let record_id = input.read_compact_int()?;
        let symbol = read_symbol(input)?;
        let time = input.read_i64()?;
        records.push(SubscriptionRecord::new(record_id, symbol, time));
    }
    ensure_consumed(input)?;
    Ok(records)
}

fn ensure_consumed(input: &BufferedInput<'_>) -> ProtocolResult<()> {
    if input.has_available() {
        return Err(ProtocolError::invalid_size(
            input.remaining() as i64,
            input.position(),
            "trailing bytes after records",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_overhead_matches_write() {
        for (type_id, body_len) in [(10, 0), (10, 62), (10, 63), (1000, 9000), (-1, 5)] {
            let body = vec![0u8; body_len];
            let mut out = BufferedOutput::new();
            write_frame(&mut out, type_id, &body);
            assert_eq!(out.len(), frame_overhead(type_id, body_len) + body_len);
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut out = BufferedOutput::new();
        out.write_compact_int(1);
        write_subscription_record(&mut out, &SubscriptionRecord::new(0, "IBM", 0));
        out.write_u8(0);
        let err = read_subscription_records(&mut BufferedInput::new(out.as_slice())).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidSize { size: 1, .. }));
    }

    #[test]
    fn test_null_symbol_rejected() {
        let mut out = BufferedOutput::new();
        out.write_compact_int(1);
        out.write_compact_int(0);
        out.write_null_string();
        out.write_compact_int(0);
        assert!(read_data_records(&mut BufferedInput::new(out.as_slice())).is_err());
    }
}
