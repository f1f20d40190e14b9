use bytes::BytesMut;

use super::varint::{decode_varint, encode_varint, varint_len};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogRecordType {
  Normal = 0,

  Deleted = 1,

  TxnFinished = 2,
}

#[derive(Debug, Clone)]
pub struct LogRecord {
  pub(crate) key: Vec<u8>,
  pub(crate) value: Vec<u8>,
  pub(crate) rec_type: LogRecordType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogRecordPos {
  pub(crate) file_id: u32,
  pub(crate) offset: u64,
  pub(crate) size: u32,
}

#[derive(Debug)]
pub struct ReadLogRecord {
  pub(crate) record: LogRecord,
  pub(crate) size: usize,
}

pub struct TransactionRecord {
  pub(crate) record: LogRecord,
  pub(crate) pos: LogRecordPos,
}

/// Header fields decoded ahead of the key/value bytes.
pub struct RecordHeader {
  pub crc: u32,
  pub rec_type: u8,
  pub key_len: usize,
  pub val_len: usize,
}

pub enum HeaderDecode {
  /// Fewer than 5 bytes available; can't even read crc + type.
  TooShort,
  /// crc, type and both lengths are all zero: a clean end-of-stream marker.
  EndOfStream,
  Header(RecordHeader, usize),
}

impl LogRecord {
  // Encode for log record, return bytes.
  // +---------+----------+----------------+------------------+---------+-----------+
  // |   Crc   |   Type   |   Key Length   |   Value Length   |   Key   |   Value   |
  // +---------+----------+----------------+------------------+---------+-----------+
  //  4bytes     1byte       n(n<=5) bytes     m(m<=5) bytes       x          y
  //
  // the crc covers everything after it.
  pub fn encode(&self) -> Vec<u8> {
    let mut body = BytesMut::with_capacity(self.residual_header_len() + self.key.len() + self.value.len());
    body.extend_from_slice(&[self.rec_type as u8]);
    encode_varint(self.key.len() as i64, &mut body);
    encode_varint(self.value.len() as i64, &mut body);
    body.extend_from_slice(&self.key);
    body.extend_from_slice(&self.value);

    let crc = crc32fast::hash(&body);

    let mut out = BytesMut::with_capacity(4 + body.len());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&body);
    out.to_vec()
  }

  pub fn get_crc(&self) -> u32 {
    let mut body = BytesMut::with_capacity(self.residual_header_len() + self.key.len() + self.value.len());
    body.extend_from_slice(&[self.rec_type as u8]);
    encode_varint(self.key.len() as i64, &mut body);
    encode_varint(self.value.len() as i64, &mut body);
    body.extend_from_slice(&self.key);
    body.extend_from_slice(&self.value);
    crc32fast::hash(&body)
  }

  fn residual_header_len(&self) -> usize {
    1 + varint_len(self.key.len() as i64) + varint_len(self.value.len() as i64)
  }

  // get encoded log record length
  pub fn encoded_length(&self) -> usize {
    4 + self.residual_header_len() + self.key.len() + self.value.len()
  }
}

/// crc of `[residual_header ‖ key ‖ value]`, where `residual_header` is
/// the type byte plus the two length varints (everything the on-disk crc
/// covers except itself).
pub fn verify_crc(residual_header: &[u8], key: &[u8], value: &[u8]) -> u32 {
  let mut hasher = crc32fast::Hasher::new();
  hasher.update(residual_header);
  hasher.update(key);
  hasher.update(value);
  hasher.finalize()
}

impl LogRecordPos {
  /// A compact private encoding for hint-file entries; round-trips
  /// through `decode_log_record_pos`, but is not part of the record
  /// format spec.
  pub fn encode(&self) -> Vec<u8> {
    let mut buf = BytesMut::new();
    crate::data::varint::encode_uvarint(self.file_id as u64, &mut buf);
    crate::data::varint::encode_uvarint(self.offset, &mut buf);
    crate::data::varint::encode_uvarint(self.size as u64, &mut buf);
    buf.to_vec()
  }
}

impl LogRecordType {
  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(LogRecordType::Normal),
      1 => Some(LogRecordType::Deleted),
      2 => Some(LogRecordType::TxnFinished),
      _ => None,
    }
  }
}

/// Fixed crc (4) + type (1) prefix, plus the worst case (5 bytes) for
/// each of the two length varints.
pub fn max_log_record_header_size() -> usize {
  4 + 1 + 5 + 5
}

/// Decodes the crc/type prefix and the two length varints from the start
/// of `buf`. `buf` may be a short, clamped read taken near EOF.
pub fn decode_header(buf: &[u8]) -> HeaderDecode {
  if buf.len() < 5 {
    return HeaderDecode::TooShort;
  }
  let crc = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
  let rec_type = buf[4];

  let rest = &buf[5..];
  let (key_len, n1) = match decode_varint(rest) {
    Some(v) => v,
    None => return HeaderDecode::TooShort,
  };
  let (val_len, n2) = match decode_varint(&rest[n1..]) {
    Some(v) => v,
    None => return HeaderDecode::TooShort,
  };

  if crc == 0 && rec_type == 0 && key_len == 0 && val_len == 0 {
    return HeaderDecode::EndOfStream;
  }

  HeaderDecode::Header(
    RecordHeader {
      crc,
      rec_type,
      key_len: key_len as usize,
      val_len: val_len as usize,
    },
    5 + n1 + n2,
  )
}

pub fn decode_log_record_pos(pos: Vec<u8>) -> LogRecordPos {
  let (file_id, n1) = crate::data::varint::decode_uvarint(&pos).expect("corrupt hint record");
  let (offset, n2) =
    crate::data::varint::decode_uvarint(&pos[n1..]).expect("corrupt hint record");
  let (size, _) =
    crate::data::varint::decode_uvarint(&pos[n1 + n2..]).expect("corrupt hint record");
  LogRecordPos {
    file_id: file_id as u32,
    offset,
    size: size as u32,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn split(encoded: &[u8]) -> (RecordHeader, usize) {
    match decode_header(encoded) {
      HeaderDecode::Header(h, n) => (h, n),
      _ => panic!("expected a parsed header"),
    }
  }

  #[test]
  fn test_log_record_encode_and_get_crc() {
    let verify = |record: &LogRecord| {
      let encoded = record.encode();
      assert_eq!(encoded.len(), record.encoded_length());

      let (header, header_len) = split(&encoded);
      assert_eq!(header.key_len, record.key.len());
      assert_eq!(header.val_len, record.value.len());

      let key = &encoded[header_len..header_len + header.key_len];
      let value = &encoded[header_len + header.key_len..encoded.len()];
      assert_eq!(key, record.key.as_slice());
      assert_eq!(value, record.value.as_slice());

      let residual = &encoded[4..header_len];
      let crc = verify_crc(residual, key, value);
      assert_eq!(crc, header.crc);
      assert_eq!(record.get_crc(), header.crc);
    };

    let rec1 = LogRecord {
      key: "key-a".as_bytes().to_vec(),
      value: "value-a".as_bytes().to_vec(),
      rec_type: LogRecordType::Normal,
    };
    verify(&rec1);

    let rec2 = LogRecord {
      key: "caskdb".as_bytes().to_vec(),
      value: vec![],
      rec_type: LogRecordType::Normal,
    };
    verify(&rec2);

    let rec3 = LogRecord {
      key: "key-b".as_bytes().to_vec(),
      value: "value-b".as_bytes().to_vec(),
      rec_type: LogRecordType::Deleted,
    };
    verify(&rec3);
  }

  #[test]
  fn corrupted_key_byte_fails_crc_check() {
    let record = LogRecord {
      key: "key-a".as_bytes().to_vec(),
      value: "value-a".as_bytes().to_vec(),
      rec_type: LogRecordType::Normal,
    };
    let mut encoded = record.encode();
    let key_offset = encoded.len() - record.value.len() - record.key.len();
    encoded[key_offset] ^= 0xff;

    let (header, header_len) = split(&encoded);
    let key = &encoded[header_len..header_len + header.key_len];
    let value = &encoded[header_len + header.key_len..encoded.len()];
    let crc = verify_crc(&encoded[4..header_len], key, value);
    assert_ne!(crc, header.crc);
  }

  #[test]
  fn zero_header_is_end_of_stream() {
    let zero = [0u8; 15];
    assert!(matches!(decode_header(&zero), HeaderDecode::EndOfStream));
  }

  #[test]
  fn short_buffer_is_too_short() {
    let buf = [0u8; 3];
    assert!(matches!(decode_header(&buf), HeaderDecode::TooShort));
  }

  #[test]
  fn location_encode_roundtrip() {
    let pos = LogRecordPos {
      file_id: 42,
      offset: 123456,
      size: 789,
    };
    let decoded = decode_log_record_pos(pos.encode());
    assert_eq!(decoded, pos);
  }
}
