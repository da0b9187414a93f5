//! Row and batch frame encoding
//!
//! One committed batch is one frame:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, whole frame including this field)
//! +------------------+
//! | Row Count        | (u32 LE)
//! +------------------+
//! | Rows             | (row encodings, back to back)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of every byte above)
//! +------------------+
//! ```
//!
//! Strings are length-prefixed (u32 LE) UTF-8. Optional integers carry a
//! presence byte. Reals are stored as their IEEE-754 bits. A joined row is
//! its title encoding followed by its rating encoding.

use super::checksum::compute_checksum;
use super::errors::{StorageError, StorageResult};
use crate::record::{AdultFlag, JoinedRecord, RatingRecord, Record, TitleRecord};

/// Bytes before the first row
pub const FRAME_HEADER_SIZE: usize = 8;

/// Header plus trailing checksum
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_SIZE + 4;

/// A row that can be written into a frame.
pub trait RowCodec: Clone + Sized {
    /// Appends the row encoding to `buf`.
    fn encode_row(&self, buf: &mut Vec<u8>);

    /// Decodes one row, advancing the reader.
    fn decode_row(reader: &mut RowReader<'_>) -> Result<Self, String>;
}

/// A feed record the store keeps in its own table.
pub trait StoredRow: Record + RowCodec {}

impl<T: Record + RowCodec> StoredRow for T {}

/// Cursor over the row section of a frame
pub struct RowReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RowReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| format!("row truncated at byte {} (need {} more)", self.pos, n))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, String> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64, String> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_string(&mut self) -> Result<String, String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8: {}", e))
    }

    pub fn read_opt_u16(&mut self) -> Result<Option<u16>, String> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_u16()?)),
            other => Err(format!("invalid presence byte {}", other)),
        }
    }

    pub fn read_opt_u32(&mut self) -> Result<Option<u32>, String> {
        match self.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.read_u32()?)),
            other => Err(format!("invalid presence byte {}", other)),
        }
    }
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_opt_u16(buf: &mut Vec<u8>, v: Option<u16>) {
    match v {
        Some(v) => {
            buf.push(1);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        None => buf.push(0),
    }
}

fn put_opt_u32(buf: &mut Vec<u8>, v: Option<u32>) {
    match v {
        Some(v) => {
            buf.push(1);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        None => buf.push(0),
    }
}

impl RowCodec for TitleRecord {
    fn encode_row(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.id);
        put_string(buf, &self.title_type);
        put_string(buf, &self.primary_title);
        put_string(buf, &self.original_title);
        buf.push(match self.is_adult {
            AdultFlag::No => 0,
            AdultFlag::Yes => 1,
            AdultFlag::Unknown => 2,
        });
        put_opt_u16(buf, self.start_year);
        put_opt_u16(buf, self.end_year);
        put_opt_u32(buf, self.runtime_minutes);
        buf.extend_from_slice(&(self.genres.len() as u32).to_le_bytes());
        for genre in &self.genres {
            put_string(buf, genre);
        }
    }

    fn decode_row(reader: &mut RowReader<'_>) -> Result<Self, String> {
        let id = reader.read_string()?;
        let title_type = reader.read_string()?;
        let primary_title = reader.read_string()?;
        let original_title = reader.read_string()?;
        let is_adult = match reader.read_u8()? {
            0 => AdultFlag::No,
            1 => AdultFlag::Yes,
            2 => AdultFlag::Unknown,
            other => return Err(format!("invalid adult flag {}", other)),
        };
        let start_year = reader.read_opt_u16()?;
        let end_year = reader.read_opt_u16()?;
        let runtime_minutes = reader.read_opt_u32()?;
        let genre_count = reader.read_u32()? as usize;
        let mut genres = Vec::with_capacity(genre_count.min(16));
        for _ in 0..genre_count {
            genres.push(reader.read_string()?);
        }
        Ok(TitleRecord {
            id,
            title_type,
            primary_title,
            original_title,
            is_adult,
            start_year,
            end_year,
            runtime_minutes,
            genres,
        })
    }
}

impl RowCodec for RatingRecord {
    fn encode_row(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.id);
        buf.extend_from_slice(&self.average_rating.to_bits().to_le_bytes());
        buf.extend_from_slice(&self.num_votes.to_le_bytes());
    }

    fn decode_row(reader: &mut RowReader<'_>) -> Result<Self, String> {
        Ok(RatingRecord {
            id: reader.read_string()?,
            average_rating: reader.read_f64()?,
            num_votes: reader.read_u64()?,
        })
    }
}

impl RowCodec for JoinedRecord {
    fn encode_row(&self, buf: &mut Vec<u8>) {
        self.title.encode_row(buf);
        self.rating.encode_row(buf);
    }

    fn decode_row(reader: &mut RowReader<'_>) -> Result<Self, String> {
        let title = TitleRecord::decode_row(reader)?;
        let rating = RatingRecord::decode_row(reader)?;
        if title.id != rating.id {
            return Err(format!(
                "joined row pairs title '{}' with rating '{}'",
                title.id, rating.id
            ));
        }
        Ok(JoinedRecord { title, rating })
    }
}

/// Encodes a batch of rows as one checksummed frame.
pub fn encode_frame<R: RowCodec>(rows: &[R]) -> StorageResult<Vec<u8>> {
    encode_rows(rows.iter())
}

/// Encodes borrowed rows as one checksummed frame.
///
/// Fails without side effects if the row count or the frame length does not
/// fit the `u32` header fields.
pub fn encode_rows<'a, R, I>(rows: I) -> StorageResult<Vec<u8>>
where
    R: RowCodec + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD);
    frame.extend_from_slice(&[0u8; FRAME_HEADER_SIZE]);
    let mut count = 0usize;
    for row in rows {
        row.encode_row(&mut frame);
        count += 1;
    }

    let total = frame.len() + 4;
    let too_large = || StorageError::FrameTooLarge {
        rows: count,
        bytes: total,
    };
    let row_count = u32::try_from(count).map_err(|_| too_large())?;
    let frame_length = u32::try_from(total).map_err(|_| too_large())?;

    frame[0..4].copy_from_slice(&frame_length.to_le_bytes());
    frame[4..8].copy_from_slice(&row_count.to_le_bytes());
    let checksum = compute_checksum(&frame);
    frame.extend_from_slice(&checksum.to_le_bytes());
    Ok(frame)
}

/// Reads the declared length of a frame from its first four bytes.
pub fn frame_length(header: &[u8; 4]) -> usize {
    u32::from_le_bytes(*header) as usize
}

/// Verifies and decodes a complete frame. `table` and `offset` are only used
/// for errors.
pub fn decode_frame<R: RowCodec>(
    frame: &[u8],
    table: &'static str,
    offset: u64,
) -> StorageResult<Vec<R>> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(StorageError::corruption_at_offset(
            table,
            offset,
            format!("frame of {} bytes is shorter than its header", frame.len()),
        ));
    }

    let declared = frame_length(&[frame[0], frame[1], frame[2], frame[3]]);
    if declared != frame.len() {
        return Err(StorageError::corruption_at_offset(
            table,
            offset,
            format!("frame declares {} bytes, found {}", declared, frame.len()),
        ));
    }

    let checksum_offset = frame.len() - 4;
    let stored = u32::from_le_bytes([
        frame[checksum_offset],
        frame[checksum_offset + 1],
        frame[checksum_offset + 2],
        frame[checksum_offset + 3],
    ]);
    let computed = compute_checksum(&frame[..checksum_offset]);
    if stored != computed {
        return Err(StorageError::corruption_at_offset(
            table,
            offset,
            format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            ),
        ));
    }

    let row_count = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]) as usize;
    let mut reader = RowReader::new(&frame[FRAME_HEADER_SIZE..checksum_offset]);
    let mut rows = Vec::with_capacity(row_count);
    for _ in 0..row_count {
        let row = R::decode_row(&mut reader)
            .map_err(|reason| StorageError::corruption_at_offset(table, offset, reason))?;
        rows.push(row);
    }
    if !reader.is_exhausted() {
        return Err(StorageError::corruption_at_offset(
            table,
            offset,
            "trailing bytes after last row",
        ));
    }
    Ok(rows)
}
