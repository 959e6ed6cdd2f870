//! Sparse binary encoding of histograms
//!
//! A record is a fixed 48-byte header followed by one 12-byte entry per
//! nonzero bin. All fields are little-endian:
//!
//! ```text
//! header: id u32 | sum_of_squares f64 | sum_of_values f64 | sum_of_weights f64
//!         | min f64 | max f64 | bins_used u32
//! bin:    index u32 | weight f64
//! ```
//!
//! The bin count and total weight are not part of the record; they belong to
//! the enclosing profile file and are passed back in when reading.

use crate::config::HistogramConfig;
use crate::stats::Stats;
use crate::types::Histogram;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use profile_core::tolerance::{snap_to_zero as snap, FP_FUDGE_EPS};
use profile_core::{Error, Result};
use std::io::{Read, Write};
use tracing::{error, warn};

/// Encoded size of a record header
pub const HEADER_LEN: usize = 48;

/// Encoded size of one bin entry
pub const BIN_RECORD_LEN: usize = 12;

/// Fixed part of a serialized histogram
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistogramHeader {
    pub id: u32,
    pub sum_of_squares: f64,
    pub sum_of_values: f64,
    pub sum_of_weights: f64,
    pub min: f64,
    pub max: f64,
    pub bins_used: u32,
}

impl HistogramHeader {
    /// Encode the header fields in record order
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.id)?;
        w.write_f64::<LittleEndian>(self.sum_of_squares)?;
        w.write_f64::<LittleEndian>(self.sum_of_values)?;
        w.write_f64::<LittleEndian>(self.sum_of_weights)?;
        w.write_f64::<LittleEndian>(self.min)?;
        w.write_f64::<LittleEndian>(self.max)?;
        w.write_u32::<LittleEndian>(self.bins_used)?;
        Ok(())
    }

    /// Decode a header, failing with an I/O error on short input
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            id: r.read_u32::<LittleEndian>()?,
            sum_of_squares: r.read_f64::<LittleEndian>()?,
            sum_of_values: r.read_f64::<LittleEndian>()?,
            sum_of_weights: r.read_f64::<LittleEndian>()?,
            min: r.read_f64::<LittleEndian>()?,
            max: r.read_f64::<LittleEndian>()?,
            bins_used: r.read_u32::<LittleEndian>()?,
        })
    }
}

impl Histogram {
    /// Write this histogram as a sparse record tagged with `id`
    ///
    /// Points write only the header.
    pub fn serialize<W: Write>(&self, id: u32, w: &mut W) -> Result<()> {
        if self.stats.sum_of_weights - self.stats.total_weight > FP_FUDGE_EPS {
            warn!(
                "(#{}) serialize: sum of weights {} exceeds total {} (delta = {})",
                self.id,
                self.stats.sum_of_weights,
                self.stats.total_weight,
                self.stats.sum_of_weights - self.stats.total_weight
            );
        }

        // near-zero values go out as exact zeros so output is deterministic
        let used: Vec<(u32, f64)> = self
            .bins
            .iter()
            .enumerate()
            .filter_map(|(i, &w)| {
                let w = snap(w);
                (w != 0.0).then_some((i as u32, w))
            })
            .collect();

        let header = HistogramHeader {
            id,
            sum_of_squares: snap(self.stats.sum_of_squares),
            sum_of_values: snap(self.stats.sum_of_values),
            sum_of_weights: snap(self.stats.sum_of_weights),
            min: snap(self.min),
            max: snap(self.max),
            bins_used: if self.is_point() { 0 } else { used.len() as u32 },
        };

        if header.min == 0.0 && header.max > 0.0 {
            warn!("(#{}) writing non-point histogram with 0 lower bound: {}", self.id, id);
        }

        header.write_to(w)?;

        // no bins for a point
        if self.is_point() {
            return Ok(());
        }

        for (index, weight) in used {
            w.write_u32::<LittleEndian>(index)?;
            w.write_f64::<LittleEndian>(weight)?;
        }
        Ok(())
    }

    /// Read one record, returning its id and the histogram
    ///
    /// `bin_count` and `total_weight` come from the enclosing file's schema.
    pub fn deserialize<R: Read>(r: &mut R, bin_count: usize, total_weight: f64) -> Result<(u32, Histogram)> {
        let header = HistogramHeader::read_from(r)?;

        let mut h = Histogram::new();
        h.stats = Stats {
            sum_of_squares: header.sum_of_squares,
            sum_of_values: header.sum_of_values,
            sum_of_weights: header.sum_of_weights,
            total_weight,
        };

        if header.sum_of_weights - total_weight > FP_FUDGE_EPS {
            warn!(
                "(#{}) deserialize: sum of weights {} exceeds total {} (delta = {})",
                h.id,
                header.sum_of_weights,
                total_weight,
                header.sum_of_weights - total_weight
            );
        }

        h.min = header.min;
        h.max = header.max;
        if h.min == 0.0 && h.max != 0.0 {
            warn!("(#{}) read non-point histogram with 0 lower bound: {}", h.id, header.id);
        }

        // points have no bins
        if h.is_point() {
            return Ok((header.id, h));
        }

        if bin_count == 0 {
            return Err(Error::invalid_bin_count(bin_count));
        }

        if header.bins_used as usize > bin_count {
            error!(
                "(#{}) histogram bin data corrupt: {} of {} bins used",
                h.id, header.bins_used, bin_count
            );
            return Err(Error::CorruptRecord {
                used: header.bins_used,
                bins: bin_count,
            });
        }

        h.set_bin_count(bin_count);

        for _ in 0..header.bins_used {
            let index = r.read_u32::<LittleEndian>()?;
            let weight = r.read_f64::<LittleEndian>()?;
            match h.bins.get_mut(index as usize) {
                Some(bin) => *bin = weight,
                None => {
                    return Err(Error::BinOutOfRange {
                        index,
                        bins: bin_count,
                    })
                }
            }
        }

        Ok((header.id, h))
    }

    /// Encoded size of this histogram's record
    pub fn encoded_len(&self) -> usize {
        if self.is_point() {
            return HEADER_LEN;
        }
        HEADER_LEN + self.bins_used() * BIN_RECORD_LEN
    }
}

/// Writes consecutive histogram records to a byte sink
#[derive(Debug)]
pub struct HistogramWriter<W: Write> {
    inner: W,
    config: HistogramConfig,
    written: usize,
}

impl<W: Write> HistogramWriter<W> {
    /// Wrap a sink for files laid out with `config`
    pub fn new(inner: W, config: HistogramConfig) -> Self {
        Self {
            inner,
            config,
            written: 0,
        }
    }

    /// Append `h` as record `id`
    ///
    /// Histograms laid out with a different bin count than the file's are
    /// rejected since they could not be read back.
    pub fn write(&mut self, id: u32, h: &Histogram) -> Result<()> {
        if !h.is_point() && h.bin_count() != self.config.bin_count {
            return Err(Error::InvalidInput(format!(
                "histogram #{} has {} bins, file uses {}",
                h.id(),
                h.bin_count(),
                self.config.bin_count
            )));
        }
        h.serialize(id, &mut self.inner)?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads consecutive histogram records from a byte source
#[derive(Debug)]
pub struct HistogramReader<R: Read> {
    inner: R,
    config: HistogramConfig,
}

impl<R: Read> HistogramReader<R> {
    /// Wrap a source for files laid out with `config`
    pub fn new(inner: R, config: HistogramConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next record, attributing `total_weight` to it
    pub fn read(&mut self, total_weight: f64) -> Result<(u32, Histogram)> {
        Histogram::deserialize(&mut self.inner, self.config.bin_count, total_weight)
    }

    /// Recover the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn sample() -> Histogram {
        let mut h = Histogram::new();
        for (v, w) in [(1.5, 2.0), (3.5, 1.0), (0.0, 1.0)] {
            h.add_to_list(v, w);
        }
        h.build_from_list(4, 4.0, 1.0, 5.0);
        h
    }

    #[test]
    fn test_round_trip() {
        let h = sample();
        let mut buf = Vec::new();
        h.serialize(7, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN + 2 * BIN_RECORD_LEN);
        assert_eq!(buf.len(), h.encoded_len());

        let (id, back) = Histogram::deserialize(&mut Cursor::new(buf), 4, 4.0).unwrap();
        assert_eq!(id, 7);
        assert_eq!(back.min(), h.min());
        assert_eq!(back.max(), h.max());
        assert_eq!(back.total_weight(), 4.0);
        assert_abs_diff_eq!(back.stats().sum_of_squares, h.stats().sum_of_squares, epsilon = 1e-9);
        assert_eq!(back.bins(), h.bins());
    }

    #[test]
    fn test_sub_epsilon_values_written_as_zero() {
        let mut h = sample();
        h.add_to_bin(1, 5e-11);
        h.stats.sum_of_squares = 3e-11;

        let mut buf = Vec::new();
        h.serialize(4, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN + 2 * BIN_RECORD_LEN);
        assert_eq!(buf.len(), h.encoded_len());

        let header = HistogramHeader::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(header.bins_used, 2);
        assert_eq!(header.sum_of_squares, 0.0);

        let (_, back) = Histogram::deserialize(&mut Cursor::new(buf), 4, 4.0).unwrap();
        assert_eq!(back.bins(), &[2.0, 0.0, 1.0, 0.0]);
        assert_eq!(back.stats().sum_of_squares, 0.0);
    }

    #[test]
    fn test_point_writes_header_only() {
        let p = Histogram::point(3.0, 2.0, 5.0);
        let mut buf = Vec::new();
        p.serialize(1, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);

        let (_, back) = Histogram::deserialize(&mut Cursor::new(buf), 4, 5.0).unwrap();
        assert!(back.is_point());
        assert_eq!(back.min(), 3.0);
        assert_eq!(back.zero_weight(), 3.0);
        assert!(back.bins().is_empty());
    }

    #[test]
    fn test_layout_is_little_endian() {
        let p = Histogram::point(3.0, 2.0, 2.0);
        let mut buf = Vec::new();
        p.serialize(0x0102_0304, &mut buf).unwrap();
        assert_eq!(&buf[..4], &[4, 3, 2, 1]);
        assert_eq!(&buf[28..36], &3.0f64.to_le_bytes());
    }

    #[test]
    fn test_short_header_is_io_error() {
        let err = Histogram::deserialize(&mut Cursor::new(vec![0u8; 20]), 4, 1.0).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_corrupt_bins_used() {
        let h = sample();
        let mut buf = Vec::new();
        h.serialize(1, &mut buf).unwrap();

        let err = Histogram::deserialize(&mut Cursor::new(buf), 1, 4.0).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { used: 2, bins: 1 }));
    }

    #[test]
    fn test_truncated_bins_is_io_error() {
        let h = sample();
        let mut buf = Vec::new();
        h.serialize(1, &mut buf).unwrap();
        buf.truncate(HEADER_LEN + BIN_RECORD_LEN + 3);

        let err = Histogram::deserialize(&mut Cursor::new(buf), 4, 4.0).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_bin_index_out_of_range() {
        let h = sample();
        let mut buf = Vec::new();
        h.serialize(1, &mut buf).unwrap();

        // rewrite the second bin's index
        let at = HEADER_LEN + BIN_RECORD_LEN;
        buf[at..at + 4].copy_from_slice(&9u32.to_le_bytes());

        let err = Histogram::deserialize(&mut Cursor::new(buf), 4, 4.0).unwrap_err();
        assert!(matches!(err, Error::BinOutOfRange { index: 9, bins: 4 }));
    }

    #[test]
    fn test_writer_reader_stream() {
        let config = HistogramConfig::new(4);
        let mut writer = HistogramWriter::new(Vec::new(), config.clone());
        writer.write(1, &sample()).unwrap();
        writer.write(2, &Histogram::point(2.0, 1.0, 1.0)).unwrap();
        assert_eq!(writer.written(), 2);

        let wrong = HistogramConfig::new(8);
        let mut other = HistogramWriter::new(Vec::new(), wrong);
        assert!(other.write(3, &sample()).is_err());

        let mut reader = HistogramReader::new(Cursor::new(writer.into_inner()), config);
        let (id, first) = reader.read(4.0).unwrap();
        assert_eq!(id, 1);
        assert_eq!(first.bins(), sample().bins());
        let (id, second) = reader.read(1.0).unwrap();
        assert_eq!(id, 2);
        assert!(second.is_point());
        assert!(reader.read(1.0).unwrap_err().is_io());
    }
}
