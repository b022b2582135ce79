//! Binary save and load of a [`Numeric`].
//!
//! The file is a fixed header followed by flat arrays, in native byte order:
//!
//! ```text
//! header
//! D        min(n_row, n_col) + 1 entries   (trailing 0)
//! Rperm    n_row + 1                       (trailing n_row)
//! Cperm    n_col + 1                       (trailing n_col)
//! Lpos Lilen Lip   npiv + 1 each           (trailing 0)
//! Upos Uilen Uip   npiv + 1 each           (trailing 0)
//! Rs       n_row                           (only if scaled)
//! Upattern ulen + 1                        (only if ulen > 0)
//! arena    size units
//! ```
//!
//! Index arrays are `i64`. In `Lip`/`Uip` a chain start at offset `p` is stored as `-(p + 1)`; in
//! `Lpos`/`Upos` a missing removal or restore position is [`EMPTY`].

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    mem::size_of,
    path::Path,
};

use bytemuck::{Pod, Zeroable};
use log::debug;
use lu_arena::{Arena, Offset, Unit};
use nalgebra::DVector;

use crate::{
    constants::{EMPTY, FORMAT_VERSION, MAGIC, READ_CHUNK},
    Entry, Error, FactorStore, LColumn, Numeric, Scaling, URow,
};

const SCALE_NONE: u64 = 0;
const SCALE_DIVIDE: u64 = 1;
const SCALE_MULTIPLY: u64 = 2;

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct Header {
    magic: [u8; 8],
    version: u64,
    index_size: u64,
    entry_size: u64,
    unit_size: u64,
    n_row: u64,
    n_col: u64,
    npiv: u64,
    n1: u64,
    ulen: u64,
    lnz: u64,
    unz: u64,
    size: u64,
    ihead: u64,
    itail: u64,
    max_usage: u64,
    scale: u64,
}

impl<T: Entry> Numeric<T> {
    /// Writes the factorization to `path`.
    ///
    /// The object is validated first; an invalid object never creates the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.validate()?;
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_layout(&mut writer)?;
        writer.flush()?;
        debug!("saved numeric object to {}", path.as_ref().display());
        Ok(())
    }

    /// Writes the factorization to any byte sink, validating it first.
    pub fn save_to<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        self.validate()?;
        self.write_layout(&mut writer)
    }

    /// Reads a factorization saved by [`Self::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let numeric = Self::load_from(BufReader::new(File::open(path.as_ref())?))?;
        debug!("loaded numeric object from {}", path.as_ref().display());
        Ok(numeric)
    }

    /// Reads a factorization from any byte source. The result is validated before it is returned.
    pub fn load_from<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut header = Header::zeroed();
        reader.read_exact(bytemuck::bytes_of_mut(&mut header))?;
        if header.magic != MAGIC {
            return bad_format("bad magic");
        }
        if header.version != FORMAT_VERSION {
            return bad_format(format!("unknown version {}", header.version));
        }
        if header.index_size != size_of::<i64>() as u64
            || header.entry_size != size_of::<T>() as u64
            || header.unit_size != size_of::<Unit>() as u64
        {
            return bad_format(format!(
                "written with {}-byte indices, {}-byte entries and {}-byte units",
                header.index_size, header.entry_size, header.unit_size
            ));
        }

        let n_row = count(header.n_row, "n_row")?;
        let n_col = count(header.n_col, "n_col")?;
        let npiv = count(header.npiv, "npiv")?;
        let n1 = count(header.n1, "n1")?;
        let ulen = count(header.ulen, "ulen")?;
        let n_inner = n_row.min(n_col);
        if npiv > n_inner
            || n1 > npiv
            || ulen > n_col
            || header.ihead > header.itail
            || header.itail > header.size
        {
            return bad_format("inconsistent counters");
        }

        let diagonal = read_array::<T, _>(&mut reader, with_trailing(n_inner)?)?;
        let rperm = read_indices(&mut reader, with_trailing(n_row)?)?;
        let cperm = read_indices(&mut reader, with_trailing(n_col)?)?;
        let per_pivot = with_trailing(npiv)?;
        let lpos = read_array::<i64, _>(&mut reader, per_pivot)?;
        let lilen = read_indices(&mut reader, per_pivot)?;
        let lip = read_array::<i64, _>(&mut reader, per_pivot)?;
        let upos = read_array::<i64, _>(&mut reader, per_pivot)?;
        let uilen = read_indices(&mut reader, per_pivot)?;
        let uip = read_array::<i64, _>(&mut reader, per_pivot)?;

        let recip = match header.scale {
            SCALE_NONE => None,
            SCALE_DIVIDE => Some(false),
            SCALE_MULTIPLY => Some(true),
            flag => return bad_format(format!("unknown scaling flag {flag}")),
        };
        let scaling = match recip {
            Some(recip) => Some(Scaling {
                factors: DVector::from_vec(read_array::<T, _>(&mut reader, n_row)?),
                recip,
            }),
            None => None,
        };
        let upattern = if ulen > 0 {
            let mut upattern = read_indices(&mut reader, with_trailing(ulen)?)?;
            upattern.truncate(ulen);
            upattern
        } else {
            Vec::new()
        };

        let memory = read_array::<Unit, _>(&mut reader, count(header.size, "size")?)?;
        let arena = Arena::from_parts(
            memory,
            count(header.ihead, "ihead")?,
            count(header.itail, "itail")?,
            count(header.max_usage, "max_usage")?,
        )
        .ok_or_else(|| Error::BadFormat {
            reason: "arena cursors out of range".to_string(),
        })?;

        let mut l = Vec::with_capacity(npiv);
        let mut u = Vec::with_capacity(npiv);
        for k in 0..npiv {
            l.push(decode_l(k, n1, lip[k], lilen[k], lpos[k])?);
            u.push(decode_u(k, n1, uip[k], uilen[k], upos[k])?);
        }

        let numeric = Numeric {
            n_row,
            n_col,
            arena,
            store: FactorStore::from_parts(n1, l, u, upattern),
            rperm: truncated(rperm, n_row),
            cperm: truncated(cperm, n_col),
            diagonal: DVector::from_vec(truncated(diagonal, n_inner)),
            scaling,
            lnz: count(header.lnz, "lnz")?,
            unz: count(header.unz, "unz")?,
        };
        numeric.validate()?;
        Ok(numeric)
    }

    fn write_layout<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let store = &self.store;
        let npiv = store.npiv();
        let arena = &self.arena;
        let header = Header {
            magic: MAGIC,
            version: FORMAT_VERSION,
            index_size: size_of::<i64>() as u64,
            entry_size: size_of::<T>() as u64,
            unit_size: size_of::<Unit>() as u64,
            n_row: self.n_row as u64,
            n_col: self.n_col as u64,
            npiv: npiv as u64,
            n1: store.n1() as u64,
            ulen: store.upattern().len() as u64,
            lnz: self.lnz as u64,
            unz: self.unz as u64,
            size: arena.size() as u64,
            ihead: arena.head() as u64,
            itail: arena.tail() as u64,
            max_usage: arena.max_usage() as u64,
            scale: match &self.scaling {
                None => SCALE_NONE,
                Some(Scaling { recip: false, .. }) => SCALE_DIVIDE,
                Some(Scaling { recip: true, .. }) => SCALE_MULTIPLY,
            },
        };
        writer.write_all(bytemuck::bytes_of(&header))?;

        let mut diagonal: Vec<T> = self.diagonal.iter().copied().collect();
        diagonal.push(T::zero());
        write_array(writer, &diagonal)?;
        write_indices(writer, self.rperm.iter().copied().chain([self.n_row]))?;
        write_indices(writer, self.cperm.iter().copied().chain([self.n_col]))?;

        let mut pos = Vec::with_capacity(npiv + 1);
        let mut ilen = Vec::with_capacity(npiv + 1);
        let mut ip = Vec::with_capacity(npiv + 1);
        for col in store.l_columns() {
            let (p, removal) = match *col {
                LColumn::Singleton { offset, .. } => (encode_offset(offset), EMPTY),
                LColumn::ChainStart { offset, .. } => (encode_start(offset), EMPTY),
                LColumn::ChainContinuation { offset, removal, .. } => {
                    (encode_offset(offset), removal as i64)
                }
            };
            pos.push(removal);
            ilen.push(col.explicit_len() as i64);
            ip.push(p);
        }
        write_flat(writer, &mut pos, &mut ilen, &mut ip)?;

        for row in store.u_rows() {
            let (p, restore) = match *row {
                URow::Singleton { offset, .. } => (encode_offset(offset), EMPTY),
                URow::ChainStart { offset, .. } => (encode_start(offset), EMPTY),
                URow::ChainContinuation { offset, restore, .. } => {
                    (encode_offset(offset), restore.map_or(EMPTY, |pos| pos as i64))
                }
            };
            pos.push(restore);
            ilen.push(row.explicit_len() as i64);
            ip.push(p);
        }
        write_flat(writer, &mut pos, &mut ilen, &mut ip)?;

        if let Some(scaling) = &self.scaling {
            let factors: Vec<T> = scaling.factors.iter().copied().collect();
            write_array(writer, &factors)?;
        }
        let upattern = store.upattern();
        if !upattern.is_empty() {
            write_indices(writer, upattern.iter().copied().chain([0]))?;
        }
        write_array(writer, arena.units())?;
        Ok(())
    }
}

fn bad_format<X>(reason: impl Into<String>) -> Result<X, Error> {
    Err(Error::BadFormat {
        reason: reason.into(),
    })
}

fn count(value: u64, what: &str) -> Result<usize, Error> {
    usize::try_from(value).or_else(|_| bad_format(format!("{what} = {value} does not fit")))
}

/// Length of an array saved with one trailing slot.
fn with_trailing(len: usize) -> Result<usize, Error> {
    len.checked_add(1)
        .map_or_else(|| bad_format(format!("array of {len} entries")), Ok)
}

fn index(value: i64, what: &str) -> Result<usize, Error> {
    usize::try_from(value).or_else(|_| bad_format(format!("{what} = {value} is negative")))
}

fn truncated<X>(mut v: Vec<X>, len: usize) -> Vec<X> {
    v.truncate(len);
    v
}

fn encode_offset(offset: Offset) -> i64 {
    offset.get() as i64
}

fn encode_start(offset: Offset) -> i64 {
    -(offset.get() as i64) - 1
}

fn decode_l(k: usize, n1: usize, ip: i64, len: usize, pos: i64) -> Result<LColumn, Error> {
    Ok(if k < n1 {
        LColumn::Singleton {
            offset: Offset::new(index(ip, "Lip")?),
            len,
        }
    } else if ip < 0 {
        LColumn::ChainStart {
            offset: Offset::new(index(-(ip + 1), "Lip")?),
            len,
        }
    } else {
        LColumn::ChainContinuation {
            offset: Offset::new(index(ip, "Lip")?),
            len,
            removal: index(pos, "Lpos")?,
        }
    })
}

fn decode_u(k: usize, n1: usize, ip: i64, len: usize, pos: i64) -> Result<URow, Error> {
    Ok(if k < n1 {
        URow::Singleton {
            offset: Offset::new(index(ip, "Uip")?),
            len,
        }
    } else if ip < 0 {
        URow::ChainStart {
            offset: Offset::new(index(-(ip + 1), "Uip")?),
            len,
        }
    } else {
        URow::ChainContinuation {
            offset: Offset::new(index(ip, "Uip")?),
            len,
            restore: if pos == EMPTY { None } else { Some(index(pos, "Upos")?) },
        }
    })
}

/// Writes the three per-pivot arrays with their trailing slot and empties them for reuse.
fn write_flat<W: Write>(
    writer: &mut W,
    pos: &mut Vec<i64>,
    ilen: &mut Vec<i64>,
    ip: &mut Vec<i64>,
) -> Result<(), Error> {
    for array in [pos, ilen, ip] {
        array.push(0);
        write_array(writer, array)?;
        array.clear();
    }
    Ok(())
}

fn write_array<X: Pod, W: Write>(writer: &mut W, data: &[X]) -> Result<(), Error> {
    writer.write_all(bytemuck::cast_slice(data))?;
    Ok(())
}

fn write_indices<W: Write>(writer: &mut W, indices: impl Iterator<Item = usize>) -> Result<(), Error> {
    let data: Vec<i64> = indices.map(|i| i as i64).collect();
    write_array(writer, &data)
}

/// Reads `len` objects, at most [`READ_CHUNK`] at a time.
///
/// Memory grows with what was actually read, so a length that the stream cannot back ends in an
/// `Io` error rather than a huge allocation.
fn read_array<X: Pod, R: Read>(reader: &mut R, len: usize) -> Result<Vec<X>, Error> {
    let mut data = Vec::with_capacity(len.min(READ_CHUNK));
    while data.len() < len {
        let start = data.len();
        data.resize(start + (len - start).min(READ_CHUNK), X::zeroed());
        reader.read_exact(bytemuck::cast_slice_mut(&mut data[start..]))?;
    }
    Ok(data)
}

fn read_indices<R: Read>(reader: &mut R, len: usize) -> Result<Vec<usize>, Error> {
    read_array::<i64, _>(reader, len)?
        .into_iter()
        .map(|i| index(i, "index"))
        .collect()
}
