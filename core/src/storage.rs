//! Binærformatet for cachefilen.
//!
//! ```text
//! u32 version
//! u32 count[14]        meanmax{watts,hr,cad,nm,kph,xpower,np}, dist{samme}
//! 14 blokker à count[i] x u32
//! ```
//!
//! Alt skrives i maskinens egen byte-rekkefølge. Filene er lokale og deles
//! aldri mellom maskiner.

use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{CacheError, Result, StaleReason};

pub const RIDE_CACHE_VERSION: u32 = 1;
pub const SLOT_COUNT: usize = 14;
pub const HEADER_LEN: usize = 4 * (1 + SLOT_COUNT);

/// De 14 blokkene i fast rekkefølge (se `types::slot`).
pub type Blocks = [Vec<u32>; SLOT_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHeader {
    pub version: u32,
    pub counts: [u32; SLOT_COUNT],
}

impl CacheHeader {
    pub fn for_blocks(version: u32, blocks: &Blocks) -> Self {
        let mut counts = [0u32; SLOT_COUNT];
        for (c, b) in counts.iter_mut().zip(blocks.iter()) {
            *c = b.len() as u32;
        }
        Self { version, counts }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let words = std::iter::once(self.version).chain(self.counts.iter().copied());
        for (chunk, w) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&w.to_ne_bytes());
        }
        out
    }

    /// `None` hvis det er færre enn `HEADER_LEN` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let mut words = bytes[..HEADER_LEN]
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]));
        let version = words.next()?;
        let mut counts = [0u32; SLOT_COUNT];
        for (c, w) in counts.iter_mut().zip(words) {
            *c = w;
        }
        Some(Self { version, counts })
    }

    pub fn body_len(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64 * 4).sum()
    }
}

/// Cachefilen ligger ved siden av opptaket, med endelsen byttet ut.
pub fn cache_path_for(ride_file: &Path, extension: &str) -> PathBuf {
    ride_file.with_extension(extension)
}

pub fn encode(version: u32, blocks: &Blocks) -> Vec<u8> {
    let header = CacheHeader::for_blocks(version, blocks);
    let mut out = Vec::with_capacity(HEADER_LEN + header.body_len() as usize);
    out.extend_from_slice(&header.to_bytes());
    for block in blocks {
        for v in block {
            out.extend_from_slice(&v.to_ne_bytes());
        }
    }
    out
}

/// Dekoder en hel fil. Versjonsavvik gir `CacheStale`, feil lengde `CacheCorrupt`;
/// ingen halvleste arrays slipper ut.
pub fn decode(path: &Path, bytes: &[u8], expected_version: u32) -> Result<Blocks> {
    let header = CacheHeader::from_bytes(bytes)
        .ok_or_else(|| CacheError::corrupt(path, format!("short header ({} bytes)", bytes.len())))?;
    check_version(path, &header, expected_version)?;

    let mut blocks: Blocks = Default::default();
    let mut offset = HEADER_LEN;
    for (i, (block, &count)) in blocks.iter_mut().zip(header.counts.iter()).enumerate() {
        let need = count as usize * 4;
        let Some(raw) = bytes.get(offset..offset + need) else {
            let have = bytes.len().saturating_sub(offset) / 4;
            return Err(CacheError::corrupt(
                path,
                format!("block {i}: header declares {count} values, file has {have}"),
            ));
        };
        *block = raw
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        offset += need;
    }
    if offset != bytes.len() {
        return Err(CacheError::corrupt(
            path,
            format!("{} trailing bytes after last block", bytes.len() - offset),
        ));
    }
    Ok(blocks)
}

fn check_version(path: &Path, header: &CacheHeader, expected: u32) -> Result<()> {
    if header.version != expected {
        return Err(CacheError::CacheStale {
            path: path.to_path_buf(),
            reason: StaleReason::Version { expected, found: header.version },
        });
    }
    Ok(())
}

fn io_error(path: &Path, e: io::Error) -> CacheError {
    match e.kind() {
        ErrorKind::NotFound => CacheError::CacheMissing { path: path.to_path_buf() },
        _ => CacheError::corrupt(path, format!("read failed: {e}")),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| io_error(path, e))
}

/// Leser bare de første `HEADER_LEN` bytene (for ferskhetssjekk uten å
/// laste data); kroppslengden sjekkes mot filstørrelsen.
pub fn read_header(path: &Path, expected_version: u32) -> Result<CacheHeader> {
    let mut file = fs::File::open(path).map_err(|e| io_error(path, e))?;
    let file_len = file.metadata().map_err(|e| io_error(path, e))?.len();
    let mut buf = [0u8; HEADER_LEN];
    file.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            CacheError::corrupt(path, format!("short header ({file_len} bytes)"))
        }
        _ => io_error(path, e),
    })?;
    let header = CacheHeader::from_bytes(&buf)
        .ok_or_else(|| CacheError::corrupt(path, format!("short header ({file_len} bytes)")))?;
    check_version(path, &header, expected_version)?;
    let body = file_len.saturating_sub(HEADER_LEN as u64);
    if body != header.body_len() {
        return Err(CacheError::corrupt(
            path,
            format!("body is {body} bytes, header declares {}", header.body_len()),
        ));
    }
    Ok(header)
}

pub fn read_cache(path: &Path, expected_version: u32) -> Result<Blocks> {
    let bytes = read_bytes(path)?;
    let blocks = decode(path, &bytes, expected_version)?;
    debug!("read {} ({} bytes)", path.display(), bytes.len());
    Ok(blocks)
}

/// Skriver via en midlertidig fil + rename, så en avbrutt skriving
/// aldri etterlater en halv cachefil.
pub fn write_cache(path: &Path, version: u32, blocks: &Blocks) -> Result<()> {
    let bytes = encode(version, blocks);
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let written = write_file(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp);
        return Err(CacheError::WriteFailed { path: path.to_path_buf(), source });
    }
    debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}
