//! Read-only ISO9660 access to images of the original installation media.
//!
//! Both cooked images (2048 bytes per sector) and raw images (2352 bytes per sector, as ripped
//! from PSX discs) are supported. The complete directory tree is indexed when the image is
//! opened, so `exists` never touches the disc.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::*;
use crate::utils::FastHashMap;

use super::{relative_path, wildcard_match, FileSystem, Stream};

const SECTOR_SIZE: u64 = 2048;
const RAW_SECTOR_SIZE: u64 = 2352;
const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

const VOLUME_DESCRIPTOR_START: u32 = 16;
const MAX_VOLUME_DESCRIPTORS: u32 = 32;
const MAX_DIRECTORY_DEPTH: usize = 32;

const PRIMARY_VOLUME_DESCRIPTOR: u8 = 1;
const VOLUME_DESCRIPTOR_TERMINATOR: u8 = 255;
const ROOT_RECORD_OFFSET: usize = 156;
const MIN_RECORD_LEN: usize = 34;
const FLAG_DIRECTORY: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectorLayout {
    Cooked,
    Raw { data_offset: u64 },
}

impl SectorLayout {
    #[inline]
    fn offset_of(self, lba: u64) -> u64 {
        match self {
            SectorLayout::Cooked => lba * SECTOR_SIZE,
            SectorLayout::Raw { data_offset } => lba * RAW_SECTOR_SIZE + data_offset,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    lba: u32,
    len: u32,
}

struct Record {
    name: String,
    extent: Extent,
    is_dir: bool,
}

pub struct DiscImage {
    fs_path: String,
    layout: SectorLayout,
    files: FastHashMap<String, Extent>,
    directories: FastHashMap<String, Vec<String>>,
}

impl DiscImage {
    pub fn new<T: AsRef<str>>(path: T) -> Result<Self> {
        let fs_path = path.as_ref().to_owned();
        info!("Creates disc image based virtual file system at {:?}.", fs_path);

        let mut file = File::open(&fs_path).map_err(|_| Error::FileNotFound(fs_path.clone()))?;
        let layout = DiscImage::detect(&mut file)?;

        let mut image = DiscImage {
            fs_path,
            layout,
            files: FastHashMap::default(),
            directories: FastHashMap::default(),
        };

        let root = image.root_record(&mut file)?;
        image.directories.insert(String::new(), Vec::new());
        image.index(&mut file, "", root.extent, 0)?;

        debug!(
            "Indexed {} files of disc image {:?} ({:?}).",
            image.files.len(),
            image.fs_path,
            image.layout
        );

        Ok(image)
    }

    fn detect(file: &mut File) -> Result<SectorLayout> {
        let len = file.metadata()?.len();

        let mut header = [0; 16];
        if len >= header.len() as u64 {
            file.seek(SeekFrom::Start(0))?;
            file.read_exact(&mut header)?;

            if header[0..12] == SYNC_PATTERN[..] && len % RAW_SECTOR_SIZE == 0 {
                return match header[15] {
                    1 => Ok(SectorLayout::Raw { data_offset: 16 }),
                    // Mode 2 XA, the 8 bytes sub-header follows the header.
                    2 => Ok(SectorLayout::Raw { data_offset: 24 }),
                    mode => Err(Error::DiscImage(format!("unsupported sector mode {}", mode))),
                };
            }
        }

        Ok(SectorLayout::Cooked)
    }

    fn read_sectors(&self, file: &mut File, extent: Extent) -> Result<Vec<u8>> {
        let mut buf = vec![0; extent.len as usize];

        for (index, chunk) in buf.chunks_mut(SECTOR_SIZE as usize).enumerate() {
            let lba = u64::from(extent.lba) + index as u64;
            file.seek(SeekFrom::Start(self.layout.offset_of(lba)))?;
            file.read_exact(chunk)?;
        }

        Ok(buf)
    }

    fn root_record(&self, file: &mut File) -> Result<Record> {
        for lba in VOLUME_DESCRIPTOR_START..VOLUME_DESCRIPTOR_START + MAX_VOLUME_DESCRIPTORS {
            let extent = Extent {
                lba,
                len: SECTOR_SIZE as u32,
            };

            let sector = self.read_sectors(file, extent)?;
            if &sector[1..6] != b"CD001" {
                return Err(Error::DiscImage(format!(
                    "{} has no ISO9660 volume descriptor at sector {}",
                    self.fs_path, lba
                )));
            }

            match sector[0] {
                PRIMARY_VOLUME_DESCRIPTOR => {
                    return DiscImage::parse_record(&sector[ROOT_RECORD_OFFSET..]).ok_or_else(
                        || Error::DiscImage("malformed root directory record".to_owned()),
                    );
                }
                VOLUME_DESCRIPTOR_TERMINATOR => break,
                _ => {}
            }
        }

        Err(Error::DiscImage(format!(
            "{} has no primary volume descriptor",
            self.fs_path
        )))
    }

    fn index(&mut self, file: &mut File, dir: &str, extent: Extent, depth: usize) -> Result<()> {
        if depth > MAX_DIRECTORY_DEPTH {
            return Err(Error::DiscImage(format!(
                "directory {:?} is nested too deeply",
                dir
            )));
        }

        let buf = self.read_sectors(file, extent)?;
        let mut offset = 0;

        while offset < buf.len() {
            let len = buf[offset] as usize;
            if len == 0 {
                // Records never cross sector boundaries, the rest of this sector is padding.
                offset = (offset / SECTOR_SIZE as usize + 1) * SECTOR_SIZE as usize;
                continue;
            }

            let record = buf
                .get(offset..offset + len)
                .and_then(DiscImage::parse_record)
                .ok_or_else(|| {
                    Error::DiscImage(format!("malformed directory record in {:?}", dir))
                })?;
            offset += len;

            if record.name == "." || record.name == ".." {
                continue;
            }

            let key = if dir.is_empty() {
                record.name.to_uppercase()
            } else {
                format!("{}/{}", dir, record.name.to_uppercase())
            };

            self.directories
                .entry(dir.to_owned())
                .or_insert_with(Vec::new)
                .push(record.name.clone());

            if record.is_dir {
                self.directories.entry(key.clone()).or_insert_with(Vec::new);
                self.index(file, &key, record.extent, depth + 1)?;
            } else {
                self.files.insert(key, record.extent);
            }
        }

        Ok(())
    }

    fn parse_record(buf: &[u8]) -> Option<Record> {
        let len = *buf.get(0)? as usize;
        if len < MIN_RECORD_LEN || len > buf.len() {
            return None;
        }

        let name_len = buf[32] as usize;
        let name = buf.get(33..33 + name_len)?;
        let name = match name {
            [0] => ".".to_owned(),
            [1] => "..".to_owned(),
            _ => {
                let name = String::from_utf8_lossy(name);
                let name = name.split(';').next().unwrap_or("");
                name.trim_end_matches('.').to_owned()
            }
        };

        Some(Record {
            name,
            extent: Extent {
                lba: LittleEndian::read_u32(&buf[2..6]),
                len: LittleEndian::read_u32(&buf[10..14]),
            },
            is_dir: buf[25] & FLAG_DIRECTORY != 0,
        })
    }

    fn key(path: &str) -> String {
        let path = relative_path(path);
        let path = path.split(';').next().unwrap_or("");
        path.trim_end_matches('/').to_uppercase()
    }
}

impl FileSystem for DiscImage {
    fn open(&self, file: &str) -> Result<Box<dyn Stream>> {
        let extent = *self
            .files
            .get(&DiscImage::key(file))
            .ok_or_else(|| Error::FileNotFound(format!("{}:{}", self.fs_path, file)))?;

        let handle = File::open(&self.fs_path)?;
        Ok(Box::new(DiscStream {
            file: handle,
            layout: self.layout,
            extent,
            pos: 0,
        }))
    }

    #[inline]
    fn exists(&self, file: &str) -> bool {
        self.files.contains_key(&DiscImage::key(file))
    }

    fn enumerate(&self, directory: &str, filter: &str) -> Result<Vec<String>> {
        let entries = self
            .directories
            .get(&DiscImage::key(directory))
            .ok_or_else(|| Error::FileNotFound(format!("{}:{}", self.fs_path, directory)))?;

        let mut names: Vec<_> = entries
            .iter()
            .filter(|name| wildcard_match(name, filter))
            .cloned()
            .collect();

        names.sort();
        Ok(names)
    }

    #[inline]
    fn fs_path(&self) -> &str {
        &self.fs_path
    }
}

/// A stream over one file of a disc image, translating positions into sectors lazily.
struct DiscStream {
    file: File,
    layout: SectorLayout,
    extent: Extent,
    pos: u64,
}

impl Read for DiscStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = u64::from(self.extent.len);
        if self.pos >= len || buf.is_empty() {
            return Ok(0);
        }

        let lba = u64::from(self.extent.lba) + self.pos / SECTOR_SIZE;
        let in_sector = self.pos % SECTOR_SIZE;
        let n = (buf.len() as u64)
            .min(SECTOR_SIZE - in_sector)
            .min(len - self.pos) as usize;

        self.file
            .seek(SeekFrom::Start(self.layout.offset_of(lba) + in_sector))?;
        self.file.read_exact(&mut buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for DiscStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.pos = n;
                return Ok(n);
            }
            SeekFrom::End(n) => (i64::from(self.extent.len), n),
            SeekFrom::Current(n) => (self.pos as i64, n),
        };

        let next = base + offset;
        if next < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }

        self.pos = next as u64;
        Ok(self.pos)
    }
}
