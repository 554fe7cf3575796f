#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alive_data::prelude::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

pub fn setup() {
    let _ = env_logger::try_init();
}

/// Writes `files` into `dir`, creating intermediate directories.
pub fn write_files<P: AsRef<Path>>(dir: P, files: &[(&str, &[u8])]) {
    for (name, bytes) in files {
        let path = dir.as_ref().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        fs::write(path, bytes).unwrap();
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ToyChunk {
    pub id: u32,
    pub kind: String,
    pub bytes: Vec<u8>,
}

/// A JSON stand-in for the LVL container: file name to chunks.
#[derive(Serialize, Deserialize, Default, Clone)]
pub struct ToyLvl {
    pub files: BTreeMap<String, Vec<ToyChunk>>,
}

impl ToyLvl {
    pub fn new() -> Self {
        ToyLvl::default()
    }

    pub fn chunk(mut self, file: &str, id: u32, kind: &str, bytes: &[u8]) -> Self {
        self.files
            .entry(file.to_owned())
            .or_insert_with(Vec::new)
            .push(ToyChunk {
                id,
                kind: kind.to_owned(),
                bytes: bytes.to_vec(),
            });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }
}

fn kind_of(kind: &str) -> ChunkType {
    let mut tag = *b"    ";
    for (dst, src) in tag.iter_mut().zip(kind.bytes()) {
        *dst = src;
    }

    ChunkType(tag)
}

struct ToyFile {
    name: String,
    chunks: Vec<Chunk>,
}

impl ArchiveFile for ToyFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn chunk_by_id(&self, id: u32) -> Option<Chunk> {
        self.chunks.iter().find(|v| v.id == id).cloned()
    }

    fn chunk_by_index(&self, index: usize) -> Option<Chunk> {
        self.chunks.get(index).cloned()
    }

    fn chunk_by_type(&self, kind: ChunkType) -> Option<Chunk> {
        self.chunks.iter().find(|v| v.kind == kind).cloned()
    }
}

struct ToyArchive {
    files: Vec<Arc<ToyFile>>,
}

impl Archive for ToyArchive {
    fn file_by_name(&self, name: &str) -> Option<Arc<dyn ArchiveFile>> {
        self.files
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .map(|v| v.clone() as Arc<dyn ArchiveFile>)
    }
}

/// Loads `ToyLvl` archives and counts how many were decoded.
#[derive(Clone, Default)]
pub struct ToyLoader {
    pub loads: Arc<AtomicUsize>,
}

impl ToyLoader {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ArchiveLoader for ToyLoader {
    fn load(&self, name: &str, mut stream: Box<dyn Stream>) -> alive_data::errors::Result<Box<dyn Archive>> {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;

        let lvl: ToyLvl = serde_json::from_slice(&buf)
            .map_err(|err| Error::Archive(format!("{}: {}", name, err)))?;

        self.loads.fetch_add(1, Ordering::SeqCst);

        let files = lvl
            .files
            .into_iter()
            .map(|(name, chunks)| {
                let chunks = chunks
                    .into_iter()
                    .map(|v| Chunk::new(v.id, kind_of(&v.kind), v.bytes))
                    .collect();

                Arc::new(ToyFile { name, chunks })
            })
            .collect();

        Ok(Box::new(ToyArchive { files }))
    }
}

/// Builds ISO9660 images with a root directory and one level of sub-directories.
pub struct IsoBuilder {
    files: Vec<(String, Vec<u8>)>,
}

const SECTOR: usize = 2048;

impl IsoBuilder {
    pub fn new() -> Self {
        IsoBuilder { files: Vec::new() }
    }

    pub fn file(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.push((path.to_owned(), bytes.to_vec()));
        self
    }

    /// Returns an image with cooked 2048 bytes sectors.
    pub fn cooked(&self) -> Vec<u8> {
        self.sectors().concat()
    }

    /// Returns an image with raw 2352 bytes Mode 2 XA sectors.
    pub fn raw(&self) -> Vec<u8> {
        let mut image = Vec::new();
        for sector in self.sectors() {
            image.extend_from_slice(&[0x00]);
            image.extend_from_slice(&[0xFF; 10]);
            image.extend_from_slice(&[0x00]);
            image.extend_from_slice(&[0, 0, 0, 2]);
            image.extend_from_slice(&[0; 8]);
            image.extend_from_slice(&sector);
            image.extend_from_slice(&[0; 280]);
        }

        image
    }

    fn sectors(&self) -> Vec<Vec<u8>> {
        let mut dirs: Vec<String> = Vec::new();
        for (path, _) in &self.files {
            if let Some(index) = path.find('/') {
                let dir = path[..index].to_owned();
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }

        let root_lba = 18;
        let dir_lba = |index: usize| root_lba + 1 + index as u32;

        let mut lba = dir_lba(dirs.len());
        let mut extents = Vec::new();
        for (_, bytes) in &self.files {
            extents.push(lba);
            lba += ((bytes.len() + SECTOR - 1) / SECTOR).max(1) as u32;
        }

        let mut sectors = vec![vec![0; SECTOR]; lba as usize];

        let pvd = &mut sectors[16];
        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        let root = record(&[0], root_lba, SECTOR as u32, true);
        pvd[156..156 + root.len()].copy_from_slice(&root);

        let terminator = &mut sectors[17];
        terminator[0] = 255;
        terminator[1..6].copy_from_slice(b"CD001");
        terminator[6] = 1;

        let mut root = vec![
            record(&[0], root_lba, SECTOR as u32, true),
            record(&[1], root_lba, SECTOR as u32, true),
        ];

        for (index, dir) in dirs.iter().enumerate() {
            root.push(record(dir.as_bytes(), dir_lba(index), SECTOR as u32, true));

            let mut entries = vec![
                record(&[0], dir_lba(index), SECTOR as u32, true),
                record(&[1], root_lba, SECTOR as u32, true),
            ];

            for ((path, bytes), &extent) in self.files.iter().zip(&extents) {
                if path.starts_with(&format!("{}/", dir)) {
                    let name = format!("{};1", &path[dir.len() + 1..]);
                    entries.push(record(name.as_bytes(), extent, bytes.len() as u32, false));
                }
            }

            sectors[dir_lba(index) as usize] = directory(&entries);
        }

        for ((path, bytes), &extent) in self.files.iter().zip(&extents) {
            if !path.contains('/') {
                let name = format!("{};1", path);
                root.push(record(name.as_bytes(), extent, bytes.len() as u32, false));
            }

            for (index, chunk) in bytes.chunks(SECTOR).enumerate() {
                sectors[extent as usize + index][..chunk.len()].copy_from_slice(chunk);
            }
        }

        sectors[root_lba as usize] = directory(&root);
        sectors
    }
}

fn record(name: &[u8], lba: u32, size: u32, is_dir: bool) -> Vec<u8> {
    let len = 33 + name.len() + (name.len() + 1) % 2;
    let mut buf = vec![0; len];

    buf[0] = len as u8;
    LittleEndian::write_u32(&mut buf[2..6], lba);
    BigEndian::write_u32(&mut buf[6..10], lba);
    LittleEndian::write_u32(&mut buf[10..14], size);
    BigEndian::write_u32(&mut buf[14..18], size);
    buf[25] = if is_dir { 0x02 } else { 0x00 };
    LittleEndian::write_u16(&mut buf[28..30], 1);
    BigEndian::write_u16(&mut buf[30..32], 1);
    buf[32] = name.len() as u8;
    buf[33..33 + name.len()].copy_from_slice(name);
    buf
}

fn directory(records: &[Vec<u8>]) -> Vec<u8> {
    let mut sector = records.concat();
    assert!(sector.len() <= SECTOR);
    sector.resize(SECTOR, 0);
    sector
}
