//! Builders for in-memory test fixtures: a PRS bit writer and greedy compressor, and NARC/ZARC/ZPR byte layouts.

use super::zpr::{ZPR_HEADER_LEN, ZPR_MAGIC, ZPR_XOR_KEY};


/// Writes a PRS stream token by token.
pub(crate) struct PrsWriter {
    out: Vec<u8>,
    ctrl_pos: usize,
    ctrl_bits: u8,
}


impl PrsWriter {
    pub(crate) fn new() -> Self {
        Self { out: Vec::new(), ctrl_pos: 0, ctrl_bits: 8 }
    }

    fn bit(&mut self, set: bool) {
        if self.ctrl_bits == 8 {
            self.ctrl_pos = self.out.len();
            self.out.push(0);
            self.ctrl_bits = 0;
        }
        if set {
            self.out[self.ctrl_pos] |= 1 << self.ctrl_bits;
        }
        self.ctrl_bits += 1;
    }

    pub(crate) fn literal(&mut self, byte: u8) {
        self.bit(true);
        self.out.push(byte);
    }

    pub(crate) fn short(&mut self, offset: isize, len: usize) {
        assert!((-256..0).contains(&offset) && (2..=5).contains(&len));
        let l = len - 2;
        self.bit(false);
        self.bit(false);
        self.bit(l & 2 != 0);
        self.bit(l & 1 != 0);
        self.out.push((offset + 256) as u8);
    }

    pub(crate) fn long(&mut self, offset: isize, len: usize) {
        // -8192 would encode as `00 00` with an extended length, which is the end marker
        assert!((-8191..0).contains(&offset) && (3..=265).contains(&len));
        let v = (offset + 8192) as usize;
        let b1 = ((v & 31) << 3) as u8;
        let b2 = (v >> 5) as u8;

        self.bit(false);
        self.bit(true);
        if len <= 9 {
            self.out.push(b1 | (len - 2) as u8);
            self.out.push(b2);
        } else {
            self.out.push(b1);
            self.out.push(b2);
            self.out.push((len - 10) as u8);
        }
    }

    pub(crate) fn end(&mut self) {
        self.bit(false);
        self.bit(true);
        self.out.push(0);
        self.out.push(0);
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.out
    }
}


/// Greedy PRS compressor, only good enough to produce valid streams for round-trip tests.
pub(crate) fn compress_prs(input: &[u8]) -> Vec<u8> {
    const MAX_DIST: usize = 8191;
    const MAX_LEN: usize = 265;

    let mut w = PrsWriter::new();
    let mut pos = 0;

    while pos < input.len() {
        let (mut best_dist, mut best_len) = (0, 0);
        for dist in 1..=pos.min(MAX_DIST) {
            let mut len = 0;
            while len < MAX_LEN && pos + len < input.len() && input[pos + len] == input[pos + len - dist] {
                len += 1;
            }
            if len > best_len {
                best_dist = dist;
                best_len = len;
                if len == MAX_LEN {
                    break;
                }
            }
        }

        let offset = -(best_dist as isize);
        if best_len >= 2 && best_dist <= 256 && best_len <= 5 {
            w.short(offset, best_len);
        } else if best_len >= 3 {
            w.long(offset, best_len);
        } else {
            w.literal(input[pos]);
            best_len = 1;
        }
        pos += best_len;
    }

    w.end();
    w.finish()
}


/// Wraps an already-compressed PRS stream in a ZPR header.
pub(crate) fn wrap_zpr(stream: &[u8], declared_size: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(ZPR_HEADER_LEN + stream.len());
    out.extend_from_slice(&ZPR_MAGIC);
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&declared_size.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend(stream.iter().map(|b| b ^ ZPR_XOR_KEY));
    out
}


/// Compresses and wraps `data` as a ZPR file.
pub(crate) fn build_zpr(data: &[u8]) -> Vec<u8> {
    wrap_zpr(&compress_prs(data), data.len() as u32)
}


/// Builds the body of a NARC name table (everything after the `BTNF` magic and length).
pub(crate) struct NameTreeBuilder {
    /// `(first_file_index, parent)` per directory; the root's parent slot is unused.
    dirs: Vec<(u16, u16)>,
    streams: Vec<Vec<u8>>,
}


impl NameTreeBuilder {
    pub(crate) fn new() -> Self {
        Self { dirs: vec![(0, 0)], streams: vec![Vec::new()] }
    }

    /// Adds a directory entry and returns its index.
    pub(crate) fn add_dir(&mut self, parent: u16, first_file: u16) -> u16 {
        self.dirs.push((first_file, parent));
        self.streams.push(Vec::new());
        (self.dirs.len() - 1) as u16
    }

    pub(crate) fn file(&mut self, dir: u16, name: &str) {
        let stream = &mut self.streams[dir as usize];
        stream.push(name.len() as u8);
        stream.extend_from_slice(name.as_bytes());
    }

    pub(crate) fn subdir(&mut self, dir: u16, name: &str, id: u16) {
        let stream = &mut self.streams[dir as usize];
        stream.push(0x80 | name.len() as u8);
        stream.extend_from_slice(name.as_bytes());
        stream.extend_from_slice(&(0xF000 | id).to_le_bytes());
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let count = self.dirs.len() as u16;

        out.extend_from_slice(&(8 * count as u32).to_le_bytes());
        out.extend_from_slice(&self.dirs[0].0.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        for &(first_file, parent) in &self.dirs[1..] {
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&first_file.to_le_bytes());
            out.extend_from_slice(&(0xF000 | parent).to_le_bytes());
        }

        for stream in &self.streams {
            out.extend_from_slice(stream);
            out.push(0);
        }
        out
    }
}


/// A name table body with no names: root offset of 4 and a single directory.
pub(crate) fn nameless_tree() -> Vec<u8> {
    vec![4, 0, 0, 0, 0, 0, 1, 0]
}


/// Lays out a NARC with the given file payloads and name table body. Payloads are stored back-to-back in the data
/// section, each padded to four bytes.
pub(crate) fn build_narc(files: &[&[u8]], btnf_body: &[u8]) -> Vec<u8> {
    let mut fimg = Vec::new();
    let mut fat = Vec::new();
    for file in files {
        let start = fimg.len() as u32;
        fimg.extend_from_slice(file);
        fat.push((start, fimg.len() as u32));
        while fimg.len() % 4 != 0 {
            fimg.push(0xFF);
        }
    }

    let btaf_len = 12 + 8 * files.len();
    let btnf_len = 8 + btnf_body.len();
    let fimg_len = 8 + fimg.len();
    let total = 16 + btaf_len + btnf_len + fimg_len;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"NARC");
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());

    out.extend_from_slice(b"BTAF");
    out.extend_from_slice(&(btaf_len as u32).to_le_bytes());
    out.extend_from_slice(&(files.len() as u32).to_le_bytes());
    for (start, end) in fat {
        out.extend_from_slice(&start.to_le_bytes());
        out.extend_from_slice(&end.to_le_bytes());
    }

    out.extend_from_slice(b"BTNF");
    out.extend_from_slice(&(btnf_len as u32).to_le_bytes());
    out.extend_from_slice(btnf_body);

    out.extend_from_slice(b"GMIF");
    out.extend_from_slice(&(fimg_len as u32).to_le_bytes());
    out.extend_from_slice(&fimg);
    out
}


/// Offset of the `index`th allocation entry in a NARC built by [`build_narc`].
pub(crate) fn narc_fat_entry(index: usize) -> usize {
    16 + 12 + 8 * index
}


pub(crate) const ZARC_TABLE_START: usize = 0x20;
pub(crate) const ZARC_STRIDE: usize = 0x40;


/// Lays out a ZARC with one fixed-stride record per `(name, data)` pair and the payloads after the table.
pub(crate) fn build_zarc(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"ZARC");
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // total length, patched below
    out.extend_from_slice(&(ZARC_TABLE_START as u32).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.extend_from_slice(&(ZARC_STRIDE as u32).to_le_bytes());
    out.resize(ZARC_TABLE_START, 0);

    let mut offset = ZARC_TABLE_START + entries.len() * ZARC_STRIDE;
    for (name, data) in entries {
        let record = out.len();
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0xAB; 8]);
        out.extend_from_slice(name.as_bytes());
        out.resize(record + ZARC_STRIDE, 0);
        offset += data.len();
    }

    for (_, data) in entries {
        out.extend_from_slice(data);
    }

    let total = out.len() as u32;
    out[8..12].copy_from_slice(&total.to_le_bytes());
    out
}
