//! Incremental PDF object writer
//!
//! Objects go straight to the sink as they are produced. Only their byte
//! offsets are kept, for the cross-reference table written by [`ObjectWriter::finish`].

use std::io::{self, Write};

/// Header with a binary comment so transports treat the file as binary
const HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

pub(crate) struct ObjectWriter<W: Write> {
    out: W,
    position: u64,
    /// Byte offset per object number; index 0 is the free-list head
    offsets: Vec<Option<u64>>,
}

impl<W: Write> ObjectWriter<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            position: 0,
            offsets: vec![None],
        }
    }

    pub(crate) fn write_header(&mut self) -> io::Result<()> {
        self.emit(HEADER)
    }

    /// Allocate an object number without writing anything
    pub(crate) fn reserve(&mut self) -> u32 {
        self.offsets.push(None);
        (self.offsets.len() - 1) as u32
    }

    /// Write `id 0 obj <body> endobj`
    pub(crate) fn write_object(&mut self, id: u32, body: &[u8]) -> io::Result<()> {
        self.begin_object(id)?;
        self.emit(body)?;
        self.emit(b"\nendobj\n")
    }

    /// Write a stream object with its `/Length`
    pub(crate) fn write_stream(&mut self, id: u32, data: &[u8]) -> io::Result<()> {
        self.begin_object(id)?;
        self.emit(format!("<< /Length {} >>\nstream\n", data.len()).as_bytes())?;
        self.emit(data)?;
        self.emit(b"\nendstream\nendobj\n")
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Bytes written so far
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// Write the cross-reference table and trailer, then flush
    pub(crate) fn finish(mut self, root: u32, info: u32) -> io::Result<W> {
        let xref_offset = self.position;
        let mut table = format!("xref\n0 {}\n", self.offsets.len());
        table.push_str("0000000000 65535 f \n");
        for offset in &self.offsets[1..] {
            match offset {
                Some(offset) => table.push_str(&format!("{:010} 00000 n \n", offset)),
                None => table.push_str("0000000000 00000 f \n"),
            }
        }
        table.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len(),
            root,
            info,
            xref_offset
        ));
        self.emit(table.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn begin_object(&mut self, id: u32) -> io::Result<()> {
        let slot = self
            .offsets
            .get_mut(id as usize)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "unreserved object id"))?;
        *slot = Some(self.position);
        self.emit(format!("{} 0 obj\n", id).as_bytes())
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }
}

/// Text string as UTF-16BE hex with byte order mark, for the info dictionary
pub(crate) fn utf16_hex(text: &str) -> String {
    let mut out = String::from("<FEFF");
    for unit in text.encode_utf16() {
        out.push_str(&format!("{:04X}", unit));
    }
    out.push('>');
    out
}
