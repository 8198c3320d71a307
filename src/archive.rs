use crate::assemble::Part;
use crate::error::Result;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds a zip archive in memory.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        ArchiveWriter {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    pub fn add_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(name, options)?;
        self.zip.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let bytes = self.zip.finish()?.into_inner();
        debug!(entries = self.entries, bytes = bytes.len(), "Archive finished");
        Ok(bytes)
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bundle split parts into one archive, in part order.
pub fn pack_parts(parts: &[Part]) -> Result<Vec<u8>> {
    let mut archive = ArchiveWriter::new();
    for part in parts {
        archive.add_file(&part.name, &part.bytes)?;
    }
    archive.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn part(name: &str, bytes: &[u8]) -> Part {
        Part {
            name: name.to_string(),
            page_count: 1,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_pack_parts_in_order() {
        let parts = vec![part("b_part01.pdf", b"first"), part("b_part02.pdf", b"second")];
        let bytes = pack_parts(&parts).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_index(1).unwrap();
        assert_eq!(entry.name(), "b_part02.pdf");
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_empty_archive() {
        let bytes = ArchiveWriter::new().finish().unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
