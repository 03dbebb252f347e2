//! Reading script files from disk the way an editor host hands them to the cache.

use std::path::Path;

use anyhow::{bail, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrderMark {
    #[default]
    None,
    Utf8,
    Utf16BE,
    Utf16LE,
}

impl ByteOrderMark {
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0xef, 0xbb, 0xbf, ..] => ByteOrderMark::Utf8,
            [0xfe, 0xff, ..] => ByteOrderMark::Utf16BE,
            [0xff, 0xfe, ..] => ByteOrderMark::Utf16LE,
            _ => ByteOrderMark::None,
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            ByteOrderMark::None => 0,
            ByteOrderMark::Utf8 => 3,
            ByteOrderMark::Utf16BE | ByteOrderMark::Utf16LE => 2,
        }
    }
}

/// Decodes file contents, stripping and reporting the byte order mark.
pub fn decode(bytes: &[u8]) -> anyhow::Result<(String, ByteOrderMark)> {
    let bom = ByteOrderMark::detect(bytes);
    let body = &bytes[bom.byte_len()..];

    let text = match bom {
        ByteOrderMark::None | ByteOrderMark::Utf8 => {
            String::from_utf8(body.to_vec()).context("text is not valid utf-8")?
        }
        ByteOrderMark::Utf16BE | ByteOrderMark::Utf16LE => {
            if body.len() % 2 != 0 {
                bail!("utf-16 text has an odd number of bytes: {}", body.len());
            }
            let units = body.chunks_exact(2).map(|pair| {
                let pair = [pair[0], pair[1]];
                if bom == ByteOrderMark::Utf16BE {
                    u16::from_be_bytes(pair)
                } else {
                    u16::from_le_bytes(pair)
                }
            });
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .context("text is not valid utf-16")?
        }
    };
    Ok((text, bom))
}

pub fn read_file(path: impl AsRef<Path>) -> anyhow::Result<(String, ByteOrderMark)> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (text, bom) = decode(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    log::debug!(
        "read {}: {} bytes, {:?} byte order mark",
        path.display(),
        bytes.len(),
        bom
    );
    Ok((text, bom))
}
