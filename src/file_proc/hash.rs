use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

pub const PARTIAL_HASH_LENGTH: usize = 256 * 1024; // 256 KiB
const FULL_HASH_CHUNK: usize = 1024 * 1024; // 1 MiB

/// XxHash64 over the first 256 KiB of the file (the whole file if smaller).
/// Cheap second-stage filter: touches only the head of each candidate.
pub fn partial_hash(path: &Path) -> io::Result<u64> {
    let mut f = File::open(path)?;
    let mut buffer = vec![0u8; PARTIAL_HASH_LENGTH];
    let mut filled = 0;
    while filled < PARTIAL_HASH_LENGTH {
        let bytes_read = f.read(&mut buffer[filled..])?;
        if bytes_read == 0 {
            break;
        }
        filled += bytes_read;
    }
    buffer.truncate(filled);

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&buffer);
    Ok(hasher.finish())
}

/// Full-content blake3 digest, streamed in fixed-size chunks so large files
/// are never loaded into memory whole.
pub fn full_hash(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; FULL_HASH_CHUNK];
    loop {
        let bytes_read = f.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
