//! File helpers for binary and YAML artifacts.

use crate::error::TrainingResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

fn ensure_parent(path: &Path) -> TrainingResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn encode<T: Serialize>(value: &T) -> TrainingResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> TrainingResult<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

/// Write `value` as a bincode file, creating parent directories.
pub fn save_object<T: Serialize>(path: &Path, value: &T) -> TrainingResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, encode(value)?)?;
    tracing::debug!(path = %path.display(), "saved binary artifact");
    Ok(())
}

pub fn load_object<T: DeserializeOwned>(path: &Path) -> TrainingResult<T> {
    decode(&std::fs::read(path)?)
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> TrainingResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> TrainingResult<T> {
    Ok(serde_yaml::from_str(&std::fs::read_to_string(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use tempfile::TempDir;

    #[test]
    fn test_object_written_under_missing_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("b").join("train.bin");
        let m = Matrix::from_rows(vec![vec![1.0, 0.0]]).unwrap();
        save_object(&path, &m).unwrap();
        let back: Matrix = load_object(&path).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        let bytes = encode(&m).unwrap();
        assert!(decode::<Matrix>(&bytes[..bytes.len() / 2]).is_err());
    }
}
