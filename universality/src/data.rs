// SPDX-License-Identifier: AGPL-3.0-only

//! Reference coefficient files: converged fixed points persisted for warm
//! starts.
//!
//! Layout (all integers and floats little-endian):
//!
//! ```text
//! offset  size  field
//!      0     8  magic "MRGCOEF1"
//!      8     4  format version (1)
//!     12     4  truncation order N
//!     16     4  partial quotient n
//!     20     4  critical exponent z
//!     24  16·N  2N f64 pair coefficients (ξ then η)
//! ```
//!
//! A reference is a read-only input: it is loaded once and handed to the
//! pipeline explicitly, never stored in global state.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use crate::error::{Result, UniversalityError};
use crate::index::IndexDescriptor;
use crate::renormalization::PairSpaces;
use crate::space::CoefficientVector;

const MAGIC: [u8; 8] = *b"MRGCOEF1";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = std::mem::size_of::<CoefficientFileHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CoefficientFileHeader {
    magic: [u8; 8],
    version: u32,
    order: u32,
    partial_quotient: u32,
    exponent: u32,
}

/// Pair coefficients of a converged fixed point.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCoefficients {
    /// Partial quotient n the pair was solved for.
    pub partial_quotient: u32,
    /// Critical exponent z.
    pub exponent: u32,
    /// Pair vector of length 2N.
    pub coefficients: CoefficientVector,
}

impl ReferenceCoefficients {
    /// Validate and wrap a pair vector.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DataLoad`] for an empty or odd-length vector or
    /// non-finite entries.
    pub fn new(
        partial_quotient: u32,
        exponent: u32,
        coefficients: CoefficientVector,
    ) -> Result<Self> {
        if coefficients.is_empty() || coefficients.len() % 2 != 0 {
            return Err(UniversalityError::DataLoad(format!(
                "pair vector must have positive even length, got {}",
                coefficients.len()
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(UniversalityError::DataLoad(
                "pair vector contains non-finite coefficients".into(),
            ));
        }
        Ok(Self {
            partial_quotient,
            exponent,
            coefficients,
        })
    }

    /// Truncation order N of each map.
    #[must_use]
    pub fn order(&self) -> usize {
        self.coefficients.len() / 2
    }

    /// Initial guess on `spaces`, padded or truncated to the target order.
    /// `None` if the critical exponent differs; the partial quotient may be
    /// any related index.
    #[must_use]
    pub fn warm_start(&self, spaces: &PairSpaces) -> Option<CoefficientVector> {
        (self.exponent == spaces.xi.exponent())
            .then(|| PairSpaces::resize_pair(&self.coefficients, spaces.order()))
    }

    /// Whether the reference was solved for `index` itself rather than a
    /// related partial quotient.
    #[must_use]
    pub fn is_for(&self, index: &IndexDescriptor) -> bool {
        self.partial_quotient == index.n
    }

    /// Serialize to the binary layout.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DataLoad`] if the order does not fit in u32.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let order = u32::try_from(self.order())
            .map_err(|_| UniversalityError::DataLoad("order exceeds u32".into()))?;
        let header = CoefficientFileHeader {
            magic: MAGIC,
            version: FORMAT_VERSION.to_le(),
            order: order.to_le(),
            partial_quotient: self.partial_quotient.to_le(),
            exponent: self.exponent.to_le(),
        };
        let mut out = Vec::with_capacity(HEADER_LEN + 8 * self.coefficients.len());
        out.extend_from_slice(bytemuck::bytes_of(&header));
        for c in &self.coefficients {
            out.extend_from_slice(&c.to_le_bytes());
        }
        Ok(out)
    }

    /// Parse the binary layout.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DataLoad`] for a short file, wrong magic or
    /// version, or a payload that does not match the declared order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let head = bytes.get(..HEADER_LEN).ok_or_else(|| {
            UniversalityError::DataLoad(format!(
                "file too short for header: {} < {HEADER_LEN} bytes",
                bytes.len()
            ))
        })?;
        let header: CoefficientFileHeader = bytemuck::try_pod_read_unaligned(head)
            .map_err(|e| UniversalityError::DataLoad(format!("header: {e}")))?;
        if header.magic != MAGIC {
            return Err(UniversalityError::DataLoad(
                "not a reference coefficient file (bad magic)".into(),
            ));
        }
        let version = u32::from_le(header.version);
        if version != FORMAT_VERSION {
            return Err(UniversalityError::DataLoad(format!(
                "unsupported format version {version}"
            )));
        }
        let order = u32::from_le(header.order) as usize;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != 16 * order {
            return Err(UniversalityError::DataLoad(format!(
                "payload holds {} bytes, expected {} for N = {order}",
                payload.len(),
                16 * order
            )));
        }
        let coefficients = payload
            .chunks_exact(8)
            .map(|chunk| {
                <[u8; 8]>::try_from(chunk)
                    .map(f64::from_le_bytes)
                    .map_err(|e| UniversalityError::DataLoad(e.to_string()))
            })
            .collect::<Result<CoefficientVector>>()?;
        Self::new(
            u32::from_le(header.partial_quotient),
            u32::from_le(header.exponent),
            coefficients,
        )
    }
}

/// Write a reference file.
///
/// # Errors
///
/// [`UniversalityError::DataLoad`] wrapping the IO error and path.
pub fn write_reference(path: &Path, reference: &ReferenceCoefficients) -> Result<()> {
    let bytes = reference.to_bytes()?;
    std::fs::write(path, bytes)
        .map_err(|e| UniversalityError::DataLoad(format!("{}: {e}", path.display())))
}

/// Read a reference file.
///
/// # Errors
///
/// [`UniversalityError::DataLoad`] on IO or format errors.
pub fn read_reference(path: &Path) -> Result<ReferenceCoefficients> {
    let bytes = std::fs::read(path)
        .map_err(|e| UniversalityError::DataLoad(format!("{}: {e}", path.display())))?;
    ReferenceCoefficients::from_bytes(&bytes).map_err(|e| match e {
        UniversalityError::DataLoad(msg) => {
            UniversalityError::DataLoad(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// Conventional file name for a reference of partial quotient `n` at order `order`.
#[must_use]
pub fn reference_file_name(n: u32, order: usize) -> String {
    format!("metallic_n{n}_N{order}.coef")
}

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
///
/// # Errors
///
/// [`UniversalityError::DataLoad`] if directory creation, serialization or
/// writing fails.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| UniversalityError::DataLoad(format!("create {}: {e}", parent.display())))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| UniversalityError::DataLoad(format!("JSON serialize: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| UniversalityError::DataLoad(format!("write {}: {e}", path.display())))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> ReferenceCoefficients {
        ReferenceCoefficients::new(4, 3, vec![1.0, -0.25, 3.5e-9, -0.6, 0.125, -1e-12])
            .expect("valid")
    }

    #[test]
    fn header_is_24_bytes() {
        assert_eq!(HEADER_LEN, 24);
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join("metallic_universality_data_round_trip.coef");
        let reference = sample();
        write_reference(&path, &reference).expect("write");
        let loaded = read_reference(&path).expect("read");
        assert_eq!(loaded, reference);
        assert_eq!(loaded.order(), 3);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().to_bytes().expect("bytes");
        bytes[0] = b'X';
        let err = ReferenceCoefficients::from_bytes(&bytes).expect_err("bad magic");
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn rejects_truncated_payload() {
        let bytes = sample().to_bytes().expect("bytes");
        assert!(ReferenceCoefficients::from_bytes(&bytes[..bytes.len() - 8]).is_err());
        assert!(ReferenceCoefficients::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = sample().to_bytes().expect("bytes");
        bytes[8] = 9;
        let err = ReferenceCoefficients::from_bytes(&bytes).expect_err("version 9");
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn rejects_odd_length() {
        assert!(ReferenceCoefficients::new(1, 3, vec![1.0, 2.0, 3.0]).is_err());
        assert!(ReferenceCoefficients::new(1, 3, vec![]).is_err());
        assert!(ReferenceCoefficients::new(1, 3, vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn warm_start_resizes_matching_index() {
        let reference = sample();
        let spaces = PairSpaces::new(5, 3).expect("spaces");
        let k2 = IndexDescriptor::exceptional(2).expect("n = 4");
        let guess = reference.warm_start(&spaces).expect("same exponent");
        assert_eq!(guess.len(), 10);
        assert_eq!(&guess[..3], &[1.0, -0.25, 3.5e-9]);
        assert_eq!(guess[5], -0.6);
        assert_eq!(guess[9], 0.0);
        assert!(reference.is_for(&k2));
    }

    #[test]
    fn warm_start_accepts_related_index_but_not_exponent() {
        let reference = sample();
        let golden = IndexDescriptor::golden().expect("n = 1");
        let cubic = PairSpaces::new(5, 3).expect("z = 3");
        assert_eq!(reference.warm_start(&cubic).map(|g| g.len()), Some(10));
        assert!(!reference.is_for(&golden));
        let quintic = PairSpaces::new(5, 5).expect("z = 5");
        assert!(reference.warm_start(&quintic).is_none());
    }

    #[test]
    fn save_json_creates_directories() {
        let dir = std::env::temp_dir().join("metallic_universality_save_json");
        let path = dir.join("nested").join("values.json");
        save_json(&path, &[1.5_f64, -2.0]).expect("write");
        let text = std::fs::read_to_string(&path).expect("read back");
        let parsed: Vec<f64> = serde_json::from_str(&text).expect("parse");
        assert_eq!(parsed, vec![1.5, -2.0]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_data_load() {
        let err = read_reference(Path::new("/nonexistent/metallic.coef")).expect_err("missing");
        assert!(!err.is_recoverable());
    }
}
