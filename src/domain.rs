use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::MirrorError;

/// Name of the zero-byte sentinel object under a snapshot prefix. Its
/// presence is the sole signal that the snapshot finished publishing.
pub const DONE_MARKER: &str = "done";

/// Calendar date namespacing all artifacts of one run. Reruns on the same
/// day target the same namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotDate(NaiveDate);

impl SnapshotDate {
    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    /// The snapshot prefix under the top-level folder, `<top>/<YYYY-MM-DD>`.
    pub fn prefix_under(&self, top_folder: &str) -> String {
        format!("{top_folder}/{self}")
    }

    pub fn marker_key(&self, top_folder: &str) -> String {
        format!("{}/{DONE_MARKER}", self.prefix_under(top_folder))
    }
}

impl fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for SnapshotDate {
    type Err = MirrorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| MirrorError::InvalidSnapshotDate(value.to_string()))
    }
}

/// Last path segment of a remote path.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Name of the decompressed artifact: strips exactly one `.gz` suffix.
/// Anything else is a manifest mistake and is rejected rather than guessed
/// at, since a wrong suffix here would corrupt artifact naming.
pub fn unpacked_name(name: &str) -> Result<String, MirrorError> {
    name.strip_suffix(".gz")
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MirrorError::UnpackedName(name.to_string()))
}

/// Name of the lz4-recompressed artifact: appends `.lz4`.
pub fn lz4_name(name: &str) -> String {
    format!("{name}.lz4")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn snapshot_date_roundtrip() {
        let date: SnapshotDate = "2024-03-01".parse().unwrap();
        assert_eq!(date.to_string(), "2024-03-01");
        assert_eq!(date.prefix_under("ncbi-sources"), "ncbi-sources/2024-03-01");
        assert_eq!(
            date.marker_key("ncbi-sources"),
            "ncbi-sources/2024-03-01/done"
        );
    }

    #[test]
    fn snapshot_date_invalid() {
        let err = "03/01/2024".parse::<SnapshotDate>().unwrap_err();
        assert_matches!(err, MirrorError::InvalidSnapshotDate(_));
    }

    #[test]
    fn today_is_iso_formatted() {
        let rendered = SnapshotDate::today().to_string();
        assert_eq!(rendered.len(), 10);
        assert!(rendered.parse::<SnapshotDate>().is_ok());
    }

    #[test]
    fn base_name_of_remote_paths() {
        assert_eq!(base_name("/blast/db/FASTA/nt.gz"), "nt.gz");
        assert_eq!(base_name("/pub/taxonomy/accession2taxid/"), "accession2taxid");
        assert_eq!(base_name("plain"), "plain");
    }

    #[test]
    fn unpacked_name_strips_single_gz_suffix() {
        assert_eq!(unpacked_name("nt.gz").unwrap(), "nt");
        assert_eq!(unpacked_name("taxdump.tar.gz").unwrap(), "taxdump.tar");
    }

    #[test]
    fn unpacked_name_rejects_other_suffixes() {
        assert_matches!(unpacked_name("nt.gz.md5"), Err(MirrorError::UnpackedName(_)));
        assert_matches!(unpacked_name(".gz"), Err(MirrorError::UnpackedName(_)));
        assert_matches!(unpacked_name("nt"), Err(MirrorError::UnpackedName(_)));
    }

    #[test]
    fn lz4_name_appends_suffix() {
        assert_eq!(lz4_name("nt"), "nt.lz4");
        assert_eq!(lz4_name("taxdump.tar"), "taxdump.tar.lz4");
    }
}
