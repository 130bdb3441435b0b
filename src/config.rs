use crate::domain::base_name;

/// One remote file to mirror. `unpack` marks entries that additionally get a
/// decompressed copy and an lz4 recompression published next to the original.
#[derive(Debug, Clone)]
pub struct FileSpec {
    pub remote_path: String,
    pub unpack: bool,
}

impl FileSpec {
    pub fn new(remote_path: &str, unpack: bool) -> Self {
        Self {
            remote_path: remote_path.to_string(),
            unpack,
        }
    }

    pub fn base_name(&self) -> &str {
        base_name(&self.remote_path)
    }
}

/// One remote directory tree to mirror recursively. `cut_dirs` is the number
/// of leading path segments dropped when mapping members to local names, so
/// `/pub/taxonomy/accession2taxid/x` with `cut_dirs = 2` lands at
/// `accession2taxid/x`.
#[derive(Debug, Clone)]
pub struct FolderSpec {
    pub remote_path: String,
    pub cut_dirs: usize,
}

impl FolderSpec {
    pub fn new(remote_path: &str, cut_dirs: usize) -> Self {
        Self {
            remote_path: remote_path.to_string(),
            cut_dirs,
        }
    }

    pub fn base_name(&self) -> &str {
        base_name(&self.remote_path)
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub files: Vec<FileSpec>,
    pub folders: Vec<FolderSpec>,
}

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub remote_base: String,
    pub bucket: String,
    pub top_folder: String,
    pub manifest: Manifest,
}

impl MirrorConfig {
    /// The fixed production deployment: the NCBI BLAST databases and the
    /// taxonomy dump, mirrored into the `idseq-database` bucket.
    pub fn ncbi_defaults() -> Self {
        Self {
            remote_base: "https://ftp.ncbi.nih.gov".to_string(),
            bucket: "idseq-database".to_string(),
            top_folder: "ncbi-sources".to_string(),
            manifest: Manifest {
                files: vec![
                    FileSpec::new("/blast/db/FASTA/nt.gz", true),
                    FileSpec::new("/blast/db/FASTA/nt.gz.md5", false),
                    FileSpec::new("/blast/db/FASTA/nr.gz", true),
                    FileSpec::new("/blast/db/FASTA/nr.gz.md5", false),
                    FileSpec::new("/pub/taxonomy/taxdump.tar.gz", true),
                    FileSpec::new("/pub/taxonomy/taxdump.tar.gz.md5", false),
                ],
                folders: vec![FolderSpec::new("/pub/taxonomy/accession2taxid", 2)],
            },
        }
    }
}
