use crate::util::{
    Result, Slice, Status,
    coding::{Decoder, put_fixed32, put_fixed64, put_length_prefixed},
};

/// Metadata for a single table file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetaData {
    /// File number (used in filename: {number}.sst)
    pub number: u64,
    pub file_size: u64,
    /// Smallest user key in this file
    pub smallest: Slice,
    /// Largest user key in this file
    pub largest: Slice,
}

impl FileMetaData {
    pub fn new(number: u64, file_size: u64, smallest: Slice, largest: Slice) -> Self {
        FileMetaData {
            number,
            file_size,
            smallest,
            largest,
        }
    }
}

const TAG_COMPARATOR: u8 = 1;
const TAG_LOG_NUMBER: u8 = 2;
const TAG_NEXT_FILE_NUMBER: u8 = 3;
const TAG_LAST_SEQUENCE: u8 = 4;
const TAG_DELETED_FILE: u8 = 5;
const TAG_NEW_FILE: u8 = 6;
const TAG_CREATE_CF: u8 = 7;
const TAG_DROP_CF: u8 = 8;
const TAG_MAX_COLUMN_FAMILY: u8 = 9;

/// A VersionEdit is one MANIFEST record: the changes between two states of
/// the database. Column family creation and drop are recorded here, which
/// is what makes a family visible to later opens.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VersionEdit {
    pub comparator: Option<String>,
    /// WAL file holding writes not yet in table files
    pub log_number: Option<u64>,
    pub next_file_number: Option<u64>,
    pub last_sequence: Option<u64>,
    /// Largest column family id ever allocated
    pub max_column_family: Option<u32>,
    /// Files to delete: (cf_id, file_number)
    pub deleted_files: Vec<(u32, u64)>,
    /// Files to add: (cf_id, file_metadata)
    pub new_files: Vec<(u32, FileMetaData)>,
    /// Column Families to create: (cf_id, cf_name)
    pub created_column_families: Vec<(u32, String)>,
    /// Column Families to drop: cf_id
    pub dropped_column_families: Vec<u32>,
}

impl VersionEdit {
    pub fn new() -> Self {
        VersionEdit::default()
    }

    pub fn set_comparator(&mut self, name: impl Into<String>) {
        self.comparator = Some(name.into());
    }

    pub fn set_log_number(&mut self, num: u64) {
        self.log_number = Some(num);
    }

    pub fn set_next_file_number(&mut self, num: u64) {
        self.next_file_number = Some(num);
    }

    pub fn set_last_sequence(&mut self, seq: u64) {
        self.last_sequence = Some(seq);
    }

    pub fn set_max_column_family(&mut self, id: u32) {
        self.max_column_family = Some(id);
    }

    pub fn add_file(&mut self, cf_id: u32, file: FileMetaData) {
        self.new_files.push((cf_id, file));
    }

    pub fn delete_file(&mut self, cf_id: u32, file_number: u64) {
        self.deleted_files.push((cf_id, file_number));
    }

    pub fn create_column_family(&mut self, cf_id: u32, cf_name: impl Into<String>) {
        self.created_column_families.push((cf_id, cf_name.into()));
    }

    pub fn drop_column_family(&mut self, cf_id: u32) {
        self.dropped_column_families.push(cf_id);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        if let Some(ref cmp) = self.comparator {
            buf.push(TAG_COMPARATOR);
            put_length_prefixed(&mut buf, cmp.as_bytes());
        }
        if let Some(num) = self.log_number {
            buf.push(TAG_LOG_NUMBER);
            put_fixed64(&mut buf, num);
        }
        if let Some(num) = self.next_file_number {
            buf.push(TAG_NEXT_FILE_NUMBER);
            put_fixed64(&mut buf, num);
        }
        if let Some(seq) = self.last_sequence {
            buf.push(TAG_LAST_SEQUENCE);
            put_fixed64(&mut buf, seq);
        }
        if let Some(id) = self.max_column_family {
            buf.push(TAG_MAX_COLUMN_FAMILY);
            put_fixed32(&mut buf, id);
        }

        // Creations go before files so a single edit can create a family
        // and register its first table.
        for (cf_id, cf_name) in &self.created_column_families {
            buf.push(TAG_CREATE_CF);
            put_fixed32(&mut buf, *cf_id);
            put_length_prefixed(&mut buf, cf_name.as_bytes());
        }
        for (cf_id, file_num) in &self.deleted_files {
            buf.push(TAG_DELETED_FILE);
            put_fixed32(&mut buf, *cf_id);
            put_fixed64(&mut buf, *file_num);
        }
        for (cf_id, file) in &self.new_files {
            buf.push(TAG_NEW_FILE);
            put_fixed32(&mut buf, *cf_id);
            put_fixed64(&mut buf, file.number);
            put_fixed64(&mut buf, file.file_size);
            put_length_prefixed(&mut buf, file.smallest.data());
            put_length_prefixed(&mut buf, file.largest.data());
        }
        for cf_id in &self.dropped_column_families {
            buf.push(TAG_DROP_CF);
            put_fixed32(&mut buf, *cf_id);
        }

        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut edit = VersionEdit::new();
        let mut dec = Decoder::new(data, "version edit");

        while !dec.is_empty() {
            match dec.get_u8()? {
                TAG_COMPARATOR => edit.set_comparator(dec.get_string()?),
                TAG_LOG_NUMBER => edit.set_log_number(dec.get_fixed64()?),
                TAG_NEXT_FILE_NUMBER => edit.set_next_file_number(dec.get_fixed64()?),
                TAG_LAST_SEQUENCE => edit.set_last_sequence(dec.get_fixed64()?),
                TAG_MAX_COLUMN_FAMILY => edit.set_max_column_family(dec.get_fixed32()?),
                TAG_CREATE_CF => {
                    let cf_id = dec.get_fixed32()?;
                    let name = dec.get_string()?;
                    edit.create_column_family(cf_id, name);
                },
                TAG_DELETED_FILE => {
                    let cf_id = dec.get_fixed32()?;
                    let number = dec.get_fixed64()?;
                    edit.delete_file(cf_id, number);
                },
                TAG_NEW_FILE => {
                    let cf_id = dec.get_fixed32()?;
                    let number = dec.get_fixed64()?;
                    let file_size = dec.get_fixed64()?;
                    let smallest = Slice::from(dec.get_length_prefixed()?);
                    let largest = Slice::from(dec.get_length_prefixed()?);
                    edit.add_file(
                        cf_id,
                        FileMetaData::new(number, file_size, smallest, largest),
                    );
                },
                TAG_DROP_CF => edit.drop_column_family(dec.get_fixed32()?),
                tag => {
                    return Err(Status::corruption(format!(
                        "Unknown version edit tag {tag} at offset {}",
                        dec.position() - 1
                    )));
                },
            }
        }

        Ok(edit)
    }
}
