use lsmkv::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, CompressionType, DB, DBOptions, ReadOptions,
    Slice, WriteBatch, WriteOptions,
    filename,
    wal::{self, Writer},
};
use tempfile::TempDir;

fn get(db: &DB, key: &str) -> Option<Slice> {
    db.get(&ReadOptions::default(), &Slice::from(key)).unwrap()
}

fn put(db: &DB, key: &str, value: &str) {
    db.put(&WriteOptions::default(), Slice::from(key), Slice::from(value))
        .unwrap();
}

#[test]
fn test_wal_recovery_after_crash() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_db");

    {
        let db = DB::open(&db_path, DBOptions::default()).unwrap();
        put(&db, "key1", "value1");
        put(&db, "key2", "value2");
        put(&db, "key3", "value3");
        // Dropped without an explicit close
    }

    {
        let db = DB::open_for_read_only(&db_path, DBOptions::default()).unwrap();
        assert_eq!(get(&db, "key1"), Some(Slice::from("value1")));
        assert_eq!(get(&db, "key3"), Some(Slice::from("value3")));
    }

    let db = DB::open(&db_path, DBOptions::default()).unwrap();
    assert_eq!(get(&db, "key1"), Some(Slice::from("value1")));
    assert_eq!(get(&db, "key2"), Some(Slice::from("value2")));
    assert_eq!(get(&db, "key3"), Some(Slice::from("value3")));
}

#[test]
fn test_wal_recovery_with_delete() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_db");

    {
        let db = DB::open(&db_path, DBOptions::default()).unwrap();
        put(&db, "key1", "value1");
        put(&db, "key2", "value2");
        db.delete(&WriteOptions::default(), Slice::from("key1"))
            .unwrap();
    }

    let db = DB::open_for_read_only(&db_path, DBOptions::default()).unwrap();
    assert_eq!(get(&db, "key1"), None);
    assert_eq!(get(&db, "key2"), Some(Slice::from("value2")));
}

#[test]
fn test_tombstones_shadow_older_tables() {
    let temp_dir = TempDir::new().unwrap();

    {
        let db = DB::open(temp_dir.path(), DBOptions::default()).unwrap();
        put(&db, "a", "1");
        put(&db, "b", "1");
        put(&db, "c", "1");
        db.flush().unwrap();

        db.delete(&WriteOptions::default(), Slice::from("a"))
            .unwrap();
        put(&db, "b", "2");
        db.flush().unwrap();

        // Only in the WAL
        db.delete(&WriteOptions::default(), Slice::from("c"))
            .unwrap();
    }

    for read_only in [true, false] {
        let db = if read_only {
            DB::open_for_read_only(temp_dir.path(), DBOptions::default()).unwrap()
        } else {
            DB::open(temp_dir.path(), DBOptions::default()).unwrap()
        };
        assert_eq!(get(&db, "a"), None);
        assert_eq!(get(&db, "b"), Some(Slice::from("2")));
        assert_eq!(get(&db, "c"), None);
    }
}

#[test]
fn test_recovery_across_families_and_compressions() {
    let temp_dir = TempDir::new().unwrap();
    let options = DBOptions {
        create_missing_column_families: true,
        ..Default::default()
    };
    let cf_descriptors = || {
        vec![
            ColumnFamilyDescriptor::default_family(),
            ColumnFamilyDescriptor::new(
                "lz4",
                ColumnFamilyOptions {
                    compression_type: CompressionType::Lz4,
                    ..Default::default()
                },
            ),
            ColumnFamilyDescriptor::new(
                "plain",
                ColumnFamilyOptions {
                    compression_type: CompressionType::None,
                    ..Default::default()
                },
            ),
        ]
    };

    {
        let (db, handles) =
            DB::open_with_column_families(temp_dir.path(), options.clone(), cf_descriptors())
                .unwrap();
        let mut batch = WriteBatch::new();
        for handle in &handles {
            for i in 0..100 {
                batch.put_cf(
                    handle,
                    Slice::from(format!("{}-{i:03}", handle.name())),
                    Slice::from(format!("value-{i}").repeat(10)),
                );
            }
        }
        db.write(&WriteOptions { sync: true }, &batch).unwrap();
        db.flush().unwrap();

        let mut batch = WriteBatch::new();
        batch.delete_cf(&handles[1], Slice::from("lz4-000"));
        db.write(&WriteOptions::default(), &batch).unwrap();
    }

    let (db, handles) =
        DB::open_with_column_families(temp_dir.path(), options, cf_descriptors()).unwrap();
    let ro = ReadOptions::default();
    for handle in &handles {
        let expected = Some(Slice::from("value-7".repeat(10)));
        let key = Slice::from(format!("{}-007", handle.name()));
        assert_eq!(db.get_cf(&ro, handle, &key).unwrap(), expected);
    }
    assert_eq!(
        db.get_cf(&ro, &handles[1], &Slice::from("lz4-000")).unwrap(),
        None
    );
    assert_eq!(
        db.get_cf(&ro, &handles[0], &Slice::from("lz4-001")).unwrap(),
        None
    );
}

#[test]
fn test_reader_tolerates_torn_wal_tail() {
    let temp_dir = TempDir::new().unwrap();

    {
        let db = DB::open(temp_dir.path(), DBOptions::default()).unwrap();
        put(&db, "key1", "value1");
    }

    // The live WAL is the newest log file.
    let log_number = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| {
            let name = e.unwrap().file_name().into_string().unwrap();
            match filename::parse_file_name(&name) {
                Some(filename::FileType::Log(n)) => Some(n),
                _ => None,
            }
        })
        .max()
        .unwrap();
    let log_path = filename::log_file_name(temp_dir.path(), log_number);

    // A record cut short, as a writer crashing mid-append would leave it.
    let mut scratch = Vec::new();
    {
        let scratch_path = temp_dir.path().join("scratch.log");
        let mut writer = Writer::new(&scratch_path).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(Slice::from("torn"), Slice::from("x".repeat(100)));
        writer.add_record(&batch.encode(1000)).unwrap();
        scratch.extend(std::fs::read(&scratch_path).unwrap());
        std::fs::remove_file(&scratch_path).unwrap();
    }
    let mut contents = std::fs::read(&log_path).unwrap();
    contents.extend_from_slice(&scratch[..wal::HEADER_SIZE + 10]);
    std::fs::write(&log_path, contents).unwrap();

    let db = DB::open_for_read_only(temp_dir.path(), DBOptions::default()).unwrap();
    assert_eq!(get(&db, "key1"), Some(Slice::from("value1")));
    assert_eq!(get(&db, "torn"), None);
}

#[test]
fn test_second_writer_is_busy() {
    let temp_dir = TempDir::new().unwrap();

    let writer = DB::open(temp_dir.path(), DBOptions::default()).unwrap();
    put(&writer, "key", "value");

    let err = DB::open(temp_dir.path(), DBOptions::default()).err().unwrap();
    assert!(err.is_busy());

    // Readers do not need the lock.
    let reader = DB::open_for_read_only(temp_dir.path(), DBOptions::default()).unwrap();
    assert_eq!(get(&reader, "key"), Some(Slice::from("value")));

    writer.close().unwrap();
    let writer = DB::open(temp_dir.path(), DBOptions::default()).unwrap();
    assert_eq!(get(&writer, "key"), Some(Slice::from("value")));
}

#[test]
fn test_read_write_open_must_list_every_family() {
    let temp_dir = TempDir::new().unwrap();
    {
        let db = DB::open(temp_dir.path(), DBOptions::default()).unwrap();
        db.create_column_family("users", ColumnFamilyOptions::default())
            .unwrap();
    }

    let err = DB::open(temp_dir.path(), DBOptions::default()).err().unwrap();
    assert!(err.is_invalid_argument());

    let err = DB::open_with_column_families(
        temp_dir.path(),
        DBOptions::default(),
        vec![
            ColumnFamilyDescriptor::default_family(),
            ColumnFamilyDescriptor::from("users"),
            ColumnFamilyDescriptor::from("orders"),
        ],
    )
    .err()
    .unwrap();
    assert!(err.is_unknown_column_family());
}
