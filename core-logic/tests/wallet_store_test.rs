use core_logic::{
    generate_wallets, import_wallets, read_wallet_records, validate_wallets, DecodePolicy,
    KeyDecoder, WalletError, WalletRecord, WalletStore,
};
use std::fs;
use tempfile::tempdir;

fn record(public_key: Option<&str>, private_key: Option<&str>) -> WalletRecord {
    WalletRecord {
        public_key: public_key.map(str::to_string),
        private_key: private_key.map(str::to_string),
        balance: None,
    }
}

#[test]
fn test_generate_count_bounds() {
    assert_eq!(generate_wallets(1).unwrap().len(), 1);
    assert_eq!(generate_wallets(100).unwrap().len(), 100);
    assert!(matches!(
        generate_wallets(0),
        Err(WalletError::InvalidCount { count: 0, .. })
    ));
    assert!(generate_wallets(101).is_err());
}

#[test]
fn test_generated_wallets_are_consistent() {
    let decoder = KeyDecoder::strict();
    for wallet in generate_wallets(5).unwrap() {
        let keypair = decoder.decode(&wallet.private_key).unwrap();
        assert_eq!(keypair.address(), wallet.public_key);
    }
}

#[test]
fn test_import_replaces_mismatched_address() {
    let wallets = generate_wallets(2).unwrap();
    let records = vec![
        record(Some(&wallets[0].public_key), Some(&wallets[0].private_key)),
        record(Some(&wallets[0].public_key), Some(&wallets[1].private_key)),
        record(Some("abc"), None),
        record(Some("abc"), Some("not-a-real-key")),
    ];

    let report = import_wallets(&records, DecodePolicy::Strict);

    assert_eq!(report.imported(), 2);
    assert_eq!(report.wallets[0].public_key, wallets[0].public_key);
    assert_eq!(report.wallets[1].public_key, wallets[1].public_key);
    assert_eq!(report.wallets[0].balance, Some(0.0));

    assert_eq!(report.invalid.len(), 2);
    assert!(report.invalid[0].errors.missing_required_fields);
    assert!(report.invalid[1].errors.invalid_private_key);
}

#[test]
fn test_validate_flags_mismatch() {
    let wallets = generate_wallets(2).unwrap();
    let records = vec![
        record(Some(&wallets[0].public_key), Some(&wallets[0].private_key)),
        record(Some(&wallets[0].public_key), Some(&wallets[1].private_key)),
        record(None, Some(&wallets[1].private_key)),
    ];

    let report = validate_wallets(&records, DecodePolicy::Strict);

    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.valid, 1);
    assert_eq!(report.stats.invalid, 2);
    assert!(report.invalid[0].errors.key_mismatch);
    assert!(!report.invalid[0].errors.invalid_private_key);
    assert_eq!(
        report.invalid[0].errors.mismatch_error.as_deref(),
        Some(
            WalletError::AddressMismatch {
                expected: wallets[0].public_key.clone(),
                actual: wallets[1].public_key.clone(),
            }
            .to_string()
            .as_str()
        )
    );
    assert!(report.invalid[1].errors.missing_required_fields);
    assert_eq!(report.invalid[1].errors.mismatch_error, None);
}

#[test]
fn test_store_missing_file_loads_empty() {
    let dir = tempdir().unwrap();
    let store = WalletStore::new(dir.path().join("wallets.json"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_store_save_and_load() {
    let dir = tempdir().unwrap();
    let store = WalletStore::new(dir.path().join("nested").join("wallets.json"));
    let wallets = generate_wallets(3).unwrap();

    store.save(&wallets).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded.len(), 3);
    for (saved, original) in loaded.iter().zip(&wallets) {
        assert_eq!(saved.public_key, original.public_key);
        assert_eq!(saved.private_key, original.private_key);
    }

    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"wallets\""));
    assert!(raw.contains("\"publicKey\""));
}

#[test]
fn test_store_accepts_bare_array() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wallets.json");
    let wallet = &generate_wallets(1).unwrap()[0];
    let body = format!(
        r#"[{{"publicKey": "{}", "privateKey": "{}", "balance": 1.5}}]"#,
        wallet.public_key, wallet.private_key
    );
    fs::write(&path, body).unwrap();

    let loaded = WalletStore::new(&path).load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].balance, Some(1.5));
}

#[test]
fn test_store_merge_deduplicates() {
    let dir = tempdir().unwrap();
    let store = WalletStore::new(dir.path().join("wallets.json"));
    let first = generate_wallets(2).unwrap();
    store.save(&first).unwrap();

    let mut incoming = generate_wallets(1).unwrap();
    incoming.push(first[1].clone());

    let summary = store.merge(&incoming).unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(store.load().unwrap().len(), 3);
}

#[test]
fn test_read_records_tolerates_partial_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("import.json");
    fs::write(
        &path,
        r#"{"wallets": [{"publicKey": "abc"}, {"privateKey": "def", "balance": 2}]}"#,
    )
    .unwrap();

    let records = read_wallet_records(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].private_key.is_none());
    assert_eq!(records[1].balance, Some(2.0));
}
