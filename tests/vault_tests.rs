//! Integration tests for the QVault vault module.

use std::fs;
use std::path::{Path, PathBuf};

use qvault::crypto::KdfParams;
use qvault::vault::format::{HEADER_LEN, MAC_OFFSET, SALT_OFFSET};
use qvault::vault::{Value, VaultStore};
use qvault::VaultError;
use tempfile::TempDir;

const PASSWORD: &[u8] = b"password";

/// Cheap calibration so tests don't spend 50ms per derivation.
fn fast_params() -> KdfParams {
    KdfParams {
        target_ms: 2,
        benchmark_iterations: 200,
        min_iterations: 100,
    }
}

/// Helper: create a temporary vault file path inside a fresh temp dir.
fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.qvault");
    (dir, path)
}

/// Helper: create a vault and return an unlocked handle on it.
fn unlocked(path: &Path) -> VaultStore {
    VaultStore::create_with_params(path, PASSWORD, &fast_params()).expect("create vault");
    let mut store = VaultStore::with_params(path, fast_params());
    store.unlock(PASSWORD).expect("unlock vault");
    store
}

fn flip_bit(path: &Path, offset: usize, bit: u8) {
    let mut data = fs::read(path).unwrap();
    data[offset] ^= 1 << bit;
    fs::write(path, &data).unwrap();
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn create_writes_non_empty_file() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();

    let data = fs::read(&path).unwrap();
    assert!(data.len() >= HEADER_LEN);
    assert_eq!(&data[..4], b"QVLT");
}

#[test]
fn create_fails_when_file_exists() {
    let (_dir, path) = vault_path();
    fs::write(&path, b"something else").unwrap();

    let result = VaultStore::create_with_params(&path, PASSWORD, &fast_params());
    assert!(matches!(result, Err(VaultError::AlreadyExists(_))));

    // The existing file is left alone.
    assert_eq!(fs::read(&path).unwrap(), b"something else");
}

#[test]
fn create_fails_with_empty_password() {
    let (_dir, path) = vault_path();

    let result = VaultStore::create_with_params(&path, b"", &fast_params());
    assert!(matches!(result, Err(VaultError::EmptyPassword)));
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn create_restricts_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ---------------------------------------------------------------------------
// Locked state
// ---------------------------------------------------------------------------

#[test]
fn new_handle_is_locked() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();

    let store = VaultStore::new(&path);
    assert!(store.is_locked());
    assert_eq!(store.filepath(), path.as_path());
}

#[test]
fn record_operations_fail_while_locked() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();
    let mut store = VaultStore::new(&path);

    assert!(matches!(
        store.get_value("k"),
        Err(VaultError::LockedStateViolation)
    ));
    assert!(matches!(
        store.set_value("k", 1i64),
        Err(VaultError::LockedStateViolation)
    ));
    assert!(matches!(
        store.remove_value("k"),
        Err(VaultError::LockedStateViolation)
    ));
    assert!(matches!(
        store.clear(),
        Err(VaultError::LockedStateViolation)
    ));
    assert!(matches!(
        store.change_password(b"other-password"),
        Err(VaultError::LockedStateViolation)
    ));
}

#[test]
fn lock_is_idempotent() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);

    store.lock();
    store.lock();
    assert!(store.is_locked());
}

// ---------------------------------------------------------------------------
// Unlocking
// ---------------------------------------------------------------------------

#[test]
fn wrong_password_keeps_vault_locked() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();
    let mut store = VaultStore::new(&path);

    let result = store.unlock(b"wrong-password");
    assert!(matches!(result, Err(VaultError::AuthenticationFailure)));
    assert!(store.is_locked());

    // The right password still works afterwards.
    store.unlock(PASSWORD).unwrap();
    assert!(!store.is_locked());
}

#[test]
fn unlock_when_unlocked_is_a_no_op() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    store.set_value("k", "v").unwrap();

    // A different password is not even checked.
    store.unlock(b"anything").unwrap();
    assert_eq!(store.get_value("k").unwrap(), Value::from("v"));
}

#[test]
fn unlock_missing_file_is_io_error() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::new(&path);

    assert!(matches!(store.unlock(PASSWORD), Err(VaultError::Io(_))));
    assert!(store.is_locked());
}

#[test]
fn unlock_garbage_file_is_format_error() {
    let (_dir, path) = vault_path();
    fs::write(&path, b"definitely not a vault").unwrap();
    let mut store = VaultStore::new(&path);

    assert!(matches!(
        store.unlock(PASSWORD),
        Err(VaultError::InvalidVaultFormat(_))
    ));
}

// ---------------------------------------------------------------------------
// Tamper sensitivity
// ---------------------------------------------------------------------------

#[test]
fn flipping_any_mac_bit_fails_unlock() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();

    for offset in MAC_OFFSET..MAC_OFFSET + 32 {
        for bit in 0..8 {
            flip_bit(&path, offset, bit);
            let mut store = VaultStore::new(&path);
            assert!(
                matches!(store.unlock(PASSWORD), Err(VaultError::AuthenticationFailure)),
                "mac byte {offset} bit {bit}"
            );
            flip_bit(&path, offset, bit);
        }
    }

    // Restored file opens again.
    VaultStore::new(&path).unlock(PASSWORD).unwrap();
}

#[test]
fn flipping_any_salt_bit_fails_unlock() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, PASSWORD, &fast_params()).unwrap();

    for offset in SALT_OFFSET..SALT_OFFSET + 16 {
        for bit in 0..8 {
            flip_bit(&path, offset, bit);
            let mut store = VaultStore::new(&path);
            assert!(
                matches!(store.unlock(PASSWORD), Err(VaultError::AuthenticationFailure)),
                "salt byte {offset} bit {bit}"
            );
            flip_bit(&path, offset, bit);
        }
    }
}

// ---------------------------------------------------------------------------
// Record operations
// ---------------------------------------------------------------------------

#[test]
fn concrete_scenario() {
    let (_dir, path) = vault_path();
    VaultStore::create_with_params(&path, b"password", &fast_params()).unwrap();

    let mut store = VaultStore::new(&path);
    store.unlock(b"password").unwrap();
    store.set_value("intKey", 123i64).unwrap();
    store.set_value("stringKey", "Some string").unwrap();
    store.lock();

    store.unlock(b"password").unwrap();
    assert_eq!(store.get_value("intKey").unwrap(), Value::Int(123));
    assert_eq!(
        store.get_value("stringKey").unwrap(),
        Value::Text("Some string".into())
    );
    assert!(matches!(
        store.get_value("missing"),
        Err(VaultError::KeyNotFound(k)) if k == "missing"
    ));
}

#[test]
fn every_value_kind_survives_reopen() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);

    store.set_value("int", i64::MIN).unwrap();
    store.set_value("float", -1.5e10).unwrap();
    store.set_value("text", "héllo wörld").unwrap();
    store.set_value("empty-text", "").unwrap();
    store.set_value("bytes", vec![0u8, 255, 16, 0]).unwrap();
    drop(store);

    // A brand-new handle sees what the first one wrote.
    let mut store = VaultStore::new(&path);
    store.unlock(PASSWORD).unwrap();
    assert_eq!(store.get_value("int").unwrap(), Value::Int(i64::MIN));
    assert_eq!(store.get_value("float").unwrap(), Value::Float(-1.5e10));
    assert_eq!(store.get_value("text").unwrap(), Value::from("héllo wörld"));
    assert_eq!(store.get_value("empty-text").unwrap(), Value::from(""));
    assert_eq!(
        store.get_value("bytes").unwrap(),
        Value::Bytes(vec![0, 255, 16, 0])
    );
    assert_eq!(store.len().unwrap(), 5);
}

#[test]
fn set_replaces_existing_value() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);

    store.set_value("k", 1i64).unwrap();
    store.set_value("k", "now text").unwrap();

    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(store.get_value("k").unwrap(), Value::from("now text"));
}

#[test]
fn empty_key_is_rejected() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);

    assert!(matches!(store.set_value("", 1i64), Err(VaultError::EmptyKey)));
    assert!(matches!(store.get_value(""), Err(VaultError::EmptyKey)));
}

#[test]
fn remove_absent_key_is_a_no_op() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    store.set_value("keep", 1i64).unwrap();
    let before = fs::read(&path).unwrap();

    store.remove_value("never-set").unwrap();

    assert!(matches!(
        store.get_value("never-set"),
        Err(VaultError::KeyNotFound(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn remove_deletes_and_persists() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    store.set_value("a", 1i64).unwrap();
    store.set_value("b", 2i64).unwrap();

    store.remove_value("a").unwrap();
    store.lock();
    store.unlock(PASSWORD).unwrap();

    assert!(matches!(store.get_value("a"), Err(VaultError::KeyNotFound(_))));
    assert_eq!(store.get_value("b").unwrap(), Value::Int(2));
}

#[test]
fn clear_empties_vault() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    for i in 0..5i64 {
        store.set_value(&format!("key-{i}"), i).unwrap();
    }

    store.clear().unwrap();
    assert!(store.is_empty().unwrap());

    store.lock();
    store.unlock(PASSWORD).unwrap();
    for i in 0..5 {
        assert!(matches!(
            store.get_value(&format!("key-{i}")),
            Err(VaultError::KeyNotFound(_))
        ));
    }
}

#[test]
fn keys_are_sorted_plaintext() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    store.set_value("zeta", 1i64).unwrap();
    store.set_value("alpha", 2i64).unwrap();
    store.set_value("mid", 3i64).unwrap();

    assert_eq!(store.keys().unwrap(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn file_does_not_contain_plaintext() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    store.set_value("DATABASE_URL", "postgres://secret-host").unwrap();

    let data = fs::read(&path).unwrap();
    let contains = |needle: &[u8]| data.windows(needle.len()).any(|w| w == needle);
    assert!(!contains(b"DATABASE_URL"));
    assert!(!contains(b"secret-host"));
}

// ---------------------------------------------------------------------------
// Password change
// ---------------------------------------------------------------------------

#[test]
fn change_password_reencrypts_every_record() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);

    let pairs: Vec<(String, Value)> = (0..20i64)
        .map(|i| {
            let value = if i % 2 == 0 {
                Value::Int(i * 1_000)
            } else {
                Value::Text(format!("value number {i}"))
            };
            (format!("key-{i}"), value)
        })
        .collect();
    for (key, value) in &pairs {
        store.set_value(key, value.clone()).unwrap();
    }

    store.change_password(b"brand-new-password").unwrap();
    store.lock();

    // Old password no longer works.
    assert!(matches!(
        store.unlock(PASSWORD),
        Err(VaultError::AuthenticationFailure)
    ));

    store.unlock(b"brand-new-password").unwrap();
    assert_eq!(store.len().unwrap(), pairs.len());
    for (key, value) in &pairs {
        assert_eq!(&store.get_value(key).unwrap(), value, "{key}");
    }
}

#[test]
fn change_password_on_empty_vault() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);

    store.change_password(b"second-password").unwrap();
    store.lock();
    store.unlock(b"second-password").unwrap();
    assert!(store.is_empty().unwrap());
}

#[test]
fn change_password_rejects_empty_password() {
    let (_dir, path) = vault_path();
    let mut store = unlocked(&path);
    store.set_value("k", 1i64).unwrap();

    assert!(matches!(
        store.change_password(b""),
        Err(VaultError::EmptyPassword)
    ));

    // Still usable with the old password.
    store.lock();
    store.unlock(PASSWORD).unwrap();
    assert_eq!(store.get_value("k").unwrap(), Value::Int(1));
}
