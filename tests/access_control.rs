use datarepo::construct::{Access, DataRepo, KeyOptions};
use datarepo::datatype::ValueKind;
use datarepo::error::RepoError;

#[test]
fn write_password_enforced() {
    let repo = DataRepo::new();
    repo.create_key("secure", ValueKind::String, &KeyOptions::new().write_pass("w123")).unwrap();
    let err = repo.write("secure", "x", None).unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized(Access::Write)));
    assert!(matches!(repo.write("secure", "x", Some("nope")), Err(RepoError::Unauthorized(_))));
    repo.write("secure", "x", Some("w123")).unwrap();
    assert_eq!(repo.read_string("secure", None).unwrap(), "x");
}

#[test]
fn set_null_needs_the_write_password() {
    let repo = DataRepo::new();
    let options = KeyOptions::new().write_pass("w123");
    repo.create_and_write("secure", ValueKind::String, "x", &options).unwrap();
    assert!(matches!(repo.set_null("secure", None), Err(RepoError::Unauthorized(Access::Write))));
    repo.set_null("secure", Some("w123")).unwrap();
    assert_eq!(repo.read_string("secure", None).unwrap(), "");
}

#[test]
fn read_password_enforced() {
    let repo = DataRepo::new();
    let options = KeyOptions::new().read_pass("r123").write_pass("w123");
    repo.create_key("secret", ValueKind::String, &options).unwrap();
    repo.write("secret", "top", Some("w123")).unwrap();
    assert!(matches!(repo.read("secret", None), Err(RepoError::Unauthorized(Access::Read))));
    assert!(matches!(repo.read_string("secret", Some("w123")), Err(RepoError::Unauthorized(_))));
    let snapshot = repo.read("secret", Some("r123")).unwrap();
    assert_eq!(snapshot.display(), "top");
}

#[test]
fn delete_password_enforced() {
    let repo = DataRepo::new();
    let options = KeyOptions::new().delete_pass("d123").write_pass("d123");
    repo.create_and_write("temp_key", ValueKind::Integer, 7, &options).unwrap();
    assert!(matches!(repo.delete_key("temp_key", None), Err(RepoError::Unauthorized(Access::Delete))));
    assert!(repo.contains_key("temp_key"));
    repo.delete_key("temp_key", Some("d123")).unwrap();
    assert!(matches!(repo.read("temp_key", None), Err(RepoError::KeyNotFound(_))));
}

#[test]
fn empty_password_means_unprotected() {
    let repo = DataRepo::new();
    let options = KeyOptions::new().read_pass("").write_pass("").delete_pass("");
    repo.create_key("open", ValueKind::Integer, &options).unwrap();
    repo.write("open", 5, None).unwrap();
    assert_eq!(repo.read_string("open", None).unwrap(), "5");
    repo.delete_key("open", None).unwrap();
}

#[test]
fn batch_password_applies_to_every_entry() {
    let repo = DataRepo::new();
    repo.create_key("p.a", ValueKind::Integer, &KeyOptions::new().write_pass("w")).unwrap();
    repo.create_key("p.b", ValueKind::Integer, &KeyOptions::new().write_pass("other")).unwrap();
    let err = repo.write_batch([("p.a", 1), ("p.b", 2)], Some("w")).unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized(Access::Write)));
    assert_eq!(repo.read_string("p.a", None).unwrap(), "1");
    assert_eq!(repo.read_string("p.b", None).unwrap(), "");
}

#[test]
fn policy_reports_which_accesses_are_guarded() {
    let repo = DataRepo::new();
    let options = KeyOptions::new().read_pass("r").write_pass("");
    repo.create_key("guarded", ValueKind::String, &options).unwrap();
    let (_, cell) = repo.list_all().find(|(key, _)| key == "guarded").unwrap();
    let policy = cell.policy();
    assert!(policy.is_protected(Access::Read));
    // an empty password guards nothing
    assert!(!policy.is_protected(Access::Write));
    assert!(!policy.is_protected(Access::Delete));
}
