//! The profile tree and its on-disk store
//!
//! A store is a YAML or JSON list of [`Profile`] records. Parsing tries YAML
//! first and falls back to JSON; saving picks the encoding from the file
//! extension.

mod node;

pub use node::{CallbackShell, Profile, DEFAULT_PORT, DEFAULT_USER};

use std::path::{Path, PathBuf};

use crate::cipher::CredentialCipher;
use crate::error::{ConfigError, ProfileError};

/// File names searched, in order, when no store path is given
pub const STORE_NAMES: [&str; 4] = [".sshw", ".sshw.yml", ".sshw.yaml", ".sshw.json"];

/// File written when saving without an explicit path
pub const DEFAULT_STORE_NAME: &str = ".sshw.yml";

/// Encryption state of the top-level profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionStatus {
    /// Every top-level profile is encrypted
    Encrypted,
    /// No top-level profile is encrypted
    Plaintext,
    /// Some are, some are not
    Partial,
}

/// An ordered list of top-level profiles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileTree {
    profiles: Vec<Profile>,
    source: Option<PathBuf>,
}

impl ProfileTree {
    /// Create a tree from profiles built in memory
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles,
            source: None,
        }
    }

    /// Parse a profile store, trying YAML then JSON
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        parse_profiles(bytes).map(Self::new)
    }

    /// Load the store at `path`, or search the default locations
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (bytes, source) = read_store(path)?;
        Ok(Self::from_slice(&bytes)?.with_source(source))
    }

    /// Record where the tree was read from
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Path the tree was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Write the tree to `path`, or to `~/.sshw.yml`
    ///
    /// `.json` destinations get pretty JSON, everything else YAML. The file
    /// is readable by its owner only.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => home_dir()?.join(DEFAULT_STORE_NAME),
        };

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let content = if is_json {
            serde_json::to_string_pretty(&self.profiles)
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            serde_yaml::to_string(&self.profiles)
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        };

        write_owner_only(&path, content.as_bytes()).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Saved {} profiles to {:?}", self.profiles.len(), path);
        Ok(path)
    }

    /// Return an encrypted copy of the tree
    ///
    /// All-or-nothing: on error `self` is untouched and no partial tree is
    /// returned.
    pub fn encrypted(&self, cipher: &CredentialCipher) -> Result<Self, ProfileError> {
        let mut next = self.clone();
        for profile in &mut next.profiles {
            profile.encrypt_fields(cipher)?;
        }
        Ok(next)
    }

    /// Return a decrypted copy of the tree (all-or-nothing)
    pub fn decrypted(&self, cipher: &CredentialCipher) -> Result<Self, ProfileError> {
        let mut next = self.clone();
        for profile in &mut next.profiles {
            profile.decrypt_fields(cipher)?;
        }
        Ok(next)
    }

    /// Encryption state across the top-level profiles
    ///
    /// An empty tree reports [`EncryptionStatus::Plaintext`].
    pub fn encryption_status(&self) -> EncryptionStatus {
        let encrypted = self.profiles.iter().filter(|p| p.is_encrypted).count();
        if encrypted == 0 {
            EncryptionStatus::Plaintext
        } else if encrypted == self.profiles.len() {
            EncryptionStatus::Encrypted
        } else {
            EncryptionStatus::Partial
        }
    }

    /// Whether some top-level profile holds secrets in plaintext
    pub fn has_plaintext_secrets(&self) -> bool {
        self.profiles
            .iter()
            .any(|p| !p.is_encrypted && p.has_secrets())
    }

    /// Whether a profile below the top level holds secrets in plaintext
    ///
    /// [`ProfileTree::has_plaintext_secrets`] does not see these.
    pub fn has_nested_plaintext_secrets(&self) -> bool {
        self.profiles
            .iter()
            .any(|p| nested_plaintext(&p.children) || nested_plaintext(&p.jump))
    }

    /// Find a profile by alias anywhere under `children`
    pub fn find_by_alias(&self, alias: &str) -> Option<&Profile> {
        find_alias(&self.profiles, alias)
    }
}

fn nested_plaintext(profiles: &[Profile]) -> bool {
    profiles.iter().any(|p| {
        (!p.is_encrypted && p.has_secrets())
            || nested_plaintext(&p.children)
            || nested_plaintext(&p.jump)
    })
}

fn find_alias<'a>(profiles: &'a [Profile], alias: &str) -> Option<&'a Profile> {
    for profile in profiles {
        if !profile.alias.is_empty() && profile.alias == alias {
            return Some(profile);
        }
        if let Some(found) = find_alias(&profile.children, alias) {
            return Some(found);
        }
    }
    None
}

/// Report whether a store is encrypted without decrypting it
///
/// Only top-level profiles are inspected; a tree whose encrypted nodes sit
/// solely under `children` or `jump` reports `false`.
pub fn is_tree_encrypted(bytes: &[u8]) -> Result<bool, ConfigError> {
    Ok(parse_profiles(bytes)?.iter().any(|p| p.is_encrypted))
}

/// Read the raw bytes of a store, returning the path that was used
pub fn read_store(path: Option<&Path>) -> Result<(Vec<u8>, PathBuf), ConfigError> {
    if let Some(path) = path {
        return match std::fs::read(path) {
            Ok(bytes) => Ok((bytes, path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        };
    }

    let candidates = default_store_candidates(dirs::home_dir().as_deref());
    for candidate in &candidates {
        if let Ok(bytes) = std::fs::read(candidate) {
            tracing::debug!("Using profile store {:?}", candidate);
            return Ok((bytes, candidate.clone()));
        }
    }
    Err(ConfigError::NoProfileStore {
        searched: candidates,
    })
}

/// Default store locations: each name under `home`, then relative to the
/// current directory
pub fn default_store_candidates(home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(STORE_NAMES.len() * 2);
    if let Some(home) = home {
        candidates.extend(STORE_NAMES.iter().map(|name| home.join(name)));
    }
    candidates.extend(STORE_NAMES.iter().map(PathBuf::from));
    candidates
}

fn parse_profiles(bytes: &[u8]) -> Result<Vec<Profile>, ConfigError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let yaml_err = match serde_yaml::from_slice::<Option<Vec<Profile>>>(bytes) {
        Ok(profiles) => return Ok(profiles.unwrap_or_default()),
        Err(e) => e,
    };
    match serde_json::from_slice::<Vec<Profile>>(bytes) {
        Ok(profiles) => Ok(profiles),
        Err(json_err) => Err(ConfigError::Parse {
            yaml: yaml_err.to_string(),
            json: json_err.to_string(),
        }),
    }
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or_else(|| ConfigError::Invalid("cannot determine home directory".into()))
}

pub(crate) fn write_owner_only(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(data)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE_YAML: &str = r#"
- name: web
  alias: w
  host: 10.0.0.5
  user: deploy
  port: 2222
  password: pw1
  callback-shells:
    - cmd: cd /srv
      delay: 500
- name: group
  children:
    - name: db
      alias: dbx
      host: db.internal
      passphrase: keypass
      jump:
        - name: bastion
          host: bastion.example.com
          password: jumppw
"#;

    fn cipher() -> CredentialCipher {
        CredentialCipher::new("master").with_iterations(1_000)
    }

    fn sample() -> ProfileTree {
        ProfileTree::from_slice(SAMPLE_YAML.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_yaml_store() {
        let tree = sample();
        assert_eq!(tree.len(), 2);
        let web = &tree.profiles()[0];
        assert_eq!(web.port(), 2222);
        assert_eq!(web.callback_shells[0].cmd, "cd /srv");
        assert_eq!(
            web.callback_shells[0].delay,
            std::time::Duration::from_millis(500)
        );
        assert_eq!(tree.profiles()[1].children[0].jump[0].name, "bastion");
    }

    #[test]
    fn test_parse_json_store() {
        let json = r#"[{"name":"a","host":"h","is_encrypted":true,"keypath":"/k"}]"#;
        let tree = ProfileTree::from_slice(json.as_bytes()).unwrap();
        assert!(tree.profiles()[0].is_encrypted);
        assert_eq!(tree.profiles()[0].key_path, "/k");
    }

    #[test]
    fn test_parse_failure_names_both_encodings() {
        let err = ProfileTree::from_slice(b"name: [unclosed").unwrap_err();
        match err {
            ConfigError::Parse { yaml, json } => {
                assert!(!yaml.is_empty());
                assert!(!json.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_store_is_empty_tree() {
        assert!(ProfileTree::from_slice(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_tree_encrypt_then_decrypt_restores_descendants() {
        let tree = sample();
        let encrypted = tree.encrypted(&cipher()).unwrap();

        let db = &encrypted.profiles()[1].children[0];
        assert!(db.is_encrypted);
        assert_ne!(db.passphrase, "keypass");
        assert!(db.jump[0].is_encrypted);
        assert_ne!(db.jump[0].password, "jumppw");
        assert_eq!(encrypted.encryption_status(), EncryptionStatus::Encrypted);

        let decrypted = encrypted.decrypted(&cipher()).unwrap();
        assert_eq!(decrypted, tree);
    }

    #[test]
    fn test_tree_transform_is_all_or_nothing() {
        let tree = sample();
        let encrypted = tree.encrypted(&cipher()).unwrap();
        let wrong = CredentialCipher::new("other").with_iterations(1_000);
        assert!(encrypted.decrypted(&wrong).is_err());
        assert!(encrypted.profiles()[0].is_encrypted);
        assert!(encrypted.decrypted(&cipher()).is_ok());
    }

    #[test]
    fn test_is_tree_encrypted_scans_top_level_only() {
        let nested = r#"
- name: group
  children:
    - name: inner
      host: h
      password: token
      is_encrypted: true
"#;
        assert!(!is_tree_encrypted(nested.as_bytes()).unwrap());

        let mixed = r#"
- name: a
  host: h
  is_encrypted: true
- name: b
  host: h
"#;
        assert!(is_tree_encrypted(mixed.as_bytes()).unwrap());
        let tree = ProfileTree::from_slice(mixed.as_bytes()).unwrap();
        assert_eq!(tree.encryption_status(), EncryptionStatus::Partial);
    }

    #[test]
    fn test_find_by_alias_searches_all_children() {
        let tree = sample();
        assert_eq!(tree.find_by_alias("w").unwrap().name, "web");
        assert_eq!(tree.find_by_alias("dbx").unwrap().name, "db");
        assert!(tree.find_by_alias("nope").is_none());
        assert!(tree.find_by_alias("").is_none());
    }

    #[test]
    fn test_has_plaintext_secrets() {
        assert!(sample().has_plaintext_secrets());
        let tree = ProfileTree::new(vec![Profile::new("bare", "h")]);
        assert!(!tree.has_plaintext_secrets());
    }

    #[test]
    fn test_nested_plaintext_secrets_seen_below_top_level() {
        let tree = ProfileTree::new(vec![Profile {
            children: vec![Profile {
                jump: vec![Profile {
                    password: "hunter2".into(),
                    ..Profile::new("bastion", "10.0.0.1")
                }],
                ..Profile::new("db", "10.0.1.5")
            }],
            ..Profile::new("group", "")
        }]);
        assert!(!tree.has_plaintext_secrets());
        assert!(tree.has_nested_plaintext_secrets());
        assert!(!ProfileTree::new(vec![Profile::new("bare", "h")]).has_nested_plaintext_secrets());
    }

    #[test]
    fn test_save_format_follows_extension() {
        let dir = TempDir::new().unwrap();
        let tree = sample();

        let json_path = tree.save(Some(&dir.path().join("store.json"))).unwrap();
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert!(json.trim_start().starts_with('['));

        let yaml_path = tree.save(Some(&dir.path().join("store.yml"))).unwrap();
        let yaml = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.starts_with("- name: web"));

        assert_eq!(ProfileTree::from_slice(json.as_bytes()).unwrap(), tree);
        assert_eq!(ProfileTree::from_slice(yaml.as_bytes()).unwrap(), tree);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = sample().save(Some(&dir.path().join(".sshw"))).unwrap();
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_records_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sshw.yaml");
        std::fs::write(&path, SAMPLE_YAML).unwrap();
        let tree = ProfileTree::load(Some(&path)).unwrap();
        assert_eq!(tree.source(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = ProfileTree::load(Some(&dir.path().join("absent"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_default_candidates_order() {
        let candidates = default_store_candidates(Some(Path::new("/home/u")));
        assert_eq!(candidates.len(), 8);
        assert_eq!(candidates[0], PathBuf::from("/home/u/.sshw"));
        assert_eq!(candidates[3], PathBuf::from("/home/u/.sshw.json"));
        assert_eq!(candidates[4], PathBuf::from(".sshw"));
    }
}
