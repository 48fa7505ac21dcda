//! Import hosts from an OpenSSH client config
//!
//! Every `Host` block whose first pattern is a concrete name and that
//! resolves a `HostName` becomes a profile named after that pattern.
//! Keyword lookup follows OpenSSH: the first value from any block whose
//! patterns match the name wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use sw_core::{Profile, ProfileTree};

#[derive(Debug, Default)]
struct Block {
    patterns: Vec<String>,
    options: Vec<(String, String)>,
}

impl Block {
    fn matches(&self, name: &str) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            if let Some(negated) = pattern.strip_prefix('!') {
                if glob_match(negated, name) {
                    return false;
                }
            } else if glob_match(pattern, name) {
                matched = true;
            }
        }
        matched
    }
}

/// Parsed `ssh_config` contents
#[derive(Debug, Default)]
pub struct SshConfig {
    blocks: Vec<Block>,
}

impl SshConfig {
    pub fn parse(text: &str) -> Self {
        // Options before the first Host line apply to every host
        let mut blocks = vec![Block {
            patterns: vec!["*".to_string()],
            options: Vec::new(),
        }];

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((keyword, value)) = split_option(line) else {
                continue;
            };

            match keyword.to_ascii_lowercase().as_str() {
                "host" => blocks.push(Block {
                    patterns: value.split_whitespace().map(str::to_string).collect(),
                    options: Vec::new(),
                }),
                // Match conditions are not evaluated; their options never apply
                "match" => blocks.push(Block::default()),
                _ => {
                    if let Some(block) = blocks.last_mut() {
                        block
                            .options
                            .push((keyword.to_ascii_lowercase(), unquote(value).to_string()));
                    }
                }
            }
        }

        Self { blocks }
    }

    /// First value of `keyword` that applies to `name`
    pub fn get(&self, name: &str, keyword: &str) -> Option<&str> {
        let keyword = keyword.to_ascii_lowercase();
        self.blocks
            .iter()
            .filter(|block| block.matches(name))
            .flat_map(|block| block.options.iter())
            .find(|(key, _)| *key == keyword)
            .map(|(_, value)| value.as_str())
    }

    /// Concrete host names, in file order
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .filter_map(|block| block.patterns.first())
            .map(String::as_str)
            .filter(|p| !p.contains(['*', '?', '!']))
    }

    /// Convert to profiles, expanding `~` in key paths against `home`
    pub fn profiles(&self, home: &Path) -> Vec<Profile> {
        let mut profiles = Vec::new();
        for alias in self.host_names() {
            let Some(host) = self.get(alias, "HostName").filter(|h| !h.is_empty()) else {
                continue;
            };

            let port = match self.get(alias, "Port") {
                Some(port) => port.parse().unwrap_or_else(|_| {
                    tracing::warn!("Ignoring invalid port {:?} for {}", port, alias);
                    sw_core::profile::DEFAULT_PORT
                }),
                None => sw_core::profile::DEFAULT_PORT,
            };

            profiles.push(Profile {
                alias: alias.to_string(),
                user: self.get(alias, "User").unwrap_or_default().to_string(),
                port,
                key_path: self
                    .get(alias, "IdentityFile")
                    .map(|p| expand_tilde(p, home).display().to_string())
                    .unwrap_or_default(),
                ..Profile::new(alias, host)
            });
        }
        profiles
    }
}

/// Load `~/.ssh/config` as a profile tree
pub fn load_default() -> Result<ProfileTree> {
    let home = dirs::home_dir().context("Cannot determine home directory")?;
    let path = home.join(".ssh").join("config");
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let profiles = SshConfig::parse(&text).profiles(&home);
    tracing::debug!("Imported {} hosts from {:?}", profiles.len(), path);
    Ok(ProfileTree::new(profiles))
}

fn split_option(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let keyword = &line[..idx];
    let value = line[idx..].trim_start_matches(|c: char| c.is_whitespace() || c == '=');
    let value = value.trim();
    (!keyword.is_empty() && !value.is_empty()).then_some((keyword, value))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None if path == "~" => home.to_path_buf(),
        None => PathBuf::from(path),
    }
}

/// `*` and `?` wildcard match
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((sp, sn)) = star {
            p = sp + 1;
            n = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
