//! Interactive host picker
//!
//! Shows one level of the profile tree as a numbered menu. Selecting a
//! profile with children descends into them; the `-parent-` entry goes back
//! up. Any other input filters the current level.

use std::io;

use crossterm::style::Stylize;

use sw_core::traits::Prompter;
use sw_core::Profile;

use crate::output::format_profile_line;

/// Label of the entry that returns to the enclosing level
pub const PARENT_ENTRY: &str = "-parent-";

const PROMPT: &str = "select host (number, filter text, empty to clear, q to quit): ";

/// A selectable row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Parent,
    Profile(&'a Profile),
}

impl Entry<'_> {
    fn label(&self) -> String {
        match self {
            Entry::Parent => PARENT_ENTRY.to_string(),
            Entry::Profile(profile) => format_profile_line(profile),
        }
    }
}

/// Whether every space-separated term occurs in `"name user host"`
pub fn matches_query(profile: &Profile, query: &str) -> bool {
    let content = format!("{} {} {}", profile.name, profile.user, profile.host);
    query
        .split(' ')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| content.contains(term))
}

/// Rows shown for one level
pub fn visible_entries<'a>(level: &'a [Profile], nested: bool, filter: &str) -> Vec<Entry<'a>> {
    let parent = nested.then_some(Entry::Parent);
    parent
        .into_iter()
        .chain(
            level
                .iter()
                .filter(|p| matches_query(p, filter))
                .map(Entry::Profile),
        )
        .collect()
}

/// Let the user pick a leaf profile
///
/// Returns `None` when the user quits or input ends.
pub fn choose<'a>(roots: &'a [Profile], prompter: &dyn Prompter) -> io::Result<Option<&'a Profile>> {
    let mut stack: Vec<&'a [Profile]> = vec![roots];
    let mut filter = String::new();

    loop {
        let level = stack.last().copied().unwrap_or(roots);
        let entries = visible_entries(level, stack.len() > 1, &filter);
        render(&entries, &filter);

        let answer = match prompter.read_line(PROMPT) {
            Ok(answer) => answer,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        let answer = answer.trim();

        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }

        let picked = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| entries.get(i).copied());
        match picked {
            Some(Entry::Parent) => {
                stack.pop();
                filter.clear();
            }
            Some(Entry::Profile(profile)) if !profile.children.is_empty() => {
                stack.push(&profile.children);
                filter.clear();
            }
            Some(Entry::Profile(profile)) => return Ok(Some(profile)),
            None => filter = answer.to_string(),
        }
    }
}

fn render(entries: &[Entry<'_>], filter: &str) {
    if filter.is_empty() {
        println!("{}", "✨ select host".green());
    } else {
        println!("{} {}", "✨ select host".green(), format!("[filter: {}]", filter).dark_grey());
    }
    if entries.is_empty() {
        println!("  {}", "no matching hosts".dark_grey());
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("{:>3}. {}", i + 1, entry.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_core::prompt::ScriptedPrompter;

    fn tree() -> Vec<Profile> {
        vec![
            Profile {
                children: vec![
                    Profile {
                        user: "postgres".into(),
                        ..Profile::new("db-primary", "10.0.1.5")
                    },
                    Profile::new("db-replica", "10.0.1.6"),
                ],
                ..Profile::new("databases", "")
            },
            Profile {
                user: "deploy".into(),
                ..Profile::new("web", "app.example.com")
            },
        ]
    }

    #[test]
    fn test_query_requires_every_term() {
        let profile = Profile {
            user: "deploy".into(),
            ..Profile::new("web", "app.example.com")
        };
        assert!(matches_query(&profile, ""));
        assert!(matches_query(&profile, "web deploy"));
        assert!(matches_query(&profile, "  example  "));
        assert!(!matches_query(&profile, "web root"));
    }

    #[test]
    fn test_parent_entry_only_when_nested() {
        let tree = tree();
        assert_eq!(visible_entries(&tree, false, "").len(), 2);
        let nested = visible_entries(&tree[0].children, true, "replica");
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0], Entry::Parent);
    }

    #[test]
    fn test_choose_descends_into_children() {
        let tree = tree();
        let prompter = ScriptedPrompter::new(["1", "3"]);
        let picked = choose(&tree, &prompter).unwrap().unwrap();
        assert_eq!(picked.name, "db-replica");
    }

    #[test]
    fn test_choose_parent_then_filter() {
        let tree = tree();
        let prompter = ScriptedPrompter::new(["1", "1", "deploy", "1"]);
        let picked = choose(&tree, &prompter).unwrap().unwrap();
        assert_eq!(picked.name, "web");
    }

    #[test]
    fn test_choose_quit_or_eof() {
        let tree = tree();
        assert!(choose(&tree, &ScriptedPrompter::new(["q"])).unwrap().is_none());
        assert!(choose(&tree, &ScriptedPrompter::new(Vec::<String>::new()))
            .unwrap()
            .is_none());
    }
}
