//! Follow-up chains (`followedBy`)

use crate::{name::Action, CHAIN_DELIMITER, RELOAD_TOKEN};

#[derive(Clone, Debug, PartialEq)]
pub enum ChainEntry {
    /// Ask the host to reload all definitions
    Reload,
    Action(Action),
    /// Activate every animation with this name
    Animation(String),
}

impl ChainEntry {
    pub fn parse(entry: &str) -> Option<ChainEntry> {
        let entry = entry.trim();
        if entry.is_empty() {
            None
        } else if entry == RELOAD_TOKEN {
            Some(ChainEntry::Reload)
        } else if let Some(a) = Action::parse(entry) {
            Some(ChainEntry::Action(a))
        } else {
            Some(ChainEntry::Animation(entry.to_string()))
        }
    }
}

/// Splits a comma separated chain, skipping empty entries
pub fn parse_chain(csv: &str) -> Vec<ChainEntry> {
    csv.split(CHAIN_DELIMITER)
        .filter_map(ChainEntry::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_chain() {
        let chain = parse_chain(" fadeIn, ,Reload,SetActive:lamp, openUrl:https://example.com ,spin twice");
        assert_eq!(chain.len(), 5);
        assert_eq!(chain[0], ChainEntry::Animation("fadeIn".to_string()));
        assert_eq!(chain[1], ChainEntry::Reload);
        assert!(matches!(
            chain[2],
            ChainEntry::Action(Action::SetActive { active: true, .. })
        ));
        assert!(matches!(chain[3], ChainEntry::Action(Action::OpenUrl(_))));
        assert_eq!(chain[4], ChainEntry::Animation("spin twice".to_string()));
    }

    #[test]
    fn empty_chain() {
        assert!(parse_chain("").is_empty());
        assert!(parse_chain(" , ,").is_empty());
    }
}
