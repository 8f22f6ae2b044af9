//! Unverified profile, search and avatar links
//!
//! Links are rendered from configured URL templates and never fetched, so
//! their presence says nothing about whether an account exists.

use crate::config::{LinkConfig, LinkTemplate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Profile,
    Search,
    Avatar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLink {
    pub platform: String,
    pub kind: LinkKind,
    pub url: String,
}

pub struct LinkBuilder {
    profiles: Vec<LinkTemplate>,
    searches: Vec<LinkTemplate>,
    avatar: Option<LinkTemplate>,
}

impl LinkBuilder {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            profiles: config.profiles.clone(),
            searches: config.searches.clone(),
            avatar: config.avatar.clone(),
        }
    }

    /// One link per username and profile template, usernames outermost
    pub fn profile_links(&self, usernames: &[String]) -> Vec<ProfileLink> {
        usernames
            .iter()
            .flat_map(|username| {
                let encoded = urlencoding::encode(username);
                self.profiles.iter().map(move |t| ProfileLink {
                    platform: t.platform.clone(),
                    kind: LinkKind::Profile,
                    url: t.template.replace("{username}", &encoded),
                })
            })
            .collect()
    }

    pub fn search_links(&self, query: &str) -> Vec<ProfileLink> {
        let encoded = urlencoding::encode(query.trim());
        self.searches
            .iter()
            .map(|t| ProfileLink {
                platform: t.platform.clone(),
                kind: LinkKind::Search,
                url: t.template.replace("{query}", &encoded),
            })
            .collect()
    }

    /// Avatar lookup keyed on the SHA-256 of the normalized address
    pub fn avatar_link(&self, email: &str) -> Option<ProfileLink> {
        let template = self.avatar.as_ref()?;
        let digest = hex::encode(Sha256::digest(email.trim().to_lowercase().as_bytes()));
        Some(ProfileLink {
            platform: template.platform.clone(),
            kind: LinkKind::Avatar,
            url: template.template.replace("{email_sha256}", &digest),
        })
    }

    /// Profiles, then searches, then the avatar when an email is given
    pub fn build(&self, usernames: &[String], query: &str, email: Option<&str>) -> Vec<ProfileLink> {
        let mut links = self.profile_links(usernames);
        links.extend(self.search_links(query));
        links.extend(email.and_then(|e| self.avatar_link(e)));
        links
    }
}
