//! Channel existence checks.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex_lite::Regex;

use super::ports::{ChannelDirectory, DirectoryError};

static CHANNEL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]{3,25}$").expect("valid regex"));

/// Whether `name` is a well-formed channel or user name. Case-insensitive.
pub fn is_valid_channel_name(name: &str) -> bool {
    CHANNEL_NAME_RE.is_match(&name.to_lowercase())
}

/// Directory backed by a fixed list of channels.
///
/// An empty list accepts every well-formed channel name.
#[derive(Debug, Default)]
pub struct StaticChannelDirectory {
    channels: HashSet<String>,
}

impl StaticChannelDirectory {
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            channels: channels
                .into_iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl ChannelDirectory for StaticChannelDirectory {
    async fn channel_exists(&self, channel: &str) -> Result<bool, DirectoryError> {
        if !is_valid_channel_name(channel) {
            return Ok(false);
        }
        Ok(self.channels.is_empty() || self.channels.contains(&channel.to_lowercase()))
    }
}
