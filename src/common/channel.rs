use serde::{Deserialize, Serialize};
use std::fmt;

/// Image channels the analysis engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    R,
    G,
    B,
    A,
}

impl Channel {
    pub const COLOR: [Channel; 3] = [Channel::R, Channel::G, Channel::B];

    pub fn is_color(&self) -> bool {
        !matches!(self, Channel::A)
    }

    /// Parses a decoder channel name ("R", "r", "red", "B"...), ignoring layer prefixes.
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.rsplit('.').next().unwrap_or(name);
        match short.to_ascii_lowercase().as_str() {
            "r" | "red" => Some(Channel::R),
            "g" | "green" => Some(Channel::G),
            "b" | "blue" => Some(Channel::B),
            "a" | "alpha" => Some(Channel::A),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::R => "R",
            Channel::G => "G",
            Channel::B => "B",
            Channel::A => "A",
        };
        f.pad(name)
    }
}

/// Set of channels included in aggregation (histogram, waveform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVisibility {
    pub r: bool,
    pub g: bool,
    pub b: bool,
}

impl Default for ChannelVisibility {
    fn default() -> Self {
        Self::all()
    }
}

impl ChannelVisibility {
    pub fn all() -> Self {
        Self {
            r: true,
            g: true,
            b: true,
        }
    }

    pub fn only(channels: &[Channel]) -> Self {
        Self {
            r: channels.contains(&Channel::R),
            g: channels.contains(&Channel::G),
            b: channels.contains(&Channel::B),
        }
    }

    pub fn is_visible(&self, channel: Channel) -> bool {
        match channel {
            Channel::R => self.r,
            Channel::G => self.g,
            Channel::B => self.b,
            Channel::A => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.r || self.g || self.b)
    }

    pub fn visible(&self) -> Vec<Channel> {
        Channel::COLOR
            .into_iter()
            .filter(|c| self.is_visible(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layered_channel_names() {
        assert_eq!(Channel::from_name("R"), Some(Channel::R));
        assert_eq!(Channel::from_name("beauty.G"), Some(Channel::G));
        assert_eq!(Channel::from_name("alpha"), Some(Channel::A));
        assert_eq!(Channel::from_name("Z"), None);
    }

    #[test]
    fn visibility_never_includes_alpha() {
        let visibility = ChannelVisibility::only(&[Channel::R, Channel::A]);
        assert!(visibility.is_visible(Channel::R));
        assert!(!visibility.is_visible(Channel::A));
        assert_eq!(visibility.visible(), vec![Channel::R]);
    }
}
