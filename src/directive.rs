use crate::xml::Element;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    /// Windows Phone 8
    Wp8,
}

impl Platform {
    /// Maps a `platforms/` directory name onto a supported platform.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "android" => Some(Platform::Android),
            "ios" => Some(Platform::Ios),
            "wp8" => Some(Platform::Wp8),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Wp8 => "wp8",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `android-manifest/<path>/<attr>` preference
    AttributePreference,
    /// Child element of a `<config-file>` block
    SubtreeInsert,
    /// `ios-XCBuildConfiguration-<key>` preference
    BuildSetting,
    /// Any other `ios-<type>-<key>` preference, xcconfig files only
    TextSetting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Value(String),
    Subtree(Element),
}

/// How a build setting is rendered when it is added to a block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuoteMode {
    None,
    Key,
    Value,
    Both,
}

impl QuoteMode {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "none" => QuoteMode::None,
            "key" => QuoteMode::Key,
            "value" => QuoteMode::Value,
            _ => QuoteMode::Both,
        }
    }

    pub fn quotes_key(&self) -> bool {
        matches!(self, QuoteMode::Key | QuoteMode::Both)
    }

    pub fn quotes_value(&self) -> bool {
        matches!(self, QuoteMode::Value | QuoteMode::Both)
    }
}

/// `xcconfigEnforce` tri-state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Enforce {
    True,
    False,
    #[default]
    Unset,
}

impl Enforce {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("true") => Enforce::True,
            Some("false") => Enforce::False,
            _ => Enforce::Unset,
        }
    }
}

/// A normalized edit instruction for one target file.
///
/// Produced by the descriptor parser and only ever borrowed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub platform: Platform,
    pub target_file: String,
    pub kind: DirectiveKind,
    /// Selector of the insertion point. Build and text settings carry the
    /// settings section type here (`XCBuildConfiguration`).
    pub parent_path: String,
    pub destination: String,
    pub payload: Payload,
    pub build_type: Option<String>,
    pub quote_mode: Option<QuoteMode>,
    pub enforce: Enforce,
}

impl Directive {
    /// Scalar payload, empty for subtree payloads.
    pub fn value(&self) -> &str {
        match &self.payload {
            Payload::Value(v) => v,
            Payload::Subtree(_) => "",
        }
    }

    pub fn subtree(&self) -> Option<&Element> {
        match &self.payload {
            Payload::Subtree(el) => Some(el),
            Payload::Value(_) => None,
        }
    }

    pub fn quote_mode(&self) -> QuoteMode {
        self.quote_mode.unwrap_or(QuoteMode::Both)
    }
}
