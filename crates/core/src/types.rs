use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the inner string as a str slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    InstanceId,
    "Identifies the calling BI instance (`x-looker-instance` header). Used for tracing only."
);
newtype_string!(
    WebhookId,
    "Identifies one outgoing webhook delivery (`x-looker-webhook-id` header). Used for tracing only."
);

/// Granularity of the data an action is invoked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Cell,
    Query,
    Dashboard,
}

impl ActionType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cell => "cell",
            Self::Query => "query",
            Self::Dashboard => "dashboard",
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cell" => Ok(Self::Cell),
            "query" => Ok(Self::Query),
            "dashboard" => Ok(Self::Dashboard),
            other => Err(format!("unknown action type \"{other}\"")),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data formats an action can declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFormat {
    Txt,
    Csv,
    CsvZip,
    InlineJson,
    Json,
    JsonLabel,
    JsonDetail,
    JsonDetailLiteStream,
    Xlsx,
    Html,
    WysiwygPdf,
    AssembledPdf,
    WysiwygPng,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFormatting {
    Formatted,
    Unformatted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionVisualizationFormatting {
    Apply,
    Noapply,
}

/// How the caller delivers data: pushed inline, or as a download URL the
/// action streams from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDownloadSetting {
    Push,
    Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_serde_is_transparent() {
        let id = WebhookId::new("wh-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"wh-123\"");
        let back: WebhookId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn action_type_wire_names() {
        assert_eq!(serde_json::to_string(&ActionType::Dashboard).unwrap(), "\"dashboard\"");
        let t: ActionType = serde_json::from_str("\"cell\"").unwrap();
        assert_eq!(t, ActionType::Cell);
        assert_eq!(ActionType::Query.to_string(), "query");
        assert_eq!("dashboard".parse::<ActionType>(), Ok(ActionType::Dashboard));
        assert!("spreadsheet".parse::<ActionType>().is_err());
    }

    #[test]
    fn format_wire_names() {
        assert_eq!(
            serde_json::to_string(&ActionFormat::JsonDetailLiteStream).unwrap(),
            "\"json_detail_lite_stream\""
        );
        assert_eq!(
            serde_json::to_string(&ActionFormat::WysiwygPdf).unwrap(),
            "\"wysiwyg_pdf\""
        );
    }
}
