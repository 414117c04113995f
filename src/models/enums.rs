use serde::{Deserialize, Serialize};

/// Unknown string value for one of the `str_enum!` enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(DocumentFormat {
    Pdf => "pdf",
    Txt => "txt",
    Html => "html",
    Docx => "docx",
    Xlsx => "xlsx",
});

str_enum!(AnalysisMode {
    Single => "single",
    Compare => "compare",
});

impl DocumentFormat {
    /// Infer the declared format from an uploaded file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "htm" => Some(Self::Html),
            "text" => Some(Self::Txt),
            other => other.parse().ok(),
        }
    }
}

impl AnalysisMode {
    /// Number of documents a request in this mode must carry.
    pub fn expected_documents(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Compare => 2,
        }
    }
}
