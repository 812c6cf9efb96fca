use thiserror::Error;

use mavis_core::MavisError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read ISA catalog '{path}': {source}")]
    BadISAFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse ISA catalog '{path}': {source}")]
    BadISAFileJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read annotation catalog '{path}': {source}")]
    BadAnnotationFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse annotation catalog '{path}': {source}")]
    BadAnnotationFileJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("entry in '{file}' is missing a required 'mnemonic' (stencil {stencil:?})")]
    MissingMnemonic { file: String, stencil: Option<String> },

    #[error("mnemonic '{mnemonic}' in '{file}' is missing a required 'stencil'")]
    MissingStencil { file: String, mnemonic: String },

    #[error("mnemonic '{mnemonic}' in '{file}' names unknown form '{form}'")]
    UnknownForm {
        file: String,
        mnemonic: String,
        form: String,
    },

    #[error("mnemonic '{mnemonic}' duplicated within annotation file '{file}'")]
    AnnotationNotUniqueInFile { mnemonic: String, file: String },

    #[error("uArchInfo for '{mnemonic}': unknown unit '{value}'")]
    UArchInfoUnknownUnit { mnemonic: String, value: String },

    #[error("uArchInfo for '{mnemonic}': unknown issue target '{value}'")]
    UArchInfoUnknownIssueTarget { mnemonic: String, value: String },

    #[error("uArchInfo for '{mnemonic}': rob_group '{value}' is not a parseable integer")]
    UArchInfoROBGroupParseError { mnemonic: String, value: String },

    #[error("overlay '{0}' is missing its base instruction's definition")]
    OverlayMissingBase(String),

    #[error(transparent)]
    Core(#[from] MavisError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
