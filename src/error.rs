use std::io;

/// Failure kinds of a conversion run. Every one of them aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The export file is not well-formed XML.
    #[error("malformed export at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// A `<note>` element lacks one of its required children.
    #[error("note #{index}: required element <{field}> is missing")]
    Schema { index: usize, field: &'static str },

    #[error("invalid timestamp {value:?}: expected YYYYMMDDTHHMMSSZ")]
    DateFormat { value: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_identify_the_failing_note() {
        let err = ConvertError::Schema {
            index: 3,
            field: "created",
        };
        assert_eq!(
            err.to_string(),
            "note #3: required element <created> is missing"
        );
    }

    #[test]
    fn io_keeps_its_source() {
        let err = ConvertError::io(
            "Failed to create notes.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("Failed to create notes.json"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
