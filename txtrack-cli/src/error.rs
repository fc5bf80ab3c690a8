//! Error handling for the txtrack CLI

use std::path::PathBuf;
use thiserror::Error;
use txtrack_core::TrackError;

/// Main error type for txtrack CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid region '{region}': {message}")]
    InvalidRegion { region: String, message: String },

    #[error("Unknown chromosome: {name}")]
    UnknownChrom { name: String },

    #[error("Translation error: {message}")]
    Translation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    pub fn invalid_region<S: Into<String>, M: Into<String>>(region: S, message: M) -> Self {
        Self::InvalidRegion {
            region: region.into(),
            message: message.into(),
        }
    }

    pub fn translation<S: Into<String>>(message: S) -> Self {
        Self::Translation { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<TrackError> for CliError {
    fn from(err: TrackError) -> Self {
        match err {
            TrackError::UnknownChrom(name) => Self::UnknownChrom { name },
            TrackError::UnknownGeneticCode(id) => {
                Self::config(format!("unsupported genetic code {}", id))
            }
            TrackError::Format(e) => Self::invalid_format(e.to_string()),
            TrackError::Io(e) => Self::io(e.to_string()),
            other => Self::translation(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file\n\
                 • Compressed inputs must carry a .gz extension",
                path.display()
            ));
        }

        CliError::InvalidFormat { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Transcript files are tab-separated with 1-based exon starts\n\
                 • Chromosome sizes files have two columns: name and length\n\
                 • Ensure the file is not corrupted or truncated"
            );
        }

        CliError::InvalidRegion { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Use the form chr1:1000-2000\n\
                 • Positions accept K and M suffixes, e.g. chr1:1.5M-2M\n\
                 • A bare chromosome name selects the whole chromosome"
            );
        }

        CliError::UnknownChrom { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that --chromsizes or --reference lists this chromosome\n\
                 • Chromosome names are case sensitive (chr1 vs Chr1)"
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your txtrack.toml configuration file\n\
                 • Use 'txtrack config --example' to generate a sample configuration\n\
                 • Supported genetic codes are 1, 2 and 11"
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("genes.tsv"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));

        let err = CliError::invalid_region("chr1:x", "bad start");
        assert!(format_error_with_suggestions(&err).contains("chr1:1000-2000"));
    }

    #[test]
    fn test_track_error_conversion() {
        let err: CliError = TrackError::UnknownChrom("chrZ".to_string()).into();
        assert!(matches!(err, CliError::UnknownChrom { ref name } if name == "chrZ"));

        let err: CliError = TrackError::UnknownGeneticCode(7).into();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
