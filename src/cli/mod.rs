//! Command-line parsing for the NIV engine.
//!
//! Every tunable lives in the YAML config; the command line only says where
//! that file is.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "niv", version, about = "National Impact Velocity macro indicator (FRED-based)")]
pub struct Cli {
    /// YAML configuration file (defaults are used when omitted).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn config_flag_is_optional() {
        let cli = Cli::try_parse_from(["niv"]).unwrap();
        assert!(cli.config.is_none());

        let cli = Cli::try_parse_from(["niv", "--config", "conf/niv.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("conf/niv.yaml")));
    }

    #[test]
    fn help_names_the_indicator() {
        let about = Cli::command().get_about().map(|a| a.to_string()).unwrap_or_default();
        assert!(about.starts_with("National Impact Velocity"), "{about}");
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["niv", "--fit"]).is_err());
    }
}
