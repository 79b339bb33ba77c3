use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the recommendation service.
    Daemon {},

    /// Analyze a single url and print the result
    Analyze {
        /// Page or video url
        url: String,
    },

    /// Find indexed pages similar to a url or a text
    Similar {
        /// A previously analyzed url
        #[clap(short, long)]
        url: Option<String>,

        /// Free text
        #[clap(short, long)]
        text: Option<String>,

        /// Number of results
        #[clap(short)]
        k: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_similar() {
        let args = Args::try_parse_from(["recommender", "similar", "--text", "rust", "-k", "3"])
            .unwrap();

        match args.command {
            Command::Similar { url, text, k } => {
                assert_eq!(url, None);
                assert_eq!(text.as_deref(), Some("rust"));
                assert_eq!(k, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_analyze_requires_url() {
        assert!(Args::try_parse_from(["recommender", "analyze"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
