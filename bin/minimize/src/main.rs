mod build;
mod project;

use std::path::{Path, PathBuf};

use clap::Parser;
use minimize::{BoxError, stamp};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use project::Configuration;

#[derive(Parser)]
enum Args {
    /// Minify every entry of a project and write the stamped outputs.
    Build {
        /// The path of the configuration file.
        #[arg(long)]
        project: Option<PathBuf>,

        /// Write the minifier's output without banner and checksum footer.
        #[arg(long)]
        disabled: bool,
    },
    /// Check that a stamped file still matches the checksum in its footer.
    Verify {
        #[arg()]
        file: PathBuf,

        /// The footer template the file was stamped with.
        #[arg(long, default_value = stamp::DEFAULT_FOOTER)]
        footer: String,
    },
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minimize=info,minimize_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match args {
        Args::Build { project, disabled } => {
            let project = Configuration::load(project.as_deref())?;
            build::run(&project, disabled)
        }
        Args::Verify { file, footer } => verify(&file, &footer),
    }
}

fn verify(file: &Path, footer: &str) -> Result<(), BoxError> {
    let code = std::fs::read_to_string(file)?;
    let code = build::strip_source_mapping_url(&code);

    if !stamp::verify_footer(code, footer) {
        return Err(format!("{}: checksum footer does not match", file.display()).into());
    }

    tracing::info!(file = %file.display(), "checksum footer matches");
    Ok(())
}
