//! Generate command - produce one artifact without running the server.

use std::path::Path;
use std::time::Instant;

use artcache::generate::GenerationRequest;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Generate subcommands.
#[derive(Debug, Subcommand)]
pub enum GenerateAction {
    /// Animated clip from an HLS master playlist
    Clip {
        /// Manifest URL (*.apple.com)
        url: String,
    },
    /// Composite artist square from 2 to 4 images
    Square {
        /// Image URLs; order does not affect the result
        #[arg(num_args = 2..=4, required = true)]
        urls: Vec<String>,
    },
    /// 1024x1024 copy of one image
    Resize {
        /// Image URL (*.mzstatic.com)
        url: String,
    },
}

impl GenerateAction {
    fn into_request(self) -> GenerationRequest {
        match self {
            GenerateAction::Clip { url } => GenerationRequest::AnimatedClip { manifest_url: url },
            GenerateAction::Square { urls } => GenerationRequest::CompositeSquare { image_urls: urls },
            GenerateAction::Resize { url } => GenerationRequest::ResizedCopy { image_url: url },
        }
    }
}

/// Run a generate subcommand.
pub async fn run(action: GenerateAction, config_path: Option<&Path>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("generate");

    let service = runner.create_service(CancellationToken::new()).await?;

    let request = action.into_request();
    println!("Generating {}...", request.class());
    let start = Instant::now();

    let result = service.generate_to_completion(request).await;
    service.shutdown();
    let location = result.map_err(CliError::Generate)?;

    println!(
        "Done in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    println!("  Key:  {}", location.key);
    println!("  Path: {}", location.path.display());
    println!(
        "  URL:  {}",
        service.public_url(location.class, &location.key, Some(&location.extension))
    );

    Ok(())
}
