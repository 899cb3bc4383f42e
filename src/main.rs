use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Download a video from a Twitter/X post URL and save it as a local mp4
/// file.
#[derive(Parser)]
#[command(name = "tvget", version, about)]
struct Args {
    /// Post URL, e.g. https://x.com/tw_7rikazhexde/status/1710868951109124552
    post_url: String,

    /// Save the video under this filename, e.g. twittervid
    file_name: String,

    /// Directory the files are written into
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match tvget::download_video(&args.post_url, Some(&args.file_name), &args.output_dir).await {
        Ok(paths) if paths.is_empty() => info!("nothing to download"),
        Ok(_) => info!("all videos downloaded successfully"),
        Err(e) => error!("{e}"),
    }
}
