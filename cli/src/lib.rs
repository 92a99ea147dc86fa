//! Command-line front end for upload-ai.

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use upload_ai_pipeline::config::Config;
use upload_ai_pipeline::{FfmpegTranscoder, FormController, HttpVideoApi, SubmitOutcome, VideoId};

use crate::render::StatusLine;

#[derive(Debug, Parser)]
#[command(name = "upload-ai")]
#[command(about = "Extract a video's audio, upload it and request a transcription")]
#[command(version)]
pub struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a video's audio track and request its transcription
    Upload(UploadArgs),
    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Video file to upload
    pub video: PathBuf,

    /// Keywords mentioned in the video, separated by commas
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Backend base URL (overrides api.base_url)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// ffmpeg executable (overrides transcode.ffmpeg_path)
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parse arguments, set up logging and run the selected command.
pub async fn run() -> Result<()> {
    run_with(Cli::parse()).await
}

pub async fn run_with(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let config = load_config(&config_path, &cli.command)?;

    let _guard = upload_ai_pipeline::init_logging(&config.logging)?;

    match cli.command {
        Commands::Upload(args) => upload(&config, args).await,
        Commands::Config(command) => config_command(&config, &config_path, command),
    }
}

/// Load the config file for `command`.
///
/// `config path` and `config init` fall back to defaults on a broken file so
/// they can still be used to locate or replace it.
fn load_config(path: &Path, command: &Commands) -> Result<Config> {
    match command {
        Commands::Config(ConfigCommand::Path | ConfigCommand::Init { .. }) => {
            Ok(Config::load_from(path).unwrap_or_default())
        }
        _ => Config::load_from(path),
    }
}

/// Settings for one upload after command-line overrides are applied.
#[derive(Debug, Clone, PartialEq)]
struct UploadSettings {
    api_url: String,
    ffmpeg_path: PathBuf,
}

impl UploadSettings {
    fn resolve(config: &Config, args: &UploadArgs) -> Self {
        Self {
            api_url: args
                .api_url
                .clone()
                .unwrap_or_else(|| config.api.base_url.clone()),
            ffmpeg_path: args
                .ffmpeg
                .clone()
                .unwrap_or_else(|| config.transcode.ffmpeg_path.clone()),
        }
    }
}

async fn upload(config: &Config, args: UploadArgs) -> Result<()> {
    let settings = UploadSettings::resolve(config, &args);
    info!(api_url = %settings.api_url, ffmpeg = %settings.ffmpeg_path.display(), "Starting upload");

    let controller = FormController::new(
        Arc::new(FfmpegTranscoder::new(settings.ffmpeg_path)),
        Arc::new(HttpVideoApi::new(settings.api_url)),
        |id: &VideoId| println!("{id}"),
    );

    controller
        .select_file([&args.video])
        .await
        .with_context(|| format!("Cannot select {}", args.video.display()))?;
    controller.set_prompt(args.prompt).await;

    let line = StatusLine::new();
    line.show(&controller.status().await);
    let renderer = tokio::spawn(render::follow(controller.subscribe(), line));

    let outcome = controller.submit().await;
    // Closing the status channel lets the renderer exit on every path.
    drop(controller);
    renderer.await.context("Status renderer panicked")?;

    match outcome? {
        SubmitOutcome::Uploaded(id) => {
            info!(video_id = %id, "Done");
            Ok(())
        }
        other => anyhow::bail!("Nothing was uploaded: {other:?}"),
    }
}

fn config_command(config: &Config, path: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save_to(path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_with_prompt() {
        let cli = Cli::try_parse_from([
            "upload-ai",
            "upload",
            "talk.mp4",
            "--prompt",
            "rust, async",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.video, PathBuf::from("talk.mp4"));
                assert_eq!(args.prompt.as_deref(), Some("rust, async"));
                assert_eq!(args.api_url, None);
            }
            other => panic!("Expected upload, got {other:?}"),
        }
    }

    #[test]
    fn test_upload_requires_video() {
        assert!(Cli::try_parse_from(["upload-ai", "upload"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["upload-ai", "config", "show", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Show)));
    }

    #[test]
    fn test_settings_fall_back_to_config() {
        let config = Config::default();
        let args = UploadArgs {
            video: PathBuf::from("v.mp4"),
            prompt: None,
            api_url: None,
            ffmpeg: None,
        };

        let settings = UploadSettings::resolve(&config, &args);

        assert_eq!(settings.api_url, "http://localhost:3333");
        assert_eq!(settings.ffmpeg_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_settings_prefer_arguments() {
        let config = Config::default();
        let args = UploadArgs {
            video: PathBuf::from("v.mp4"),
            prompt: None,
            api_url: Some("https://api.example.com".to_string()),
            ffmpeg: Some(PathBuf::from("/opt/bin/ffmpeg")),
        };

        let settings = UploadSettings::resolve(&config, &args);

        assert_eq!(settings.api_url, "https://api.example.com");
        assert_eq!(settings.ffmpeg_path, PathBuf::from("/opt/bin/ffmpeg"));
    }

    #[test]
    fn test_config_init_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let config = Config::default();

        config_command(&config, &path, ConfigCommand::Init { force: false }).unwrap();
        assert!(path.exists());

        let err = config_command(&config, &path, ConfigCommand::Init { force: false }).unwrap_err();
        assert!(err.to_string().contains("--force"));

        config_command(&config, &path, ConfigCommand::Init { force: true }).unwrap();
    }

    #[test]
    fn test_config_init_force_replaces_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        let command = Commands::Config(ConfigCommand::Init { force: true });

        let config = load_config(&path, &command).unwrap();
        let Commands::Config(init) = command else {
            unreachable!()
        };
        config_command(&config, &path, init).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_config_path_ignores_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let config = load_config(&path, &Commands::Config(ConfigCommand::Path)).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_upload_rejects_corrupt_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        let command = Commands::Upload(UploadArgs {
            video: PathBuf::from("v.mp4"),
            prompt: None,
            api_url: None,
            ffmpeg: None,
        });

        assert!(load_config(&path, &command).is_err());
        assert!(load_config(&path, &Commands::Config(ConfigCommand::Show)).is_err());
    }
}
