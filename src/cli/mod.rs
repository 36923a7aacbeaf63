use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardManager, Environment, ImageClipboard};
use crate::config::Config;
use crate::editor::MarkdownFile;
use crate::naming::{NameSuggester, NamingEngine, RemoteNamingClient};
use crate::notify::{messages, ConsoleNotifier, Notifier};
use crate::paste::PasteCommand;

/// Exit code for a paste that found nothing to do
pub const EXIT_WARNING: u8 = 2;

#[derive(Parser)]
#[command(name = "pastemark")]
#[command(about = "Paste clipboard images into Markdown documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Save the clipboard image and reference it from a document")]
    Paste {
        /// Markdown document receiving the image reference
        document: PathBuf,

        /// Selected text: used as the image name and replaced by the reference
        #[arg(short, long)]
        selection: Option<String>,

        /// Insert the reference after this line instead of at the end
        #[arg(short, long)]
        line: Option<usize>,

        /// Never ask the naming service
        #[arg(long)]
        no_remote: bool,

        /// Image directory, absolute or relative to the document
        #[arg(long)]
        image_path: Option<PathBuf>,
    },

    #[command(about = "Show platform, clipboard, and naming service status")]
    Status,

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Generate example configuration")]
    Init {
        #[arg(long)]
        force: bool,
    },

    #[command(about = "Validate configuration")]
    Validate,
}

pub struct CliHandler {
    config: Arc<Config>,
    config_path: Option<PathBuf>,
}

impl CliHandler {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        // A named file that does not exist yet is what `config init` creates
        let config = match &config_path {
            Some(path) if !path.exists() => Config::default(),
            _ => Config::load_config(config_path.as_deref()).with_context(|| match &config_path {
                Some(path) => format!("Failed to load {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?,
        };

        Ok(Self {
            config: Arc::new(config),
            config_path,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn handle_command(&self, command: Commands) -> Result<ExitCode> {
        match command {
            Commands::Paste {
                document,
                selection,
                line,
                no_remote,
                image_path,
            } => {
                self.paste(document, selection, line, no_remote, image_path)
                    .await
            }
            Commands::Status => self.show_status().await,
            Commands::Config { action } => self.handle_config_action(action),
        }
    }

    /// Naming engine for the loaded configuration
    pub fn naming_engine(&self) -> Result<NamingEngine> {
        let naming = &self.config.naming;
        let suggester: Option<Arc<dyn NameSuggester>> = if naming.remote_enabled {
            Some(Arc::new(RemoteNamingClient::from_config(naming)?))
        } else {
            None
        };
        Ok(NamingEngine::new(suggester, naming.max_file_name_length))
    }

    async fn paste(
        &self,
        document: PathBuf,
        selection: Option<String>,
        line: Option<usize>,
        no_remote: bool,
        image_path: Option<PathBuf>,
    ) -> Result<ExitCode> {
        let notifier = Arc::new(ConsoleNotifier::new());
        let setup = async {
            let clipboard = ClipboardManager::new(&self.config.clipboard).await?;
            Ok::<_, anyhow::Error>((clipboard, self.naming_engine()?))
        };
        let (clipboard, naming) = match setup.await {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Paste setup failed: {:#}", e);
                notifier.error(&messages::format_error(messages::FAILED_TO_PASTE_IMAGE, &e));
                return Ok(ExitCode::FAILURE);
            }
        };

        let editor = Arc::new(
            MarkdownFile::new(document)
                .with_selection(selection)
                .with_cursor_line(line),
        );
        let image_dir = image_path.unwrap_or_else(|| self.config.storage.image_path.clone());

        let command = PasteCommand::new(Arc::new(clipboard), editor, notifier, naming)
            .with_image_dir(image_dir)
            .with_max_image_size(self.config.storage.max_image_size);

        let allow_remote = self.config.naming.remote_enabled && !no_remote;
        debug!("Remote naming allowed: {}", allow_remote);

        match command.execute(allow_remote).await {
            Ok(report) => {
                println!("{}", report.reference);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) if e.is_warning() => Ok(ExitCode::from(EXIT_WARNING)),
            Err(_) => Ok(ExitCode::FAILURE),
        }
    }

    async fn show_status(&self) -> Result<ExitCode> {
        println!("PasteMark Status:");
        println!("  Version: {}", crate::VERSION);
        println!(
            "  Build: {} ({}, {})",
            env!("TARGET"),
            env!("PROFILE"),
            env!("BUILD_DATE")
        );
        println!("  Compiler: {}", env!("RUSTC_VERSION"));
        println!(
            "  Config: {}",
            self.config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "Default".to_string())
        );

        let environment = Environment::detect()?;
        println!("  Platform: {}", environment.display_name());

        let clipboard = ClipboardManager::new(&self.config.clipboard).await?;
        println!("  Clipboard adapter: {}", clipboard.name());
        let has_image = clipboard.has_image().await;
        clipboard.cleanup().await;
        println!(
            "  Clipboard image: {}",
            if has_image { "present" } else { "none" }
        );

        let naming = &self.config.naming;
        if naming.remote_enabled {
            let client = RemoteNamingClient::from_config(naming)?;
            let available = client.is_available().await;
            println!(
                "  Naming service: {} ({}, model {})",
                if available { "available" } else { "unavailable" },
                client.endpoint(),
                client.model()
            );
        } else {
            println!("  Naming service: disabled");
        }

        Ok(ExitCode::SUCCESS)
    }

    fn handle_config_action(&self, action: ConfigAction) -> Result<ExitCode> {
        match action {
            ConfigAction::Show => {
                println!("Current Configuration:");
                println!("{}", toml::to_string_pretty(self.config.as_ref())?);
            }
            ConfigAction::Init { force } => {
                let path = match &self.config_path {
                    Some(path) => {
                        Config::write_example_config(path, force)?;
                        path.clone()
                    }
                    None => Config::generate_example_config(force)?,
                };
                info!("Wrote example configuration to {}", path.display());
                println!("Example configuration generated at {}", path.display());
            }
            ConfigAction::Validate => {
                // Loading in CliHandler::new already validated it
                println!("Configuration is valid");
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
