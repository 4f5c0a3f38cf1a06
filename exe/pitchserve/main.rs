mod app_config;

use std::{error::Error, path::PathBuf};

use app_config::AppConfig;
use clap::{Args, Parser, Subcommand};
use pitchlib::{model::PitchDatasets, subcommands, utils};

#[derive(Parser)]
#[command(version, about = "Pitch type classifier")]
struct Cli {
  /// YAML file with default settings
  #[arg(short, long, value_name = "PATH", global = true)]
  config: Option<PathBuf>,
  /// Log every training step
  #[arg(short, long, global = true)]
  verbose: bool,
  #[command(subcommand)]
  command: Command,
}

#[derive(Args)]
struct DataArgs {
  #[arg(long, value_name = "PATH")]
  training_data: Option<PathBuf>,
  #[arg(long, value_name = "PATH")]
  test_data: Option<PathBuf>,
  /// Evaluate the test data after every epoch as well
  #[arg(long)]
  report_validation: bool,
  #[arg(long, value_name = "INT")]
  seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
  /// Train while serving predictions over a websocket
  Serve {
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
    #[command(flatten)]
    data: DataArgs,
  },
  /// Train without a server and report the final accuracy
  Train {
    #[command(flatten)]
    data: DataArgs,
  },
}

impl DataArgs {
  fn into_config(self, port: Option<u16>) -> AppConfig {
    AppConfig {
      port,
      training_data: self.training_data,
      test_data: self.test_data,
      report_validation: self.report_validation.then(|| true),
      seed: self.seed,
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  let args = Cli::parse();
  utils::init_logging(args.verbose)?;

  let file_config = match &args.config {
    Some(path) => AppConfig::from_file(path)?,
    None => AppConfig::default(),
  };

  match args.command {
    Command::Serve { port, data } => {
      let config = file_config.merge(data.into_config(port));
      let datasets = PitchDatasets::load(&config.training_data(), &config.test_data())?;
      let app = subcommands::Server::new(
        config.port.unwrap_or(subcommands::DEFAULT_PORT),
        datasets,
        config.report_validation.unwrap_or(false),
        config.seed,
      );
      app.run().await?;
    }
    Command::Train { data } => {
      let config = file_config.merge(data.into_config(None));
      let datasets = PitchDatasets::load(&config.training_data(), &config.test_data())?;
      let app = subcommands::Train::new(datasets, config.report_validation.unwrap_or(false), config.seed);
      app.run().await?;
    }
  }
  Ok(())
}
