use clap::{Parser, Subcommand, ValueEnum};
use weather_core::{Config, OpenWeatherClient, WeatherProvider, WeatherQuery};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "ZIP-code weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key.
    Configure,

    /// Show current conditions for a U.S. ZIP code.
    Current {
        /// ZIP code, e.g. "12345".
        zipcode: String,

        /// Unit system: "fahrenheit" or "celsius" (exact lowercase).
        #[arg(long)]
        units: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show the average temperature over the next few days.
    Average {
        /// ZIP code, e.g. "12345".
        zipcode: String,

        /// Unit system: "fahrenheit" or "celsius" (exact lowercase).
        #[arg(long)]
        units: String,

        /// Number of days to average over (2-5).
        #[arg(long)]
        days: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Current { zipcode, units, output } => {
                let query = WeatherQuery::current(&zipcode, &units)?;
                let client = client_from_config()?;

                let report = client.current_weather(&query).await?;

                match output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Text => {
                        println!("Location: {zipcode}");
                        println!("{}\u{00B0} {}", report.current_temperature, report.unit);
                        println!("Rain possible today: {}", report.rain_possible_today);
                    }
                }

                Ok(())
            }
            Command::Average { zipcode, units, days, output } => {
                let query = WeatherQuery::average(&zipcode, &units, days)?;
                let client = client_from_config()?;

                let report = client.average_weather(&query).await?;

                match output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Text => {
                        println!("Location: {zipcode}");
                        println!("{}\u{00B0} {}", report.average_temperature, report.unit);
                        println!("Rain possible soon: {}", report.rain_possible);
                    }
                }

                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Text::new("OpenWeatherMap API key:").prompt()?;
    config.api_key = Some(api_key);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

fn client_from_config() -> anyhow::Result<OpenWeatherClient> {
    let config = Config::load()?;
    OpenWeatherClient::from_config(&config)
}
