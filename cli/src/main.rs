use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use tunecraft::{
    config::AppConfig,
    download::AudioCache,
    history::TrackHistory,
    render::{describe_error, describe_tracks},
    retry::Retrying,
    watch::{watch_until_settled, WatchOptions, WatchOutcome},
    Attribute, Attributes, GenerationClient, GenerationError, GenerationRequest, MusicGenerator,
    Track,
};

/// Compose prompts and generate music through a hosted generation API.
#[derive(Parser)]
#[command(name = "tunecraft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Print tracks as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate music from a description plus optional attributes
    Generate {
        /// Free-text description of the music
        prompt: String,

        #[command(flatten)]
        attributes: AttributeArgs,

        #[command(flatten)]
        submit: SubmitArgs,
    },

    /// Generate through the custom-mode endpoint with explicit tags and title
    Custom {
        /// Free-text description of the music
        prompt: String,

        /// Comma-separated style tags, sent verbatim
        #[arg(long)]
        tags: Option<String>,

        /// Track title, sent verbatim
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        submit: SubmitArgs,
    },

    /// Print the prompt that would be sent, without calling the API
    Preview {
        /// Free-text description of the music
        prompt: String,

        #[command(flatten)]
        attributes: AttributeArgs,
    },

    /// Query the current state of one or more tracks
    Status {
        /// Track ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List tracks from earlier runs
    History,

    /// Download the audio of a track into the artifact directory
    Download {
        /// Track id
        id: String,

        /// Play the file after downloading
        #[cfg(feature = "playback")]
        #[arg(long)]
        play: bool,
    },
}

#[derive(Args)]
struct AttributeArgs {
    #[arg(long)]
    genre: Option<String>,

    #[arg(long)]
    mood: Option<String>,

    /// Voice gender (e.g. Male, Female, Neutral)
    #[arg(long)]
    voice: Option<String>,

    /// Additional instruments
    #[arg(long)]
    instruments: Option<String>,

    #[arg(long)]
    era: Option<String>,

    /// Lyrics language
    #[arg(long)]
    language: Option<String>,

    /// Tempo in beats per minute
    #[arg(long, value_parser = clap::value_parser!(u16).range(20..=400))]
    tempo: Option<u16>,

    /// Duration in seconds
    #[arg(long)]
    duration: Option<u32>,

    /// Musical key (e.g. C, F#)
    #[arg(long)]
    key: Option<String>,
}

impl AttributeArgs {
    fn into_attributes(self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes
            .set_opt(Attribute::Genre, self.genre)
            .set_opt(Attribute::Mood, self.mood)
            .set_opt(Attribute::VoiceGender, self.voice)
            .set_opt(Attribute::Instruments, self.instruments)
            .set_opt(Attribute::Era, self.era)
            .set_opt(Attribute::Language, self.language);
        if let Some(seconds) = self.duration {
            attributes.duration_seconds(seconds);
        }
        attributes.set_opt(Attribute::Key, self.key);
        if let Some(bpm) = self.tempo {
            attributes.tempo_bpm(bpm);
        }
        attributes
    }
}

#[derive(Args)]
struct SubmitArgs {
    /// Suppress vocals
    #[arg(long)]
    instrumental: bool,

    /// Return as soon as the job is accepted instead of waiting for audio
    #[arg(long)]
    no_wait: bool,

    /// Poll until every track has audio or an error
    #[arg(long)]
    watch: bool,

    /// Seconds between status polls
    #[arg(long, default_value_t = 5)]
    poll_interval: u64,

    /// Download audio for finished tracks
    #[arg(long)]
    download: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    setup_tracing()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Preview { prompt, attributes } => {
            let request = GenerationRequest::new(prompt).with_attributes(attributes.into_attributes());
            println!("{}", request.composed_prompt());
            Ok(())
        }
        Commands::Generate { prompt, attributes, submit } => {
            let request = GenerationRequest::new(prompt).with_attributes(attributes.into_attributes());
            submit_request(request, submit, cli.json).await
        }
        Commands::Custom { prompt, tags, title, submit } => {
            let request = GenerationRequest::new(prompt).custom(tags, title);
            submit_request(request, submit, cli.json).await
        }
        Commands::Status { ids } => {
            let session = Session::open()?;
            let tracks = session.client.fetch_status(&ids).await.map_err(generation_failure)?;
            session.remember(&tracks)?;
            print_tracks(&tracks, cli.json)
        }
        Commands::History => {
            let history = TrackHistory::load_from(&TrackHistory::default_path()?)?;
            let tracks: Vec<Track> = history.iter().cloned().collect();
            print_tracks(&tracks, cli.json)
        }
        #[cfg(feature = "playback")]
        Commands::Download { id, play } => {
            let path = download_track(&id).await?;
            if play {
                tokio::task::spawn_blocking(move || tunecraft::playback::play_blocking(&path))
                    .await
                    .context("playback task panicked")??;
            }
            Ok(())
        }
        #[cfg(not(feature = "playback"))]
        Commands::Download { id } => download_track(&id).await.map(|_| ()),
    }
}

fn setup_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}

/// Per-invocation wiring: configured client plus the persisted history.
struct Session {
    config: AppConfig,
    client: Retrying<GenerationClient>,
    history_path: PathBuf,
}

impl Session {
    fn open() -> Result<Self> {
        let config = AppConfig::load()?;
        info!(base_url = config.api_base_url(), "loaded configuration");
        if !config.has_api_key() {
            warn!("no API key configured; requests will be rejected");
        }
        let client = GenerationClient::new(config.client_config()?).map_err(generation_failure)?;
        let client = Retrying::new(client, config.retry_policy());
        Ok(Self { config, client, history_path: TrackHistory::default_path()? })
    }

    fn remember(&self, tracks: &[Track]) -> Result<TrackHistory> {
        let mut history = TrackHistory::load_from(&self.history_path)?;
        history.merge(tracks.iter().cloned());
        history.save_to(&self.history_path)?;
        Ok(history)
    }
}

async fn submit_request(request: GenerationRequest, submit: SubmitArgs, json: bool) -> Result<()> {
    let request = request.instrumental(submit.instrumental).wait_audio(!submit.no_wait);
    let session = Session::open()?;

    eprintln!("Prompt: {}", request.composed_prompt());
    let mut tracks = session.client.generate(&request).await.map_err(generation_failure)?;
    session.remember(&tracks)?;

    if submit.watch && tracks.iter().any(|track| !track.is_settled()) {
        print_tracks(&tracks, json)?;
        let ids: Vec<String> = tracks.iter().map(|track| track.id.clone()).collect();
        let options = WatchOptions {
            interval: Duration::from_secs(submit.poll_interval.max(1)),
            ..WatchOptions::default()
        };
        let outcome = watch_until_settled(&session.client, &ids, options, |attempt, tracks| {
            let ready = tracks.iter().filter(|track| track.is_settled()).count();
            eprintln!("Poll {attempt}: {ready}/{} tracks ready", tracks.len());
        })
        .await
        .map_err(generation_failure)?;
        if let WatchOutcome::Pending(_) = outcome {
            eprintln!("Still rendering; check again later with `tunecraft status {}`", ids.join(" "));
        }
        tracks = outcome.into_tracks();
        session.remember(&tracks)?;
    } else if !request.wait_for_audio {
        let ids: Vec<&str> = tracks.iter().map(|track| track.id.as_str()).collect();
        eprintln!("Generation continues in the background; check with `tunecraft status {}`", ids.join(" "));
    }

    print_tracks(&tracks, json)?;

    if submit.download {
        let cache = AudioCache::new(session.config.artifact_dir().clone(), session.config.timeout())?;
        for track in tracks.iter().filter(|track| track.audio_url.is_some()) {
            let local = cache.fetch(track).await?;
            eprintln!("Saved {} to {}", track.title, local.local_path.display());
        }
    }
    Ok(())
}

async fn download_track(id: &str) -> Result<PathBuf> {
    let session = Session::open()?;
    let history = TrackHistory::load_from(&session.history_path)?;

    let track = match history.get(id).filter(|track| track.audio_url.is_some()) {
        Some(track) => track.clone(),
        None => {
            let tracks = session
                .client
                .fetch_status(&[id.to_string()])
                .await
                .map_err(generation_failure)?;
            session.remember(&tracks)?;
            tracks
                .into_iter()
                .find(|track| track.id == id)
                .ok_or_else(|| anyhow!("track {id} not found"))?
        }
    };

    let cache = AudioCache::new(session.config.artifact_dir().clone(), session.config.timeout())?;
    let local = cache.fetch(&track).await?;
    println!("{}", local.local_path.display());
    Ok(local.local_path)
}

fn print_tracks(tracks: &[Track], json: bool) -> Result<()> {
    if json {
        let encoded = serde_json::to_string_pretty(tracks).context("failed to encode tracks")?;
        println!("{encoded}");
    } else {
        println!("{}", describe_tracks(tracks));
    }
    Ok(())
}

fn generation_failure(err: GenerationError) -> anyhow::Error {
    let message = describe_error(&err);
    anyhow::Error::new(err).context(message)
}
