use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use nomen_contracts::analysis::{AnalysisResult, Reading};
use nomen_contracts::events::EventLog;
use nomen_contracts::history::HistoryStore;
use nomen_contracts::input::{Persona, UserInput};
use nomen_contracts::preferences::{PreferenceStore, Theme};
use nomen_engine::config::{DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use nomen_engine::{PipelineConfig, ResultPipeline};

#[derive(Debug, Parser)]
#[command(name = "nomen", version, about = "Read a name through a generative model")]
struct Cli {
    /// Where history, preferences and events live (default: $NOMEN_HOME or .nomen).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Analyze(AnalyzeArgs),
    #[command(subcommand)]
    History(HistoryCommand),
    #[command(subcommand)]
    Draft(DraftCommand),
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    occupation: Option<String>,
    #[arg(long)]
    background: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    persona: Option<Persona>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL)]
    image_model: String,
    #[arg(long)]
    no_image: bool,
    #[arg(long)]
    image_out: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List,
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    Clear,
}

#[derive(Debug, Subcommand)]
enum DraftCommand {
    Show,
    Clear,
}

#[derive(Debug, Subcommand)]
enum ThemeCommand {
    Show,
    Toggle,
    Set { theme: Theme },
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("nomen error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir, env::var("NOMEN_HOME").ok());
    match cli.command {
        Command::Analyze(args) => run_analyze(&data_dir, args),
        Command::History(command) => run_history(&data_dir, command),
        Command::Draft(command) => run_draft(&data_dir, command),
        Command::Theme(command) => run_theme(&data_dir, command),
    }
}

fn resolve_data_dir(flag: Option<PathBuf>, env_home: Option<String>) -> PathBuf {
    flag.or_else(|| {
        env_home
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(".nomen"))
}

fn history_store(data_dir: &Path) -> HistoryStore {
    HistoryStore::new(data_dir.join("history.json"))
}

fn preference_store(data_dir: &Path) -> PreferenceStore {
    PreferenceStore::new(data_dir.join("preferences.json"))
}

fn run_analyze(data_dir: &Path, args: AnalyzeArgs) -> Result<i32> {
    let preferences = preference_store(data_dir);
    let input = merge_input(&args, preferences.draft());
    preferences.save_draft(&input)?;
    if let Err(reason) = input.validate() {
        bail!(reason);
    }

    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| data_dir.join("events.jsonl"));
    let session_id = format!("session-{}", chrono::Utc::now().timestamp_millis());
    let pipeline = ResultPipeline::gemini(PipelineConfig {
        api_key: args.api_key.clone(),
        text_model: args.text_model.clone(),
        image_model: args.image_model.clone(),
        image_enabled: !args.no_image,
        ..PipelineConfig::default()
    })
    .with_events(EventLog::new(events_path, session_id));

    eprintln!(
        "Reading {} as {} ({} mode)...",
        input.name.trim(),
        input.persona.label(),
        input.mode()
    );
    let result = generate_and_record(&pipeline, &history_store(data_dir), &input)?;

    if let Some(path) = args.image_out.as_deref() {
        match result.image_url.as_deref() {
            Some(data_url) => {
                let written = write_data_url_image(data_url, path)?;
                eprintln!("Image written to {}", written.display());
            }
            None => eprintln!("No image was generated for this reading."),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_result(&result));
    }
    Ok(0)
}

/// History only ever sees successful results.
fn generate_and_record(
    pipeline: &ResultPipeline,
    history: &HistoryStore,
    input: &UserInput,
) -> Result<AnalysisResult> {
    let result = pipeline.generate(input)?;
    history
        .prepend(&result)
        .with_context(|| format!("failed to save reading to {}", history.path().display()))?;
    Ok(result)
}

fn run_history(data_dir: &Path, command: HistoryCommand) -> Result<i32> {
    let store = history_store(data_dir);
    match command {
        HistoryCommand::List => {
            let entries = store.list();
            if entries.is_empty() {
                println!("No readings yet.");
            }
            for entry in entries {
                println!(
                    "{}  {}  {:<6} {:<8} {}",
                    entry.id,
                    format_timestamp(entry.timestamp),
                    entry.mode(),
                    entry.user_input.persona.label(),
                    entry.user_input.name
                );
            }
            Ok(0)
        }
        HistoryCommand::Show { id, json } => {
            let Some(entry) = store.get(&id) else {
                eprintln!("No reading with id {id}.");
                return Ok(1);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                print!("{}", render_result(&entry));
            }
            Ok(0)
        }
        HistoryCommand::Clear => {
            store.clear()?;
            println!("History cleared.");
            Ok(0)
        }
    }
}

fn run_draft(data_dir: &Path, command: DraftCommand) -> Result<i32> {
    let preferences = preference_store(data_dir);
    match command {
        DraftCommand::Show => match preferences.draft() {
            Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            None => println!("No saved draft."),
        },
        DraftCommand::Clear => {
            preferences.clear_draft()?;
            println!("Draft cleared.");
        }
    }
    Ok(0)
}

fn run_theme(data_dir: &Path, command: ThemeCommand) -> Result<i32> {
    let preferences = preference_store(data_dir);
    let theme = match command {
        ThemeCommand::Show => preferences.theme(),
        ThemeCommand::Toggle => preferences.toggle_theme()?,
        ThemeCommand::Set { theme } => {
            preferences.set_theme(theme)?;
            theme
        }
    };
    println!("{theme}");
    Ok(0)
}

/// Flags win; anything left out comes from the saved draft.
fn merge_input(args: &AnalyzeArgs, draft: Option<UserInput>) -> UserInput {
    let draft = draft.unwrap_or_default();
    UserInput {
        name: args.name.clone().unwrap_or(draft.name),
        occupation: args.occupation.clone().unwrap_or(draft.occupation),
        background: args
            .background
            .clone()
            .or(draft.background)
            .filter(|value| !value.trim().is_empty()),
        location: args.location.clone().unwrap_or(draft.location),
        persona: args.persona.unwrap_or(draft.persona),
    }
}

fn render_result(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let input = &result.user_input;
    let _ = writeln!(
        out,
        "━━ {} · {} · {} ━━",
        input.name.trim(),
        input.persona.label(),
        format_timestamp(result.timestamp)
    );
    let _ = writeln!(out, "\n{}\n", result.prologue);

    match &result.reading {
        Reading::Standard(reading) => {
            push_section(&mut out, "意象 Imagery", &reading.imagery);
            push_section(&mut out, "能量 Energy", &reading.energy);
            push_section(&mut out, "心理 Psychology", &reading.psychology);
            push_section(&mut out, "社会 Sociology", &reading.sociology);
        }
        Reading::Deep(reading) => {
            let imagery = &reading.imagery_detail;
            push_section(
                &mut out,
                "意象拆解 Imagery",
                &format!(
                    "字面: {}\n能量: {}\n隐喻: {}",
                    imagery.literal, imagery.energy, imagery.metaphor
                ),
            );
            let personality = &reading.personality_detail;
            push_section(
                &mut out,
                "性格画像 Personality",
                &format!(
                    "自我: {}\n社交: {}\n心态: {}",
                    personality.self_perception, personality.social_strategy, personality.mindset
                ),
            );
            let fortune = &reading.fortune_detail;
            push_section(
                &mut out,
                "运势推演 Fortune",
                &format!(
                    "财运: {}\n情感: {}\n隐忧: {}",
                    fortune.wealth, fortune.relationships, fortune.hidden_worries
                ),
            );
        }
    }

    if let Some(timeline) = result.timeline().filter(|rows| !rows.is_empty()) {
        let body = timeline
            .iter()
            .map(|node| format!("{}  {}: {}", node.year, node.title, node.choice))
            .collect::<Vec<String>>()
            .join("\n");
        push_section(&mut out, "流年抉择 Timeline", &body);
    }
    if let Some(totem) = result.energy_totem() {
        push_section(
            &mut out,
            "能量图腾 Totem",
            &format!("{}  {}", totem.kanji, totem.meaning),
        );
    }

    push_section(&mut out, "总结 Summary", &result.summary);
    push_section(&mut out, "建议 Advice", &result.advice);
    push_section(&mut out, "终极一问 Final question", &result.final_question);
    if let Some(mantra) = result.daily_mantra.as_deref() {
        push_section(&mut out, "今日箴言 Mantra", mantra);
    }
    if let Some(gold) = result.gold_value {
        let _ = writeln!(out, "名字估值 Gold value: {gold}");
    }
    let _ = writeln!(
        out,
        "Image: {}",
        if result.image_url.is_some() {
            "attached"
        } else {
            "none"
        }
    );
    let _ = writeln!(out, "id: {}", result.id);
    out
}

fn push_section(out: &mut String, title: &str, body: &str) {
    let _ = writeln!(out, "【{title}】\n{}\n", body.trim());
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let Some(rest) = data_url.strip_prefix("data:") else {
        bail!("image url is not a data URI");
    };
    let Some((header, data)) = rest.split_once(',') else {
        bail!("data URI has no payload");
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        bail!("data URI is not base64 encoded");
    };
    let bytes = BASE64
        .decode(data.trim().as_bytes())
        .context("image base64 decode failed")?;
    Ok((mime.to_string(), bytes))
}

/// Writes the decoded image, picking an extension from the bytes when `path` has none.
fn write_data_url_image(data_url: &str, path: &Path) -> Result<PathBuf> {
    let (mime, bytes) = decode_data_url(data_url)?;
    let mut target = path.to_path_buf();
    if target.extension().is_none() {
        let ext = image::guess_format(&bytes)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .or_else(|| mime.strip_prefix("image/"))
            .unwrap_or("png");
        target.set_extension(ext);
    }
    if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes).with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}
