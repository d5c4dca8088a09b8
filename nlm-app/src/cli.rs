use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nlm_artifacts::{ArtifactSource, AuthProfile, NotebookClient};
use nlm_common::OutputFormat;
use nlm_config::NlmConfig;
use nlm_http::{RawResponse, RedirectTrace};
use std::path::{Path, PathBuf};

const URL_PREVIEW: usize = 100;

#[derive(Debug, Parser)]
#[command(name = "nlm", version, about = "List, download and export notebook artifacts")]
pub struct Cli {
    /// Configuration file (YAML). Defaults to ./nlm.yaml when present.
    #[arg(long, global = true, env = "NLM_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Auth profile (JSON) overriding `profile.path` from the configuration.
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    /// Mirror log events to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the artifacts of a notebook.
    List {
        notebook: String,
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show an artifact's type, status and resolved download URL.
    Inspect {
        notebook: String,
        artifact: String,
        /// Walk the download URL's redirect chain hop by hop.
        #[arg(long)]
        trace_redirects: bool,
    },
    /// Download the media (audio preferred) behind an artifact.
    Download {
        notebook: String,
        artifact: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export quiz or flashcard content.
    Export {
        notebook: String,
        artifact: String,
        /// html, markdown or json; defaults to `output.format` from the configuration.
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Treat the artifact as flashcards instead of a quiz.
        #[arg(long)]
        flashcards: bool,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarise the auth profile cookies without printing their values.
    Auth {
        /// Fail unless the profile belongs to this account.
        #[arg(long)]
        expect_email: Option<String>,
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(cli: Cli, cfg: NlmConfig) -> Result<()> {
    let profile_path = cli
        .profile
        .clone()
        .unwrap_or_else(|| cfg.profile.resolved_path());
    let profile = AuthProfile::from_json_file(&profile_path)?;

    if let Command::Auth {
        expect_email,
        force,
    } = &cli.command
    {
        print!("{}", profile.summary());
        if let Some(email) = expect_email {
            profile.ensure_same_account(email, *force)?;
            println!("Profile '{}' matches {email}", profile.name);
        }
        return Ok(());
    }

    let client = NotebookClient::new(cfg.service.clone(), profile)?;

    match cli.command {
        Command::List { notebook, json } => {
            let artifacts = client.list(&notebook).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
            } else {
                for a in &artifacts {
                    println!("{}\t{}\t{}", a.id, a.kind, a.status);
                }
            }
        }
        Command::Inspect {
            notebook,
            artifact,
            trace_redirects,
        } => {
            let (details, trace) = if trace_redirects {
                let (details, trace) = client.trace_media_redirects(&notebook, &artifact).await?;
                (details, Some(trace))
            } else {
                (client.resolve(&notebook, &artifact).await?, None)
            };
            println!("Artifact ID: {}", details.summary.id);
            println!("Artifact Type: {}", details.summary.kind);
            println!("Artifact Status: {}", details.summary.status);
            println!("Download URL: {}", preview(&details.media_url, URL_PREVIEW));
            if let Some(trace) = trace {
                print!("{}", render_trace(&trace));
            }
        }
        Command::Download {
            notebook,
            artifact,
            output,
        } => {
            let (_, resp) = client.download_media(&notebook, &artifact).await?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "{artifact}.{}",
                    extension_for(resp.content_type())
                ))
            });
            write_output(&path, &resp.body)?;
            println!("{}", saved_message(&resp, &path));
        }
        Command::Export {
            notebook,
            artifact,
            format,
            flashcards,
            title,
            output,
        } => {
            let format = format.unwrap_or(cfg.output.format);
            let title = title.unwrap_or_else(|| {
                if flashcards { "Flashcards" } else { "Quiz" }.to_string()
            });
            let rendered = client
                .interactive_content(&notebook, &artifact, &title, format, !flashcards)
                .await?;
            match output {
                Some(path) => {
                    write_output(&path, rendered.as_bytes())?;
                    println!("Wrote {format} export to {}", path.display());
                }
                None => println!("{rendered}"),
            }
        }
        Command::Auth { .. } => {}
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// File extension for a downloaded media body.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("audio/mp4") | Some("audio/x-m4a") => "m4a",
        Some("audio/mpeg") => "mp3",
        Some("audio/wav") | Some("audio/x-wav") => "wav",
        Some("video/mp4") => "mp4",
        Some("text/html") => "html",
        _ => "bin",
    }
}

/// Reports the bytes actually written, not the advertised `Content-Length`.
fn saved_message(resp: &RawResponse, path: &Path) -> String {
    format!("Saved {} bytes to {}", resp.body.len(), path.display())
}

fn render_trace(trace: &RedirectTrace) -> String {
    let mut out = String::new();
    for (i, hop) in trace.hops.iter().enumerate() {
        out.push_str(&format!("Hop {}: {}", i + 1, hop.status.as_u16()));
        if let Some(loc) = &hop.location {
            out.push_str(&format!(" -> {}", preview(loc, URL_PREVIEW)));
        }
        out.push('\n');
    }
    let final_status = trace
        .last()
        .map(|h| h.status.as_u16().to_string())
        .unwrap_or_else(|| "-".into());
    out.push_str(&format!(
        "Redirects followed: {} (final status {final_status})\n",
        trace.redirect_count()
    ));
    out
}

fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
