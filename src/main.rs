// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Questmap CLI entrypoint.
//!
//! By default this loads the chat state from the data directory, compiles the
//! active chat's quest, and prints the rendered graph. `--generate` asks the
//! generation backend for a fresh quest first; `--export` writes the active
//! quest as JSON.

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use questmap::model::{decode_quest_payload, ChatId, QuestDocument};
use questmap::render::{GraphRenderer, HeadlessEngine, InteractionMode, SurfaceContent};
use questmap::session::SessionStore;
use questmap::store::{ChatStore, WriteDurability};
use questmap::theme::{GraphTheme, ThemeMode};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [<data-dir>] [--durable-writes] [--theme light|dark]\n  {program} [<data-dir>] --export <path>\n  {program} [<data-dir>] --generate --provider <name> --model <name> [--backend <url>] [--setting <text>]\n  {program} [<data-dir>] --chat <chat-id>\n  {program} --compile <quest.json> [--theme light|dark]\n\nIf data-dir is omitted, the current working directory is used.\n\n--chat switches the active chat before anything else runs.\n--compile bypasses the chat state and renders a quest JSON file directly.\n--theme overrides the QUESTMAP_THEME environment variable.\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    data_dir: Option<String>,
    durable_writes: bool,
    theme: Option<ThemeMode>,
    chat: Option<String>,
    compile: Option<String>,
    export: Option<String>,
    generate: bool,
    backend: Option<String>,
    provider: Option<String>,
    model: Option<String>,
    setting: Option<String>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            "--theme" => {
                if options.theme.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.theme = Some(match raw.as_str() {
                    "light" => ThemeMode::Light,
                    "dark" => ThemeMode::Dark,
                    _ => return Err(()),
                });
            }
            "--chat" => {
                if options.chat.is_some() {
                    return Err(());
                }
                options.chat = Some(args.next().ok_or(())?);
            }
            "--compile" => {
                if options.compile.is_some() {
                    return Err(());
                }
                options.compile = Some(args.next().ok_or(())?);
            }
            "--export" => {
                if options.export.is_some() {
                    return Err(());
                }
                options.export = Some(args.next().ok_or(())?);
            }
            "--generate" => {
                if options.generate {
                    return Err(());
                }
                options.generate = true;
            }
            "--backend" => {
                if options.backend.is_some() {
                    return Err(());
                }
                options.backend = Some(args.next().ok_or(())?);
            }
            "--provider" => {
                if options.provider.is_some() {
                    return Err(());
                }
                options.provider = Some(args.next().ok_or(())?);
            }
            "--model" => {
                if options.model.is_some() {
                    return Err(());
                }
                options.model = Some(args.next().ok_or(())?);
            }
            "--setting" => {
                if options.setting.is_some() {
                    return Err(());
                }
                options.setting = Some(args.next().ok_or(())?);
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.data_dir.is_some() {
                    return Err(());
                }
                options.data_dir = Some(arg);
            }
        }
    }

    if options.compile.is_some()
        && (options.generate || options.export.is_some() || options.chat.is_some())
    {
        return Err(());
    }

    if options.generate {
        if options.provider.is_none() || options.model.is_none() {
            return Err(());
        }
    } else if options.backend.is_some()
        || options.provider.is_some()
        || options.model.is_some()
        || options.setting.is_some()
    {
        return Err(());
    }

    Ok(options)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "questmap".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let dir = options.data_dir.unwrap_or_else(|| ".".to_owned());
        let store = if options.durable_writes {
            ChatStore::new(dir).with_durability(WriteDurability::Durable)
        } else {
            ChatStore::new(dir)
        };

        let theme = match options.theme {
            Some(mode) => GraphTheme::for_mode(mode),
            None => GraphTheme::from_env()?,
        };

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        if let Some(path) = options.compile.as_deref() {
            let payload = std::fs::read_to_string(path)?;
            let doc = decode_quest_payload(&payload)?;
            return render_and_print(&program, &runtime, theme, &doc);
        }

        let mut session = SessionStore::open(store)?;

        if let Some(chat) = options.chat.as_deref() {
            session.switch_chat(&ChatId::new(chat)?)?;
        } else if session.active_chat().is_none() {
            session.create_chat()?;
        }

        if options.generate {
            let provider = options.provider.as_deref().unwrap_or_default();
            let model = options.model.as_deref().unwrap_or_default();
            let backend = options
                .backend
                .as_deref()
                .unwrap_or(questmap::backend::DEFAULT_BACKEND_URL);

            let api_key = session
                .store()
                .load_api_keys()?
                .get(provider)
                .cloned()
                .unwrap_or_default();

            if let Some(setting) = options.setting.as_deref() {
                session.set_setting(setting)?;
            }
            let setting = session
                .active_chat()
                .map(|chat| chat.setting().to_owned())
                .unwrap_or_default();

            let client = questmap::backend::GenerationClient::new(backend);
            let request = questmap::backend::GenerateRequest {
                setting,
                api_key,
                api_provider: provider.to_owned(),
                model: model.to_owned(),
            };

            let doc = runtime.block_on(client.generate(&request, |message| {
                eprintln!("{program}: {message}");
            }))?;
            session.set_result(&doc.to_json_string())?;
        }

        if let Some(path) = options.export.as_deref() {
            session.export_active_quest(std::path::Path::new(path))?;
            session.flush();
            return Ok(());
        }

        let doc = session.active_quest()?;
        session.flush();
        render_and_print(&program, &runtime, theme, &doc)
    })();

    if let Err(err) = result {
        eprintln!("questmap: {err}");
        std::process::exit(1);
    }
}

fn render_and_print(
    program: &str,
    runtime: &tokio::runtime::Runtime,
    theme: GraphTheme,
    doc: &QuestDocument,
) -> Result<(), Box<dyn Error>> {
    let renderer = GraphRenderer::new(Arc::new(HeadlessEngine), theme);
    runtime.block_on(renderer.render_document(doc, InteractionMode::View));

    match renderer.surface().content() {
        SurfaceContent::Graph { text, .. } => {
            print!("{text}");
            Ok(())
        }
        SurfaceContent::Error(message) => {
            eprintln!("{program}: {message}");
            std::process::exit(1);
        }
        SurfaceContent::Empty => {
            eprintln!("{program}: render produced no output");
            std::process::exit(1);
        }
    }
}
