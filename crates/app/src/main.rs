#![forbid(unsafe_code)]

use clap::Parser;
use lt_app::config::{AppConfig, Cli, Command};
use lt_app::render::{RenderOptions, render_columns, render_outline};
use lt_app::{AppSession, PermissionState, RecordEdit, SessionError, SyncReconciler, telemetry};
use lt_core::FlatRecord;
use lt_storage::SqliteKvStore;
use std::time::Instant;

type Session = AppSession<SqliteKvStore, PermissionState>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    telemetry::init(&cli.config.log);

    let store = SqliteKvStore::open(&cli.config.storage_dir, cli.config.device.clone())?;
    let mut session = AppSession::load(store, cli.config.favicon_permission)?;

    if let Err(err) = run(&mut session, &cli.config, cli.command) {
        eprintln!("linktree: {err}");
        std::process::exit(1);
    }
    Ok(())
}

fn run(session: &mut Session, config: &AppConfig, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let options = RenderOptions {
        extension_base: config.extension_base.clone(),
        ..RenderOptions::default()
    };

    match command {
        Command::Add {
            name,
            url,
            parent,
            icon,
            border,
        } => {
            session.add(FlatRecord {
                name,
                url,
                parent,
                task_complete: None,
                icon,
                border,
            })?;
            print_tree(session, &options, false);
        }
        Command::Rm { name } => {
            session.remove(&name)?;
            print_tree(session, &options, false);
        }
        Command::Edit {
            name,
            rename,
            url,
            clear_url,
            parent,
            clear_parent,
            icon,
            border,
        } => {
            let existing = session
                .store()
                .get(&name)
                .ok_or_else(|| SessionError::NotFound(name.clone()))?;
            let mut edit = RecordEdit::from_record(existing);
            if let Some(rename) = rename {
                edit.name = rename;
            }
            if clear_url {
                edit.url = None;
            } else if url.is_some() {
                edit.url = url;
            }
            if clear_parent {
                edit.parent = None;
            } else if parent.is_some() {
                edit.parent = parent;
            }
            if icon.is_some() {
                edit.icon = icon;
            }
            if border.is_some() {
                edit.border = border;
            }
            session.edit(&name, edit)?;
            print_tree(session, &options, false);
        }
        Command::Toggle { name, context } => {
            if context {
                if !session.context_toggle(&name)? {
                    println!("right-click complete is disabled in settings");
                    return Ok(());
                }
            } else {
                session.toggle_task_complete(&name)?;
            }
            print_tree(session, &options, false);
        }
        Command::Up { name } => {
            if !session.move_up(&name)? {
                println!("{name} is already first among its siblings");
            }
            print_tree(session, &options, false);
        }
        Command::Down { name } => {
            if !session.move_down(&name)? {
                println!("{name} is already last among its siblings");
            }
            print_tree(session, &options, false);
        }
        Command::Show {
            columns,
            json,
            icons,
        } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&session.tree().root)?);
            } else {
                let options = RenderOptions {
                    show_icons: icons,
                    ..options
                };
                print_tree(session, &options, columns);
            }
        }
        Command::Settings {
            provider,
            right_click,
            theme,
        } => {
            let mut settings = session.settings().clone();
            if let Some(provider) = provider {
                settings.default_favicon_provider = provider;
            }
            if let Some(right_click) = right_click {
                settings.enable_right_click_complete = right_click;
            }
            if let Some(theme) = theme {
                settings.theme = theme;
            }
            session.save_settings(settings)?;
            println!("{}", serde_json::to_string_pretty(session.settings())?);
        }
        Command::Usage => {
            let usage = session.usage()?;
            println!(
                "{}% of the per-item quota ({} of {} bytes)",
                usage.percent, usage.bytes_in_use, usage.quota_bytes
            );
        }
        Command::Watch {
            columns,
            max_passes,
        } => watch(session, config, options, columns, max_passes),
    }
    Ok(())
}

fn watch(session: &mut Session, config: &AppConfig, options: RenderOptions, columns: bool, max_passes: Option<u64>) {
    print_tree(session, &options, columns);
    session.subscribe_tree(move |build| {
        let text = if columns {
            render_columns(&build.root, &options)
        } else {
            render_outline(&build.root, &options)
        };
        println!("--");
        print!("{text}");
    });

    let mut reconciler = SyncReconciler::new(config.debounce());
    loop {
        if let Err(err) = reconciler.pump(session, Instant::now()) {
            tracing::error!(error = %err, "reconciliation skipped");
        }
        if max_passes.is_some_and(|max| reconciler.passes() >= max) {
            break;
        }
        std::thread::sleep(reconciler.next_wake(Instant::now(), config.poll_interval()));
    }
}

fn print_tree(session: &Session, options: &RenderOptions, columns: bool) {
    let root = &session.tree().root;
    if columns {
        print!("{}", render_columns(root, options));
    } else {
        print!("{}", render_outline(root, options));
    }
    for message in session.footer() {
        println!("! {}", message.as_str());
    }
}
