use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use lifx_dash::{ChangeSet, Settings, ViewStore};
use tracing::info;

use crate::Params;
use crate::utils::{Dashboard, create_dashboard, format_groups, format_view, serial_at};

const KEY_POLL: Duration = Duration::from_millis(50);

/// Prints outside raw mode so line endings behave.
fn print_lines(lines: &[String]) -> std::io::Result<()> {
    terminal::disable_raw_mode()?;
    for line in lines {
        println!("{line}");
    }
    terminal::enable_raw_mode()
}

fn describe(store: &ViewStore, change: &ChangeSet) -> Vec<String> {
    match change {
        ChangeSet::Rebuilt(groups) => {
            let mut lines = vec![format!("Roster rebuilt, {} lights", store.len())];
            lines.extend(format_groups(groups));
            lines
        }
        ChangeSet::Updated(changed) => store
            .views(changed)
            .iter()
            .map(|view| format!("Updated: {}", format_view(view)))
            .collect(),
    }
}

pub async fn watch(params: &Params, settings: &Settings) -> anyhow::Result<()> {
    let Dashboard {
        transport,
        store,
        dispatcher,
        poller,
        mut changes,
    } = create_dashboard(params, settings)?;
    let handle = poller.spawn();

    println!("Press 'q' to quit");
    println!("Press '1'..'9' to toggle a light");
    println!("Press 'a' to add a light, 'r' to remove the last one");
    println!("Press 'n' to cut or restore the network");
    println!("Press 'l' to list lights");

    terminal::enable_raw_mode()?;
    let mut reachable = true;
    let result: anyhow::Result<()> = async {
        loop {
            while let Ok(change) = changes.try_recv() {
                print_lines(&describe(&store, &change))?;
            }

            if !event::poll(Duration::ZERO)? {
                tokio::time::sleep(KEY_POLL).await;
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char(c @ '1'..='9') => {
                    let index = c as usize - '0' as usize;
                    let line = match serial_at(&store, index) {
                        Ok(serial) => match dispatcher.toggle(serial).await {
                            Ok(view) => format!("Toggled: {}", format_view(&view)),
                            Err(e) => format!("Toggle failed: {e}"),
                        },
                        Err(e) => e.to_string(),
                    };
                    print_lines(&[line])?;
                }
                KeyCode::Char('a') => {
                    let serial = transport.add_random_device();
                    info!(%serial, "Simulated light added");
                    print_lines(&[format!("Added light {serial}")])?;
                }
                KeyCode::Char('r') => {
                    let line = match transport.serials().last() {
                        Some(serial) => {
                            transport.remove_device(serial);
                            format!("Removed light {serial}")
                        }
                        None => "No lights to remove".to_string(),
                    };
                    print_lines(&[line])?;
                }
                KeyCode::Char('n') => {
                    reachable = !reachable;
                    transport.set_reachable(reachable);
                    let state = if reachable { "restored" } else { "down" };
                    print_lines(&[format!("Network {state}")])?;
                }
                KeyCode::Char('l') => print_lines(&format_groups(&store.grouped()))?,
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    terminal::disable_raw_mode()?;
    println!("Exiting...");
    handle.stop().await;
    result
}
