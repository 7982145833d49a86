use anyhow::Context;
use lifx_dash::Settings;

use crate::Params;
use crate::utils::{create_dashboard, format_view};

pub async fn list(params: &Params, settings: &Settings, info: bool) -> anyhow::Result<()> {
    let dashboard = create_dashboard(params, settings)?;
    dashboard.poller.wait_until_ready().await;
    dashboard
        .poller
        .poll_once()
        .await
        .context("Failed to fetch lights")?;

    let groups = dashboard.store.grouped();
    if groups.is_empty() {
        println!("No lights found");
        return Ok(());
    }
    let mut index = 1;
    for group in groups {
        println!("[{}]", group.name);
        for view in group.views {
            println!("  {index} - {}", format_view(&view));
            if info && let Some(device) = dashboard.store.snapshot(&view.serial) {
                for line in device.info().lines() {
                    println!("      {line}");
                }
            }
            index += 1;
        }
    }
    Ok(())
}
