use anyhow::Context;
use lifx_dash::{ColorEdit, Serial, Settings, ViewState};

use crate::Params;
use crate::utils::{Dashboard, Target, create_dashboard, format_view};

async fn prepare(
    params: &Params,
    settings: &Settings,
    target: Target,
) -> anyhow::Result<(Dashboard, Serial)> {
    let dashboard = create_dashboard(params, settings)?;
    dashboard
        .poller
        .poll_once()
        .await
        .context("Failed to fetch lights")?;
    let serial = target.resolve(&dashboard.store)?;
    Ok((dashboard, serial))
}

/// Prints the optimistic view and then the polls that confirm it.
async fn report(dashboard: &Dashboard, view: ViewState) -> anyhow::Result<()> {
    println!("sent:      {}", format_view(&view));
    for _ in 0..2 {
        dashboard.poller.poll_once().await?;
        if let Some(view) = dashboard.store.get(&view.serial) {
            println!("polled:    {}", format_view(&view));
        }
    }
    Ok(())
}

pub async fn power(
    params: &Params,
    settings: &Settings,
    target: Target,
    on: bool,
) -> anyhow::Result<()> {
    let (dashboard, serial) = prepare(params, settings, target).await?;
    let view = dashboard
        .dispatcher
        .set_power(serial, on)
        .await
        .with_context(|| format!("Failed to switch {serial}"))?;
    report(&dashboard, view).await
}

pub async fn color(
    params: &Params,
    settings: &Settings,
    target: Target,
    edit: ColorEdit,
) -> anyhow::Result<()> {
    let (dashboard, serial) = prepare(params, settings, target).await?;
    let view = dashboard
        .dispatcher
        .set_color(serial, edit)
        .await
        .with_context(|| format!("Failed to recolor {serial}"))?;
    report(&dashboard, view).await
}
